#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod admission;
pub mod clock;
pub mod entities;
pub mod error;
pub mod history;
pub mod issuer;
pub mod lifecycle;
pub mod notify;
pub mod redemption;
pub mod store;
pub mod windows;
