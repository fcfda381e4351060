#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

//! Wire objects shared between the evreg server and its clients, plus an
//! optional reqwest-based API client (feature `client`).

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
