//! HTTP API: participant endpoints under `/api/v1`, admin under `/admin`.

pub mod admin;
pub mod error;
pub mod extractors;
pub mod participant;
