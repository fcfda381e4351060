//! Event Registration Server
//!
//! HTTP front for the registration, attendance-token, and lifecycle engine.
//! The binary in `main.rs` wires configuration, the database pool, and the
//! scheduler around the router built here.

pub mod api;
pub mod config;
pub mod server;
pub mod shutdown;
pub mod state;
