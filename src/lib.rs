//! Rideshare Backend Library
//!
//! Scope-gated bearer-token auth core plus the ride-hailing HTTP API built
//! on it. The binary in `main.rs` only wires configuration and serves.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod models;
pub mod store;
