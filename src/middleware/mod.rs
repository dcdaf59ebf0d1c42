//! Middleware for observability.
//!
//! Request logging with latency tracking. Auth gating lives in
//! `auth::middleware`.

pub mod logging;

pub use logging::request_logging;
