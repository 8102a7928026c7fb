//! Middleware for request logging and cross-origin access.

pub mod cors;
pub mod logging;

pub use cors::cors_layer;
pub use logging::request_logging;
