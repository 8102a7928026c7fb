//! Cooperative society backend library
//!
//! Exposes the session token core, storage and HTTP router for the binary and tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod models;
pub mod storage;
