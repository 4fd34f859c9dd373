//! HTTP API Module
//!
//! Provides a REST API for writes and reads against the replica set.

mod http;

pub use http::{AppState, HttpServer};
