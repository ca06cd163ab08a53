//! # Careline API
//!
//! Application layer - commands, HTTP routes and the main entry point.
//!
//! This crate contains:
//! - Commands returning `{data, error}` / `{success, error}` envelopes
//! - Application context (dependency injection)
//! - The axum router exposing the commands as JSON routes
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod http;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
