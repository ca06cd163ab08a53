//! # Careline Domain
//!
//! Business domain types and models for Careline.
//!
//! This crate contains:
//! - Appointment records, inputs and partial-update types
//! - The appointment status state machine table
//! - Calendar event payloads and directory name types
//! - Domain error types and Result definitions
//! - Configuration structures and domain constants
//!
//! ## Architecture
//! - No dependencies on other Careline crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
