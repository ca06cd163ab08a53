//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AppointmentStatus;

/// Main error type for Careline
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CarelineError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CarelineError {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// Shorthand for a missing appointment.
    pub fn appointment_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("appointment {id}"))
    }
}

/// Result type alias for Careline operations
pub type Result<T> = std::result::Result<T, CarelineError>;
