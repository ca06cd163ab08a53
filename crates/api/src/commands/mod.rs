//! Command layer
//!
//! Every operation returns an envelope instead of a `Result` so callers
//! always receive a serializable shape: `{data, error}` for operations that
//! produce a record and `{success, error}` for actions.

pub mod appointments;
pub mod directory;
pub mod health;

use careline_domain::Result;
use serde::Serialize;

pub use appointments::*;
pub use directory::*;
pub use health::*;

/// `{data, error}` envelope
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip)]
    error_kind: Option<&'static str>,
}

impl<T> CommandResponse<T> {
    /// Error label of a failed command (see `CarelineError::label`).
    pub fn error_kind(&self) -> Option<&'static str> {
        self.error_kind
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl<T> From<Result<T>> for CommandResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self { data: Some(data), error: None, error_kind: None },
            Err(err) => {
                Self { data: None, error: Some(err.to_string()), error_kind: Some(err.label()) }
            }
        }
    }
}

/// `{success, error}` envelope
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub error: Option<String>,
    #[serde(skip)]
    error_kind: Option<&'static str>,
}

impl ActionResponse {
    pub fn error_kind(&self) -> Option<&'static str> {
        self.error_kind
    }
}

impl<T> From<Result<T>> for ActionResponse {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self { success: true, error: None, error_kind: None },
            Err(err) => {
                Self { success: false, error: Some(err.to_string()), error_kind: Some(err.label()) }
            }
        }
    }
}
