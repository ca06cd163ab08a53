use std::time::Duration;

use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"appointments::create_appointment"`).
/// * `elapsed` - Duration the command execution took.
/// * `success` - Whether the command completed successfully.
/// * `error_type` - Stable error label on failure.
///
/// Callers must avoid forwarding patient data in `command`.
#[inline]
pub fn log_command_execution(
    command: &str,
    elapsed: Duration,
    success: bool,
    error_type: Option<&str>,
) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(command, duration_ms, success, "command_execution_success");
    } else {
        warn!(command, duration_ms, success, error_type, "command_execution_failure");
    }
}
