//! Command execution helpers
//!
//! Times and logs every command so individual commands stay one-liners.

use std::future::Future;
use std::time::Instant;

use careline_domain::{CarelineError, Result as DomainResult};

use crate::utils::logging::log_command_execution;

/// Execute a command future with timing and structured logging.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn get_appointment(ctx: &AppContext, id: Uuid) -> CommandResponse<Appointment> {
///     execute_command("appointments::get_appointment", ctx.appointments.get(id))
///         .await
///         .into()
/// }
/// ```
pub async fn execute_command<Fut, T>(command: &str, command_fut: Fut) -> DomainResult<T>
where
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();

    let result = command_fut.await;

    let error_type = result.as_ref().err().map(CarelineError::label);
    log_command_execution(command, start.elapsed(), result.is_ok(), error_type);

    result
}
