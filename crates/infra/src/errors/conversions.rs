//! Conversions from external infrastructure errors into domain errors.

use careline_domain::CarelineError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CarelineError);

impl From<InfraError> for CarelineError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CarelineError> for InfraError {
    fn from(value: CarelineError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCarelineError {
    fn into_careline(self) -> CarelineError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CarelineError */
/* -------------------------------------------------------------------------- */

impl IntoCarelineError for SqlError {
    fn into_careline(self) -> CarelineError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        CarelineError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        CarelineError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 1555 | 2067) => {
                        CarelineError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        CarelineError::Database("foreign key constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 275) => {
                        CarelineError::Database(format!("check constraint violation: {message}"))
                    }
                    _ => CarelineError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => CarelineError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                CarelineError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                CarelineError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                CarelineError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidPath(path) => CarelineError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => CarelineError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_careline())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CarelineError */
/* -------------------------------------------------------------------------- */

impl IntoCarelineError for r2d2::Error {
    fn into_careline(self) -> CarelineError {
        CarelineError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_careline())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CarelineError */
/* -------------------------------------------------------------------------- */

impl IntoCarelineError for HttpError {
    fn into_careline(self) -> CarelineError {
        if self.is_timeout() {
            return CarelineError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CarelineError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => CarelineError::NotFound(message),
                400..=499 if code != 429 => CarelineError::InvalidInput(message),
                _ => CarelineError::Network(message),
            };
        }

        if self.is_decode() {
            return CarelineError::Network(format!("invalid response body: {self}"));
        }

        CarelineError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_careline())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
