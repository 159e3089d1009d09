//! Conversions from external infrastructure errors into domain errors.

use overtrakt_domain::OvertraktError;
use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub OvertraktError);

impl From<InfraError> for OvertraktError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<OvertraktError> for InfraError {
    fn from(value: OvertraktError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoOvertraktError {
    fn into_overtrakt(self) -> OvertraktError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → OvertraktError */
/* -------------------------------------------------------------------------- */

impl IntoOvertraktError for SqlError {
    fn into_overtrakt(self) -> OvertraktError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        OvertraktError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        OvertraktError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        OvertraktError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::CannotOpen, _) => {
                        OvertraktError::Database(format!("unable to open database: {message}"))
                    }
                    _ => OvertraktError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => OvertraktError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                OvertraktError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                OvertraktError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => OvertraktError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => OvertraktError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        Self(value.into_overtrakt())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → OvertraktError */
/* -------------------------------------------------------------------------- */

impl IntoOvertraktError for PoolError {
    fn into_overtrakt(self) -> OvertraktError {
        OvertraktError::Database(format!("connection pool: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        Self(value.into_overtrakt())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → OvertraktError */
/* -------------------------------------------------------------------------- */

impl IntoOvertraktError for HttpError {
    fn into_overtrakt(self) -> OvertraktError {
        if self.is_timeout() {
            return OvertraktError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return OvertraktError::Transport("HTTP connection failure".into());
        }

        if self.is_decode() {
            return OvertraktError::Decode(self.to_string());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => OvertraktError::Auth(message),
                404 => OvertraktError::NotFound(message),
                _ => OvertraktError::Transport(message),
            };
        }

        OvertraktError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_overtrakt())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
