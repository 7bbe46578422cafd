use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied input has the wrong shape. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection failure, pool timeout or query failure.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid retention schedule: {0}")]
    Schedule(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Whether a caller may reasonably retry an idempotent read after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Storage(err) => is_transient_error(err),
            _ => false,
        }
    }
}

fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => {
            // Connection-class SQLSTATEs
            db_err.code().is_some_and(|code| {
                code == "08000" || // connection_exception
                code == "08003" || // connection_does_not_exist
                code == "08006" || // connection_failure
                code == "57P03" || // cannot_connect_now
                code == "53300" // too_many_connections
            })
        }
        _ => false,
    }
}
