use crate::models::job::Source;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Source {0} temporarily unavailable")]
    SourceUnavailable(Source),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a reqwest failure into the taxonomy, preserving the timeout case
    /// so callers can distinguish it from protocol errors.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            AppError::Timeout(timeout_secs)
        } else if err.is_connect() {
            AppError::Http(format!("Connection failed: {err}"))
        } else {
            AppError::Http(err.to_string())
        }
    }
}
