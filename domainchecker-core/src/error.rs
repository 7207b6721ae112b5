use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckerError {
    #[error("Invalid domain: {0}")]
    Validation(String),

    #[error("WHOIS lookup failed: {0}")]
    Whois(String),

    #[error("WHOIS server not found for TLD: {0}")]
    WhoisServerNotFound(String),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Operation failed after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: usize, last_error: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckerError {
    /// Returns true for failures worth another attempt: timeouts, rate
    /// limiting and connection-level transport errors.
    pub fn is_transient(&self) -> bool {
        match self {
            CheckerError::Timeout(_) | CheckerError::RateLimited(_) => true,
            CheckerError::Whois(msg) | CheckerError::Dns(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("connection")
                    || lower.contains("timed out")
                    || lower.contains("refused")
                    || lower.contains("reset")
                    || lower.contains("temporary")
            }
            CheckerError::Validation(_)
            | CheckerError::WhoisServerNotFound(_)
            | CheckerError::Cache(_)
            | CheckerError::RetryExhausted { .. }
            | CheckerError::Io(_) => false,
        }
    }
}

impl From<sqlx::Error> for CheckerError {
    fn from(err: sqlx::Error) -> Self {
        CheckerError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for CheckerError {
    fn from(err: serde_json::Error) -> Self {
        CheckerError::Cache(format!("snapshot serialization failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CheckerError>;
