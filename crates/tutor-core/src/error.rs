use thiserror::Error;

/// Failure taxonomy shared by every adapter and the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Unexpected format: {0}")]
    UnexpectedFormat(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A single streamed record failed to parse. Never terminates a stream.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

impl Error {
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        Error::UpstreamUnavailable(format!("{context}: {err}"))
    }

    pub fn unexpected(context: &str, err: impl std::fmt::Display) -> Self {
        Error::UnexpectedFormat(format!("{context}: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
