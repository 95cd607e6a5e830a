use thiserror::Error;

/// Top-level error type for the jobscout system.
///
/// Each variant maps to a subsystem or failure class. Subsystem crates
/// either use these variants directly or define their own error types
/// and implement `From<SubsystemError> for JobscoutError` so that the
/// `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobscoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The vacancy listings API failed or returned an error marker.
    #[error("Listings error: {0}")]
    Listings(String),

    /// The completion service failed at the network or HTTP level.
    #[error("Completion error: {0}")]
    Completion(String),

    /// A remote response could not be decoded into the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The completion provider rejected the request with a quota error
    /// on every configured API key.
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for JobscoutError {
    fn from(err: toml::de::Error) -> Self {
        JobscoutError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for JobscoutError {
    fn from(err: toml::ser::Error) -> Self {
        JobscoutError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for JobscoutError {
    fn from(err: serde_json::Error) -> Self {
        JobscoutError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for jobscout operations.
pub type Result<T> = std::result::Result<T, JobscoutError>;
