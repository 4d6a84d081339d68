use thiserror::Error;

/// Errors that can occur when reading or writing webbridge wire data.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization or parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The protocol configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// TOML parsing error.
    #[error("toml parsing error: {0}")]
    Toml(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A script does not match any generated shape.
    #[error("malformed script: {0}")]
    MalformedScript(String),

    /// A response envelope is missing fields or has the wrong shape.
    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),
}

/// Result type for webbridge-format operations.
pub type Result<T> = std::result::Result<T, Error>;
