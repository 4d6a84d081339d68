use thiserror::Error;
use webbridge_runtime::{BridgeError, ExecutionError};

/// Errors raised while translating a platform signal into an inbound message.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The URL uses the bridge scheme but not the expected layout.
    #[error("unrecognized bridge url: {0}")]
    UnrecognizedUrl(String),

    /// The instance id is not a number.
    #[error("invalid instance id: {0:?}")]
    InvalidInstanceId(String),

    /// A field could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The secondary round trip to the embedded context failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The bridge rejected a readiness transition.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for webbridge-adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
