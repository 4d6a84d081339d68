use crate::InstanceId;
use serde_json::Value;
use thiserror::Error;

/// The embedded context could not run a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script execution failed: {message}")]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    /// Create a new execution error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Human-readable reason.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced synchronously by bridge operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The event name is the reserved response event.
    #[error("event name {0:?} is reserved for internal use")]
    ReservedEventName(String),

    /// The executor could not inject the script.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// An initial URL was given without a loader to navigate to it.
    #[error("initial url {0:?} requires a content loader")]
    MissingLoader(String),

    /// The instance has been torn down.
    #[error("bridge instance {0} has been destroyed")]
    Destroyed(InstanceId),
}

/// Outcome of an awaited remote call that did not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// The embedded function reported a failure; carries its response.
    #[error("remote function failed: {0}")]
    Remote(Value),

    /// The bridge was destroyed before a response arrived.
    #[error("call abandoned before a response arrived")]
    Abandoned,

    /// The call could not be issued.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for webbridge-runtime operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
