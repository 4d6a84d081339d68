use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply to a remote function call, as delivered on the reserved response event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Request id issued with the call.
    pub req_id: String,
    /// Whether the embedded function reported a failure.
    #[serde(default)]
    pub is_error: bool,
    /// Result value, or the error description when `is_error` is set.
    #[serde(default)]
    pub response: Value,
}

impl ResponseEnvelope {
    /// Successful reply.
    pub fn success(req_id: impl Into<String>, response: Value) -> Self {
        Self {
            req_id: req_id.into(),
            is_error: false,
            response,
        }
    }

    /// Failed reply.
    pub fn failure(req_id: impl Into<String>, response: Value) -> Self {
        Self {
            req_id: req_id.into(),
            is_error: true,
            response,
        }
    }

    /// Interpret an already decoded inbound payload as an envelope.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }

    /// JSON text of this envelope.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound payload exactly as an adapter received it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Nothing was attached to the message.
    Empty,
    /// Text that is usually, but not necessarily, JSON.
    Text(String),
    /// Data the platform already delivered in structured form.
    Structured(Value),
}

impl RawPayload {
    /// Decode into a value, never failing.
    ///
    /// Text that is not valid JSON is passed through as a string value so
    /// plain-text messages are not lost.
    pub fn decode(self) -> Value {
        match self {
            RawPayload::Empty => Value::Null,
            RawPayload::Structured(value) => value,
            RawPayload::Text(text) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) => {
                    log::trace!("payload is not JSON, passing through as text");
                    Value::String(text)
                }
            },
        }
    }
}

impl From<String> for RawPayload {
    fn from(text: String) -> Self {
        RawPayload::Text(text)
    }
}

impl From<&str> for RawPayload {
    fn from(text: &str) -> Self {
        RawPayload::Text(text.to_string())
    }
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        RawPayload::Structured(value)
    }
}

impl From<Option<String>> for RawPayload {
    fn from(text: Option<String>) -> Self {
        text.map(RawPayload::Text).unwrap_or(RawPayload::Empty)
    }
}
