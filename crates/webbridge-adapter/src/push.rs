//! Push-model inbound channel.
//!
//! The embedded context calls a registered native function directly, for
//! example an injected `window.webbridge.postMessage(...)`. Platforms hand
//! the arguments over either as separate strings or as one structured
//! message body; both shapes are accepted here.

use crate::{AdapterError, Result};
use serde::Deserialize;
use serde_json::Value;
use webbridge_runtime::{InboundMessage, InstanceDirectory, InstanceId, RawPayload};

/// Structured message body posted by the embedded context.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostedMessage {
    instance_id: Value,
    event_name: String,
    #[serde(default)]
    payload: Option<Value>,
}

/// Native callable that forwards embedded-context messages to their bridge.
#[derive(Debug, Clone)]
pub struct PushChannel {
    directory: InstanceDirectory,
}

impl PushChannel {
    /// Create a channel delivering into `directory`.
    pub fn new(directory: InstanceDirectory) -> Self {
        Self { directory }
    }

    /// Handle a call carrying `(instanceId, eventName, payload)` as strings.
    ///
    /// Returns whether a live bridge received the message.
    pub fn receive(
        &self,
        instance_id: &str,
        event_name: &str,
        payload: Option<String>,
    ) -> Result<bool> {
        let instance_id = parse_instance_id(instance_id)?;
        Ok(self
            .directory
            .deliver(InboundMessage::new(instance_id, event_name, payload)))
    }

    /// Handle a call carrying one structured body
    /// `{instanceId, eventName, payload}`.
    ///
    /// A string payload is kept as text so it still goes through JSON
    /// decoding with plain-text fallback.
    pub fn receive_structured(&self, body: Value) -> Result<bool> {
        let message: PostedMessage =
            serde_json::from_value(body).map_err(|e| AdapterError::Decode(e.to_string()))?;

        let instance_id = match &message.instance_id {
            Value::Number(n) => n
                .as_u64()
                .map(InstanceId::from_raw)
                .ok_or_else(|| AdapterError::InvalidInstanceId(n.to_string()))?,
            Value::String(s) => parse_instance_id(s)?,
            other => return Err(AdapterError::InvalidInstanceId(other.to_string())),
        };

        let payload = match message.payload {
            None | Some(Value::Null) => RawPayload::Empty,
            Some(Value::String(text)) => RawPayload::Text(text),
            Some(value) => RawPayload::Structured(value),
        };

        Ok(self.directory.deliver(InboundMessage {
            instance_id,
            event_name: message.event_name,
            payload,
        }))
    }

    /// Like [`receive_structured`](Self::receive_structured), for bodies
    /// delivered as JSON text.
    pub fn receive_json(&self, body: &str) -> Result<bool> {
        let body: Value =
            serde_json::from_str(body).map_err(|e| AdapterError::Decode(e.to_string()))?;
        self.receive_structured(body)
    }
}

pub(crate) fn parse_instance_id(raw: &str) -> Result<InstanceId> {
    raw.parse()
        .map_err(|_| AdapterError::InvalidInstanceId(raw.to_string()))
}
