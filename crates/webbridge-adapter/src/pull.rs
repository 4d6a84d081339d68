//! Pull-model inbound channel.
//!
//! Some platforms can only observe navigations. The embedded context
//! signals a message by requesting a pseudo-URL
//! `<scheme>://<instanceId>/<base64url(eventName)>/<base64url(messageKey)>`; the URL
//! carries no payload because interception channels limit its size. The
//! payload is pulled back with a second script, `fetch_entry_point(key)`.

use crate::push::parse_instance_id;
use crate::{AdapterError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;
use std::rc::Rc;
use webbridge_format::{fetch_script, ProtocolConfig};
use webbridge_runtime::{InboundMessage, InstanceDirectory, InstanceId, RawPayload, ScriptExecutor};

/// What happened to an intercepted URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    /// Not a bridge URL; let the navigation proceed.
    PassThrough,
    /// Bridge URL handled and delivered to a live bridge.
    Delivered,
    /// Bridge URL handled, but no live bridge owns the instance id.
    Dropped,
}

impl Interception {
    /// Whether the platform should cancel the navigation.
    pub fn should_cancel(self) -> bool {
        !matches!(self, Interception::PassThrough)
    }
}

/// Parts of a signal URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalUrl {
    /// Addressed bridge.
    pub instance_id: InstanceId,
    /// Event name.
    pub event_name: String,
    /// Key of the queued payload in the embedded context.
    pub message_key: String,
}

impl SignalUrl {
    /// Build the URL the embedded context requests for this message.
    pub fn to_url(&self, config: &ProtocolConfig) -> String {
        format!(
            "{}://{}/{}/{}",
            config.url_scheme,
            self.instance_id,
            URL_SAFE_NO_PAD.encode(self.event_name.as_bytes()),
            URL_SAFE_NO_PAD.encode(self.message_key.as_bytes())
        )
    }

    /// Parse `url`; `Ok(None)` if it does not use the bridge scheme.
    pub fn parse(config: &ProtocolConfig, url: &str) -> Result<Option<Self>> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Ok(None);
        };
        if !scheme.eq_ignore_ascii_case(&config.url_scheme) {
            return Ok(None);
        }

        let rest = rest.trim_end_matches('/');
        let parts: Vec<&str> = rest.split('/').collect();
        let [instance_id, event_name, message_key] = parts.as_slice() else {
            return Err(AdapterError::UnrecognizedUrl(url.to_string()));
        };
        if message_key.is_empty() {
            return Err(AdapterError::UnrecognizedUrl(url.to_string()));
        }

        Ok(Some(Self {
            instance_id: parse_instance_id(instance_id)?,
            event_name: decode_segment("event name", event_name)?,
            message_key: decode_segment("message key", message_key)?,
        }))
    }
}

fn decode_segment(what: &str, segment: &str) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AdapterError::Decode(format!("{}: {}", what, e)))?;
    String::from_utf8(bytes).map_err(|e| AdapterError::Decode(format!("{}: {}", what, e)))
}

/// Intercepts signal URLs for one embedded context and pulls their payloads.
pub struct PullChannel {
    directory: InstanceDirectory,
    executor: Rc<dyn ScriptExecutor>,
    config: ProtocolConfig,
}

impl PullChannel {
    /// Create a channel that fetches payloads through `executor`.
    pub fn new(
        directory: InstanceDirectory,
        executor: Rc<dyn ScriptExecutor>,
        config: ProtocolConfig,
    ) -> Self {
        Self {
            directory,
            executor,
            config,
        }
    }

    /// Handle a navigation request.
    ///
    /// Messages for instances that are no longer registered are dropped
    /// without the secondary round trip.
    pub fn intercept(&self, url: &str) -> Result<Interception> {
        let Some(signal) = SignalUrl::parse(&self.config, url)? else {
            return Ok(Interception::PassThrough);
        };

        if !self.directory.contains(signal.instance_id) {
            log::debug!(
                "dropping signal {:?} for unknown instance {}",
                signal.event_name,
                signal.instance_id
            );
            return Ok(Interception::Dropped);
        }

        let result = self
            .executor
            .execute(&fetch_script(&self.config, &signal.message_key))?;
        let payload = completion_to_payload(result);

        let delivered = self.directory.deliver(InboundMessage {
            instance_id: signal.instance_id,
            event_name: signal.event_name,
            payload,
        });
        Ok(if delivered {
            Interception::Delivered
        } else {
            Interception::Dropped
        })
    }
}

/// Platforms report a script's completion value as JSON; a string result
/// arrives as a quoted literal and is unwrapped back to its text.
fn completion_to_payload(result: Option<String>) -> RawPayload {
    let Some(text) = result else {
        return RawPayload::Empty;
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Null) => RawPayload::Empty,
        Ok(Value::String(inner)) => RawPayload::Text(inner),
        Ok(value) => RawPayload::Structured(value),
        Err(_) => RawPayload::Text(text),
    }
}
