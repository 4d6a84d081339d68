use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Event name the embedded side uses to deliver remote call results.
pub const RESPONSE_EVENT: &str = "_jsCallResponse";

/// Global function the embedded side exposes for host-emitted events.
pub const EVENT_ENTRY_POINT: &str = "_onNativeEvent";

/// Global function the embedded side exposes for remote function calls.
pub const CALL_ENTRY_POINT: &str = "_callJSFunction";

/// Global function returning a queued message body for pull-model adapters.
pub const FETCH_ENTRY_POINT: &str = "_fetchQueuedMessage";

/// Pseudo-URL scheme intercepted by pull-model adapters.
pub const URL_SCHEME: &str = "webbridge";

/// Content loaded into the embedded context when a bridge is destroyed.
pub const BLANK_URL: &str = "about:blank";

/// Wire-level identifiers shared by the host and the embedded context.
///
/// Both sides must agree on every value here. The defaults are the
/// reserved identifiers; a TOML file only needs to name the fields it
/// overrides.
///
/// ```
/// use webbridge_format::ProtocolConfig;
///
/// let config = ProtocolConfig::from_toml_str(r#"url_scheme = "myapp""#).unwrap();
/// assert_eq!(config.url_scheme, "myapp");
/// assert_eq!(config.response_event, "_jsCallResponse");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Reserved inbound event carrying `{reqId, isError, response}`.
    pub response_event: String,
    /// Embedded dispatcher invoked as `entry(eventName, jsonPayload)`.
    pub event_entry_point: String,
    /// Embedded dispatcher invoked as `entry(requestId, functionName, jsonArgs)`.
    pub call_entry_point: String,
    /// Embedded accessor invoked as `entry(messageKey)` by pull adapters.
    pub fetch_entry_point: String,
    /// Scheme of the pseudo-URLs pull adapters intercept.
    pub url_scheme: String,
    /// URL loaded on teardown so a stale context cannot reattach.
    pub blank_url: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            response_event: RESPONSE_EVENT.to_string(),
            event_entry_point: EVENT_ENTRY_POINT.to_string(),
            call_entry_point: CALL_ENTRY_POINT.to_string(),
            fetch_entry_point: FETCH_ENTRY_POINT.to_string(),
            url_scheme: URL_SCHEME.to_string(),
            blank_url: BLANK_URL.to_string(),
        }
    }
}

impl ProtocolConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Whether `event_name` is reserved for internal traffic.
    pub fn is_reserved(&self, event_name: &str) -> bool {
        event_name == self.response_event
    }

    /// Check that every identifier can be spliced into a generated script.
    pub fn validate(&self) -> Result<()> {
        if self.response_event.is_empty() {
            return Err(Error::Config("response_event cannot be empty".to_string()));
        }

        for (field, value) in [
            ("event_entry_point", &self.event_entry_point),
            ("call_entry_point", &self.call_entry_point),
            ("fetch_entry_point", &self.fetch_entry_point),
        ] {
            if !is_script_path(value) {
                return Err(Error::Config(format!(
                    "{} is not a valid script identifier: {:?}",
                    field, value
                )));
            }
        }

        let scheme_ok = self
            .url_scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && self
                .url_scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(Error::Config(format!(
                "url_scheme is not a valid URL scheme: {:?}",
                self.url_scheme
            )));
        }

        if self.blank_url.trim().is_empty() {
            return Err(Error::Config("blank_url cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Dotted identifier path such as `_onNativeEvent` or `window.bridge.dispatch`.
fn is_script_path(value: &str) -> bool {
    !value.is_empty() && value.split('.').all(is_script_identifier)
}

fn is_script_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_entry_points_are_accepted() {
        assert!(is_script_path("window.bridge._onNativeEvent"));
        assert!(is_script_path("$native"));
        assert!(!is_script_path("window..bridge"));
        assert!(!is_script_path("1bridge"));
        assert!(!is_script_path("alert(1);x"));
    }

    #[test]
    fn reserved_name_matches_response_event_only() {
        let config = ProtocolConfig::default();
        assert!(config.is_reserved("_jsCallResponse"));
        assert!(!config.is_reserved("ping"));
    }
}
