//! # webbridge-format
//!
//! Wire format for the webbridge protocol.
//!
//! The host can only talk to an embedded script context by injecting a
//! script string, and can only listen through side channels the embedded
//! context triggers. This crate owns everything that crosses that boundary:
//!
//! - Reserved identifiers and [`ProtocolConfig`] (loadable from TOML)
//! - Script builders for event emission and remote function calls
//! - The inbound response envelope `{reqId, isError, response}`
//! - Raw payload decoding with plain-text fallback
//! - A conforming decoder for generated scripts, used by simulators and tests
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use webbridge_format::{event_script, parse_script, OutboundScript, ProtocolConfig};
//!
//! let config = ProtocolConfig::default();
//! let script = event_script(&config, "ping", &json!({"n": 1}));
//! assert_eq!(script, r#"_onNativeEvent("ping","{\"n\":1}");"#);
//!
//! match parse_script(&config, &script).unwrap() {
//!     OutboundScript::Event { event_name, payload } => {
//!         assert_eq!(event_name, "ping");
//!         assert_eq!(payload, json!({"n": 1}));
//!     }
//!     other => panic!("unexpected script: {:?}", other),
//! }
//! ```

mod codec;
mod config;
mod envelope;
mod error;

pub use codec::{
    call_script, event_script, fetch_script, parse_script, script_string_literal,
    serialize_payload, CallArgs, OutboundScript, UNSERIALIZABLE_PLACEHOLDER,
};
pub use config::{
    ProtocolConfig, BLANK_URL, CALL_ENTRY_POINT, EVENT_ENTRY_POINT, FETCH_ENTRY_POINT,
    RESPONSE_EVENT, URL_SCHEME,
};
pub use envelope::{RawPayload, ResponseEnvelope};
pub use error::{Error, Result};
