use crate::{Error, ProtocolConfig, RawPayload, Result};
use serde::Serialize;
use serde_json::Value;

/// Serialized form used when a payload cannot be represented as JSON.
pub const UNSERIALIZABLE_PLACEHOLDER: &str = "null";

/// Arguments for a remote function call, always carried as a sequence.
///
/// A missing value (or JSON `null`) becomes an empty sequence, an array is
/// taken as-is, and any other single value is wrapped in a one-element
/// sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs(Vec<Value>);

impl CallArgs {
    /// No arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The arguments as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Consume into the underlying sequence.
    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Value> for CallArgs {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::empty(),
            Value::Array(items) => Self(items),
            other => Self(vec![other]),
        }
    }
}

impl From<Option<Value>> for CallArgs {
    fn from(value: Option<Value>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(items: Vec<Value>) -> Self {
        Self(items)
    }
}

impl From<()> for CallArgs {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

/// A generated script, decoded back into its parts.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundScript {
    /// `event_entry_point(eventName, jsonPayload)`.
    Event {
        /// Event name as emitted.
        event_name: String,
        /// Payload after JSON decoding (raw string when not JSON).
        payload: Value,
    },
    /// `call_entry_point(requestId, functionName, jsonArgs)`.
    Call {
        /// Correlation id the reply must carry.
        request_id: String,
        /// Embedded function to invoke.
        function: String,
        /// Decoded argument sequence.
        args: Vec<Value>,
    },
    /// `fetch_entry_point(messageKey)`.
    Fetch {
        /// Key of the queued message to pull.
        message_key: String,
    },
}

/// Serialize a payload to its JSON text, unconditionally.
///
/// Strings are serialized too, so `"hi"` becomes `"\"hi\""`. Values that
/// cannot be represented yield [`UNSERIALIZABLE_PLACEHOLDER`] instead of an
/// error.
pub fn serialize_payload<T: Serialize + ?Sized>(data: &T) -> String {
    match serde_json::to_string(data) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("payload is not serializable, sending placeholder: {}", err);
            UNSERIALIZABLE_PLACEHOLDER.to_string()
        }
    }
}

/// Quote `text` as a JSON string literal that is also a valid script literal.
///
/// JSON permits raw U+2028 and U+2029 inside strings while older script
/// engines treat them as line terminators, so both are escaped.
pub fn script_string_literal(text: &str) -> String {
    Value::String(text.to_string())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Build the statement delivering `(event_name, data)` to the embedded side.
pub fn event_script<T: Serialize + ?Sized>(
    config: &ProtocolConfig,
    event_name: &str,
    data: &T,
) -> String {
    let payload = serialize_payload(data);
    format!(
        "{}({},{});",
        config.event_entry_point,
        script_string_literal(event_name),
        script_string_literal(&payload)
    )
}

/// Build the statement invoking `function` with `args` on the embedded side.
pub fn call_script(
    config: &ProtocolConfig,
    request_id: &str,
    function: &str,
    args: &CallArgs,
) -> String {
    let args = serialize_payload(args.as_slice());
    format!(
        "{}({},{},{});",
        config.call_entry_point,
        script_string_literal(request_id),
        script_string_literal(function),
        script_string_literal(&args)
    )
}

/// Build the expression pulling a queued message body from the embedded side.
pub fn fetch_script(config: &ProtocolConfig, message_key: &str) -> String {
    format!(
        "{}({});",
        config.fetch_entry_point,
        script_string_literal(message_key)
    )
}

/// Decode a script produced by [`event_script`], [`call_script`] or
/// [`fetch_script`].
///
/// This is the embedded side's view of the wire: every argument is a JSON
/// string literal, and payloads are JSON text inside that literal.
pub fn parse_script(config: &ProtocolConfig, script: &str) -> Result<OutboundScript> {
    let script = script.trim();
    let body = script
        .strip_suffix(';')
        .unwrap_or(script)
        .trim_end();

    let open = body
        .find('(')
        .ok_or_else(|| Error::MalformedScript("missing argument list".to_string()))?;
    let callee = body[..open].trim();
    let inner = body[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| Error::MalformedScript("unterminated argument list".to_string()))?;

    let literals: Vec<String> = serde_json::from_str(&format!("[{}]", inner))
        .map_err(|e| Error::MalformedScript(format!("arguments are not string literals: {}", e)))?;

    if callee == config.event_entry_point {
        let [event_name, payload] = take_args::<2>(callee, literals)?;
        Ok(OutboundScript::Event {
            event_name,
            payload: RawPayload::Text(payload).decode(),
        })
    } else if callee == config.call_entry_point {
        let [request_id, function, args] = take_args::<3>(callee, literals)?;
        let args = match serde_json::from_str::<Value>(&args)? {
            Value::Array(items) => items,
            other => {
                return Err(Error::MalformedScript(format!(
                    "call arguments must be a sequence, got {}",
                    other
                )))
            }
        };
        Ok(OutboundScript::Call {
            request_id,
            function,
            args,
        })
    } else if callee == config.fetch_entry_point {
        let [message_key] = take_args::<1>(callee, literals)?;
        Ok(OutboundScript::Fetch { message_key })
    } else {
        Err(Error::MalformedScript(format!(
            "unknown entry point: {}",
            callee
        )))
    }
}

fn take_args<const N: usize>(callee: &str, literals: Vec<String>) -> Result<[String; N]> {
    let found = literals.len();
    literals.try_into().map_err(|_| {
        Error::MalformedScript(format!(
            "{} expects {} arguments, got {}",
            callee, N, found
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn string_payloads_are_serialized_again() {
        assert_eq!(serialize_payload("hi"), "\"hi\"");
        assert_eq!(serialize_payload(&json!(5)), "5");
    }

    #[test]
    fn unserializable_payload_uses_placeholder() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], "tuple keys are not JSON");
        assert_eq!(serialize_payload(&map), UNSERIALIZABLE_PLACEHOLDER);
    }

    #[test]
    fn line_separators_are_escaped() {
        let literal = script_string_literal("a\u{2028}b\u{2029}c");
        assert_eq!(literal, "\"a\\u2028b\\u2029c\"");
    }

    #[test]
    fn call_args_are_coerced_into_a_sequence() {
        assert_eq!(CallArgs::from(None::<Value>).as_slice(), &[] as &[Value]);
        assert_eq!(CallArgs::from(Value::Null).as_slice(), &[] as &[Value]);
        assert_eq!(CallArgs::from(json!("one")).into_vec(), vec![json!("one")]);
        assert_eq!(CallArgs::from(json!([2, 3])).into_vec(), vec![json!(2), json!(3)]);
    }

    #[test]
    fn call_script_escapes_every_argument() {
        let config = ProtocolConfig::default();
        let script = call_script(&config, "1_1", "sum", &CallArgs::from(json!([2, 3])));
        assert_eq!(script, r#"_callJSFunction("1_1","sum","[2,3]");"#);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let config = ProtocolConfig::default();
        let err = parse_script(&config, r#"_onNativeEvent("only-one");"#).unwrap_err();
        assert!(matches!(err, Error::MalformedScript(_)));
    }
}
