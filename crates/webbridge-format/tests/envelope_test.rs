use serde_json::{json, Value};
use webbridge_format::{Error, RawPayload, ResponseEnvelope};

#[test]
fn envelope_uses_camel_case_fields() {
    let envelope = ResponseEnvelope::success("3_1", json!(5));
    let text = envelope.to_json().unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value, json!({"reqId": "3_1", "isError": false, "response": 5}));
}

#[test]
fn envelope_defaults_missing_flags() {
    let envelope = ResponseEnvelope::from_value(json!({"reqId": "1_9"})).unwrap();

    assert_eq!(envelope.req_id, "1_9");
    assert!(!envelope.is_error);
    assert_eq!(envelope.response, Value::Null);
}

#[test]
fn envelope_without_request_id_is_malformed() {
    let err = ResponseEnvelope::from_value(json!({"isError": true})).unwrap_err();
    assert!(matches!(err, Error::MalformedEnvelope(_)));
}

#[test]
fn text_payload_decodes_json_or_falls_back() {
    assert_eq!(RawPayload::from("{\"n\":1}").decode(), json!({"n": 1}));
    assert_eq!(
        RawPayload::from("just words").decode(),
        Value::String("just words".to_string())
    );
    assert_eq!(RawPayload::from(json!([1, 2])).decode(), json!([1, 2]));
    assert_eq!(RawPayload::from(None::<String>).decode(), Value::Null);
}
