use std::fs;
use tempfile::TempDir;
use webbridge_format::{Error, ProtocolConfig};

#[test]
fn partial_file_overrides_only_named_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("webbridge.toml");
    fs::write(
        &path,
        r#"
call_entry_point = "window.native.call"
blank_url = "app://blank"
"#,
    )
    .unwrap();

    let config = ProtocolConfig::load(&path).unwrap();

    assert_eq!(config.call_entry_point, "window.native.call");
    assert_eq!(config.blank_url, "app://blank");
    assert_eq!(config.event_entry_point, "_onNativeEvent");
    assert_eq!(config.response_event, "_jsCallResponse");
}

#[test]
fn injected_code_in_entry_point_is_rejected() {
    let err = ProtocolConfig::from_toml_str(r#"event_entry_point = "x;fetch('//evil')""#)
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn bad_scheme_is_rejected() {
    let err = ProtocolConfig::from_toml_str(r#"url_scheme = "9bad scheme""#).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn invalid_toml_is_reported() {
    let err = ProtocolConfig::from_toml_str("url_scheme = ").unwrap_err();
    assert!(matches!(err, Error::Toml(_)));
}

#[test]
fn missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = ProtocolConfig::load(temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
