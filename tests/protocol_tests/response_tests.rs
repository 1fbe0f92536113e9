//! Response Parsing Tests
//!
//! The reply decoder is a narrow scanner. These tests pin down what it
//! accepts, what it rejects, and what it silently skips.

use tablink::protocol::{encode_response, parse_response, Record, Response};
use tablink::ClientError;

fn record(fields: &[(&str, &str)]) -> Record {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Well-formed Replies
// =============================================================================

#[test]
fn test_parse_full_reply() {
    let reply = r#"{"success":true,"detail":"ok","data":[{"id":"1","name":"a"}]}"#;

    let response = parse_response(reply).unwrap();

    assert!(response.success);
    assert_eq!(response.detail, "ok");
    assert_eq!(response.data, vec![record(&[("id", "1"), ("name", "a")])]);
}

#[test]
fn test_parse_success_only() {
    let response = parse_response(r#"{"success":false}"#).unwrap();

    assert!(!response.success);
    assert_eq!(response.detail, "");
    assert!(response.data.is_empty());
}

#[test]
fn test_parse_multiple_records_in_order() {
    let reply = r#"{"success":true,"data":[{"id":"1"},{"id":"2"},{"id":"3","extra":"x"}]}"#;

    let response = parse_response(reply).unwrap();

    let ids: Vec<&str> = response.data.iter().map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(response.data[2].get("extra").map(String::as_str), Some("x"));
}

#[test]
fn test_record_preserves_field_order() {
    let reply = r#"{"success":true,"data":[{"z":"1","a":"2","m":"3"}]}"#;

    let response = parse_response(reply).unwrap();

    let keys: Vec<&str> = response.data[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn test_parse_ignores_text_around_object() {
    let reply = "OK\r\n{\"success\":true,\"detail\":\"done\"}\r\n";

    let response = parse_response(reply).unwrap();

    assert!(response.success);
    assert_eq!(response.detail, "done");
}

#[test]
fn test_parse_empty_data_array() {
    let response = parse_response(r#"{"success":true,"data":[]}"#).unwrap();

    assert!(response.data.is_empty());
}

#[test]
fn test_parse_empty_record() {
    let response = parse_response(r#"{"success":true,"data":[{}]}"#).unwrap();

    assert_eq!(response.data, vec![Record::new()]);
}

#[test]
fn test_detail_with_spaces_and_punctuation() {
    let reply = r#"{"success":false,"detail":"table users: not found, sorry"}"#;

    let response = parse_response(reply).unwrap();

    assert!(!response.success);
    assert_eq!(response.detail, "table users: not found, sorry");
}

#[test]
fn test_success_after_other_fields() {
    let reply = r#"{"detail":"first","success":true}"#;

    let response = parse_response(reply).unwrap();

    assert!(response.success);
    assert_eq!(response.detail, "first");
}

// =============================================================================
// Malformed Replies
// =============================================================================

#[test]
fn test_no_braces_is_malformed() {
    for reply in ["", "success true", "\"success\":true", "{\"success\":true"] {
        assert!(
            matches!(parse_response(reply), Err(ClientError::MalformedResponse(_))),
            "expected malformed: {:?}",
            reply
        );
    }
}

#[test]
fn test_closing_before_opening_is_malformed() {
    let result = parse_response("} \"success\":true {");

    assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
}

#[test]
fn test_missing_success_is_malformed() {
    let result = parse_response(r#"{"detail":"ok","data":[]}"#);

    assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
}

#[test]
fn test_success_outside_object_is_malformed() {
    let result = parse_response(r#""success":true {"detail":"ok"}"#);

    assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
}

// =============================================================================
// Narrow Grammar Edge Cases
// =============================================================================

#[test]
fn test_success_must_be_exact_literal() {
    for reply in [
        r#"{"success": true}"#,
        r#"{"success":TRUE}"#,
        r#"{"success":"true"}"#,
        r#"{"success":1}"#,
        r#"{"success":}"#,
    ] {
        assert!(!parse_response(reply).unwrap().success, "should be false: {}", reply);
    }
}

#[test]
fn test_detail_without_closing_quote_is_empty() {
    let response = parse_response(r#"{"success":true,"detail":"unterminated}"#).unwrap();

    assert!(response.success);
    assert_eq!(response.detail, "");
}

#[test]
fn test_unquoted_values_are_skipped() {
    let reply = r#"{"success":true,"data":[{"id":1,"name":"a","ok":true}]}"#;

    let response = parse_response(reply).unwrap();

    assert_eq!(response.data, vec![record(&[("name", "a")])]);
}

#[test]
fn test_duplicate_keys_keep_first_value() {
    let reply = r#"{"success":true,"data":[{"id":"1","id":"2"}]}"#;

    let response = parse_response(reply).unwrap();

    assert_eq!(response.data, vec![record(&[("id", "1")])]);
}

#[test]
fn test_unterminated_record_is_dropped() {
    let reply = r#"{"success":true,"data":[{"id":"1"},{"id":"2"]}"#;

    let response = parse_response(reply).unwrap();

    assert_eq!(response.data, vec![record(&[("id", "1")])]);
}

#[test]
fn test_data_without_array_is_empty() {
    let response = parse_response(r#"{"success":true,"data":null}"#).unwrap();

    assert!(response.data.is_empty());
}

#[test]
fn test_truncated_reply_loses_records() {
    // A reply cut mid-array: the last '}' closes the first record, so the
    // object body ends before the array does and no records survive
    let reply = r#"{"success":true,"data":[{"id":"1"},{"id":"2"#;

    let response = parse_response(reply).unwrap();

    assert!(response.success);
    assert!(response.data.is_empty());
}

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn test_encode_response_is_parseable() {
    let response = Response::ok("2 rows")
        .with_record([("id", "1"), ("name", "Ada L")])
        .with_record([("id", "2"), ("name", "Grace")]);

    let wire = encode_response(&response);

    assert_eq!(
        wire,
        r#"{"success":true,"detail":"2 rows","data":[{"id":"1","name":"Ada L"},{"id":"2","name":"Grace"}]}"#
    );
    assert_eq!(parse_response(&wire).unwrap(), response);
}

#[test]
fn test_encode_error_response() {
    let wire = encode_response(&Response::error("no such table"));

    assert_eq!(wire, r#"{"success":false,"detail":"no such table","data":[]}"#);
}
