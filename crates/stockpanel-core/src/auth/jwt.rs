//! Decoding for JWT-shaped bearer tokens.
//!
//! Only the payload segment is inspected and the signature is never verified;
//! the backend remains the authority on whether a token is valid. Every
//! malformed input decodes to `None`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

/// Decode the payload (second segment) of a `header.payload.signature` token.
///
/// Accepts both the URL-safe and the standard base64 alphabet, with or without
/// padding. Returns `None` unless there are exactly three segments and the
/// payload is a JSON object.
pub fn jwt_payload(token: &str) -> Option<Map<String, Value>> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let normalized: String = segments[1]
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD.decode(normalized.as_bytes()).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Expiry of the token in milliseconds since the epoch, from its `exp` claim.
///
/// Only a numeric claim counts; strings and other types are ignored.
pub fn expiry_ms(token: &str) -> Option<i64> {
    let payload = jwt_payload(token)?;
    let exp = payload.get("exp")?.as_f64()?;
    Some((exp * 1000.0) as i64)
}

#[cfg(test)]
pub(crate) fn encode_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_decodes_valid_token() {
        let token = encode_token(&json!({"sub": "42", "exp": 1_700_000_000}));
        let payload = jwt_payload(&token).unwrap();
        assert_eq!(payload.get("sub"), Some(&json!("42")));
        assert_eq!(payload.get("exp"), Some(&json!(1_700_000_000)));
    }

    #[test]
    fn test_payload_rejects_wrong_segment_count() {
        let token = encode_token(&json!({"exp": 1}));
        let two_segments: String = token.rsplitn(2, '.').nth(1).unwrap().to_string();
        assert!(jwt_payload(&two_segments).is_none());
        assert!(jwt_payload(&format!("{}.extra", token)).is_none());
        assert!(jwt_payload("opaque-token").is_none());
        assert!(jwt_payload("").is_none());
    }

    #[test]
    fn test_payload_rejects_bad_base64() {
        assert!(jwt_payload("aGVhZGVy.!!!not-base64!!!.sig").is_none());
    }

    #[test]
    fn test_payload_rejects_bad_json() {
        let body = URL_SAFE_NO_PAD.encode("{not json");
        assert!(jwt_payload(&format!("h.{}.s", body)).is_none());
    }

    #[test]
    fn test_payload_rejects_non_object_json() {
        let body = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(jwt_payload(&format!("h.{}.s", body)).is_none());
    }

    #[test]
    fn test_payload_accepts_padding_and_standard_alphabet() {
        use base64::engine::general_purpose::STANDARD;
        let json = r#"{"exp":10,"note":"??>>~~"}"#;
        let body = STANDARD.encode(json);
        let payload = jwt_payload(&format!("h.{}.s", body)).unwrap();
        assert_eq!(payload.get("exp"), Some(&json!(10)));
    }

    #[test]
    fn test_expiry_ms_scales_seconds() {
        let token = encode_token(&json!({"exp": 1_700_000_000}));
        assert_eq!(expiry_ms(&token), Some(1_700_000_000_000));
    }

    #[test]
    fn test_expiry_ms_ignores_missing_or_non_numeric_exp() {
        assert_eq!(expiry_ms(&encode_token(&json!({"sub": "x"}))), None);
        assert_eq!(expiry_ms(&encode_token(&json!({"exp": "soon"}))), None);
        assert_eq!(expiry_ms("opaque"), None);
    }

    #[test]
    fn test_expiry_ms_keeps_zero() {
        assert_eq!(expiry_ms(&encode_token(&json!({"exp": 0}))), Some(0));
    }
}
