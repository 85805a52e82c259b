//! Canonical encoding of the signed `set_data` payload.
//!
//! Signer and verifier must produce byte-identical output for the same logical
//! payload, so the encoding is built by hand instead of going through a
//! serializer whose field order or whitespace could drift:
//!
//! `{"data":<json string>,"timestamp":"<lowercase hex>"}`
//!
//! The data literal uses the HTML-safe escaping that deployed clients sign
//! with: `<`, `>` and `&` become `\u003c`, `\u003e` and `\u0026`, and the
//! line and paragraph separators U+2028 / U+2029 become `\u2028` / `\u2029`.

use serde::Deserialize;
use std::fmt;

/// Seconds since the Unix epoch at which the client signed the payload.
///
/// Accepted on the wire as either a JSON unsigned integer or a hex string
/// (optionally `0x`-prefixed). Both forms encode canonically as hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "TimestampRepr")]
pub struct Timestamp(pub u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Seconds(u64),
    Hex(String),
}

impl TryFrom<TimestampRepr> for Timestamp {
    type Error = String;

    fn try_from(repr: TimestampRepr) -> Result<Self, Self::Error> {
        match repr {
            TimestampRepr::Seconds(secs) => Ok(Timestamp(secs)),
            TimestampRepr::Hex(s) => {
                let digits = s.strip_prefix("0x").unwrap_or(&s);
                if digits.is_empty() {
                    return Err("timestamp must not be empty".to_string());
                }
                u64::from_str_radix(digits, 16)
                    .map(Timestamp)
                    .map_err(|e| format!("invalid hex timestamp {:?}: {}", s, e))
            }
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// The signed unit of a Set request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetPayload {
    pub data: String,
    pub timestamp: Timestamp,
}

/// Encode the payload into the exact bytes the client signed.
pub fn encode(payload: &SetPayload) -> Vec<u8> {
    let data = html_safe_literal(&payload.data);
    format!(r#"{{"data":{},"timestamp":"{}"}}"#, data, payload.timestamp).into_bytes()
}

/// Quoted JSON string literal with HTML-sensitive characters escaped.
fn html_safe_literal(data: &str) -> String {
    // Display on a JSON string value yields the escaped, quoted literal.
    let literal = serde_json::Value::String(data.to_string()).to_string();
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Hex of the canonical encoding, used as the replay-cache key.
pub fn fingerprint(payload: &SetPayload) -> String {
    hex::encode(encode(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(data: &str, ts: u64) -> SetPayload {
        SetPayload {
            data: data.to_string(),
            timestamp: Timestamp(ts),
        }
    }

    #[test]
    fn test_encoding_layout() {
        let bytes = encode(&payload("abc", 0x5f5e_1000));
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"data":"abc","timestamp":"5f5e1000"}"#
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = payload("hello", 1_700_000_000);
        let b = a.clone();
        assert_eq!(encode(&a), encode(&b));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_quotes_in_data_cannot_forge_timestamp() {
        // Without escaping, this data would collide with payload("x", 1).
        let tricky = payload(r#"x","timestamp":"1"#, 2);
        let plain = payload("x", 1);
        assert_ne!(encode(&tricky), encode(&plain));
        let text = String::from_utf8(encode(&tricky)).unwrap();
        assert!(text.starts_with(r#"{"data":"x\",\"timestamp\":\"1","#));
    }

    #[test]
    fn test_html_characters_are_escaped() {
        let text = String::from_utf8(encode(&payload("<a href=\"x\">&</a>", 1))).unwrap();
        assert_eq!(
            text,
            r#"{"data":"\u003ca href=\"x\"\u003e\u0026\u003c/a\u003e","timestamp":"1"}"#
        );

        let separators = String::from_utf8(encode(&payload("a\u{2028}b\u{2029}", 1))).unwrap();
        assert_eq!(separators, r#"{"data":"a\u2028b\u2029","timestamp":"1"}"#);
    }

    #[test]
    fn test_escaped_literal_parses_back() {
        let data = "x < y && y > z \u{2028}";
        let text = String::from_utf8(encode(&payload(data, 7))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["data"], data);
    }

    #[test]
    fn test_distinct_values_distinct_bytes() {
        assert_ne!(encode(&payload("a", 1)), encode(&payload("a", 2)));
        assert_ne!(encode(&payload("a", 1)), encode(&payload("b", 1)));
    }

    #[test]
    fn test_timestamp_wire_forms_agree() {
        let from_int: SetPayload =
            serde_json::from_str(r#"{"data":"d","timestamp":255}"#).unwrap();
        let from_hex: SetPayload =
            serde_json::from_str(r#"{"data":"d","timestamp":"ff"}"#).unwrap();
        let from_prefixed: SetPayload =
            serde_json::from_str(r#"{"data":"d","timestamp":"0xFF"}"#).unwrap();
        assert_eq!(from_int, from_hex);
        assert_eq!(from_hex, from_prefixed);
        assert_eq!(encode(&from_int), encode(&from_prefixed));
    }

    #[test]
    fn test_rejects_malformed_timestamp() {
        assert!(serde_json::from_str::<SetPayload>(r#"{"data":"d","timestamp":"zz"}"#).is_err());
        assert!(serde_json::from_str::<SetPayload>(r#"{"data":"d","timestamp":""}"#).is_err());
        assert!(serde_json::from_str::<SetPayload>(r#"{"data":"d","timestamp":-5}"#).is_err());
    }
}
