//! Canonical JSON serialization for signed payloads.
//!
//! Signers and verifiers must agree on the exact bytes that were signed. The
//! canonical form is:
//!
//! - object members sorted by key, comparing the UTF-8 bytes of the key;
//! - no whitespace between tokens;
//! - strings in standard JSON escaping (as produced by `serde_json`);
//! - integers in base 10. Floating-point numbers are rejected because their
//!   textual form is not stable across implementations.
//!
//! The sort is performed here rather than relying on `serde_json::Map`
//! ordering, which changes if any crate in the build enables
//! `serde_json/preserve_order`.

use serde::Serialize;
use serde_json::Value;

/// Errors from canonical serialization.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("non-integer number {0} has no canonical form")]
    NonIntegerNumber(String),
}

/// Serialize `value` into its canonical JSON bytes.
pub fn canonicalize<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let value =
        serde_json::to_value(value).map_err(|e| CanonicalError::Serialization(e.to_string()))?;
    let mut out = Vec::with_capacity(128);
    write_value(&mut out, &value)?;
    Ok(out)
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), CanonicalError> {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push(b'{');
            for (i, (key, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_scalar(out, &Value::String(key.clone()))?;
                out.push(b':');
                write_value(out, member)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        Value::Number(n) if n.is_f64() => {
            return Err(CanonicalError::NonIntegerNumber(n.to_string()));
        }
        scalar => write_scalar(out, scalar)?,
    }
    Ok(())
}

fn write_scalar(out: &mut Vec<u8>, value: &Value) -> Result<(), CanonicalError> {
    serde_json::to_writer(&mut *out, value)
        .map_err(|e| CanonicalError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon(v: Value) -> String {
        String::from_utf8(canonicalize(&v).unwrap()).unwrap()
    }

    #[test]
    fn keys_are_sorted_and_compact() {
        let v = json!({"tokenHash": "ab", "expiry": 10, "credentialId": "c1"});
        assert_eq!(canon(v), r#"{"credentialId":"c1","expiry":10,"tokenHash":"ab"}"#);
    }

    #[test]
    fn nested_objects_are_sorted() {
        let v = json!({"z": {"b": 1, "a": [ {"y": true, "x": null} ]}});
        assert_eq!(canon(v), r#"{"z":{"a":[{"x":null,"y":true}],"b":1}}"#);
    }

    #[test]
    fn sort_is_bytewise() {
        // Uppercase sorts before lowercase in byte order.
        let v = json!({"b": 1, "B": 2, "a": 3});
        assert_eq!(canon(v), r#"{"B":2,"a":3,"b":1}"#);
    }

    #[test]
    fn strings_are_escaped() {
        let v = json!({"k": "line\n\"quoted\""});
        assert_eq!(canon(v), r#"{"k":"line\n\"quoted\""}"#);
    }

    #[test]
    fn floats_are_rejected() {
        let err = canonicalize(&json!({"expiry": 1.5})).unwrap_err();
        assert!(matches!(err, CanonicalError::NonIntegerNumber(_)));
    }

    #[test]
    fn large_integers_keep_full_precision() {
        let v = json!({"expiry": u64::MAX});
        assert_eq!(canon(v), format!(r#"{{"expiry":{}}}"#, u64::MAX));
    }

    #[test]
    fn structs_canonicalize_by_field_name() {
        #[derive(Serialize)]
        struct Payload {
            zeta: u32,
            alpha: &'static str,
        }
        let bytes = canonicalize(&Payload { zeta: 1, alpha: "a" }).unwrap();
        assert_eq!(bytes, br#"{"alpha":"a","zeta":1}"#);
    }
}
