//! Canonical CBOR encoding for deterministic signing input.
//!
//! Signatures in a CPIX document are computed over the content model, not
//! over the text artifact. Each signable scope is lowered to a CBOR value
//! and encoded following RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats, no tags
//!
//! Whitespace, member order or indentation in the text artifact therefore
//! never changes the bytes that were signed.
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break all existing signatures.

use ciborium::value::{Integer, Value};

use crate::error::{CoreError, Result};

/// Domain separation prefix for scope signatures.
pub const SIGN_DOMAIN: &[u8] = b"cpix/scope-sig/v1";

/// Blake3 derive-key context for certificate fingerprints.
pub const FINGERPRINT_CONTEXT: &str = "cpix 2024 certificate fingerprint v1";

/// Build a map entry with an integer key.
///
/// Keys 0-23 encode as single bytes in CBOR.
pub fn entry(key: u64, value: Value) -> (Value, Value) {
    (Value::Integer(key.into()), value)
}

/// An unsigned integer value.
pub fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

/// An optional unsigned integer (null when absent).
pub fn opt_uint(n: Option<u64>) -> Value {
    n.map_or(Value::Null, uint)
}

/// A byte string value.
pub fn bytes(b: &[u8]) -> Value {
    Value::Bytes(b.to_vec())
}

/// A text value.
pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

/// Encode a CBOR value to canonical bytes.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Build the message to sign (with domain separation).
pub fn sign_message(content_bytes: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(SIGN_DOMAIN.len() + content_bytes.len());
    msg.extend_from_slice(SIGN_DOMAIN);
    msg.extend_from_slice(content_bytes);
    msg
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => return encode_array(buf, arr),
        Value::Map(entries) => return encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n = i128::from(i);

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4). Element order is significant.
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison. Duplicate keys are
/// rejected since they have no canonical form.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut key_value_pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if key_value_pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CoreError::EncodingError("duplicate map key".into()));
    }

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        // 0-23: single byte
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        // 24-255: two bytes
        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        // 256-65535: three bytes
        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 65535);
        assert_eq!(buf, vec![0x19, 0xff, 0xff]);
    }

    #[test]
    fn test_negative_integer_encoding() {
        let bytes = canonical_bytes(&Value::Integer((-1i64).into())).unwrap();
        assert_eq!(bytes, vec![0x20]);
    }

    #[test]
    fn test_map_key_ordering_is_independent_of_insertion() {
        let a = Value::Map(vec![
            entry(8, uint(80)),
            entry(0, uint(0)),
            entry(5, uint(50)),
        ]);
        let b = Value::Map(vec![
            entry(5, uint(50)),
            entry(8, uint(80)),
            entry(0, uint(0)),
        ]);

        let bytes = canonical_bytes(&a).unwrap();
        assert_eq!(bytes, canonical_bytes(&b).unwrap());

        // Map header (3 entries), then keys 0, 5, 8
        assert_eq!(
            bytes,
            vec![0xa3, 0x00, 0x00, 0x05, 0x18, 50, 0x08, 0x18, 80]
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = Value::Array(vec![uint(1), uint(2)]);
        let b = Value::Array(vec![uint(2), uint(1)]);
        assert_ne!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
    }

    #[test]
    fn test_floats_rejected() {
        assert!(canonical_bytes(&Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_duplicate_map_keys_rejected() {
        let v = Value::Map(vec![entry(1, uint(1)), entry(1, uint(2))]);
        assert!(canonical_bytes(&v).is_err());
    }

    #[test]
    fn test_sign_message_prefix() {
        let msg = sign_message(&[0xa0]);
        assert!(msg.starts_with(SIGN_DOMAIN));
        assert_eq!(msg.last(), Some(&0xa0));
    }
}
