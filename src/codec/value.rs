//! Application values
//!
//! A value is one value-type byte followed by its payload. Integers and
//! doubles are big-endian; strings take the rest of the buffer.

use std::fmt;

use super::errors::{DumpError, DumpResult};
use super::key::value_type;

/// Decoded application value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(Vec<u8>),
    Object,
    Tombstone,
}

impl Value {
    pub fn string(s: impl AsRef<[u8]>) -> Self {
        Value::String(s.as_ref().to_vec())
    }

    pub fn decode(bytes: &[u8]) -> DumpResult<Self> {
        let (&tag, payload) = bytes
            .split_first()
            .ok_or_else(|| DumpError::malformed_value("empty value"))?;

        let expect_len = |len: usize| -> DumpResult<()> {
            if payload.len() == len {
                Ok(())
            } else {
                Err(DumpError::malformed_value(format!(
                    "value type 0x{:02x} expects {} payload bytes, got {}",
                    tag,
                    len,
                    payload.len()
                )))
            }
        };

        let value = match tag {
            value_type::NULL => {
                expect_len(0)?;
                Value::Null
            }
            value_type::FALSE => {
                expect_len(0)?;
                Value::Bool(false)
            }
            value_type::TRUE => {
                expect_len(0)?;
                Value::Bool(true)
            }
            value_type::TOMBSTONE => {
                expect_len(0)?;
                Value::Tombstone
            }
            value_type::OBJECT => {
                expect_len(0)?;
                Value::Object
            }
            value_type::INT32 => {
                expect_len(4)?;
                let mut buf = [0u8; 4];
                buf.copy_from_slice(payload);
                Value::Int32(i32::from_be_bytes(buf))
            }
            value_type::INT64 => {
                expect_len(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(payload);
                Value::Int64(i64::from_be_bytes(buf))
            }
            value_type::DOUBLE => {
                expect_len(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(payload);
                Value::Double(f64::from_bits(u64::from_be_bytes(buf)))
            }
            value_type::STRING => Value::String(payload.to_vec()),
            other => {
                return Err(DumpError::malformed_value(format!(
                    "unknown value type 0x{:02x}",
                    other
                )))
            }
        };
        Ok(value)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Value::Null => out.push(value_type::NULL),
            Value::Bool(false) => out.push(value_type::FALSE),
            Value::Bool(true) => out.push(value_type::TRUE),
            Value::Tombstone => out.push(value_type::TOMBSTONE),
            Value::Object => out.push(value_type::OBJECT),
            Value::Int32(v) => {
                out.push(value_type::INT32);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Value::Int64(v) => {
                out.push(value_type::INT64);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Value::Double(v) => {
                out.push(value_type::DOUBLE);
                out.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            Value::String(bytes) => {
                out.push(value_type::STRING);
                out.extend_from_slice(bytes);
            }
        }
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(bytes) => {
                write!(f, "\"{}\"", String::from_utf8_lossy(bytes).escape_debug())
            }
            Value::Object => write!(f, "{{}}"),
            Value::Tombstone => write!(f, "DEL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DumpErrorCode;

    #[test]
    fn test_decode_scalars() {
        assert_eq!(Value::decode(b"$").unwrap(), Value::Null);
        assert_eq!(Value::decode(b"T").unwrap(), Value::Bool(true));
        assert_eq!(Value::decode(b"X").unwrap(), Value::Tombstone);
        assert_eq!(Value::decode(b"H\x00\x00\x01\x00").unwrap(), Value::Int32(256));
        assert_eq!(Value::decode(b"Shello").unwrap(), Value::string("hello"));
    }

    #[test]
    fn test_encode_matches_decode() {
        for value in [Value::Int64(-42), Value::Double(1.5), Value::Object, Value::string("")] {
            assert_eq!(Value::decode(&value.encode()).unwrap(), value);
        }
    }

    #[test]
    fn test_malformed_values_rejected() {
        let cases: &[&[u8]] = &[b"", b"?", b"H\x00\x01", b"I\x00", b"T\x00"];
        for bytes in cases {
            let err = Value::decode(bytes).unwrap_err();
            assert_eq!(err.code(), DumpErrorCode::MalformedValue, "input {:?}", bytes);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::string("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(Value::Tombstone.to_string(), "DEL");
    }
}
