//! Document keys
//!
//! Key layout:
//!
//! ```text
//! [ 'G' hash(u16 BE) hashed-components '!' ] range-components '!' subkeys* [ '#' doc-ht ]
//! ```
//!
//! Each component is a one-byte value type followed by its key encoding.
//! Key strings escape `0x00` as `0x00 0x01` and end with `0x00 0x00`. Key
//! integers are big-endian with the sign bit flipped so that byte order
//! matches numeric order. The trailing doc hybrid time is stored bit-inverted
//! big-endian so newer writes sort first.

use std::fmt;

use super::errors::{DumpError, DumpResult};
use super::hybrid_time::{DocHybridTime, HybridTime};

/// One-byte value type tags shared by keys and values
pub mod value_type {
    pub const GROUP_END: u8 = b'!';
    pub const HYBRID_TIME: u8 = b'#';
    pub const NULL: u8 = b'$';
    pub const DOUBLE: u8 = b'D';
    pub const FALSE: u8 = b'F';
    pub const UINT16_HASH: u8 = b'G';
    pub const INT32: u8 = b'H';
    pub const INT64: u8 = b'I';
    pub const SYSTEM_COLUMN_ID: u8 = b'J';
    pub const COLUMN_ID: u8 = b'K';
    pub const STRING: u8 = b'S';
    pub const TRUE: u8 = b'T';
    pub const TOMBSTONE: u8 = b'X';
    pub const OBJECT: u8 = b'{';
}

/// A single key component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    String(Vec<u8>),
    ColumnId(u32),
    SystemColumnId(u32),
}

impl PrimitiveValue {
    pub fn string(s: impl AsRef<[u8]>) -> Self {
        PrimitiveValue::String(s.as_ref().to_vec())
    }

    fn decode(decoder: &mut KeyDecoder<'_>) -> DumpResult<Self> {
        let tag = decoder.take_u8()?;
        let value = match tag {
            value_type::NULL => PrimitiveValue::Null,
            value_type::FALSE => PrimitiveValue::Bool(false),
            value_type::TRUE => PrimitiveValue::Bool(true),
            value_type::INT32 => {
                let raw = u32::from_be_bytes(decoder.take_array()?);
                PrimitiveValue::Int32((raw ^ 0x8000_0000) as i32)
            }
            value_type::INT64 => {
                let raw = u64::from_be_bytes(decoder.take_array()?);
                PrimitiveValue::Int64((raw ^ 0x8000_0000_0000_0000) as i64)
            }
            value_type::COLUMN_ID => {
                PrimitiveValue::ColumnId(u32::from_be_bytes(decoder.take_array()?))
            }
            value_type::SYSTEM_COLUMN_ID => {
                PrimitiveValue::SystemColumnId(u32::from_be_bytes(decoder.take_array()?))
            }
            value_type::STRING => PrimitiveValue::String(decoder.take_zero_escaped()?),
            other => {
                return Err(DumpError::malformed_key(format!(
                    "unknown value type 0x{:02x} at offset {}",
                    other,
                    decoder.pos - 1
                )))
            }
        };
        Ok(value)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            PrimitiveValue::Null => out.push(value_type::NULL),
            PrimitiveValue::Bool(false) => out.push(value_type::FALSE),
            PrimitiveValue::Bool(true) => out.push(value_type::TRUE),
            PrimitiveValue::Int32(v) => {
                out.push(value_type::INT32);
                out.extend_from_slice(&((*v as u32) ^ 0x8000_0000).to_be_bytes());
            }
            PrimitiveValue::Int64(v) => {
                out.push(value_type::INT64);
                out.extend_from_slice(&((*v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes());
            }
            PrimitiveValue::ColumnId(id) => {
                out.push(value_type::COLUMN_ID);
                out.extend_from_slice(&id.to_be_bytes());
            }
            PrimitiveValue::SystemColumnId(id) => {
                out.push(value_type::SYSTEM_COLUMN_ID);
                out.extend_from_slice(&id.to_be_bytes());
            }
            PrimitiveValue::String(bytes) => {
                out.push(value_type::STRING);
                for &b in bytes {
                    out.push(b);
                    if b == 0 {
                        out.push(1);
                    }
                }
                out.extend_from_slice(&[0, 0]);
            }
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Null => write!(f, "null"),
            PrimitiveValue::Bool(b) => write!(f, "{}", b),
            PrimitiveValue::Int32(v) => write!(f, "{}", v),
            PrimitiveValue::Int64(v) => write!(f, "{}", v),
            PrimitiveValue::String(bytes) => {
                write!(f, "\"{}\"", String::from_utf8_lossy(bytes).escape_debug())
            }
            PrimitiveValue::ColumnId(id) => write!(f, "ColumnId({})", id),
            PrimitiveValue::SystemColumnId(id) => write!(f, "SystemColumnId({})", id),
        }
    }
}

/// Row address: optional hash section plus range components.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DocKey {
    pub hash: Option<u16>,
    pub hashed: Vec<PrimitiveValue>,
    pub range: Vec<PrimitiveValue>,
}

impl DocKey {
    pub fn hashed(hash: u16, hashed: Vec<PrimitiveValue>, range: Vec<PrimitiveValue>) -> Self {
        Self {
            hash: Some(hash),
            hashed,
            range,
        }
    }

    pub fn range(range: Vec<PrimitiveValue>) -> Self {
        Self {
            hash: None,
            hashed: Vec::new(),
            range,
        }
    }

    fn decode(decoder: &mut KeyDecoder<'_>) -> DumpResult<Self> {
        let mut doc_key = DocKey::default();
        if decoder.peek() == Some(value_type::UINT16_HASH) {
            decoder.take_u8()?;
            doc_key.hash = Some(u16::from_be_bytes(decoder.take_array()?));
            doc_key.hashed = decode_group(decoder)?;
        }
        doc_key.range = decode_group(decoder)?;
        Ok(doc_key)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        if let Some(hash) = self.hash {
            out.push(value_type::UINT16_HASH);
            out.extend_from_slice(&hash.to_be_bytes());
            for component in &self.hashed {
                component.encode(out);
            }
            out.push(value_type::GROUP_END);
        }
        for component in &self.range {
            component.encode(out);
        }
        out.push(value_type::GROUP_END);
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocKey(")?;
        if let Some(hash) = self.hash {
            write!(f, "0x{:04x}, ", hash)?;
            write_list(f, &self.hashed)?;
            write!(f, ", ")?;
        }
        write_list(f, &self.range)?;
        write!(f, ")")
    }
}

/// Decoded key of a document or one of its nested fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SubDocKey {
    pub doc_key: DocKey,
    pub subkeys: Vec<PrimitiveValue>,
    pub doc_ht: Option<DocHybridTime>,
}

impl SubDocKey {
    pub fn new(doc_key: DocKey, subkeys: Vec<PrimitiveValue>) -> Self {
        Self {
            doc_key,
            subkeys,
            doc_ht: None,
        }
    }

    pub fn with_doc_ht(mut self, doc_ht: DocHybridTime) -> Self {
        self.doc_ht = Some(doc_ht);
        self
    }

    /// Decodes a complete key.
    ///
    /// With `full_key` set the key must end with its doc hybrid time; keys of
    /// applied write batches carry it, keys of read records may not.
    pub fn decode(bytes: &[u8], full_key: bool) -> DumpResult<Self> {
        let mut decoder = KeyDecoder { data: bytes, pos: 0 };
        let doc_key = DocKey::decode(&mut decoder)?;

        let mut subkeys = Vec::new();
        while let Some(tag) = decoder.peek() {
            if tag == value_type::HYBRID_TIME {
                break;
            }
            subkeys.push(PrimitiveValue::decode(&mut decoder)?);
        }

        let doc_ht = match decoder.peek() {
            Some(_) => {
                decoder.take_u8()?;
                let ht = !u64::from_be_bytes(decoder.take_array()?);
                let write_id = !u32::from_be_bytes(decoder.take_array()?);
                if decoder.pos != bytes.len() {
                    return Err(DumpError::malformed_key(format!(
                        "{} bytes after hybrid time",
                        bytes.len() - decoder.pos
                    )));
                }
                Some(DocHybridTime::new(HybridTime::from_repr(ht), write_id))
            }
            None => None,
        };

        if full_key && doc_ht.is_none() {
            return Err(DumpError::malformed_key("missing hybrid time in full key"));
        }

        Ok(Self {
            doc_key,
            subkeys,
            doc_ht,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.doc_key.encode(&mut out);
        for subkey in &self.subkeys {
            subkey.encode(&mut out);
        }
        if let Some(doc_ht) = self.doc_ht {
            out.push(value_type::HYBRID_TIME);
            out.extend_from_slice(&(!doc_ht.hybrid_time.repr()).to_be_bytes());
            out.extend_from_slice(&(!doc_ht.write_id).to_be_bytes());
        }
        out
    }
}

impl fmt::Display for SubDocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubDocKey({}, ", self.doc_key)?;
        write_list(f, &self.subkeys)?;
        if let Some(doc_ht) = self.doc_ht {
            write!(f, "; {}", doc_ht)?;
        }
        write!(f, ")")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[PrimitiveValue]) -> fmt::Result {
    write!(f, "[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    write!(f, "]")
}

fn decode_group(decoder: &mut KeyDecoder<'_>) -> DumpResult<Vec<PrimitiveValue>> {
    let mut components = Vec::new();
    loop {
        match decoder.peek() {
            None => return Err(DumpError::malformed_key("unterminated key group")),
            Some(value_type::GROUP_END) => {
                decoder.take_u8()?;
                return Ok(components);
            }
            Some(_) => components.push(PrimitiveValue::decode(decoder)?),
        }
    }
}

/// Cursor whose failures are all `TXNDUMP_MALFORMED_KEY`
struct KeyDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> KeyDecoder<'a> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn take(&mut self, len: usize) -> DumpResult<&'a [u8]> {
        if self.data.len() - self.pos < len {
            return Err(DumpError::malformed_key(format!(
                "truncated key: wanted {} bytes at offset {}",
                len, self.pos
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_u8(&mut self) -> DumpResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_array<const N: usize>(&mut self) -> DumpResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn take_zero_escaped(&mut self) -> DumpResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.take_u8()? {
                0 => match self.take_u8()? {
                    0 => return Ok(out),
                    1 => out.push(0),
                    other => {
                        return Err(DumpError::malformed_key(format!(
                            "invalid escape 0x00 0x{:02x} in key string",
                            other
                        )))
                    }
                },
                b => out.push(b),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DumpErrorCode;

    fn sample_key() -> SubDocKey {
        SubDocKey::new(
            DocKey::hashed(
                0xbeef,
                vec![PrimitiveValue::string("user\0id")],
                vec![PrimitiveValue::Int64(-5)],
            ),
            vec![PrimitiveValue::ColumnId(11)],
        )
    }

    #[test]
    fn test_full_key_roundtrip() {
        let key = sample_key().with_doc_ht(DocHybridTime::new(HybridTime::from_repr(4096), 2));
        let bytes = key.encode();
        assert_eq!(SubDocKey::decode(&bytes, true).unwrap(), key);
    }

    #[test]
    fn test_full_key_requires_hybrid_time() {
        let bytes = sample_key().encode();
        let err = SubDocKey::decode(&bytes, true).unwrap_err();
        assert_eq!(err.code(), DumpErrorCode::MalformedKey);
        assert_eq!(SubDocKey::decode(&bytes, false).unwrap(), sample_key());
    }

    #[test]
    fn test_range_only_key() {
        let key = SubDocKey::new(
            DocKey::range(vec![PrimitiveValue::Int32(-1), PrimitiveValue::Bool(true)]),
            vec![],
        );
        let bytes = key.encode();
        assert_eq!(bytes[0], value_type::INT32);
        assert_eq!(SubDocKey::decode(&bytes, false).unwrap(), key);
    }

    #[test]
    fn test_int_encoding_preserves_order() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        PrimitiveValue::Int64(-3).encode(&mut a);
        PrimitiveValue::Int64(2).encode(&mut b);
        assert!(a < b);
    }

    #[test]
    fn test_malformed_keys_rejected() {
        let cases: &[&[u8]] = &[
            b"",                  // no range group
            b"S\x61\x62",         // unterminated string
            b"S\x00\x05\x00\x00!", // bad escape
            b"Z!",                // unknown value type
            b"G\x01",             // truncated hash
            b"!#\x00\x01",        // truncated hybrid time
        ];
        for bytes in cases {
            let err = SubDocKey::decode(bytes, false).unwrap_err();
            assert_eq!(err.code(), DumpErrorCode::MalformedKey, "input {:?}", bytes);
        }
    }

    #[test]
    fn test_bytes_after_hybrid_time_rejected() {
        let mut bytes = sample_key()
            .with_doc_ht(DocHybridTime::new(HybridTime::from_repr(1), 0))
            .encode();
        bytes.push(value_type::NULL);
        assert_eq!(
            SubDocKey::decode(&bytes, true).unwrap_err().code(),
            DumpErrorCode::MalformedKey
        );
    }

    #[test]
    fn test_display() {
        let key = sample_key();
        assert_eq!(
            key.to_string(),
            "SubDocKey(DocKey(0xbeef, [\"user\\0id\"], [-5]), [ColumnId(11)])"
        );
    }
}
