//! Encoding of logical keys and values into the printable strings the
//! physical store accepts.
//!
//! Keys use an order-preserving base64 alphabet (`.`, digits, upper case, `_`,
//! lower case) without padding, so comparing two encoded keys as strings gives
//! the same answer as comparing the raw bytes. Values carry a one-character
//! tag in front of their payload.

use base64::Engine;
use base64::alphabet::Alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tag for values stored as base64 of raw bytes.
pub const BYTES_TAG: char = 'b';
/// Tag for values stored as literal text.
pub const TEXT_TAG: char = 's';
/// Tag for null values. Carries no payload.
pub const NULL_TAG: char = 'n';

const ORDERED_ALPHABET: Alphabet =
    match Alphabet::new(".0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("ordered key alphabet is invalid"),
    };

const ORDERED: GeneralPurpose = GeneralPurpose::new(
    &ORDERED_ALPHABET,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// A key, or a value read back in a specific mode: either raw bytes or text.
///
/// Text keys are stored as their UTF-8 bytes, so `Data::Text("a")` and
/// `Data::Bytes(b"a")` address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Data {
    Bytes(Vec<u8>),
    Text(String),
}

impl Data {
    /// The raw bytes behind this key.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Data::Bytes(bytes) => bytes,
            Data::Text(text) => text.as_bytes(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Data::Bytes(bytes) => bytes,
            Data::Text(text) => text.into_bytes(),
        }
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Data::Text(text.to_owned())
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Data::Text(text)
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data::Bytes(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Data::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Data {
    fn from(bytes: &[u8; N]) -> Self {
        Data::Bytes(bytes.to_vec())
    }
}

/// A stored value. Null, empty text and empty bytes are three different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bytes(Vec<u8>),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Self {
        match data {
            Data::Bytes(bytes) => Value::Bytes(bytes),
            Data::Text(text) => Value::Text(text),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(bytes: &[u8; N]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Encode raw key bytes with the order-preserving alphabet.
#[inline]
pub fn encode_key(key: &[u8]) -> String {
    ORDERED.encode(key)
}

/// Decode an encoded key, returning bytes or UTF-8 text.
pub fn decode_key(encoded: &str, as_buffer: bool) -> Result<Data> {
    let bytes = ORDERED
        .decode(encoded)
        .map_err(|e| Error::Decode(format!("malformed key {:?}: {}", encoded, e)))?;
    bytes_as(bytes, as_buffer)
}

/// Encode a value with its type tag.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::Null => NULL_TAG.to_string(),
        Value::Bytes(bytes) => {
            let mut encoded = String::with_capacity(1 + bytes.len().div_ceil(3) * 4);
            encoded.push(BYTES_TAG);
            STANDARD.encode_string(bytes, &mut encoded);
            encoded
        }
        Value::Text(text) => {
            let mut encoded = String::with_capacity(1 + text.len());
            encoded.push(TEXT_TAG);
            encoded.push_str(text);
            encoded
        }
    }
}

/// Decode a tagged value, converting the payload to bytes or text.
///
/// A tag with no payload decodes to empty bytes or empty text; only the null
/// tag decodes to [`Value::Null`].
pub fn decode_value(encoded: &str, as_buffer: bool) -> Result<Value> {
    let mut chars = encoded.chars();
    let tag = chars
        .next()
        .ok_or_else(|| Error::Decode("value has no type tag".into()))?;
    let payload = chars.as_str();

    match tag {
        BYTES_TAG => {
            let bytes = STANDARD
                .decode(payload)
                .map_err(|e| Error::Decode(format!("malformed byte value: {}", e)))?;
            bytes_as(bytes, as_buffer).map(Value::from)
        }
        TEXT_TAG if as_buffer => Ok(Value::Bytes(payload.as_bytes().to_vec())),
        TEXT_TAG => Ok(Value::Text(payload.to_owned())),
        NULL_TAG if payload.is_empty() => Ok(Value::Null),
        NULL_TAG => Err(Error::Decode("null value carries a payload".into())),
        other => Err(Error::Decode(format!("unknown value tag {:?}", other))),
    }
}

fn bytes_as(bytes: Vec<u8>, as_buffer: bool) -> Result<Data> {
    if as_buffer {
        return Ok(Data::Bytes(bytes));
    }
    String::from_utf8(bytes)
        .map(Data::Text)
        .map_err(|e| Error::Decode(format!("not valid UTF-8: {}", e)))
}
