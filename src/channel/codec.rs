//! Tagged payload encoding for replies.
//!
//! Strings and JSON text travel as UTF-16 code units, one per slot. Numbers
//! use one slot for 32-bit integers and two slots (high word first) for the
//! raw bits of an `f64`.

use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Unknown,
    Number,
    Boolean,
    String,
    Json,
    Undefined,
    Null,
    NaN,
}

impl ContentType {
    pub fn tag(self) -> i32 {
        match self {
            ContentType::Unknown => 0,
            ContentType::Number => 1,
            ContentType::Boolean => 2,
            ContentType::String => 3,
            ContentType::Json => 4,
            ContentType::Undefined => 5,
            ContentType::Null => 6,
            ContentType::NaN => 7,
        }
    }

    /// Tags outside the known range map to `Unknown`.
    pub fn from_tag(tag: i32) -> ContentType {
        match tag {
            1 => ContentType::Number,
            2 => ContentType::Boolean,
            3 => ContentType::String,
            4 => ContentType::Json,
            5 => ContentType::Undefined,
            6 => ContentType::Null,
            7 => ContentType::NaN,
            _ => ContentType::Unknown,
        }
    }
}

/// A reply value as it crosses the buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Undefined,
    Null,
    NaN,
    Boolean(bool),
    Integer(i32),
    Float(f64),
    String(String),
    Json(JsonValue),
}

impl DecodedValue {
    /// Maps a JSON value onto the narrowest reply type.
    pub fn from_json(value: &JsonValue) -> DecodedValue {
        match value {
            JsonValue::Null => DecodedValue::Null,
            JsonValue::Bool(b) => DecodedValue::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(i) => DecodedValue::Integer(i),
                None => DecodedValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => DecodedValue::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => DecodedValue::Json(value.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedReply {
    pub content_type: ContentType,
    pub payload: Vec<i32>,
}

impl EncodedReply {
    pub fn empty(content_type: ContentType) -> Self {
        EncodedReply {
            content_type,
            payload: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("content type unknown (tag {0})")]
    UnknownContentType(i32),
    #[error("malformed {content_type:?} payload: {reason}")]
    Malformed {
        content_type: ContentType,
        reason: String,
    },
}

pub fn encode_reply(value: &DecodedValue) -> EncodedReply {
    match value {
        DecodedValue::Undefined => EncodedReply::empty(ContentType::Undefined),
        DecodedValue::Null => EncodedReply::empty(ContentType::Null),
        DecodedValue::NaN => EncodedReply::empty(ContentType::NaN),
        DecodedValue::Float(f) if f.is_nan() => EncodedReply::empty(ContentType::NaN),
        DecodedValue::Boolean(b) => EncodedReply {
            content_type: ContentType::Boolean,
            payload: vec![i32::from(*b)],
        },
        DecodedValue::Integer(i) => EncodedReply {
            content_type: ContentType::Number,
            payload: vec![*i],
        },
        DecodedValue::Float(f) => {
            let bits = f.to_bits();
            EncodedReply {
                content_type: ContentType::Number,
                payload: vec![(bits >> 32) as u32 as i32, bits as u32 as i32],
            }
        }
        DecodedValue::String(s) => EncodedReply {
            content_type: ContentType::String,
            payload: encode_code_units(s),
        },
        DecodedValue::Json(v) => EncodedReply {
            content_type: ContentType::Json,
            payload: encode_code_units(&v.to_string()),
        },
    }
}

pub fn decode_reply(tag: i32, payload: &[i32]) -> Result<DecodedValue, DecodeError> {
    let content_type = ContentType::from_tag(tag);
    let malformed = |reason: String| DecodeError::Malformed {
        content_type,
        reason,
    };
    Ok(match content_type {
        ContentType::Unknown => return Err(DecodeError::UnknownContentType(tag)),
        ContentType::Undefined => DecodedValue::Undefined,
        ContentType::Null => DecodedValue::Null,
        ContentType::NaN => DecodedValue::NaN,
        ContentType::Boolean => match payload.first() {
            Some(v) => DecodedValue::Boolean(*v != 0),
            None => return Err(malformed("empty payload".to_string())),
        },
        ContentType::Number => match payload {
            [i] => DecodedValue::Integer(*i),
            [high, low] => {
                let bits = (u64::from(*high as u32) << 32) | u64::from(*low as u32);
                DecodedValue::Float(f64::from_bits(bits))
            }
            _ => return Err(malformed(format!("expected 1 or 2 slots, got {}", payload.len()))),
        },
        ContentType::String => DecodedValue::String(decode_code_units(payload)),
        ContentType::Json => {
            let text = decode_code_units(payload);
            let value = serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;
            DecodedValue::Json(value)
        }
    })
}

fn encode_code_units(s: &str) -> Vec<i32> {
    s.encode_utf16().map(i32::from).collect()
}

/// Each slot is truncated to 16 bits, as a character code would be.
fn decode_code_units(payload: &[i32]) -> String {
    let units: Vec<u16> = payload.iter().map(|v| *v as u16).collect();
    String::from_utf16_lossy(&units)
}
