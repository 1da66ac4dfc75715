use std::fmt;
use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

use crate::channel::DecodedValue;
use crate::runner::capability::node::VirtualNode;
use crate::runner::ds::error::JErrorType;

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    String(String),
    Number(JsNumberType),
    /// Structured data received from the coordinator. Read locally, never
    /// proxied.
    Json(JsonValue),
    Node(VirtualNode),
    /// Host object provided by a super-global resolver, e.g. `console`.
    Native(String),
}

impl JsValue {
    pub fn from_f64(f: f64) -> Self {
        JsValue::Number(JsNumberType::from_f64(f))
    }

    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => JsValue::Null,
            JsonValue::Bool(b) => JsValue::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => JsValue::Number(JsNumberType::Integer(i)),
                None => JsValue::from_f64(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => JsValue::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => JsValue::Json(value.clone()),
        }
    }

    /// JSON form of a value being written through the channel. `None` stands
    /// for `undefined`, which has no JSON spelling. Non-finite numbers become
    /// `null`.
    pub fn to_json(&self) -> Result<Option<JsonValue>, JErrorType> {
        Ok(Some(match self {
            JsValue::Undefined => return Ok(None),
            JsValue::Null => JsonValue::Null,
            JsValue::Boolean(b) => JsonValue::Bool(*b),
            JsValue::String(s) => JsonValue::String(s.clone()),
            JsValue::Number(JsNumberType::Integer(i)) => JsonValue::from(*i),
            JsValue::Number(JsNumberType::Float(f)) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            JsValue::Number(_) => JsonValue::Null,
            JsValue::Json(v) => v.clone(),
            JsValue::Node(node) => {
                return Err(JErrorType::TypeError(format!(
                    "{} is a capability reference and cannot be sent as a value",
                    node.path()
                )))
            }
            JsValue::Native(name) => {
                return Err(JErrorType::TypeError(format!(
                    "{} is a host object and cannot be sent as a value",
                    name
                )))
            }
        }))
    }
}

impl From<DecodedValue> for JsValue {
    fn from(value: DecodedValue) -> Self {
        match value {
            DecodedValue::Undefined => JsValue::Undefined,
            DecodedValue::Null => JsValue::Null,
            DecodedValue::NaN => JsValue::Number(JsNumberType::NaN),
            DecodedValue::Boolean(b) => JsValue::Boolean(b),
            DecodedValue::Integer(i) => JsValue::Number(JsNumberType::Integer(i64::from(i))),
            DecodedValue::Float(f) => JsValue::from_f64(f),
            DecodedValue::String(s) => JsValue::String(s),
            DecodedValue::Json(v) => JsValue::from_json(&v),
        }
    }
}

impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            JsValue::Null => write!(f, "{}", TYPE_STR_NULL),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::String(s) => write!(f, "{}", s),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::Json(v) => write!(f, "{}", v),
            JsValue::Node(node) => write!(f, "[object {}]", node.path()),
            JsValue::Native(name) => write!(f, "[object {}]", name),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "JsValue::Undefined"),
            JsValue::Null => write!(f, "JsValue::Null"),
            JsValue::Boolean(b) => write!(f, "JsValue::Boolean({})", b),
            JsValue::String(s) => write!(f, "JsValue::String({:?})", s),
            JsValue::Number(n) => write!(f, "JsValue::Number({:?})", n),
            JsValue::Json(v) => write!(f, "JsValue::Json({})", v),
            JsValue::Node(node) => write!(f, "JsValue::Node({})", node.path()),
            JsValue::Native(name) => write!(f, "JsValue::Native({})", name),
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::Json(a), JsValue::Json(b)) => a == b,
            (JsValue::Node(a), JsValue::Node(b)) => a == b,
            (JsValue::Native(a), JsValue::Native(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsNumberType {
    Integer(i64),
    Float(f64),
    NaN,
    PositiveInfinity,
    NegativeInfinity,
}

impl JsNumberType {
    /// Normalizes an `f64`: whole numbers in the safe range become integers,
    /// NaN and the infinities get their own variants. `-0.0` stays a float.
    pub fn from_f64(f: f64) -> Self {
        if f.is_nan() {
            JsNumberType::NaN
        } else if f == f64::INFINITY {
            JsNumberType::PositiveInfinity
        } else if f == f64::NEG_INFINITY {
            JsNumberType::NegativeInfinity
        } else if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER && !(f == 0.0 && f.is_sign_negative()) {
            JsNumberType::Integer(f as i64)
        } else {
            JsNumberType::Float(f)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            JsNumberType::Integer(i) => *i as f64,
            JsNumberType::Float(f) => *f,
            JsNumberType::NaN => f64::NAN,
            JsNumberType::PositiveInfinity => f64::INFINITY,
            JsNumberType::NegativeInfinity => f64::NEG_INFINITY,
        }
    }
}

impl Display for JsNumberType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsNumberType::Integer(i) => write!(f, "{}", i),
            JsNumberType::Float(nf) if *nf == 0.0 => write!(f, "0"),
            JsNumberType::Float(nf) => write!(f, "{}", nf),
            JsNumberType::NaN => write!(f, "NaN"),
            JsNumberType::PositiveInfinity => write!(f, "Infinity"),
            JsNumberType::NegativeInfinity => write!(f, "-Infinity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::AccessorPath;
    use serde_json::json;

    #[test]
    fn test_from_f64_normalizes() {
        assert_eq!(JsNumberType::from_f64(3.0), JsNumberType::Integer(3));
        assert_eq!(JsNumberType::from_f64(2.5), JsNumberType::Float(2.5));
        assert_eq!(JsNumberType::from_f64(f64::NAN), JsNumberType::NaN);
        assert_eq!(JsNumberType::from_f64(-f64::INFINITY), JsNumberType::NegativeInfinity);
        assert!(matches!(JsNumberType::from_f64(-0.0), JsNumberType::Float(_)));
    }

    #[test]
    fn test_decoded_values_map_to_script_values() {
        assert_eq!(JsValue::from(DecodedValue::Integer(7)), JsValue::Number(JsNumberType::Integer(7)));
        assert_eq!(JsValue::from(DecodedValue::NaN), JsValue::Number(JsNumberType::NaN));
        assert_eq!(JsValue::from(DecodedValue::Json(json!(true))), JsValue::Boolean(true));
        assert_eq!(
            JsValue::from(DecodedValue::Json(json!({"a": 1}))),
            JsValue::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn test_to_json_follows_stringify_rules() {
        assert_eq!(JsValue::Undefined.to_json().unwrap(), None);
        assert_eq!(JsValue::from_f64(1.5).to_json().unwrap(), Some(json!(1.5)));
        assert_eq!(
            JsValue::Number(JsNumberType::PositiveInfinity).to_json().unwrap(),
            Some(JsonValue::Null)
        );
        let node = JsValue::Node(VirtualNode::new(AccessorPath::root("window")));
        assert!(matches!(node.to_json(), Err(JErrorType::TypeError(_))));
    }

    #[test]
    fn test_display_is_script_string_form() {
        assert_eq!(JsValue::String("hi".into()).to_string(), "hi");
        assert_eq!(JsValue::from_f64(0.5).to_string(), "0.5");
        assert_eq!(JsValue::Number(JsNumberType::NegativeInfinity).to_string(), "-Infinity");
        assert_eq!(
            JsValue::Node(VirtualNode::new(AccessorPath::root("window.document"))).to_string(),
            "[object window.document]"
        );
    }
}
