// Store-native bin values and their mapping to caller JSON values.
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::core::error::{Error, ErrorKind};

/// A typed bin value as the store holds it.
///
/// `Nil` doubles as the removal sentinel: writing it to a bin deletes the bin.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Nil,
    Int(i64),
    Str(String),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
        }
    }

    /// Converts a caller value into a store value.
    ///
    /// Only null, integers that fit `i64`, and strings have a store
    /// representation; everything else is a parameter error.
    pub fn from_json(value: &Json) -> Result<Self, Error> {
        match value {
            Json::Null => Ok(Value::Nil),
            Json::String(text) => Ok(Value::Str(text.clone())),
            Json::Number(number) => number.as_i64().map(Value::Int).ok_or_else(|| {
                Error::new(ErrorKind::Param)
                    .with_message(format!("number {number} is not a 64-bit integer"))
            }),
            Json::Bool(_) | Json::Array(_) | Json::Object(_) => {
                Err(Error::new(ErrorKind::Param).with_message(format!(
                    "unsupported value type: {}",
                    json_type_name(value)
                )))
            }
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Nil => Json::Null,
            Value::Int(n) => Json::from(*n),
            Value::Str(text) => Json::String(text.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

pub(crate) fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Json::Number(_) => "float",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
