//! Purpose: Parse loosely-typed caller operation entries into typed descriptors.
//! Exports: `OpCode`, `OperationDescriptor`, `parse_entry`, `parse_operations`, `validate_bin_name`.
//! Role: First stage of `operate`; everything after it works on closed enums.
//! Invariants: Pure; yields a descriptor or a `Param` error, never both.
//! Invariants: Every descriptor except `Touch` carries a valid bin name.
use serde_json::{Map, Value as Json};

use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Value, json_type_name};

/// Longest bin name the store accepts, in bytes.
pub const MAX_BIN_NAME_LEN: usize = 15;

const ENTRY_KEYS: [&str; 3] = ["op", "bin", "val"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpCode {
    Read,
    Write,
    Increment,
    Append,
    Prepend,
    Touch,
}

impl OpCode {
    pub fn code(self) -> i64 {
        match self {
            OpCode::Read => 1,
            OpCode::Write => 2,
            OpCode::Increment => 5,
            OpCode::Append => 9,
            OpCode::Prepend => 10,
            OpCode::Touch => 11,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        let op = match code {
            1 => OpCode::Read,
            2 => OpCode::Write,
            5 => OpCode::Increment,
            9 => OpCode::Append,
            10 => OpCode::Prepend,
            11 => OpCode::Touch,
            _ => return None,
        };
        Some(op)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "read" => OpCode::Read,
            "write" => OpCode::Write,
            "incr" | "increment" => OpCode::Increment,
            "append" => OpCode::Append,
            "prepend" => OpCode::Prepend,
            "touch" => OpCode::Touch,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Read => "read",
            OpCode::Write => "write",
            OpCode::Increment => "incr",
            OpCode::Append => "append",
            OpCode::Prepend => "prepend",
            OpCode::Touch => "touch",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationDescriptor {
    Append { bin: String, text: String },
    Prepend { bin: String, text: String },
    /// `offset` applies when the bin holds a value, `initial_value` otherwise.
    Increment {
        bin: String,
        offset: i64,
        initial_value: i64,
    },
    /// `None` falls back to the call's ttl option, then 0.
    Touch { ttl: Option<u32> },
    Read { bin: String },
    /// `value` is always text or an integer.
    Write { bin: String, value: Value },
}

impl OperationDescriptor {
    pub fn append(bin: impl Into<String>, text: impl Into<String>) -> Result<Self, Error> {
        let bin = checked_bin(bin.into())?;
        Ok(OperationDescriptor::Append {
            bin,
            text: text.into(),
        })
    }

    pub fn prepend(bin: impl Into<String>, text: impl Into<String>) -> Result<Self, Error> {
        let bin = checked_bin(bin.into())?;
        Ok(OperationDescriptor::Prepend {
            bin,
            text: text.into(),
        })
    }

    pub fn increment(bin: impl Into<String>, offset: i64, initial_value: i64) -> Result<Self, Error> {
        let bin = checked_bin(bin.into())?;
        Ok(OperationDescriptor::Increment {
            bin,
            offset,
            initial_value,
        })
    }

    pub fn touch(ttl: u32) -> Self {
        OperationDescriptor::Touch { ttl: Some(ttl) }
    }

    pub fn read(bin: impl Into<String>) -> Result<Self, Error> {
        let bin = checked_bin(bin.into())?;
        Ok(OperationDescriptor::Read { bin })
    }

    pub fn write(bin: impl Into<String>, value: Value) -> Result<Self, Error> {
        let bin = checked_bin(bin.into())?;
        if value.is_nil() {
            return Err(param(OpCode::Write, "val must be a string or an integer").with_bin(bin));
        }
        Ok(OperationDescriptor::Write { bin, value })
    }

    pub fn op_code(&self) -> OpCode {
        match self {
            OperationDescriptor::Append { .. } => OpCode::Append,
            OperationDescriptor::Prepend { .. } => OpCode::Prepend,
            OperationDescriptor::Increment { .. } => OpCode::Increment,
            OperationDescriptor::Touch { .. } => OpCode::Touch,
            OperationDescriptor::Read { .. } => OpCode::Read,
            OperationDescriptor::Write { .. } => OpCode::Write,
        }
    }
}

pub fn validate_bin_name(bin: &str) -> Result<(), Error> {
    if bin.is_empty() {
        return Err(Error::new(ErrorKind::Param).with_message("bin name must not be empty"));
    }
    if bin.len() > MAX_BIN_NAME_LEN {
        return Err(Error::new(ErrorKind::Param)
            .with_message(format!(
                "bin name is longer than {MAX_BIN_NAME_LEN} bytes"
            ))
            .with_bin(bin));
    }
    Ok(())
}

/// Parses an ordered operation list; an empty list is rejected.
pub fn parse_operations(value: &Json) -> Result<Vec<OperationDescriptor>, Error> {
    let Json::Array(entries) = value else {
        return Err(Error::new(ErrorKind::Param)
            .with_message(format!(
                "operations must be an array, got {}",
                json_type_name(value)
            )));
    };
    if entries.is_empty() {
        return Err(Error::new(ErrorKind::Param).with_message("operations must not be empty"));
    }
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            parse_entry(entry).map_err(|err| {
                let message = format!("operation {index}: {}", err.describe());
                err.with_message(message)
            })
        })
        .collect()
}

pub fn parse_entry(entry: &Json) -> Result<OperationDescriptor, Error> {
    let Json::Object(fields) = entry else {
        return Err(Error::new(ErrorKind::Param).with_message(format!(
            "operation entry must be an object, got {}",
            json_type_name(entry)
        )));
    };
    if let Some(unknown) = fields.keys().find(|key| !ENTRY_KEYS.contains(&key.as_str())) {
        return Err(Error::new(ErrorKind::Param)
            .with_message(format!("unknown operation field: {unknown}"))
            .with_hint("operation entries accept only op, bin, and val"));
    }

    let op = parse_op(fields)?;
    if op == OpCode::Touch {
        return parse_touch(fields.get("val"));
    }

    let bin = match fields.get("bin") {
        Some(Json::String(bin)) => checked_bin(bin.clone())?,
        Some(_) => return Err(param(op, "bin must be a string")),
        None => return Err(param(op, "bin is required")),
    };
    let val = fields.get("val");
    let descriptor = match op {
        OpCode::Read => OperationDescriptor::Read { bin },
        OpCode::Append | OpCode::Prepend => {
            let Some(Json::String(text)) = val else {
                return Err(param(op, "val must be a string").with_bin(bin));
            };
            if op == OpCode::Append {
                OperationDescriptor::Append {
                    bin,
                    text: text.clone(),
                }
            } else {
                OperationDescriptor::Prepend {
                    bin,
                    text: text.clone(),
                }
            }
        }
        OpCode::Write => {
            let value = match val {
                Some(Json::String(text)) => Value::Str(text.clone()),
                Some(Json::Number(number)) => number.as_i64().map(Value::Int).ok_or_else(|| {
                    param(op, "val must be a 64-bit integer").with_bin(bin.clone())
                })?,
                _ => return Err(param(op, "val must be a string or an integer").with_bin(bin)),
            };
            OperationDescriptor::Write { bin, value }
        }
        OpCode::Increment => {
            let Some(offset) = val.and_then(Json::as_i64) else {
                return Err(param(op, "val must be an integer offset").with_bin(bin));
            };
            OperationDescriptor::Increment {
                bin,
                offset,
                initial_value: 0,
            }
        }
        OpCode::Touch => parse_touch(val)?,
    };
    Ok(descriptor)
}

fn parse_op(fields: &Map<String, Json>) -> Result<OpCode, Error> {
    let op = match fields.get("op") {
        Some(Json::Number(number)) => number.as_i64().and_then(OpCode::from_code),
        Some(Json::String(name)) => OpCode::from_name(name),
        Some(_) => None,
        None => {
            return Err(Error::new(ErrorKind::Param).with_message("op is required"));
        }
    };
    op.ok_or_else(|| {
        Error::new(ErrorKind::Param)
            .with_message("unrecognized op")
            .with_hint("use read, write, incr, append, prepend, touch or codes 1, 2, 5, 9, 10, 11")
    })
}

fn parse_touch(val: Option<&Json>) -> Result<OperationDescriptor, Error> {
    let ttl = match val {
        None | Some(Json::Null) => None,
        Some(val) => Some(
            val.as_u64()
                .and_then(|ttl| u32::try_from(ttl).ok())
                .ok_or_else(|| param(OpCode::Touch, "val must be a non-negative integer ttl"))?,
        ),
    };
    Ok(OperationDescriptor::Touch { ttl })
}

fn checked_bin(bin: String) -> Result<String, Error> {
    validate_bin_name(&bin)?;
    Ok(bin)
}

fn param(op: OpCode, detail: &str) -> Error {
    Error::new(ErrorKind::Param).with_message(format!("{}: {detail}", op.name()))
}

#[cfg(test)]
mod tests {
    use super::{OpCode, OperationDescriptor, parse_entry, parse_operations, validate_bin_name};
    use crate::core::error::ErrorKind;
    use crate::core::value::Value;
    use serde_json::json;

    #[test]
    fn numeric_and_named_codes_agree() {
        for name in ["read", "write", "incr", "append", "prepend", "touch"] {
            let op = OpCode::from_name(name).expect("name");
            assert_eq!(OpCode::from_code(op.code()), Some(op));
        }
        assert_eq!(OpCode::from_name("increment"), Some(OpCode::Increment));
        assert_eq!(OpCode::from_code(3), None);
    }

    #[test]
    fn parses_every_descriptor_shape() {
        assert_eq!(
            parse_entry(&json!({"op": 9, "bin": "s", "val": "bar"})).unwrap(),
            OperationDescriptor::Append {
                bin: "s".into(),
                text: "bar".into()
            }
        );
        assert_eq!(
            parse_entry(&json!({"op": "prepend", "bin": "s", "val": "x"})).unwrap(),
            OperationDescriptor::Prepend {
                bin: "s".into(),
                text: "x".into()
            }
        );
        assert_eq!(
            parse_entry(&json!({"op": "incr", "bin": "n", "val": -3})).unwrap(),
            OperationDescriptor::Increment {
                bin: "n".into(),
                offset: -3,
                initial_value: 0
            }
        );
        assert_eq!(
            parse_entry(&json!({"op": 11, "val": 60})).unwrap(),
            OperationDescriptor::Touch { ttl: Some(60) }
        );
        assert_eq!(
            parse_entry(&json!({"op": "touch"})).unwrap(),
            OperationDescriptor::Touch { ttl: None }
        );
        assert_eq!(
            parse_entry(&json!({"op": 1, "bin": "a"})).unwrap(),
            OperationDescriptor::Read { bin: "a".into() }
        );
        assert_eq!(
            parse_entry(&json!({"op": 2, "bin": "a", "val": 1})).unwrap(),
            OperationDescriptor::Write {
                bin: "a".into(),
                value: Value::Int(1)
            }
        );
    }

    #[test]
    fn malformed_entries_are_param_errors() {
        let cases = [
            json!({"bin": "a", "val": 1}),
            json!({"op": 42, "bin": "a"}),
            json!({"op": "bogus", "bin": "a"}),
            json!({"op": true, "bin": "a"}),
            json!({"op": "read"}),
            json!({"op": "read", "bin": ""}),
            json!({"op": "read", "bin": 7}),
            json!({"op": "read", "bin": "sixteen_bytes_xx"}),
            json!({"op": "append", "bin": "a", "val": 1}),
            json!({"op": "append", "bin": "a"}),
            json!({"op": "write", "bin": "a", "val": 1.5}),
            json!({"op": "write", "bin": "a", "val": null}),
            json!({"op": "incr", "bin": "a", "val": "1"}),
            json!({"op": "touch", "val": -1}),
            json!({"op": "read", "bin": "a", "extra": 1}),
            json!("read"),
        ];
        for case in cases {
            let err = parse_entry(&case).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Param, "{case}");
        }
    }

    #[test]
    fn operation_lists_must_be_non_empty_arrays() {
        assert_eq!(
            parse_operations(&json!([])).unwrap_err().kind(),
            ErrorKind::Param
        );
        assert_eq!(
            parse_operations(&json!({"op": "read"})).unwrap_err().kind(),
            ErrorKind::Param
        );

        let err = parse_operations(&json!([{"op": "read", "bin": "a"}, {"bin": "b"}])).unwrap_err();
        assert_eq!(err.describe(), "operation 1: op is required");
    }

    #[test]
    fn bin_name_limits() {
        assert!(validate_bin_name("fifteen_bytes_x").is_ok());
        assert!(validate_bin_name("sixteen_bytes_xx").is_err());
        assert!(validate_bin_name("").is_err());
    }

    #[test]
    fn typed_constructors_validate() {
        assert!(OperationDescriptor::append("", "x").is_err());
        assert!(OperationDescriptor::write("a", Value::Nil).is_err());
        assert_eq!(
            OperationDescriptor::increment("n", 3, 5).unwrap().op_code(),
            OpCode::Increment
        );
    }
}
