// Key builder: caller key objects to store keys.
use serde_json::Value as Json;

use crate::core::error::{Error, ErrorKind};
use crate::core::key::{Key, UserKey};
use crate::core::value::json_type_name;

/// Builds a key from `{"ns": .., "set": .., "key": ..}`.
pub fn build_key(value: &Json) -> Result<Key, Error> {
    let Json::Object(fields) = value else {
        return Err(key_error(format!(
            "key must be an object, got {}",
            json_type_name(value)
        )));
    };
    if let Some(unknown) = fields
        .keys()
        .find(|name| !matches!(name.as_str(), "ns" | "set" | "key"))
    {
        return Err(key_error(format!("unknown key field: {unknown}")));
    }

    let namespace = match fields.get("ns") {
        Some(Json::String(ns)) if !ns.is_empty() => ns.clone(),
        _ => return Err(key_error("ns must be a non-empty string")),
    };
    let set = match fields.get("set") {
        Some(Json::String(set)) => set.clone(),
        _ => return Err(key_error("set must be a string")),
    };
    let user_key = match fields.get("key") {
        Some(Json::String(key)) => UserKey::Str(key.clone()),
        Some(Json::Number(number)) => number
            .as_i64()
            .map(UserKey::Int)
            .ok_or_else(|| key_error("key must fit a 64-bit integer"))?,
        _ => return Err(key_error("key must be a string or an integer")),
    };
    Ok(Key::new(namespace, set, user_key))
}

fn key_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Param)
        .with_message(message)
        .with_hint("keys look like {\"ns\": \"test\", \"set\": \"demo\", \"key\": \"id\"}")
}

#[cfg(test)]
mod tests {
    use super::build_key;
    use crate::core::key::UserKey;
    use serde_json::json;

    #[test]
    fn builds_string_and_integer_keys() {
        let key = build_key(&json!({"ns": "test", "set": "demo", "key": "k1"})).expect("key");
        assert_eq!(key.namespace(), "test");
        assert_eq!(key.set(), "demo");
        assert_eq!(key.user_key(), &UserKey::Str("k1".into()));

        let key = build_key(&json!({"ns": "test", "set": "", "key": 7})).expect("key");
        assert_eq!(key.user_key(), &UserKey::Int(7));
        assert_eq!(key.to_string(), "test//7");
    }

    #[test]
    fn rejects_malformed_keys() {
        for case in [
            json!("test/demo/k"),
            json!({"ns": "", "set": "demo", "key": "k"}),
            json!({"ns": "test", "key": "k"}),
            json!({"ns": "test", "set": "demo"}),
            json!({"ns": "test", "set": "demo", "key": 1.5}),
            json!({"ns": "test", "set": "demo", "key": "k", "digest": "x"}),
        ] {
            assert!(build_key(&case).is_err(), "{case}");
        }
    }
}
