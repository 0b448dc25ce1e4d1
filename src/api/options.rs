//! Purpose: Resolve a caller's JSON options object into concrete store policies.
//! Exports: `CallOptions`.
//! Role: The policy resolver; called once per entry point before any store call.
//! Invariants: Unknown keys and wrongly typed values are `Param` errors.
//! Invariants: Absent fields inherit from the client's `PolicyDefaults`.
use std::time::Duration;

use serde_json::{Map, Value as Json};

use crate::core::error::{Error, ErrorKind};
use crate::core::policy::{
    CommitLevel, Consistency, Generation, OperatePolicy, PolicyDefaults, ReadPolicy,
    RemovePolicy, WritePolicy,
};
use crate::core::value::json_type_name;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CallOptions {
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub generation: Option<Generation>,
    pub ttl: Option<u32>,
    pub consistency: Option<Consistency>,
    pub commit_level: Option<CommitLevel>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` and JSON null both mean "no options".
    pub fn from_json(options: Option<&Json>) -> Result<Self, Error> {
        let fields = match options {
            None | Some(Json::Null) => return Ok(Self::default()),
            Some(Json::Object(fields)) => fields,
            Some(other) => {
                return Err(policy_error(format!(
                    "options must be an object, got {}",
                    json_type_name(other)
                )));
            }
        };

        let mut resolved = Self::default();
        for (name, value) in fields {
            match name.as_str() {
                "read_timeout" => resolved.read_timeout = Some(parse_timeout(name, value)?),
                "write_timeout" => resolved.write_timeout = Some(parse_timeout(name, value)?),
                "generation" => resolved.generation = Some(parse_generation(value)?),
                "ttl" => resolved.ttl = Some(parse_u32(name, value)?),
                "consistency" => {
                    resolved.consistency = Some(match value.as_str() {
                        Some("one") => Consistency::One,
                        Some("all") => Consistency::All,
                        _ => return Err(policy_error("consistency must be \"one\" or \"all\"")),
                    });
                }
                "commit_level" => {
                    resolved.commit_level = Some(match value.as_str() {
                        Some("all") => CommitLevel::All,
                        Some("master") => CommitLevel::Master,
                        _ => {
                            return Err(policy_error(
                                "commit_level must be \"all\" or \"master\"",
                            ));
                        }
                    });
                }
                other => return Err(policy_error(format!("unknown option: {other}"))),
            }
        }
        Ok(resolved)
    }

    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn generation(&self) -> Generation {
        self.generation.unwrap_or_default()
    }

    pub fn read_policy(&self, defaults: &PolicyDefaults) -> ReadPolicy {
        let mut policy = defaults.read_policy();
        if let Some(timeout) = self.read_timeout {
            policy.timeout = timeout;
        }
        if let Some(consistency) = self.consistency {
            policy.consistency = consistency;
        }
        policy
    }

    pub fn write_policy(&self, defaults: &PolicyDefaults) -> WritePolicy {
        let mut policy = defaults.write_policy();
        if let Some(timeout) = self.write_timeout {
            policy.timeout = timeout;
        }
        if let Some(commit_level) = self.commit_level {
            policy.commit_level = commit_level;
        }
        policy.generation = self.generation();
        policy.ttl = self.ttl;
        policy
    }

    pub fn operate_policy(&self, defaults: &PolicyDefaults) -> OperatePolicy {
        let mut policy = defaults.operate_policy();
        if let Some(timeout) = self.write_timeout {
            policy.timeout = timeout;
        }
        if let Some(consistency) = self.consistency {
            policy.consistency = consistency;
        }
        if let Some(commit_level) = self.commit_level {
            policy.commit_level = commit_level;
        }
        policy
    }

    pub fn remove_policy(&self, defaults: &PolicyDefaults) -> RemovePolicy {
        let mut policy = defaults.remove_policy();
        if let Some(timeout) = self.write_timeout {
            policy.timeout = timeout;
        }
        if let Some(commit_level) = self.commit_level {
            policy.commit_level = commit_level;
        }
        policy.generation = self.generation();
        policy
    }
}

fn parse_timeout(name: &str, value: &Json) -> Result<Duration, Error> {
    value
        .as_u64()
        .map(Duration::from_millis)
        .ok_or_else(|| policy_error(format!("{name} must be a non-negative integer (ms)")))
}

fn parse_u32(name: &str, value: &Json) -> Result<u32, Error> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| policy_error(format!("{name} must be a non-negative 32-bit integer")))
}

fn parse_generation(value: &Json) -> Result<Generation, Error> {
    match value {
        Json::Number(_) => parse_u32("generation", value).map(Generation::Eq),
        Json::Object(fields) => parse_generation_object(fields),
        _ => Err(policy_error(
            "generation must be an integer or {\"policy\", \"value\"}",
        )),
    }
}

fn parse_generation_object(fields: &Map<String, Json>) -> Result<Generation, Error> {
    if let Some(unknown) = fields
        .keys()
        .find(|key| !matches!(key.as_str(), "policy" | "value"))
    {
        return Err(policy_error(format!("unknown generation field: {unknown}")));
    }
    let value = fields
        .get("value")
        .map(|value| parse_u32("generation value", value))
        .transpose()?;
    match (fields.get("policy").and_then(Json::as_str), value) {
        (Some("ignore"), _) => Ok(Generation::Ignore),
        (Some("eq"), Some(value)) => Ok(Generation::Eq(value)),
        (Some("gt"), Some(value)) => Ok(Generation::Gt(value)),
        (Some("eq" | "gt"), None) => Err(policy_error("generation value is required")),
        _ => Err(policy_error(
            "generation policy must be \"eq\", \"gt\", or \"ignore\"",
        )),
    }
}

fn policy_error(detail: impl Into<String>) -> Error {
    Error::new(ErrorKind::Param)
        .with_message("unable to set policy")
        .with_hint(detail)
}

#[cfg(test)]
mod tests {
    use super::CallOptions;
    use crate::core::error::ErrorKind;
    use crate::core::policy::{CommitLevel, Consistency, Generation, PolicyDefaults};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn absent_options_use_defaults() {
        let defaults = PolicyDefaults::new();
        for options in [None, Some(&json!(null))] {
            let resolved = CallOptions::from_json(options).expect("options");
            assert_eq!(resolved, CallOptions::new());
            assert_eq!(resolved.read_policy(&defaults), defaults.read_policy());
            assert_eq!(resolved.remove_policy(&defaults), defaults.remove_policy());
        }
    }

    #[test]
    fn recognized_keys_override_defaults() {
        let defaults = PolicyDefaults::new();
        let options = json!({
            "read_timeout": 50,
            "write_timeout": 250,
            "generation": {"policy": "gt", "value": 4},
            "ttl": 60,
            "consistency": "all",
            "commit_level": "master"
        });
        let resolved = CallOptions::from_json(Some(&options)).expect("options");

        let read = resolved.read_policy(&defaults);
        assert_eq!(read.timeout, Duration::from_millis(50));
        assert_eq!(read.consistency, Consistency::All);

        let write = resolved.write_policy(&defaults);
        assert_eq!(write.timeout, Duration::from_millis(250));
        assert_eq!(write.commit_level, CommitLevel::Master);
        assert_eq!(write.generation, Generation::Gt(4));
        assert_eq!(write.ttl, Some(60));

        let operate = resolved.operate_policy(&defaults);
        assert_eq!(operate.timeout, Duration::from_millis(250));
    }

    #[test]
    fn bare_generation_means_expect_equal() {
        let resolved = CallOptions::from_json(Some(&json!({"generation": 3}))).expect("options");
        assert_eq!(resolved.generation(), Generation::Eq(3));
    }

    #[test]
    fn malformed_options_are_param_errors() {
        let cases = [
            json!([]),
            json!({"timeout": 5}),
            json!({"read_timeout": -1}),
            json!({"ttl": "60"}),
            json!({"generation": "3"}),
            json!({"generation": {"policy": "eq"}}),
            json!({"generation": {"policy": "lt", "value": 1}}),
            json!({"consistency": "quorum"}),
            json!({"commit_level": 1}),
        ];
        for case in cases {
            let err = CallOptions::from_json(Some(&case)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Param, "{case}");
            assert_eq!(err.describe(), "unable to set policy");
        }
    }
}
