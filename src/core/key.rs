// Record identity: namespace, set, and user key.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserKey {
    Int(i64),
    Str(String),
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Int(n) => write!(f, "{n}"),
            UserKey::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    namespace: String,
    set: String,
    user_key: UserKey,
}

impl Key {
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, user_key: UserKey) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            user_key,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set(&self) -> &str {
        &self.set
    }

    pub fn user_key(&self) -> &UserKey {
        &self.user_key
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.set, self.user_key)
    }
}
