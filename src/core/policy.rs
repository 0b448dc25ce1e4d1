// Wire-level policy structures handed to store transports.
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Optimistic concurrency constraint checked against the stored generation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Generation {
    #[default]
    Ignore,
    /// Apply only when the stored generation equals the value.
    Eq(u32),
    /// Apply only when the value is greater than the stored generation.
    Gt(u32),
}

impl Generation {
    /// Missing records report generation 0.
    pub fn permits(self, stored: u32) -> bool {
        match self {
            Generation::Ignore => true,
            Generation::Eq(expected) => expected == stored,
            Generation::Gt(expected) => expected > stored,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Consistency {
    #[default]
    One,
    All,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CommitLevel {
    #[default]
    All,
    Master,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadPolicy {
    pub timeout: Duration,
    pub consistency: Consistency,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WritePolicy {
    pub timeout: Duration,
    pub commit_level: CommitLevel,
    pub generation: Generation,
    /// Record ttl to set; `None` or `Some(0)` uses the store default.
    pub ttl: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OperatePolicy {
    pub timeout: Duration,
    pub consistency: Consistency,
    pub commit_level: CommitLevel,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RemovePolicy {
    pub timeout: Duration,
    pub commit_level: CommitLevel,
    pub generation: Generation,
}

/// Client-wide defaults that per-call options override.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PolicyDefaults {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub consistency: Consistency,
    pub commit_level: CommitLevel,
}

impl PolicyDefaults {
    pub fn new() -> Self {
        Self {
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            consistency: Consistency::One,
            commit_level: CommitLevel::All,
        }
    }

    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            timeout: self.read_timeout,
            consistency: self.consistency,
        }
    }

    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            timeout: self.write_timeout,
            commit_level: self.commit_level,
            generation: Generation::Ignore,
            ttl: None,
        }
    }

    pub fn operate_policy(&self) -> OperatePolicy {
        OperatePolicy {
            timeout: self.write_timeout,
            consistency: self.consistency,
            commit_level: self.commit_level,
        }
    }

    pub fn remove_policy(&self) -> RemovePolicy {
        RemovePolicy {
            timeout: self.write_timeout,
            commit_level: self.commit_level,
            generation: Generation::Ignore,
        }
    }
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Generation;

    #[test]
    fn generation_checks() {
        assert!(Generation::Ignore.permits(9));
        assert!(Generation::Eq(3).permits(3));
        assert!(!Generation::Eq(3).permits(4));
        assert!(Generation::Gt(5).permits(4));
        assert!(!Generation::Gt(5).permits(5));
        assert!(Generation::Eq(0).permits(0));
    }
}
