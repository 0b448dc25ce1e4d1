// Low-level operation lists submitted to the store in one operate request.
use crate::core::policy::Generation;
use crate::core::value::Value;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    Read { bin: String },
    Write { bin: String, value: Value },
    Increment { bin: String, delta: i64 },
    Append { bin: String, text: String },
    Prepend { bin: String, text: String },
    Touch,
}

impl Operation {
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Read { .. })
    }

    pub fn bin(&self) -> Option<&str> {
        match self {
            Operation::Read { bin }
            | Operation::Write { bin, .. }
            | Operation::Increment { bin, .. }
            | Operation::Append { bin, .. }
            | Operation::Prepend { bin, .. } => Some(bin),
            Operation::Touch => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Read { .. } => "read",
            Operation::Write { .. } => "write",
            Operation::Increment { .. } => "increment",
            Operation::Append { .. } => "append",
            Operation::Prepend { .. } => "prepend",
            Operation::Touch => "touch",
        }
    }
}

/// An ordered operation list with the record-wide generation and ttl context.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Operations {
    ops: Vec<Operation>,
    pub generation: Generation,
    /// Record ttl to set on a write batch; `None` or `Some(0)` uses the store default.
    pub ttl: Option<u32>,
}

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
            generation: Generation::Ignore,
            ttl: None,
        }
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn has_writes(&self) -> bool {
        self.ops.iter().any(Operation::is_write)
    }
}
