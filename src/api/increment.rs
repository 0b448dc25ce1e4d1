//! Purpose: Decide between initializing and incrementing a bin that may not exist yet.
//! Exports: `IncrementState`, `IncrementDecision`, `resolve_increment`.
//! Role: Auxiliary single-bin read that runs before an increment is compiled.
//! Invariants: Only "record not found" is absorbed; every other read failure propagates.
//! Invariants: A read that cannot tell the bin's state fails instead of defaulting.
//! Invariants: The read and the later operate are two round trips with no atomicity;
//! a concurrent writer between them can lose an update.
use tracing::debug;

use crate::api::context::CallContext;
use crate::core::error::{Error, StatusCode};
use crate::core::key::Key;
use crate::core::ops::Operation;
use crate::core::record::Record;
use crate::core::value::Value;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IncrementDecision {
    /// Write `value`; the bin is absent, null, or the record does not exist.
    Initialize { bin: String, value: i64 },
    /// Add `offset` to the value the bin already holds.
    Increment { bin: String, offset: i64 },
}

impl IncrementDecision {
    pub fn into_operation(self) -> Operation {
        match self {
            IncrementDecision::Initialize { bin, value } => Operation::Write {
                bin,
                value: Value::Int(value),
            },
            IncrementDecision::Increment { bin, offset } => Operation::Increment { bin, delta: offset },
        }
    }
}

#[derive(Debug)]
pub enum IncrementState {
    ReadPending {
        bin: String,
        offset: i64,
        initial_value: i64,
    },
    Resolved(IncrementDecision),
    Failed(Error),
}

impl IncrementState {
    pub fn new(bin: impl Into<String>, offset: i64, initial_value: i64) -> Self {
        IncrementState::ReadPending {
            bin: bin.into(),
            offset,
            initial_value,
        }
    }

    /// Feeds the auxiliary read's outcome; only `ReadPending` moves.
    pub fn advance(self, read: Result<Record, Error>) -> Self {
        let (bin, offset, initial_value) = match self {
            IncrementState::ReadPending {
                bin,
                offset,
                initial_value,
            } => (bin, offset, initial_value),
            other => return other,
        };

        let record = match read {
            Ok(record) => record,
            Err(err) if err.is_not_found() => {
                return IncrementState::Resolved(IncrementDecision::Initialize {
                    bin,
                    value: initial_value,
                });
            }
            Err(err) => return IncrementState::Failed(err),
        };

        if let Some((other, _)) = record.bins().iter().find(|(name, _)| *name != bin) {
            return IncrementState::Failed(
                Error::store(StatusCode::Client)
                    .with_message(format!("unable to determine the state of bin {bin}"))
                    .with_hint(format!("read returned unexpected bin {other}"))
                    .with_bin(bin),
            );
        }
        let decision = match record.get(&bin) {
            None | Some(Value::Nil) => IncrementDecision::Initialize {
                bin,
                value: initial_value,
            },
            Some(_) => IncrementDecision::Increment { bin, offset },
        };
        IncrementState::Resolved(decision)
    }

    pub fn finish(self) -> Result<IncrementDecision, Error> {
        match self {
            IncrementState::Resolved(decision) => Ok(decision),
            IncrementState::Failed(err) => Err(err),
            IncrementState::ReadPending { bin, .. } => Err(Error::store(StatusCode::Client)
                .with_message("increment resolved before its read completed")
                .with_bin(bin)),
        }
    }
}

pub fn resolve_increment(
    ctx: &CallContext<'_>,
    key: &Key,
    bin: &str,
    offset: i64,
    initial_value: i64,
) -> Result<IncrementDecision, Error> {
    let state = IncrementState::new(bin, offset, initial_value);
    let bins = [bin.to_string()];
    let read = ctx.store().read(key, Some(&bins), &ctx.read_policy());
    let decision = state.advance(read).finish()?;
    debug!(key = %key, bin, ?decision, "resolved increment");
    Ok(decision)
}
