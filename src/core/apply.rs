//! Purpose: Apply operation lists, puts, and removes to stored records without any I/O.
//! Exports: `StoredRecord`, `Change`, `Applied`, `apply_operations`, `apply_put`, `apply_remove`.
//! Role: Pure semantics layer shared by every store transport in this crate.
//! Invariants: No side effects; output depends only on the inputs and `now`.
//! Invariants: A failed application never yields a partially modified record.
//! Invariants: Expired records behave exactly like missing ones.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, StatusCode};
use crate::core::ops::{Operation, Operations};
use crate::core::policy::Generation;
use crate::core::record::{Metadata, Record};
use crate::core::value::Value;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub bins: BTreeMap<String, Value>,
    pub generation: u32,
    /// Lifetime in seconds counted from `last_update`; 0 never expires.
    pub ttl: u32,
    /// Unix seconds of the last successful write.
    pub last_update: u64,
}

impl StoredRecord {
    pub fn is_expired(&self, now: u64) -> bool {
        self.ttl != 0 && now >= self.last_update.saturating_add(u64::from(self.ttl))
    }

    pub fn remaining_ttl(&self, now: u64) -> u32 {
        if self.ttl == 0 {
            return 0;
        }
        let expires_at = self.last_update.saturating_add(u64::from(self.ttl));
        u32::try_from(expires_at.saturating_sub(now)).unwrap_or(u32::MAX)
    }

    pub fn metadata(&self, now: u64) -> Metadata {
        Metadata {
            generation: self.generation,
            ttl: self.remaining_ttl(now),
        }
    }

    /// Projects the record; selected bins missing from it are omitted.
    pub fn select(&self, bins: Option<&[String]>, now: u64) -> Record {
        let projected = match bins {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    self.bins
                        .get(name)
                        .map(|value| (name.clone(), value.clone()))
                })
                .collect(),
            None => self
                .bins
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        };
        Record::from_bins(projected, self.metadata(now))
    }
}

/// What a transport must do to its stored copy after a successful application.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Change {
    Unchanged,
    Replace(StoredRecord),
    Delete,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Applied {
    pub change: Change,
    pub result: Record,
}

pub fn live(existing: Option<&StoredRecord>, now: u64) -> Option<&StoredRecord> {
    existing.filter(|record| !record.is_expired(now))
}

pub fn apply_operations(
    existing: Option<&StoredRecord>,
    ops: &Operations,
    now: u64,
    default_ttl: u32,
) -> Result<Applied, Error> {
    if ops.is_empty() {
        return Err(Error::store(StatusCode::RequestInvalid).with_message("operation list is empty"));
    }
    let existing = live(existing, now);
    let touches = ops.ops().iter().any(|op| matches!(op, Operation::Touch));
    if existing.is_none() && (!ops.has_writes() || touches) {
        return Err(Error::store(StatusCode::RecordNotFound));
    }
    let stored_generation = existing.map_or(0, |record| record.generation);
    check_generation(ops.generation, stored_generation)?;

    let mut bins = existing.map(|record| record.bins.clone()).unwrap_or_default();
    let mut result = Record::new();
    for op in ops.ops() {
        apply_one(&mut bins, &mut result, op)?;
    }

    if !ops.has_writes() {
        if let Some(record) = existing {
            result.generation = record.generation;
            result.ttl = record.remaining_ttl(now);
        }
        return Ok(Applied {
            change: Change::Unchanged,
            result,
        });
    }

    if bins.is_empty() {
        let change = if existing.is_some() {
            Change::Delete
        } else {
            Change::Unchanged
        };
        return Ok(Applied { change, result });
    }

    let next = StoredRecord {
        bins,
        generation: next_generation(stored_generation),
        ttl: effective_ttl(ops.ttl, default_ttl),
        last_update: now,
    };
    result.generation = next.generation;
    result.ttl = next.ttl;
    Ok(Applied {
        change: Change::Replace(next),
        result,
    })
}

pub fn apply_put(
    existing: Option<&StoredRecord>,
    record: &Record,
    generation: Generation,
    ttl: Option<u32>,
    now: u64,
    default_ttl: u32,
) -> Result<Change, Error> {
    if record.is_empty() {
        return Err(Error::store(StatusCode::RequestInvalid).with_message("record has no bins"));
    }
    let existing = live(existing, now);
    let only_removals = record.bins().iter().all(|(_, value)| value.is_nil());
    if existing.is_none() && only_removals {
        return Err(Error::store(StatusCode::RecordNotFound));
    }
    let stored_generation = existing.map_or(0, |stored| stored.generation);
    check_generation(generation, stored_generation)?;

    let mut bins = existing.map(|stored| stored.bins.clone()).unwrap_or_default();
    for (name, value) in record.bins() {
        if value.is_nil() {
            bins.remove(name);
        } else {
            bins.insert(name.clone(), value.clone());
        }
    }
    if bins.is_empty() {
        return Ok(Change::Delete);
    }
    Ok(Change::Replace(StoredRecord {
        bins,
        generation: next_generation(stored_generation),
        ttl: effective_ttl(ttl, default_ttl),
        last_update: now,
    }))
}

pub fn apply_remove(
    existing: Option<&StoredRecord>,
    generation: Generation,
    now: u64,
) -> Result<Change, Error> {
    let existing =
        live(existing, now).ok_or_else(|| Error::store(StatusCode::RecordNotFound))?;
    check_generation(generation, existing.generation)?;
    Ok(Change::Delete)
}

fn apply_one(
    bins: &mut BTreeMap<String, Value>,
    result: &mut Record,
    op: &Operation,
) -> Result<(), Error> {
    match op {
        Operation::Read { bin } => {
            if let Some(value) = bins.get(bin) {
                result.set(bin.clone(), value.clone());
            }
        }
        Operation::Write { bin, value } => {
            if value.is_nil() {
                bins.remove(bin);
            } else {
                bins.insert(bin.clone(), value.clone());
            }
        }
        Operation::Increment { bin, delta } => {
            let next = match bins.get(bin) {
                None | Some(Value::Nil) => *delta,
                Some(Value::Int(current)) => current.checked_add(*delta).ok_or_else(|| {
                    Error::store(StatusCode::RequestInvalid)
                        .with_message("increment overflows a 64-bit integer")
                        .with_bin(bin.clone())
                })?,
                Some(Value::Str(_)) => return Err(incompatible(bin, op)),
            };
            bins.insert(bin.clone(), Value::Int(next));
        }
        Operation::Append { bin, text } => match bins.get_mut(bin) {
            Some(Value::Str(current)) => current.push_str(text),
            Some(Value::Int(_)) => return Err(incompatible(bin, op)),
            None | Some(Value::Nil) => {
                return Err(Error::store(StatusCode::BinNotFound).with_bin(bin.clone()));
            }
        },
        Operation::Prepend { bin, text } => match bins.get_mut(bin) {
            Some(Value::Str(current)) => current.insert_str(0, text),
            Some(Value::Int(_)) => return Err(incompatible(bin, op)),
            None | Some(Value::Nil) => {
                return Err(Error::store(StatusCode::BinNotFound).with_bin(bin.clone()));
            }
        },
        Operation::Touch => {}
    }
    Ok(())
}

fn incompatible(bin: &str, op: &Operation) -> Error {
    Error::store(StatusCode::BinIncompatibleType)
        .with_message(format!("{} is not supported on this bin's type", op.name()))
        .with_bin(bin)
}

fn check_generation(generation: Generation, stored: u32) -> Result<(), Error> {
    if generation.permits(stored) {
        return Ok(());
    }
    Err(Error::store(StatusCode::GenerationMismatch)
        .with_message(format!("generation check failed (stored generation {stored})")))
}

fn next_generation(current: u32) -> u32 {
    if current == u32::MAX { 1 } else { current + 1 }
}

fn effective_ttl(requested: Option<u32>, default_ttl: u32) -> u32 {
    match requested {
        Some(ttl) if ttl > 0 => ttl,
        _ => default_ttl,
    }
}
