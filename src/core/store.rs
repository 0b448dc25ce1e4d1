//! Purpose: Define the synchronous transport primitives the compiler consumes.
//! Exports: `Store`.
//! Role: Seam between command compilation and whatever holds the records.
//! Invariants: `operate` applies a whole operation list atomically or not at all.
//! Invariants: A missing record is reported as `StatusCode::RecordNotFound`.
use crate::core::error::Error;
use crate::core::key::Key;
use crate::core::ops::Operations;
use crate::core::policy::{OperatePolicy, ReadPolicy, RemovePolicy, WritePolicy};
use crate::core::record::{Metadata, Record};

pub trait Store: Send + Sync {
    /// Reads the record; `bins` restricts the returned bins when given.
    fn read(&self, key: &Key, bins: Option<&[String]>, policy: &ReadPolicy)
    -> Result<Record, Error>;

    /// Applies `ops` in order and returns the values of its read operations.
    fn operate(&self, key: &Key, ops: &Operations, policy: &OperatePolicy)
    -> Result<Record, Error>;

    /// Writes `record`'s bins; nil bins are removed.
    fn put(&self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<(), Error>;

    fn remove(&self, key: &Key, policy: &RemovePolicy) -> Result<(), Error>;

    fn exists(&self, key: &Key, policy: &ReadPolicy) -> Result<Metadata, Error>;
}
