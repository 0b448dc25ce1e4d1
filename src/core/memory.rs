// In-process store transport; every primitive runs under one mutex.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::apply::{self, Change, StoredRecord};
use crate::core::error::{Error, StatusCode};
use crate::core::key::Key;
use crate::core::ops::Operations;
use crate::core::policy::{OperatePolicy, ReadPolicy, RemovePolicy, WritePolicy};
use crate::core::record::{Metadata, Record};
use crate::core::store::Store;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StoreOptions {
    /// ttl applied by writes that do not request one; 0 never expires.
    pub default_ttl: u32,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_ttl(mut self, default_ttl: u32) -> Self {
        self.default_ttl = default_ttl;
        self
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Key, StoredRecord>>,
    options: StoreOptions,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            options,
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Key, StoredRecord>>, Error> {
        self.records.lock().map_err(|_| {
            Error::store(StatusCode::Server).with_message("memory store lock poisoned")
        })
    }
}

impl Store for MemoryStore {
    fn read(
        &self,
        key: &Key,
        bins: Option<&[String]>,
        _policy: &ReadPolicy,
    ) -> Result<Record, Error> {
        let now = unix_now()?;
        let records = self.lock()?;
        apply::live(records.get(key), now)
            .map(|record| record.select(bins, now))
            .ok_or_else(|| Error::store(StatusCode::RecordNotFound))
    }

    fn operate(
        &self,
        key: &Key,
        ops: &Operations,
        _policy: &OperatePolicy,
    ) -> Result<Record, Error> {
        let now = unix_now()?;
        let mut records = self.lock()?;
        let applied = apply::apply_operations(records.get(key), ops, now, self.options.default_ttl)?;
        commit(&mut records, key, applied.change);
        Ok(applied.result)
    }

    fn put(&self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<(), Error> {
        let now = unix_now()?;
        let mut records = self.lock()?;
        let change = apply::apply_put(
            records.get(key),
            record,
            policy.generation,
            policy.ttl,
            now,
            self.options.default_ttl,
        )?;
        commit(&mut records, key, change);
        Ok(())
    }

    fn remove(&self, key: &Key, policy: &RemovePolicy) -> Result<(), Error> {
        let now = unix_now()?;
        let mut records = self.lock()?;
        let change = apply::apply_remove(records.get(key), policy.generation, now)?;
        commit(&mut records, key, change);
        Ok(())
    }

    fn exists(&self, key: &Key, _policy: &ReadPolicy) -> Result<Metadata, Error> {
        let now = unix_now()?;
        let records = self.lock()?;
        apply::live(records.get(key), now)
            .map(|record| record.metadata(now))
            .ok_or_else(|| Error::store(StatusCode::RecordNotFound))
    }
}

fn commit(records: &mut HashMap<Key, StoredRecord>, key: &Key, change: Change) {
    match change {
        Change::Unchanged => {}
        Change::Replace(record) => {
            records.insert(key.clone(), record);
        }
        Change::Delete => {
            records.remove(key);
        }
    }
}

pub(crate) fn unix_now() -> Result<u64, Error> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| {
            Error::store(StatusCode::Client)
                .with_message("time went backwards")
                .with_source(err)
        })?;
    Ok(duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::{MemoryStore, StoreOptions};
    use crate::core::key::{Key, UserKey};
    use crate::core::ops::{Operation, Operations};
    use crate::core::policy::{Generation, PolicyDefaults};
    use crate::core::record::Record;
    use crate::core::store::Store;
    use crate::core::value::Value;

    fn key() -> Key {
        Key::new("test", "demo", UserKey::Str("k".into()))
    }

    #[test]
    fn put_read_exists_remove() {
        let store = MemoryStore::new();
        let defaults = PolicyDefaults::new();
        let mut record = Record::new();
        record.set("a", Value::Int(1));
        store.put(&key(), &record, &defaults.write_policy()).expect("put");

        let read = store.read(&key(), None, &defaults.read_policy()).expect("read");
        assert_eq!(read.get("a"), Some(&Value::Int(1)));
        let meta = store.exists(&key(), &defaults.read_policy()).expect("exists");
        assert_eq!(meta.generation, 1);
        assert_eq!(meta.ttl, 0);

        store.remove(&key(), &defaults.remove_policy()).expect("remove");
        assert!(store.is_empty());
        assert!(store
            .exists(&key(), &defaults.read_policy())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn failed_operate_leaves_record_untouched() {
        let store = MemoryStore::new();
        let defaults = PolicyDefaults::new();
        let mut record = Record::new();
        record.set("s", Value::from("foo"));
        store.put(&key(), &record, &defaults.write_policy()).expect("put");

        let mut ops = Operations::new();
        ops.push(Operation::Write {
            bin: "s".into(),
            value: Value::from("changed"),
        });
        ops.push(Operation::Append {
            bin: "missing".into(),
            text: "x".into(),
        });
        assert!(store.operate(&key(), &ops, &defaults.operate_policy()).is_err());

        let read = store.read(&key(), None, &defaults.read_policy()).expect("read");
        assert_eq!(read.get("s"), Some(&Value::from("foo")));
        assert_eq!(read.generation, 1);
    }

    #[test]
    fn remove_honors_generation() {
        let store = MemoryStore::with_options(StoreOptions::new().with_default_ttl(120));
        let defaults = PolicyDefaults::new();
        let mut record = Record::new();
        record.set("a", Value::Int(1));
        store.put(&key(), &record, &defaults.write_policy()).expect("put");
        let ttl = store.exists(&key(), &defaults.read_policy()).unwrap().ttl;
        assert!((119..=120).contains(&ttl), "ttl {ttl}");

        let mut policy = defaults.remove_policy();
        policy.generation = Generation::Eq(5);
        assert!(store.remove(&key(), &policy).is_err());
        policy.generation = Generation::Eq(1);
        store.remove(&key(), &policy).expect("remove");
    }
}
