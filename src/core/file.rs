// Directory-backed store transport: one JSON document per namespace, serialized by an fs2 lock file.
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use libc::{EACCES, EPERM};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::apply::{self, Change, StoredRecord};
use crate::core::error::{Error, ErrorKind, StatusCode};
use crate::core::key::{Key, UserKey};
use crate::core::memory::{StoreOptions, unix_now};
use crate::core::ops::Operations;
use crate::core::policy::{OperatePolicy, ReadPolicy, RemovePolicy, WritePolicy};
use crate::core::record::{Metadata, Record};
use crate::core::store::Store;
use crate::store_paths::{NamespaceResolveError, namespace_lock_path, resolve_namespace_path};

const FORMAT_VERSION: u32 = 1;
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

type RecordMap = BTreeMap<(String, UserKey), StoredRecord>;

#[derive(Serialize, Deserialize)]
struct NamespaceDoc {
    version: u32,
    records: Vec<StoredEntry>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    set: String,
    key: UserKey,
    record: StoredRecord,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
    options: StoreOptions,
}

impl FileStore {
    /// Opens (creating if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            io_error(err, format!("failed to create store directory {}", dir.display()))
        })?;
        Ok(Self {
            dir,
            options: StoreOptions::default(),
        })
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn inspect<T>(
        &self,
        key: &Key,
        timeout: Duration,
        f: impl FnOnce(Option<&StoredRecord>, u64) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let _lock = self.lock(key.namespace(), LockMode::Shared, timeout)?;
        let records = self.load(key.namespace())?;
        let now = unix_now()?;
        f(records.get(&record_id(key)), now)
    }

    fn mutate<T>(
        &self,
        key: &Key,
        timeout: Duration,
        f: impl FnOnce(Option<&StoredRecord>, u64) -> Result<(Change, T), Error>,
    ) -> Result<T, Error> {
        let _lock = self.lock(key.namespace(), LockMode::Exclusive, timeout)?;
        let mut records = self.load(key.namespace())?;
        let now = unix_now()?;
        let id = record_id(key);
        let (change, out) = f(records.get(&id), now)?;
        match change {
            Change::Unchanged => return Ok(out),
            Change::Replace(record) => {
                records.insert(id, record);
            }
            Change::Delete => {
                records.remove(&id);
            }
        }
        records.retain(|_, record| !record.is_expired(now));
        self.save(key.namespace(), records)?;
        Ok(out)
    }

    fn lock(&self, namespace: &str, mode: LockMode, timeout: Duration) -> Result<NamespaceLock, Error> {
        let path = namespace_lock_path(namespace, &self.dir).map_err(namespace_error)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| io_error(err, format!("failed to open lock {}", path.display())))?;

        let deadline = Instant::now() + timeout;
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => file.try_lock_exclusive(),
            };
            match attempt {
                Ok(()) => return Ok(NamespaceLock { file }),
                Err(err) if lock_error_status(&err) == StatusCode::Timeout => {
                    if Instant::now() >= deadline {
                        debug!(namespace, ?mode, "namespace lock wait timed out");
                        return Err(Error::store(StatusCode::Timeout)
                            .with_message(format!("timed out waiting for namespace {namespace}"))
                            .with_source(err));
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(err) => {
                    return Err(Error::store(lock_error_status(&err))
                        .with_message(format!("failed to lock {}", path.display()))
                        .with_source(err));
                }
            }
        }
    }

    fn load(&self, namespace: &str) -> Result<RecordMap, Error> {
        let path = resolve_namespace_path(namespace, &self.dir).map_err(namespace_error)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(RecordMap::new()),
            Err(err) => return Err(io_error(err, format!("failed to read {}", path.display()))),
        };
        let doc: NamespaceDoc = serde_json::from_slice(&bytes).map_err(|err| {
            Error::store(StatusCode::Server)
                .with_message(format!("namespace file {} is corrupt", path.display()))
                .with_source(err)
        })?;
        if doc.version != FORMAT_VERSION {
            return Err(Error::store(StatusCode::Server).with_message(format!(
                "unsupported namespace file version {}",
                doc.version
            )));
        }
        Ok(doc
            .records
            .into_iter()
            .map(|entry| ((entry.set, entry.key), entry.record))
            .collect())
    }

    fn save(&self, namespace: &str, records: RecordMap) -> Result<(), Error> {
        let path = resolve_namespace_path(namespace, &self.dir).map_err(namespace_error)?;
        let doc = NamespaceDoc {
            version: FORMAT_VERSION,
            records: records
                .into_iter()
                .map(|((set, key), record)| StoredEntry { set, key, record })
                .collect(),
        };
        let bytes = serde_json::to_vec(&doc).map_err(|err| {
            Error::store(StatusCode::Client)
                .with_message("failed to encode namespace file")
                .with_source(err)
        })?;

        let tmp_path = path.with_extension("json.tmp");
        let mut file = File::create(&tmp_path)
            .map_err(|err| io_error(err, format!("failed to create {}", tmp_path.display())))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|err| io_error(err, format!("failed to write {}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path)
            .map_err(|err| io_error(err, format!("failed to replace {}", path.display())))
    }
}

impl Store for FileStore {
    fn read(
        &self,
        key: &Key,
        bins: Option<&[String]>,
        policy: &ReadPolicy,
    ) -> Result<Record, Error> {
        self.inspect(key, policy.timeout, |existing, now| {
            apply::live(existing, now)
                .map(|record| record.select(bins, now))
                .ok_or_else(|| Error::store(StatusCode::RecordNotFound))
        })
    }

    fn operate(
        &self,
        key: &Key,
        ops: &Operations,
        policy: &OperatePolicy,
    ) -> Result<Record, Error> {
        let default_ttl = self.options.default_ttl;
        self.mutate(key, policy.timeout, |existing, now| {
            let applied = apply::apply_operations(existing, ops, now, default_ttl)?;
            Ok((applied.change, applied.result))
        })
    }

    fn put(&self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<(), Error> {
        let default_ttl = self.options.default_ttl;
        self.mutate(key, policy.timeout, |existing, now| {
            let change =
                apply::apply_put(existing, record, policy.generation, policy.ttl, now, default_ttl)?;
            Ok((change, ()))
        })
    }

    fn remove(&self, key: &Key, policy: &RemovePolicy) -> Result<(), Error> {
        self.mutate(key, policy.timeout, |existing, now| {
            let change = apply::apply_remove(existing, policy.generation, now)?;
            Ok((change, ()))
        })
    }

    fn exists(&self, key: &Key, policy: &ReadPolicy) -> Result<Metadata, Error> {
        self.inspect(key, policy.timeout, |existing, now| {
            apply::live(existing, now)
                .map(|record| record.metadata(now))
                .ok_or_else(|| Error::store(StatusCode::RecordNotFound))
        })
    }
}

struct NamespaceLock {
    file: File,
}

impl Drop for NamespaceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn record_id(key: &Key) -> (String, UserKey) {
    (key.set().to_string(), key.user_key().clone())
}

fn lock_error_status(err: &io::Error) -> StatusCode {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return StatusCode::Connection;
    }
    if err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
    {
        return StatusCode::Timeout;
    }
    StatusCode::Connection
}

fn io_error(err: io::Error, message: String) -> Error {
    Error::store(StatusCode::Connection)
        .with_message(message)
        .with_source(err)
}

fn namespace_error(err: NamespaceResolveError) -> Error {
    let message = match err {
        NamespaceResolveError::Empty => "namespace must not be empty",
        NamespaceResolveError::ContainsPathSeparator => {
            "namespace must not contain path separators"
        }
    };
    Error::new(ErrorKind::Param).with_message(message)
}
