//! Purpose: Public entry points that compile, execute, and demarshal record operations.
//! Exports: `Client`, `ApiResult`.
//! Role: Stable boundary for the CLI, the C ABI, and embedders.
//! Invariants: Options, keys, and descriptors are fully validated before any store call.
//! Invariants: Each entry point issues one store request; increments may add one read.
#![allow(clippy::result_large_err)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value as Json};
use tracing::warn;

use crate::api::compile::compile;
use crate::api::context::CallContext;
use crate::api::demarshal::{RecordBins, demarshal_bins, demarshal_record};
use crate::api::descriptor::{OperationDescriptor, parse_operations, validate_bin_name};
use crate::api::execute::execute;
use crate::api::key::build_key;
use crate::api::options::CallOptions;
use crate::api::removal::compile_removal;
use crate::core::error::{Error, ErrorKind};
use crate::core::file::FileStore;
use crate::core::key::Key;
use crate::core::memory::{MemoryStore, StoreOptions};
use crate::core::policy::PolicyDefaults;
use crate::core::record::{Metadata, Record};
use crate::core::store::Store;
use crate::core::value::Value;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct Client {
    store: Arc<dyn Store>,
    defaults: PolicyDefaults,
}

impl Client {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            defaults: PolicyDefaults::new(),
        }
    }

    /// A client over a fresh in-process store.
    pub fn memory(options: StoreOptions) -> Self {
        Self::new(Arc::new(MemoryStore::with_options(options)))
    }

    /// A client over a directory-backed store shared between processes.
    pub fn open_dir(dir: impl Into<PathBuf>, options: StoreOptions) -> ApiResult<Self> {
        let store = FileStore::open(dir)?.with_options(options);
        Ok(Self::new(Arc::new(store)))
    }

    pub fn with_defaults(mut self, defaults: PolicyDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &PolicyDefaults {
        &self.defaults
    }

    fn context(&self, options: Option<&Json>) -> ApiResult<CallContext<'_>> {
        let options = CallOptions::from_json(options)?;
        Ok(CallContext::new(self.store.as_ref(), &self.defaults, options))
    }

    /// Applies `descriptors` atomically and returns the bins read by the batch.
    pub fn operate(
        &self,
        key: &Key,
        descriptors: Vec<OperationDescriptor>,
        options: Option<&Json>,
    ) -> ApiResult<Map<String, Json>> {
        let ctx = self.context(options)?;
        if descriptors.is_empty() {
            return Err(Error::new(ErrorKind::Param).with_message("operations must not be empty"));
        }
        let ops = compile(&ctx, key, descriptors)?;
        let record = execute(&ctx, key, &ops)?;
        demarshal_bins(&record)
    }

    /// `operate` with the key and operation list given as caller JSON.
    pub fn operate_json(
        &self,
        key: &Json,
        operations: &Json,
        options: Option<&Json>,
    ) -> ApiResult<Map<String, Json>> {
        let key = build_key(key)?;
        let descriptors = parse_operations(operations)?;
        self.operate(&key, descriptors, options)
    }

    pub fn append(&self, key: &Key, bin: &str, text: &str, options: Option<&Json>) -> ApiResult<()> {
        let descriptor = OperationDescriptor::append(bin, text)?;
        self.operate(key, vec![descriptor], options).map(drop)
    }

    pub fn prepend(&self, key: &Key, bin: &str, text: &str, options: Option<&Json>) -> ApiResult<()> {
        let descriptor = OperationDescriptor::prepend(bin, text)?;
        self.operate(key, vec![descriptor], options).map(drop)
    }

    /// Adds `offset` to `bin`, or writes `initial_value` when the bin has no value.
    ///
    /// The existence check and the write are separate requests; a concurrent
    /// writer between them can lose an update.
    pub fn increment(
        &self,
        key: &Key,
        bin: &str,
        offset: i64,
        initial_value: i64,
        options: Option<&Json>,
    ) -> ApiResult<()> {
        let descriptor = OperationDescriptor::increment(bin, offset, initial_value)?;
        self.operate(key, vec![descriptor], options).map(drop)
    }

    pub fn touch(&self, key: &Key, ttl: u32, options: Option<&Json>) -> ApiResult<()> {
        self.operate(key, vec![OperationDescriptor::touch(ttl)], options)
            .map(drop)
    }

    pub fn exists(&self, key: &Key, options: Option<&Json>) -> ApiResult<Metadata> {
        let ctx = self.context(options)?;
        self.store.exists(key, &ctx.read_policy()).inspect_err(|err| {
            if !err.is_not_found() {
                warn!(key = %key, code = err.code(), error = %err, "exists failed");
            }
        })
    }

    pub fn get_metadata(&self, key: &Key, options: Option<&Json>) -> ApiResult<Metadata> {
        self.exists(key, options)
    }

    pub fn remove(&self, key: &Key, options: Option<&Json>) -> ApiResult<()> {
        let ctx = self.context(options)?;
        self.store.remove(key, &ctx.remove_policy()).inspect_err(|err| {
            warn!(key = %key, code = err.code(), error = %err, "remove failed");
        })
    }

    /// Removes exactly the listed bins with one write under the default write policy.
    pub fn remove_bins(&self, key: &Key, bins: &[String], options: Option<&Json>) -> ApiResult<()> {
        let ctx = self.context(options)?;
        let record = compile_removal(bins)?;
        self.store
            .put(key, &record, &ctx.default_write_policy())
            .inspect_err(|err| {
                warn!(key = %key, code = err.code(), error = %err, "remove_bins failed");
            })
    }

    /// Reads the record, restricted to `bins` when given.
    pub fn get(&self, key: &Key, bins: Option<&[String]>, options: Option<&Json>) -> ApiResult<RecordBins> {
        let ctx = self.context(options)?;
        if let Some(bins) = bins {
            for bin in bins {
                validate_bin_name(bin)?;
            }
        }
        let record = self
            .store
            .read(key, bins, &ctx.read_policy())
            .inspect_err(|err| {
                if !err.is_not_found() {
                    warn!(key = %key, code = err.code(), error = %err, "read failed");
                }
            })?;
        demarshal_record(&record)
    }

    /// Writes `bins`; a null value removes that bin.
    pub fn put(&self, key: &Key, bins: &Map<String, Json>, options: Option<&Json>) -> ApiResult<()> {
        let ctx = self.context(options)?;
        if bins.is_empty() {
            return Err(Error::new(ErrorKind::Param).with_message("bins must not be empty"));
        }
        let mut record = Record::with_capacity(bins.len());
        for (name, value) in bins {
            validate_bin_name(name)?;
            let value = Value::from_json(value).map_err(|err| err.with_bin(name.clone()))?;
            record.set(name.clone(), value);
        }
        self.store
            .put(key, &record, &ctx.write_policy())
            .inspect_err(|err| {
                warn!(key = %key, code = err.code(), error = %err, "put failed");
            })
    }
}
