//! Purpose: Define the public Rust API boundary for record operations.
//! Exports: The client, descriptor parsing, policy resolution, and core value types.
//! Role: Public, additive-only surface; hides store internals behind `Store`.
//! Invariants: Bindings and the CLI reach stores only through this module.
//! Invariants: Compilation stages stay individually reachable for testing.

mod client;
mod compile;
mod context;
mod demarshal;
mod descriptor;
mod execute;
mod increment;
mod key;
mod options;
mod removal;

pub use crate::core::error::{Error, ErrorKind, StatusCode, to_exit_code};
pub use crate::core::file::FileStore;
pub use crate::core::key::{Key, UserKey};
pub use crate::core::memory::{MemoryStore, StoreOptions};
pub use crate::core::ops::{Operation, Operations};
pub use crate::core::policy::{
    CommitLevel, Consistency, DEFAULT_TIMEOUT, Generation, OperatePolicy, PolicyDefaults,
    ReadPolicy, RemovePolicy, WritePolicy,
};
pub use crate::core::record::{Metadata, Record};
pub use crate::core::store::Store;
pub use crate::core::value::Value;
pub use client::{ApiResult, Client};
pub use compile::compile;
pub use context::CallContext;
pub use demarshal::{RecordBins, demarshal_bins, demarshal_record, metadata_json};
pub use descriptor::{
    MAX_BIN_NAME_LEN, OpCode, OperationDescriptor, parse_entry, parse_operations,
    validate_bin_name,
};
pub use execute::execute;
pub use increment::{IncrementDecision, IncrementState, resolve_increment};
pub use key::build_key;
pub use options::CallOptions;
pub use removal::{compile_removal, parse_bin_names};
