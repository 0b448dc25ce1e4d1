//! Purpose: Shared library crate behind the `recops` CLI, the C ABI, and tests.
//! Exports: `api` (operation compiler, client), `core` (records, stores, errors).
//! Role: Compiles caller operation lists into atomic store batches and demarshals results.
//! Invariants: Bindings reach store primitives only through `api`.
//! Invariants: No process-wide mutable state; every call carries its own context.
pub mod abi;
pub mod api;
pub mod core;
pub mod store_paths;
