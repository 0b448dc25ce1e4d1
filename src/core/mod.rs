// Core modules implementing record semantics, store transports, and error modeling.
pub mod apply;
pub mod error;
pub mod file;
pub mod key;
pub mod memory;
pub mod ops;
pub mod policy;
pub mod record;
pub mod store;
pub mod value;
