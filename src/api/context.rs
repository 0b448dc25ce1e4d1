// Call-scoped context threaded through compile, resolve, and execute.
use crate::api::options::CallOptions;
use crate::core::policy::{OperatePolicy, PolicyDefaults, ReadPolicy, RemovePolicy, WritePolicy};
use crate::core::store::Store;

/// Everything one entry point needs; dropped when the call returns.
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    store: &'a dyn Store,
    defaults: &'a PolicyDefaults,
    options: CallOptions,
}

impl<'a> CallContext<'a> {
    pub fn new(store: &'a dyn Store, defaults: &'a PolicyDefaults, options: CallOptions) -> Self {
        Self {
            store,
            defaults,
            options,
        }
    }

    pub fn store(&self) -> &'a dyn Store {
        self.store
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.options.read_policy(self.defaults)
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.options.write_policy(self.defaults)
    }

    pub fn operate_policy(&self) -> OperatePolicy {
        self.options.operate_policy(self.defaults)
    }

    pub fn remove_policy(&self) -> RemovePolicy {
        self.options.remove_policy(self.defaults)
    }

    /// The client's default write policy carrying only the call's generation.
    pub fn default_write_policy(&self) -> WritePolicy {
        let mut policy = self.defaults.write_policy();
        policy.generation = self.options.generation();
        policy
    }
}
