// Command executor: one atomic operate request per compiled batch.
use tracing::{debug, warn};

use crate::api::context::CallContext;
use crate::core::error::Error;
use crate::core::key::Key;
use crate::core::ops::Operations;
use crate::core::record::Record;

/// Issues `ops` as a single request; only read operations populate the result.
pub fn execute(ctx: &CallContext<'_>, key: &Key, ops: &Operations) -> Result<Record, Error> {
    let policy = ctx.operate_policy();
    debug!(key = %key, ops = ops.len(), timeout_ms = policy.timeout.as_millis() as u64, "operate");
    ctx.store().operate(key, ops, &policy).inspect_err(|err| {
        warn!(key = %key, code = err.code(), error = %err, "operate failed");
    })
}
