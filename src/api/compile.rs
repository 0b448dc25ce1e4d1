//! Purpose: Fold validated descriptors into one ordered store operation list.
//! Exports: `compile`.
//! Role: Batch compiler between the descriptor parser and the executor.
//! Invariants: Sequential and fail-fast; no partial list ever reaches the store.
//! Invariants: Generation comes from the call options; ttl from `Touch`, else the options.
use tracing::debug;

use crate::api::context::CallContext;
use crate::api::descriptor::OperationDescriptor;
use crate::api::increment::resolve_increment;
use crate::core::error::Error;
use crate::core::key::Key;
use crate::core::ops::{Operation, Operations};

pub fn compile(
    ctx: &CallContext<'_>,
    key: &Key,
    descriptors: Vec<OperationDescriptor>,
) -> Result<Operations, Error> {
    let mut ops = Operations::with_capacity(descriptors.len());
    ops.generation = ctx.options().generation();
    ops.ttl = ctx.options().ttl;

    for descriptor in descriptors {
        let op = match descriptor {
            OperationDescriptor::Append { bin, text } => Operation::Append { bin, text },
            OperationDescriptor::Prepend { bin, text } => Operation::Prepend { bin, text },
            OperationDescriptor::Increment {
                bin,
                offset,
                initial_value,
            } => resolve_increment(ctx, key, &bin, offset, initial_value)?.into_operation(),
            OperationDescriptor::Touch { ttl } => {
                ops.ttl = Some(ttl.or(ctx.options().ttl).unwrap_or(0));
                Operation::Touch
            }
            OperationDescriptor::Read { bin } => Operation::Read { bin },
            OperationDescriptor::Write { bin, value } => Operation::Write { bin, value },
        };
        ops.push(op);
    }

    debug!(
        key = %key,
        ops = ops.len(),
        generation = ?ops.generation,
        ttl = ?ops.ttl,
        "compiled operation batch"
    );
    Ok(ops)
}
