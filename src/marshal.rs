#![forbid(unsafe_code)]
//! Turns finished descriptors into host-visible results.
//!
//! Output buffers are moved into `Bytes` without copying; once a result is
//! built the descriptor is gone and holds nothing.

use crate::control;
use crate::error::{ErrorCode, HostError};
use crate::value::Value;
use crate::work::{Output, Work};
use bytes::Bytes;

/// Result of a successful diff, with the control stream in canonical order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiffOutput {
    pub control: Bytes,
    pub diff: Bytes,
    pub extra: Bytes,
}

/// Consumes a finished diff descriptor.
pub fn settle_diff(work: Work) -> Result<DiffOutput, HostError> {
    match work.into_outcome() {
        Ok(Output::Diff(delta)) => Ok(DiffOutput {
            control: control::encode(delta.control),
            diff: Bytes::from(delta.diff),
            extra: Bytes::from(delta.extra),
        }),
        Ok(Output::Patch(_)) => Err(HostError::from(ErrorCode::Internal)),
        Err(code) => Err(HostError::from(code)),
    }
}

/// Consumes a finished patch descriptor.
pub fn settle_patch(work: Work) -> Result<Bytes, HostError> {
    match work.into_outcome() {
        Ok(Output::Patch(current)) => Ok(Bytes::from(current)),
        Ok(Output::Diff(_)) => Err(HostError::from(ErrorCode::Internal)),
        Err(code) => Err(HostError::from(code)),
    }
}

/// Callback arguments for a diff: `(null, control, diff, extra)` or
/// `(error)`.
pub fn diff_arguments(result: Result<DiffOutput, HostError>) -> Vec<Value> {
    match result {
        Ok(DiffOutput {
            control,
            diff,
            extra,
        }) => vec![
            Value::Null,
            Value::Buffer(control),
            Value::Buffer(diff),
            Value::Buffer(extra),
        ],
        Err(e) => vec![Value::Error(e)],
    }
}

/// Callback arguments for a patch: `(null, current)` or `(error)`.
pub fn patch_arguments(result: Result<Bytes, HostError>) -> Vec<Value> {
    match result {
        Ok(current) => vec![Value::Null, Value::Buffer(current)],
        Err(e) => vec![Value::Error(e)],
    }
}
