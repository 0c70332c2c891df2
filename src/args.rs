#![forbid(unsafe_code)]
//! Synchronous argument checks for the host-facing calls.
//!
//! Parsing either yields typed handles or fails before anything is
//! allocated or scheduled.

use crate::error::Error;
use crate::value::{to_uint32, Function, Value};
use bytes::Bytes;
use tracing::debug;

/// Arguments of `diff(current, reference, callback)`.
#[derive(Debug, Clone)]
pub struct DiffArgs {
    pub current: Bytes,
    pub reference: Bytes,
    pub callback: Function,
}

impl DiffArgs {
    /// Checks arity and types of a `diff` call.
    pub fn parse(args: &[Value]) -> Result<Self, Error> {
        match args {
            [Value::Buffer(current), Value::Buffer(reference), Value::Function(callback)] => {
                Ok(DiffArgs {
                    current: current.clone(),
                    reference: reference.clone(),
                    callback: callback.clone(),
                })
            }
            _ => Err(reject("diff", args)),
        }
    }
}

/// Arguments of `patch(current_length, reference, control, diff, extra, callback)`.
#[derive(Debug, Clone)]
pub struct PatchArgs {
    pub current_length: u32,
    pub reference: Bytes,
    pub control: Bytes,
    pub diff: Bytes,
    pub extra: Bytes,
    pub callback: Function,
}

impl PatchArgs {
    /// Checks arity and types of a `patch` call; the length reads as uint32.
    pub fn parse(args: &[Value]) -> Result<Self, Error> {
        match args {
            [Value::Number(length), Value::Buffer(reference), Value::Buffer(control), Value::Buffer(diff), Value::Buffer(extra), Value::Function(callback)] => {
                Ok(PatchArgs {
                    current_length: to_uint32(*length),
                    reference: reference.clone(),
                    control: control.clone(),
                    diff: diff.clone(),
                    extra: extra.clone(),
                    callback: callback.clone(),
                })
            }
            _ => Err(reject("patch", args)),
        }
    }
}

fn reject(call: &str, args: &[Value]) -> Error {
    let types: Vec<&str> = args.iter().map(Value::type_name).collect();
    debug!(call, ?types, "invalid arguments");
    Error::InvalidArguments
}
