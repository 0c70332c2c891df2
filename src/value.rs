#![forbid(unsafe_code)]
use crate::error::HostError;
use bytes::Bytes;
use std::fmt;
use std::rc::Rc;

/// Dynamically typed value passed between the host and this crate.
#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Buffer(Bytes),
    Error(HostError),
    Function(Function),
}

impl Value {
    /// Name of the value type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Buffer(_) => "buffer",
            Value::Error(_) => "error",
            Value::Function(_) => "function",
        }
    }

    /// True for `null`, the success marker in callback arguments.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The buffer, if this is one.
    pub fn as_buffer(&self) -> Option<&Bytes> {
        match self {
            Value::Buffer(b) => Some(b),
            _ => None,
        }
    }

    /// The error, if this is one.
    pub fn as_error(&self) -> Option<&HostError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// The callable, if this is one.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Buffer(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Buffer(Bytes::from(v))
    }
}

impl From<&'static [u8]> for Value {
    fn from(s: &'static [u8]) -> Self {
        Value::Buffer(Bytes::from_static(s))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<HostError> for Value {
    fn from(e: HostError) -> Self {
        Value::Error(e)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

/// Host callable, bound to the caller thread.
///
/// Returning `Err` is how a host function throws.
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&[Value]) -> Result<(), HostError>>);

impl Function {
    /// Wrap a closure as a host callable.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), HostError> + 'static,
    {
        Function(Rc::new(f))
    }

    /// Invoke with the given arguments.
    pub fn call(&self, args: &[Value]) -> Result<(), HostError> {
        (self.0)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

/// Converts a host number the way an unsigned 32-bit argument is read.
///
/// Non-finite values become zero, everything else is truncated and wrapped
/// modulo 2^32.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}
