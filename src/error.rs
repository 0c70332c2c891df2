#![forbid(unsafe_code)]
use std::fmt;
use thiserror::Error;

/// Failure code of a background computation.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorCode {
    /// The patch and reference do not fit together.
    #[error("Corrupt data")]
    CorruptData,

    /// Anything else that went wrong while computing.
    #[error("Internal error")]
    Internal,
}

/// Errors raised synchronously on the caller thread.
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong arity or argument types; nothing was scheduled.
    #[error("Invalid arguments")]
    InvalidArguments,

    /// The worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// A computation finished with an error delivered to its callback.
    #[error("{}", .0.message())]
    Callback(#[from] HostError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Render as the error a host caller would see thrown.
    pub fn to_host(&self) -> HostError {
        match self {
            Error::InvalidArguments => HostError::type_error(self.to_string()),
            Error::Callback(e) => e.clone(),
            _ => HostError::error(self.to_string()),
        }
    }
}

/// Class of a host-visible error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HostErrorKind {
    Error,
    TypeError,
}

/// Error value handed to host callbacks or thrown at the call site.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HostError {
    kind: HostErrorKind,
    message: String,
}

impl HostError {
    /// Create a plain error.
    pub fn error<S: Into<String>>(message: S) -> Self {
        HostError {
            kind: HostErrorKind::Error,
            message: message.into(),
        }
    }

    /// Create a type error.
    pub fn type_error<S: Into<String>>(message: S) -> Self {
        HostError {
            kind: HostErrorKind::TypeError,
            message: message.into(),
        }
    }

    /// Class of the error.
    pub fn kind(&self) -> HostErrorKind {
        self.kind
    }

    /// Message without the class prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            HostErrorKind::Error => write!(f, "Error: {}", self.message),
            HostErrorKind::TypeError => write!(f, "TypeError: {}", self.message),
        }
    }
}

impl std::error::Error for HostError {}

/// Translates a computation failure into the error delivered to callbacks.
impl From<ErrorCode> for HostError {
    fn from(code: ErrorCode) -> Self {
        HostError::error(code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_codes() {
        let corrupt = HostError::from(ErrorCode::CorruptData);
        assert_eq!(corrupt.kind(), HostErrorKind::Error);
        assert_eq!(corrupt.message(), "Corrupt data");

        let internal = HostError::from(ErrorCode::Internal);
        assert_eq!(internal.message(), "Internal error");
    }

    #[test]
    fn invalid_arguments_is_type_error() {
        let e = Error::InvalidArguments.to_host();
        assert_eq!(e.kind(), HostErrorKind::TypeError);
        assert_eq!(e.to_string(), "TypeError: Invalid arguments");
    }

    #[test]
    fn callback_errors_keep_their_message() {
        let e = Error::from(HostError::from(ErrorCode::CorruptData));
        assert_eq!(e.to_string(), "Corrupt data");
        assert_eq!(e.to_host(), HostError::from(ErrorCode::CorruptData));
    }
}
