use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Canonical code attached to every [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The caller supplied an input that cannot be processed.
    InvalidArgument,
}

impl ErrorCode {
    /// Returns the canonical upper-case name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
        }
    }
}

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// Indicates that an input was rejected, either by this library or by the
    /// underlying homomorphic encryption library. The message is the original
    /// diagnostic.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Returns the canonical code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }

    /// Returns the diagnostic message, without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::InvalidArgument(message) => message,
        }
    }
}

impl From<fhe::Error> for Error {
    fn from(e: fhe::Error) -> Self {
        Error::InvalidArgument(e.to_string())
    }
}

/// Runs a fallible call into the homomorphic encryption library.
///
/// The library reports most failures through its own error type but guards
/// some preconditions (e.g. operands built under different parameters) with
/// assertions. Both are surfaced as [`Error::InvalidArgument`].
///
/// The panic hook is left untouched, so a caught assertion is still reported
/// on stderr. Callers check what the public API allows (see
/// [`Evaluator`](crate::Evaluator)) before reaching such an assertion.
pub(crate) fn backend<T, E, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: Into<Error>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(Into::into),
        Err(payload) => Err(Error::InvalidArgument(panic_message(payload.as_ref()))),
    }
}

/// Same as [`backend`] for calls that only fail through assertions.
pub(crate) fn backend_infallible<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    backend(|| Ok::<T, Error>(f()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "the homomorphic encryption library rejected the operation".to_string()
    }
}
