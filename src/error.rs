//! Unified error type.
//!
//! Request-path problems (timeouts, panicking handlers, a backend that
//! cannot accept an event) are never surfaced here — they are converted to
//! HTTP responses and log events so the client always gets an answer. This
//! type covers the failures the host application must act on: bad
//! configuration, a backend that failed to start, and lifecycle misuse.

use std::fmt;

/// Boxed error type backends report from [`start`](crate::Backend::start).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by jhalog's fallible operations.
#[derive(Debug)]
pub enum Error {
    /// A context accessor was called outside an intercepted request.
    NoActiveContext,
    /// Rejected middleware options, caught at construction time.
    InvalidConfig(String),
    /// The backend failed to start. Fatal: startup must abort.
    BackendStart(BoxError),
    /// Startup or shutdown was invoked in the wrong state.
    Lifecycle { expected: &'static str, actual: &'static str },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveContext => {
                write!(f, "no active request context on this task")
            }
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            Self::BackendStart(e) => write!(f, "logging backend failed to start: {e}"),
            Self::Lifecycle { expected, actual } => {
                write!(f, "lifecycle state is {actual}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BackendStart(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
