//! Request outcomes and the severity/status classifier.
//!
//! The classifier is a pure function from an [`Outcome`] to the
//! `(status_code, level)` pair that lands on the access event. No I/O, no
//! retries, no surprises — the one extensibility point is the backend's
//! [`classify_exception`](crate::Backend::classify_exception) proposal for
//! unhandled failures, and its precedence is fixed here:
//!
//! - `Completed` never consults the backend; the response status stands.
//! - `TimedOut` is hardwired to 504 and never delegated.
//! - `Failed` takes the backend's proposed status if it makes one,
//!   otherwise 500. The level is `critical` either way.

use std::any::Any;

use crate::backend::Backend;
use crate::event::Level;
use crate::handler::Response;

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Terminal state of one intercepted request.
///
/// Produced exactly once per request by the timeout guard, consumed exactly
/// once by the classifier.
pub(crate) enum Outcome {
    /// The handler returned a response before the deadline.
    Completed(Response),
    /// The deadline fired first; the handler future was dropped.
    TimedOut,
    /// The handler panicked.
    Failed(FailureInfo),
}

/// What we know about an unhandled handler failure.
///
/// Rust unwinding does not carry a backtrace across `catch_unwind`, so this
/// is the panic payload's message — the part of "message plus stack trace"
/// the language lets us recover. It goes into the `error_detail` log field
/// and is never written into the HTTP response body.
#[derive(Debug, Clone)]
pub struct FailureInfo {
    message: String,
}

impl FailureInfo {
    /// Extracts a printable message from a caught panic payload.
    ///
    /// `panic!("…")` yields `&'static str`; `panic!("{x}")` and
    /// `String::from` payloads yield `String`. Anything else (a typed
    /// payload from `panic_any`) has no message we can recover.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked with a non-string payload".to_owned()
        };
        Self { message }
    }

    #[cfg(test)]
    pub(crate) fn from_message(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// The failure's message, as recovered from the panic payload.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ── Classifier ────────────────────────────────────────────────────────────────

/// Maps an outcome to the `(status_code, level)` pair logged on the event.
pub(crate) fn classify(outcome: &Outcome, backend: &dyn Backend) -> (u16, Level) {
    match outcome {
        Outcome::Completed(resp) => {
            let code = resp.status().as_u16();
            (code, level_for_status(code))
        }
        // An operational condition, not a programming fault: `error`, not
        // `critical`.
        Outcome::TimedOut => (504, Level::Error),
        Outcome::Failed(info) => {
            let code = backend.classify_exception(info).unwrap_or(500);
            (code, Level::Critical)
        }
    }
}

/// Severity for a normal, non-exception completion.
fn level_for_status(code: u16) -> Level {
    match code {
        0..=399 => Level::Info,
        400..=499 => Level::Warning,
        _ => Level::Error,
    }
}
