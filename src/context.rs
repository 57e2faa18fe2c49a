//! Ambient per-request access to the active log event.
//!
//! The middleware binds each request's [`LogEvent`] to the task handling it
//! via `tokio::task_local!`. Handler code — however deep in the call stack —
//! can then add fields without threading anything through its signatures:
//!
//! ```rust
//! use jhalog::context;
//!
//! async fn charge_card() {
//!     // Ignore the error if the handler may also run outside the
//!     // middleware (tests, CLI entry points).
//!     let _ = context::set("payment_provider", "stripe");
//!     let _ = context::append_to("queries", "SELECT balance");
//! }
//! ```
//!
//! The binding is task-exclusive: concurrent requests each see only their
//! own event, and no lock is ever taken. It lives exactly as long as the
//! interceptor's invocation — once the response is produced the event is
//! detached and the accessors fail with [`Error::NoActiveContext`] again.

use std::cell::RefCell;
use std::future::Future;

use serde_json::Value;

use crate::error::Error;
use crate::event::LogEvent;

tokio::task_local! {
    /// The event bound to the task currently handling a request.
    ///
    /// `RefCell`, not a mutex: the value is task-local, so borrows never
    /// cross a thread and never contend. Borrows are confined to the
    /// closures below and never held across an await point.
    static ACTIVE: RefCell<LogEvent>;
}

/// Runs `fut` with `event` bound as the task's active log event and hands
/// the (possibly mutated) event back alongside the future's output.
pub(crate) async fn scope<F>(event: LogEvent, fut: F) -> (LogEvent, F::Output)
where
    F: Future,
{
    ACTIVE
        .scope(RefCell::new(event), async move {
            let out = fut.await;
            // The future has finished; nothing else can touch the cell.
            let event = ACTIVE.with(|cell| cell.take());
            (event, out)
        })
        .await
}

/// Runs `f` against the active event.
///
/// # Errors
///
/// [`Error::NoActiveContext`] if the current task is not handling an
/// intercepted request.
pub fn with<R>(f: impl FnOnce(&mut LogEvent) -> R) -> Result<R, Error> {
    ACTIVE
        .try_with(|cell| f(&mut cell.borrow_mut()))
        .map_err(|_| Error::NoActiveContext)
}

/// Sets a field on the active event, replacing any previous value.
pub fn set(name: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
    let (name, value) = (name.into(), value.into());
    with(|ev| ev.insert(name, value))
}

/// Reads a field from the active event. `Ok(None)` means the context is
/// bound but the field has not been set.
pub fn get(name: &str) -> Result<Option<Value>, Error> {
    with(|ev| ev.get(name).cloned())
}

/// Appends a value to a list-valued field on the active event, creating
/// the list on first use.
pub fn append_to(name: &str, value: impl Into<Value>) -> Result<(), Error> {
    let value = value.into();
    with(|ev| ev.append(name, value))
}
