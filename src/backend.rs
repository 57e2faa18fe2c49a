//! The pluggable logging backend contract and the two built-in backends.
//!
//! The middleware consumes a backend through exactly four verbs — start,
//! emit, stop, generate an id — plus one optional hint
//! ([`classify_exception`](Backend::classify_exception)). Everything a real
//! backend does beyond that (batching, retries, network transport, disk
//! rotation) is its own business and invisible here.
//!
//! The one hard rule: [`emit`](Backend::emit) runs on the request path and
//! must not wait on network or disk. Queue and return; flush in the
//! background; settle your debts in [`stop`](Backend::stop).

use std::io::Write;
use std::sync::Mutex;

use tracing::warn;
use uuid::Uuid;

use crate::classify::FailureInfo;
use crate::error::BoxError;
use crate::event::LogEvent;

// ── Contract ──────────────────────────────────────────────────────────────────

/// A destination for finalized log events.
///
/// One shared instance serves every in-flight request, so implementations
/// must be safe to call concurrently.
pub trait Backend: Send + Sync + 'static {
    /// Called once by the lifecycle coordinator before any user startup
    /// hook runs. A returned error aborts application startup.
    fn start(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once at shutdown, after the shutdown event was submitted.
    /// Must block until pending events are durably handled.
    fn stop(&self) {}

    /// Non-blocking submission of one finalized event.
    ///
    /// Delivery problems stay inside the backend: log them locally or drop
    /// the event, but never panic — the request path runs right above this.
    fn emit(&self, event: LogEvent);

    /// Produces a unique identifier, used for request correlation ids and
    /// for `server_id`.
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Optionally proposes an HTTP status for an unhandled failure the
    /// backend recognizes (resource exhaustion → 503, throttling → 429, …).
    /// `None` falls through to the 500 default.
    fn classify_exception(&self, _failure: &FailureInfo) -> Option<u16> {
        None
    }
}

// ── WriterBackend ─────────────────────────────────────────────────────────────

/// The default backend: one JSON line per event to a local sink.
///
/// Synchronous and unbuffered beyond what the sink itself buffers — fine
/// for development and for containers whose stdout is already a log pipe.
/// Anything with real latency belongs behind a queueing backend instead.
pub struct WriterBackend<W: Write + Send + 'static> {
    sink: Mutex<W>,
}

impl WriterBackend<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> WriterBackend<W> {
    pub fn new(sink: W) -> Self {
        Self { sink: Mutex::new(sink) }
    }
}

impl<W: Write + Send + 'static> Backend for WriterBackend<W> {
    fn emit(&self, event: LogEvent) {
        let line = event.to_json();
        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a previous writeln panicked; the sink
            // state is unknown, so drop the event rather than the request.
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(sink, "{line}") {
            warn!("access-log event dropped, sink write failed: {e}");
        }
    }

    fn stop(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.flush();
        }
    }
}

// ── MemoryBackend ─────────────────────────────────────────────────────────────

/// A backend that keeps every emitted event in memory.
///
/// Built for test suites — both this crate's and the host application's:
/// emit into it, then assert on [`events`](MemoryBackend::events).
#[derive(Default)]
pub struct MemoryBackend {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().expect("memory backend lock").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("memory backend lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Backend for MemoryBackend {
    fn emit(&self, event: LogEvent) {
        self.events.lock().expect("memory backend lock").push(event);
    }
}
