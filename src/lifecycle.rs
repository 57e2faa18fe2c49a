//! The lifecycle coordinator: backend lifecycle strictly brackets user
//! lifecycle.
//!
//! Rather than relying on hook-registration order in the host framework —
//! caller discipline that silently breaks when someone reorders `main` —
//! the ordering contract is enforced here: [`Jhalog::startup`] and
//! [`Jhalog::shutdown`] *take* the user's hook and bracket it.
//!
//! ```text
//! startup:   backend.start() → user hook → emit "startup" event
//! shutdown:  user hook → emit "shutdown" event → backend.stop()
//! ```
//!
//! So the backend is alive before any user startup code runs, the startup
//! event timestamps strictly after user startup completes, the shutdown
//! event is in the queue before the backend flushes, and `stop()` blocks
//! until that flush is done — no events are lost on process exit.
//!
//! Run both calls sequentially with respect to request traffic: start
//! serving after `startup` returns, stop accepting before `shutdown`.

use std::future::Future;

use chrono::{SecondsFormat, Utc};

use crate::error::Error;
use crate::event::{Level, LogEvent, field};
use crate::middleware::Jhalog;

/// Coordinator states, in order of traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Uninitialized,
    BackendStarted,
    Ready,
    ShuttingDown,
    BackendStopped,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            Self::Uninitialized  => "uninitialized",
            Self::BackendStarted => "backend-started",
            Self::Ready          => "ready",
            Self::ShuttingDown   => "shutting-down",
            Self::BackendStopped => "backend-stopped",
        }
    }
}

impl Jhalog {
    /// Starts the backend, runs the user's startup hook, then emits the
    /// `startup` event.
    ///
    /// # Errors
    ///
    /// [`Error::BackendStart`] if the backend fails to start — fatal, abort
    /// application startup. [`Error::Lifecycle`] if called more than once.
    pub async fn startup<F, Fut>(&self, user_hook: F) -> Result<(), Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        {
            let mut state = self.shared.state();
            if *state != State::Uninitialized {
                return Err(Error::Lifecycle {
                    expected: State::Uninitialized.name(),
                    actual: state.name(),
                });
            }
            self.shared.backend.start().map_err(Error::BackendStart)?;
            let _ = self.shared.server_id.set(self.shared.backend.generate_id());
            *state = State::BackendStarted;
        }

        user_hook().await;

        let mut event = self.lifecycle_event("startup");
        if let Some(uptime) = os_uptime_secs() {
            event.insert(field::OS_UPTIME, uptime);
        }
        self.shared.emit(event);

        *self.shared.state() = State::Ready;
        Ok(())
    }

    /// Runs the user's shutdown hook, emits the `shutdown` event, then
    /// stops the backend — blocking until pending events are flushed.
    ///
    /// # Errors
    ///
    /// [`Error::Lifecycle`] unless a successful [`startup`](Self::startup)
    /// came first.
    pub async fn shutdown<F, Fut>(&self, user_hook: F) -> Result<(), Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        {
            let state = self.shared.state();
            if *state != State::Ready {
                return Err(Error::Lifecycle {
                    expected: State::Ready.name(),
                    actual: state.name(),
                });
            }
        }

        user_hook().await;

        self.shared.emit(self.lifecycle_event("shutdown"));
        *self.shared.state() = State::ShuttingDown;

        self.shared.backend.stop();
        *self.shared.state() = State::BackendStopped;
        Ok(())
    }

    /// Common shape of the `startup`/`shutdown` events.
    fn lifecycle_event(&self, kind: &str) -> LogEvent {
        let mut event = LogEvent::new();
        event.insert(field::ID, self.shared.backend.generate_id());
        event.insert(field::TYPE, kind);
        event.insert(
            field::DATE,
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        );
        event.insert(field::LEVEL, Level::Info.as_str());
        if let Some(server_id) = self.shared.server_id.get() {
            event.insert(field::SERVER_ID, server_id.as_str());
        }
        if !self.shared.server_version.is_empty() {
            event.insert(field::SERVER_VERSION, self.shared.server_version.as_str());
        }
        event.insert(
            field::SERVER_UPTIME,
            self.shared.constructed.elapsed().as_secs_f64(),
        );
        event
    }
}

/// Seconds since OS boot, where the platform exposes it.
fn os_uptime_secs() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let uptime = std::fs::read_to_string("/proc/uptime").ok()?;
        uptime.split_whitespace().next()?.parse().ok()
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
