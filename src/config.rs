//! Middleware configuration.
//!
//! Options are set through chained methods and validated once, inside
//! [`Jhalog::new`](crate::Jhalog::new) — a bad ignore pattern is a
//! construction-time error, never a surprise on the first request.
//!
//! ```rust
//! use std::time::Duration;
//! use jhalog::Config;
//!
//! let config = Config::new()
//!     .request_timeout(Duration::from_secs(30))
//!     .ignore_paths(["/healthz", "/readyz"])
//!     .server_version(env!("CARGO_PKG_VERSION"));
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, WriterBackend};

/// Recognized middleware options.
pub struct Config {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) forward_request_id: bool,
    pub(crate) ignore_paths: Vec<String>,
    pub(crate) ip_addresses_allowed: bool,
    pub(crate) trust_proxy: bool,
    pub(crate) request_timeout: Duration,
    pub(crate) server_version: String,
}

impl Config {
    /// The defaults: stdout backend, forwarded request ids honored, no
    /// ignored paths, no IP collection, proxy headers trusted, 50 s
    /// request timeout, empty server version.
    pub fn new() -> Self {
        Self {
            backend: Arc::new(WriterBackend::stdout()),
            forward_request_id: true,
            ignore_paths: Vec::new(),
            ip_addresses_allowed: false,
            trust_proxy: true,
            request_timeout: Duration::from_secs(50),
            server_version: String::new(),
        }
    }

    /// Replaces the default stdout backend.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    /// Whether an inbound `x-request-id` header is reused as the event id.
    /// Default `true`. Disable when clients cannot be trusted to send
    /// unique values.
    pub fn forward_request_id(mut self, forward: bool) -> Self {
        self.forward_request_id = forward;
        self
    }

    /// Paths to exclude from logging entirely — the handler runs, no event
    /// is emitted, no header is added. Patterns use `matchit` syntax, the
    /// same as a router: `/healthz`, `/users/{id}`, `/static/{*rest}`.
    pub fn ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Whether events may carry a `client_ip` field. Default `false`:
    /// collecting addresses is a privacy decision the deployment must make
    /// explicitly.
    pub fn ip_addresses_allowed(mut self, allowed: bool) -> Self {
        self.ip_addresses_allowed = allowed;
        self
    }

    /// Whether `x-forwarded-for` is believed when resolving the client
    /// address. Default `true` — this crate assumes a front-end proxy.
    /// Set `false` if the service is directly exposed, in which case the
    /// peer address from the request extensions is used instead.
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    /// Deadline for the wrapped handler. Default 50 s.
    /// `Duration::ZERO` disables the timeout entirely.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Value of the `server_version` field on lifecycle events.
    /// Default empty, which omits the field.
    pub fn server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = version.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
