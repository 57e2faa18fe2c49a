//! The request interceptor — the per-request entry point.
//!
//! [`Jhalog::wrap`] turns the application's handler into a [`Wrapped`]
//! handler that, per request: binds a fresh [`LogEvent`] to the task, runs
//! the handler under the timeout guard, classifies the outcome, stamps the
//! correlation header on the response, and hands the finalized event to the
//! backend. Requests matching an ignored path bypass all of it.
//!
//! The error policy on this path is absolute: the client always gets a
//! response. Timeouts become 504, panics become their classified status
//! with a generic body, and a backend that cannot take the event costs a
//! log line, never the response.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http::header::{HeaderValue, USER_AGENT};
use http_body_util::Full;
use tracing::error;

use crate::backend::Backend;
use crate::classify::{Outcome, classify};
use crate::config::Config;
use crate::context;
use crate::error::Error;
use crate::event::{LogEvent, field};
use crate::handler::{BoxedHandler, Handler, Response};
use crate::lifecycle::State;
use crate::timeout;

/// Correlation header, read from the request and set on every non-ignored
/// response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header consulted for the client address when a front-end proxy is
/// trusted and `ip_addresses_allowed` is on.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// ── Jhalog ────────────────────────────────────────────────────────────────────

/// The middleware: request interceptor plus lifecycle coordinator.
///
/// Build one per application, [`wrap`](Self::wrap) the handler with it, and
/// bracket the host's own startup/shutdown work with
/// [`startup`](Self::startup) / [`shutdown`](Self::shutdown). Clones share
/// state, so keeping one clone for lifecycle calls while the wrapped
/// handler serves traffic is the intended shape.
#[derive(Clone)]
pub struct Jhalog {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for Jhalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jhalog").finish_non_exhaustive()
    }
}

pub(crate) struct Shared {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) forward_request_id: bool,
    pub(crate) ip_addresses_allowed: bool,
    pub(crate) trust_proxy: bool,
    pub(crate) request_timeout: std::time::Duration,
    pub(crate) server_version: String,
    /// Radix tree over the ignore patterns; only hit/miss matters.
    ignore: matchit::Router<()>,
    pub(crate) state: Mutex<State>,
    pub(crate) server_id: OnceLock<String>,
    /// Coordinator construction time; `server_uptime` is measured from it.
    pub(crate) constructed: Instant,
}

impl Jhalog {
    /// Validates `config` and builds the middleware.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if an ignore pattern is not a valid route
    /// pattern. Surfaced here, at construction — never on the first request.
    pub fn new(config: Config) -> Result<Self, Error> {
        let mut ignore = matchit::Router::new();
        for pattern in &config.ignore_paths {
            ignore.insert(pattern.clone(), ()).map_err(|e| {
                Error::InvalidConfig(format!("bad ignore pattern `{pattern}`: {e}"))
            })?;
        }

        Ok(Self {
            shared: Arc::new(Shared {
                backend: config.backend,
                forward_request_id: config.forward_request_id,
                ip_addresses_allowed: config.ip_addresses_allowed,
                trust_proxy: config.trust_proxy,
                request_timeout: config.request_timeout,
                server_version: config.server_version,
                ignore,
                state: Mutex::new(State::Uninitialized),
                server_id: OnceLock::new(),
                constructed: Instant::now(),
            }),
        })
    }

    /// Wraps the application's handler in the interceptor.
    ///
    /// `B` is the host's request body type; the middleware never reads the
    /// body, it passes through untouched.
    pub fn wrap<B: 'static>(&self, handler: impl Handler<B>) -> Wrapped<B> {
        Wrapped {
            shared: Arc::clone(&self.shared),
            handler: handler.into_boxed_handler(),
        }
    }
}

// ── Wrapped handler ───────────────────────────────────────────────────────────

/// The application handler with the interceptor around it.
///
/// Clones share the handler and the middleware state — one clone per
/// connection task is the expected usage under hyper.
pub struct Wrapped<B> {
    shared: Arc<Shared>,
    handler: BoxedHandler<B>,
}

impl<B> Clone for Wrapped<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<B: 'static> Wrapped<B> {
    /// Core hot path: intercepts one request and produces one response.
    ///
    /// Infallible by design — every failure mode below the middleware is
    /// converted into a response and a log event, so the host framework
    /// never sees an error from here.
    pub async fn call(&self, req: http::Request<B>) -> Response {
        // Ignored paths bypass everything: no event, no context, no
        // timeout, response returned unmodified.
        if self.shared.ignore.at(req.uri().path()).is_ok() {
            return self.handler.call(req).await;
        }

        let start = Instant::now();
        let mut event = LogEvent::new();
        let id = self.request_id(&req);
        self.fill_request_fields(&mut event, &req, &id);

        // The handler runs with the event bound to this task and raced
        // against the deadline. The event comes back out whatever happens.
        let fut = self.handler.call(req);
        let (mut event, outcome) =
            context::scope(event, timeout::guard(fut, self.shared.request_timeout)).await;

        let elapsed = start.elapsed().as_secs_f64();
        let (status, level) = classify(&outcome, self.shared.backend.as_ref());

        event.insert(field::STATUS_CODE, status);
        event.insert(field::LEVEL, level.as_str());
        event.insert(field::EXECUTION_TIME, elapsed);
        if let Outcome::Failed(info) = &outcome {
            event.insert(field::ERROR_DETAIL, info.message());
        }

        let mut response = match outcome {
            Outcome::Completed(resp) => resp,
            // Synthesized responses carry the generic reason phrase only;
            // whatever went wrong stays in `error_detail`.
            Outcome::TimedOut | Outcome::Failed(_) => synthesize(status),
        };
        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        self.shared.emit(event);
        response
    }

    /// Resolves the event id: the inbound correlation header verbatim when
    /// forwarding is on and the value is well-formed, else a fresh one.
    fn request_id(&self, req: &http::Request<B>) -> String {
        if self.shared.forward_request_id
            && let Some(inbound) = header_str(req, REQUEST_ID_HEADER)
            && well_formed_id(inbound)
        {
            return inbound.to_owned();
        }
        self.shared.backend.generate_id()
    }

    fn fill_request_fields(&self, event: &mut LogEvent, req: &http::Request<B>, id: &str) {
        event.insert(field::ID, id);
        event.insert(field::TYPE, "access");
        event.insert(
            field::DATE,
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        );
        event.insert(field::METHOD, req.method().as_str());
        event.insert(field::PATH, req.uri().path());
        if let Some(ua) = req.headers().get(USER_AGENT).and_then(|v| v.to_str().ok()) {
            event.insert(field::CLIENT_USER_AGENT, ua);
        }
        if self.shared.ip_addresses_allowed
            && let Some(ip) = self.client_ip(req)
        {
            event.insert(field::CLIENT_IP, ip);
        }
    }

    /// The client address, if the configuration allows recording one.
    ///
    /// With `trust_proxy` the first entry of `x-forwarded-for` wins; the
    /// fallback either way is a peer `SocketAddr` the host placed in the
    /// request extensions before calling us.
    fn client_ip(&self, req: &http::Request<B>) -> Option<String> {
        if self.shared.trust_proxy
            && let Some(forwarded) = header_str(req, FORWARDED_FOR_HEADER)
            && let Some(first) = forwarded.split(',').next()
            && !first.trim().is_empty()
        {
            return Some(first.trim().to_owned());
        }
        req.extensions().get::<SocketAddr>().map(|addr| addr.ip().to_string())
    }
}

impl Shared {
    /// The lifecycle state, recovering the guard if a panic ever poisoned
    /// the lock — the state value itself is always coherent.
    pub(crate) fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fire-and-forget submission. A backend that panics or rejects the
    /// event costs us the event and a local log line — never the response.
    pub(crate) fn emit(&self, event: LogEvent) {
        let backend = Arc::clone(&self.backend);
        if std::panic::catch_unwind(AssertUnwindSafe(move || backend.emit(event))).is_err() {
            error!("logging backend panicked during emit; event dropped");
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn header_str<'a, B>(req: &'a http::Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// A forwarded id is taken verbatim only if it looks like an id: non-empty,
/// bounded, printable ASCII with no whitespace.
fn well_formed_id(value: &str) -> bool {
    !value.is_empty() && value.len() <= 200 && value.bytes().all(|b| b.is_ascii_graphic())
}

/// Status-only response for timeout and failure paths. The body is the
/// bare reason phrase — internals never leak to the client.
fn synthesize(status: u16) -> Response {
    let status = http::StatusCode::from_u16(status)
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    let body = status.canonical_reason().unwrap_or_default();
    let mut response = http::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
