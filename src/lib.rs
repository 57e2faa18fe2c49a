//! # jhalog
//!
//! JSON HTTP Access Log middleware for hyper services.
//! One structured event per request. Nothing else.
//!
//! ## The contract
//!
//! Your service handles requests. A logging backend persists events. jhalog
//! is the coordinator in between: it wraps every request in a mutable log
//! event your handlers can add fields to, enforces a request deadline,
//! turns timeouts and panics into clean HTTP responses plus classified
//! events, and brackets your startup/shutdown code so the backend is alive
//! before your startup runs and flushed only after your shutdown finishes.
//!
//! What jhalog intentionally does **not** do:
//!
//! - **Routing / header parsing** — that is the host framework's job
//! - **Batching, transport, persistence** — that is the [`Backend`]'s job,
//!   consumed only through `start` / `emit` / `stop`
//! - **Config-file loading** — pass a built [`Config`], load it however
//!   your deployment loads things
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use jhalog::{Config, Jhalog, Response, context};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jhalog::Error> {
//!     let log = Jhalog::new(
//!         Config::new()
//!             .ignore_paths(["/healthz"])
//!             .server_version(env!("CARGO_PKG_VERSION")),
//!     )?;
//!
//!     let app = log.wrap(handle);
//!
//!     log.startup(|| async { /* open pools, warm caches */ }).await?;
//!     // serve: pass `app.call(req)` to hyper's service_fn, one clone of
//!     // `app` per connection task
//!     # let _ = &app;
//!     log.shutdown(|| async { /* drain, close pools */ }).await?;
//!     Ok(())
//! }
//!
//! async fn handle(_req: http::Request<Bytes>) -> Response {
//!     // fields added here land on this request's event, and only this one
//!     let _ = context::set("tenant", "acme");
//!     http::Response::new(Full::new(Bytes::from_static(b"ok")))
//! }
//! ```
//!
//! Every response carries `x-request-id` — the same value as the event's
//! `id` field, reused verbatim from the inbound header when one is present.
//! Handlers that exceed the deadline produce a 504; handlers that panic
//! produce a 500 (or whatever status the backend proposes) with a generic
//! body, while the panic message goes into the event's `error_detail`.

mod backend;
mod classify;
mod config;
mod error;
mod event;
mod handler;
mod lifecycle;
mod middleware;
mod timeout;

pub mod context;

pub use backend::{Backend, MemoryBackend, WriterBackend};
pub use classify::FailureInfo;
pub use config::Config;
pub use error::{BoxError, Error};
pub use event::{Level, LogEvent, field};
pub use handler::{Handler, Response};
pub use middleware::{FORWARDED_FOR_HEADER, Jhalog, REQUEST_ID_HEADER, Wrapped};
