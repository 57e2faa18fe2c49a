//! Handler trait and type erasure.
//!
//! # How the wrapped handler is stored
//!
//! [`Jhalog::wrap`](crate::Jhalog::wrap) accepts any async function from an
//! `http::Request<B>` to a response, for whatever concrete function type the
//! host hands it. To store that behind one field we use a **trait object**
//! (`dyn ErasedHandler<B>`) that hides the concrete type behind a common
//! interface:
//!
//! ```text
//! async fn app(req: Request<B>) -> Response { … }   ← host writes this
//!        ↓ jhalog.wrap(app)
//! app.into_boxed_handler()                          ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(app))                          ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler<B> = Arc<dyn ErasedHandler<B>>
//! handler.call(req)  at request time                ← one vtable dispatch
//!        ↓
//! Box::pin(app(req))                                ← BoxFuture
//! ```
//!
//! The only runtime cost per request is **one Arc clone** (atomic inc) +
//! **one virtual call** — negligible compared to network I/O.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;

/// The response type the middleware works with: `http::Response` with a
/// fully-buffered body. This is the seam a hyper `service_fn` already
/// speaks, so a wrapped handler plugs straight into a hyper server.
pub type Response = http::Response<Full<Bytes>>;

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place — it cannot move it in memory after the first poll.
/// `Send + 'static` let tokio move the future across threads safely.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler<B> {
    fn call(&self, req: http::Request<B>) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// `#[doc(hidden)] pub` for the same reason as `ErasedHandler`.
/// `Arc` gives us cheap, thread-safe shared ownership (one atomic reference
/// count increment per request) without copying the handler.
#[doc(hidden)]
pub type BoxedHandler<B> = Arc<dyn ErasedHandler<B> + Send + Sync + 'static>;

/// Implemented for every function [`Jhalog::wrap`](crate::Jhalog::wrap)
/// accepts.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: http::Request<B>) -> jhalog::Response
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it. This prevents accidental misuse and
/// keeps the API surface stable across versions.
pub trait Handler<B>: private::Sealed<B> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<B>;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed<B> {}
}

/// Implement the sealing trait for any function with the right signature.
///
/// `Fn(http::Request<B>) -> Fut` covers:
///   - named `async fn` items
///   - `async` closures
///   - any struct that implements `Fn`
impl<F, Fut, B> private::Sealed<B> for F
where
    F: Fn(http::Request<B>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
}

impl<F, Fut, B> Handler<B> for F
where
    F: Fn(http::Request<B>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
    B: 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<B> {
        Arc::new(FnHandler(self))
    }
}

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, B> ErasedHandler<B> for FnHandler<F>
where
    F: Fn(http::Request<B>) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: http::Request<B>) -> BoxFuture {
        Box::pin((self.0)(req))
    }
}
