//! The timeout guard: races handler execution against a deadline.
//!
//! Three terminal states, mapped 1:1 onto [`Outcome`]: the handler returns
//! (`Completed`), the handler panics (`Failed`), or the deadline fires
//! first (`TimedOut`). On timeout the handler future is dropped, which is
//! tokio's cooperative cancellation: everything the handler holds is
//! released through `Drop`, and the timer never outlives the race.
//!
//! # Cooperative-cancellation limit
//!
//! Dropping a future cancels it at its next yield point. A handler that
//! blocks without yielding — a synchronous sleep, a tight CPU loop — cannot
//! be preempted and will run to completion even though the client already
//! received a 504. That is inherent to cooperative scheduling, not
//! something this module papers over; put blocking work on
//! `spawn_blocking` where it belongs.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;

use crate::classify::{FailureInfo, Outcome};
use crate::handler::BoxFuture;

/// Drives `fut` to one of the three terminal states.
///
/// A zero `timeout` disables the deadline entirely — no timer is created.
pub(crate) async fn guard(fut: BoxFuture, timeout: Duration) -> Outcome {
    // catch_unwind turns a panicking handler into a value instead of
    // unwinding through the connection task. The handler future is already
    // `'static` and owns its captures, so the unwind-safety assertion only
    // says: nothing outside the future can observe its broken invariants.
    let fut = AssertUnwindSafe(fut).catch_unwind();

    if timeout.is_zero() {
        return match fut.await {
            Ok(resp) => Outcome::Completed(resp),
            Err(payload) => Outcome::Failed(FailureInfo::from_panic(payload)),
        };
    }

    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(resp)) => Outcome::Completed(resp),
        Ok(Err(payload)) => Outcome::Failed(FailureInfo::from_panic(payload)),
        Err(_elapsed) => Outcome::TimedOut,
    }
}
