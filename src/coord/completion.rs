//! Awaitable completions
//!
//! Bridges a coordinator's completion closure into a future, for callers
//! that run the coordinator on a single-threaded tokio runtime (typically
//! inside a `LocalSet`) and would rather `.await` the aggregate.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::core::errors::{ConvergeError, Result};
use crate::coord::coordinator::Coordinator;
use crate::coord::types::Outcome;

/// Future resolving to the aggregate outcome.
///
/// Resolves to `ConvergeError::Cancelled` if the coordinator is cancelled,
/// or if every handle and token is dropped without the outcome being
/// decided.
#[must_use = "futures do nothing unless polled"]
pub struct Completion<T> {
    coordinator: String,
    rx: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    pub fn coordinator(&self) -> &str {
        &self.coordinator
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let received = futures::ready!(Pin::new(&mut this.rx).poll(cx));
        Poll::Ready(received.map_err(|_| ConvergeError::cancelled(this.coordinator.as_str())))
    }
}

/// A sender/future pair wired to `coordinator`'s name.
pub(crate) fn channel<T>(coordinator: &str) -> (oneshot::Sender<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (
        tx,
        Completion {
            coordinator: coordinator.to_string(),
            rx,
        },
    )
}

impl<S, V> Coordinator<S, V>
where
    S: Clone + PartialEq + 'static,
    V: 'static,
{
    /// Register a completion closure that feeds the returned future.
    ///
    /// Fails like `try_finalize` when a closure is already registered or
    /// the coordinator was cancelled.
    pub fn completion(&self) -> Result<Completion<(S, Outcome<V>)>> {
        let (tx, completion) = channel(self.name());
        self.try_finalize(move |status, outcome| {
            // The receiver may already be gone; nobody is left to tell.
            let _ = tx.send((status, outcome));
        })?;
        Ok(completion)
    }
}
