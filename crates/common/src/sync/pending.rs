//! Single-fire handle for a spawned network operation.
//!
//! A [`PendingResult`] is created per attempt and completes exactly once.
//! Cancelling it abandons interest in the outcome; the spawned future keeps
//! running to completion and its result is discarded, so a request already
//! on the wire is never torn down from here.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct PendingResult<T, E> {
    receiver: oneshot::Receiver<Result<T, E>>,
    token: CancellationToken,
    completed: Arc<AtomicBool>,
    cancelled_error: fn() -> E,
}

impl<T, E> PendingResult<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Spawn `future` on the current runtime.
    ///
    /// `cancelled_error` builds the error returned when the handle is
    /// cancelled or the task goes away without reporting.
    pub fn spawn<F>(future: F, cancelled_error: fn() -> E) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let completed = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&completed);

        tokio::spawn(async move {
            let outcome = future.await;
            done.store(true, Ordering::Release);
            if sender.send(outcome).is_err() {
                debug!("pending result dropped before completion");
            }
        });

        Self { receiver, token: CancellationToken::new(), completed, cancelled_error }
    }

    /// True once the operation produced its outcome or the handle was
    /// cancelled. A completed handle never changes its answer.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire) || self.token.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Abandon interest in the outcome.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token that cancels this handle; hand it to whoever may abandon the
    /// wait (a UI, a timeout).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the outcome.
    pub async fn wait(self) -> Result<T, E> {
        let Self { receiver, token, cancelled_error, .. } = self;
        tokio::select! {
            biased;
            () = token.cancelled() => Err(cancelled_error()),
            outcome = receiver => outcome.unwrap_or_else(|_| Err(cancelled_error())),
        }
    }
}

impl<T, E> std::fmt::Debug for PendingResult<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResult")
            .field("completed", &self.completed.load(Ordering::Acquire))
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
