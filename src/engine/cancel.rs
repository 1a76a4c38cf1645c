//! Cooperative cancellation token shared between a session and its interrupt handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Shared state behind a [`CancelToken`].
#[derive(Debug, Default)]
struct CancelInner {
    /// Latched once cancellation was requested.
    cancelled: AtomicBool,
    /// Wakes every task waiting in [`CancelToken::cancelled`].
    notify: Notify,
}

/// What: Externally triggerable cancellation signal for one session.
///
/// Details:
/// - Cloning is cheap; all clones observe the same state.
/// - Cancellation is sticky: once raised it stays raised for the session.
/// - The interrupt handler holds a clone of the current session's token only,
///   the runner owns the child process and reacts to the token.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    /// Shared flag and waker.
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Raise the cancellation signal.
    ///
    /// Details:
    /// - Idempotent; waiters are woken only on the first call.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("[Cancel] cancellation requested");
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// What: Wait until the token is cancelled.
    ///
    /// Output:
    /// - Resolves immediately if already cancelled.
    ///
    /// Details:
    /// - The `Notified` future is enabled before the flag is re-checked, so a
    ///   cancel racing with this call cannot be missed.
    /// - Dropping the future unregisters the waiter.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
