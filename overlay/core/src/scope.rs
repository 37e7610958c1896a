//! Cancellation Scopes
//!
//! Every state owns one [`CancelScope`] for exactly as long as it is the
//! current state. Leaving the state cancels the scope, which:
//!
//! - stops the state's async body at its next suspension point, and
//! - makes every later [`CancelScope::is_cancelled`] check fail, which the
//!   machine performs under its lock before applying any continuation.
//!
//! Together these guarantee that no work belonging to an exited state runs.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Cooperative cancellation token tied to one state's lifetime
#[derive(Clone, Debug, Default)]
pub struct CancelScope {
    token: CancellationToken,
}

impl CancelScope {
    /// Create a live scope
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Cancel the scope
    ///
    /// Returns true if the scope was still live.
    pub fn cancel(&self) -> bool {
        let live = !self.token.is_cancelled();
        self.token.cancel();
        live
    }

    /// Whether the scope has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Drive `work` until it finishes or the scope is cancelled
    ///
    /// Returns `None` when cancellation won; `work` is dropped at that point.
    pub async fn run<F>(&self, work: F) -> Option<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return None;
        }
        self.token.run_until_cancelled(work).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let scope = CancelScope::new();
        assert!(!scope.is_cancelled());
        assert!(scope.cancel());
        assert!(!scope.cancel());
        assert!(scope.is_cancelled());
    }

    #[test]
    fn test_clones_share_cancellation() {
        let scope = CancelScope::new();
        let clone = scope.clone();
        scope.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_completes_when_live() {
        let scope = CancelScope::new();
        assert_eq!(scope.run(async { 42 }).await, Some(42));
    }

    #[tokio::test]
    async fn test_run_skips_work_when_already_cancelled() {
        let scope = CancelScope::new();
        scope.cancel();
        let ran = AtomicBool::new(false);
        let out = scope
            .run(async {
                ran.store(true, Ordering::SeqCst);
            })
            .await;
        assert_eq!(out, None);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_in_flight_work() {
        let scope = CancelScope::new();
        let reached_end = Arc::new(AtomicBool::new(false));

        let task = {
            let scope = scope.clone();
            let reached_end = Arc::clone(&reached_end);
            tokio::spawn(async move {
                scope
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        reached_end.store(true, Ordering::SeqCst);
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        scope.cancel();

        assert_eq!(task.await.unwrap(), None);
        assert!(!reached_end.load(Ordering::SeqCst));
    }
}
