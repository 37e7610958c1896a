//! Deferred Signal
//!
//! A single-assignment future that is resolved from the outside. The state
//! machine creates the signal for "the next dismissal" before anyone calls
//! `show()`, and later hands out read-only [`SignalFuture`] views of it.
//!
//! Backed by a `tokio::sync::watch` slot: settling writes the slot exactly
//! once, and every view waits for the slot to become `Some`.

use std::future::IntoFuture;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

use crate::error::OverlayError;

/// Errors from settling a signal
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    /// The signal was already completed or errored
    #[error("signal already settled")]
    AlreadySettled,
}

type Slot<T> = Option<Result<T, OverlayError>>;

/// Externally-completable single-assignment future
#[derive(Debug)]
pub struct Signal<T> {
    tx: watch::Sender<Slot<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an unsettled signal
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Create a signal that is already rejected
    #[must_use]
    pub fn rejected(error: OverlayError) -> Self {
        let (tx, _rx) = watch::channel(Some(Err(error)));
        Self { tx }
    }

    /// Resolve the signal
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::AlreadySettled`] if the signal was settled before;
    /// the earlier outcome is kept.
    pub fn complete(&self, value: T) -> Result<(), SignalError> {
        self.settle(Ok(value))
    }

    /// Reject the signal
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::AlreadySettled`] if the signal was settled before.
    pub fn error(&self, error: OverlayError) -> Result<(), SignalError> {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: Result<T, OverlayError>) -> Result<(), SignalError> {
        let mut outcome = Some(outcome);
        let settled = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = outcome.take();
            true
        });
        if settled {
            Ok(())
        } else {
            Err(SignalError::AlreadySettled)
        }
    }

    /// Whether the signal has been completed or errored
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// A read-only view that resolves with the signal's outcome
    #[must_use]
    pub fn promise(&self) -> SignalFuture<T> {
        SignalFuture {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a [`Signal`]
///
/// Await it directly (`view.await`) or call [`SignalFuture::wait`]. Dropping
/// a view has no effect on the signal or on other views.
#[derive(Debug, Clone)]
pub struct SignalFuture<T> {
    rx: watch::Receiver<Slot<T>>,
}

impl<T> SignalFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The outcome if the signal has already settled
    #[must_use]
    pub fn peek(&self) -> Option<Result<T, OverlayError>> {
        self.rx.borrow().clone()
    }

    /// Whether the signal has already settled
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the signal to settle
    ///
    /// Resolves with [`OverlayError::Abandoned`] if the signal is dropped
    /// without ever settling.
    pub async fn wait(mut self) -> Result<T, OverlayError> {
        let settled = match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        };
        settled.unwrap_or(Err(OverlayError::Abandoned))
    }
}

impl<T> IntoFuture for SignalFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, OverlayError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
