//! Overlay Errors
//!
//! `show()` reports failures as a rejected dismissal future; `hide()` never
//! reports anything. `IllegalTransition` marks a bug in the state machine
//! itself and trips a debug assertion where it is raised.

use thiserror::Error;

use crate::types::{OverlayId, StateName};

/// Errors surfaced by overlay operations
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OverlayError {
    /// This overlay or an exclusive sibling is visible or on its way there
    #[error("{id} cannot be shown: an overlay of its class is already showing")]
    AlreadyShowing {
        /// The overlay whose `show()` was rejected
        id: OverlayId,
    },

    /// The overlay has been disposed
    #[error("{id} has been disposed")]
    Disposed {
        /// The disposed overlay
        id: OverlayId,
    },

    /// An operation reached a state that must never receive it
    #[error("illegal operation `{operation}` in state {state}")]
    IllegalTransition {
        /// State that received the operation
        state: StateName,
        /// Operation name
        operation: &'static str,
    },

    /// The overlay was dropped before its dismissal future settled
    #[error("dismissal abandoned: the overlay was dropped before it settled")]
    Abandoned,

    /// Construction happened outside a Tokio runtime
    #[error("overlays must be created inside a Tokio runtime")]
    NoRuntime,
}

impl OverlayError {
    /// Whether a caller can retry the operation once the blocking overlay is dismissed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyShowing { .. })
    }
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, OverlayError>;
