//! Input-Pane Reactor
//!
//! Feeds viewport notifications (an on-screen keyboard appearing or going
//! away) into an overlay. Only `Showing` and `Shown` react; every other state
//! reports the notification as unhandled.
//!
//! The reactor holds a [`WeakOverlay`], so it never keeps a dialog alive. It
//! stops when the channel closes or the overlay is dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::overlay::WeakOverlay;
use crate::types::InputPaneGeometry;

/// A viewport notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputPaneNotification {
    /// An input pane now occludes this rectangle
    Shown(InputPaneGeometry),
    /// The input pane went away
    Hidden,
}

/// Counters reported when the reactor stops
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReactorStats {
    /// Notifications delivered to the overlay
    pub forwarded: u64,
    /// Notifications the overlay acted on
    pub handled: u64,
}

/// Forward notifications from `rx` into the overlay until either goes away
pub fn spawn_input_pane_reactor(
    overlay: WeakOverlay,
    mut rx: mpsc::Receiver<InputPaneNotification>,
) -> JoinHandle<ReactorStats> {
    tokio::spawn(async move {
        let mut stats = ReactorStats::default();

        while let Some(notification) = rx.recv().await {
            let Some(overlay) = overlay.upgrade() else {
                tracing::debug!("Overlay dropped; input-pane reactor stopping");
                break;
            };

            stats.forwarded += 1;
            let handled = match notification {
                InputPaneNotification::Shown(geometry) => overlay.input_pane_shown(geometry),
                InputPaneNotification::Hidden => overlay.input_pane_hidden(),
            };
            if handled {
                stats.handled += 1;
            }
            tracing::trace!(overlay_id = %overlay.id(), ?notification, handled, "Input pane notification");
        }

        tracing::debug!(
            forwarded = stats.forwarded,
            handled = stats.handled,
            "Input-pane reactor finished"
        );
        stats
    })
}
