//! Overlay Surface
//!
//! The rendering side of an overlay. The state machine never touches pixels;
//! it tells the surface when to become visible, what content to show, and
//! how to react to an occluding input pane.
//!
//! [`HeadlessSurface`] records every call and is what tests and the demo use.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{InputPaneGeometry, OverlayContent};

/// Rendering collaborator driven by the state machine
///
/// Calls arrive while the overlay's state lock is held, so implementations
/// must not call back into the overlay.
pub trait OverlaySurface: Send + Sync {
    /// Apply or remove the visible state
    fn set_visible(&self, visible: bool);

    /// Mirror title and command content
    fn apply_content(&self, content: &OverlayContent);

    /// Shrink content to stay clear of an input pane
    fn resize_for_input_pane(&self, geometry: InputPaneGeometry);

    /// Undo [`OverlaySurface::resize_for_input_pane`]
    fn reset_input_pane_resize(&self);

    /// Move focus into the overlay
    fn focus_initial(&self) {}

    /// Return focus to where it was before the overlay showed
    fn restore_focus(&self) {}
}

/// One recorded surface call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceCall {
    /// `set_visible`
    SetVisible(bool),
    /// `apply_content`
    ApplyContent(OverlayContent),
    /// `resize_for_input_pane`
    ResizeForInputPane(InputPaneGeometry),
    /// `reset_input_pane_resize`
    ResetInputPaneResize,
    /// `focus_initial`
    FocusInitial,
    /// `restore_focus`
    RestoreFocus,
}

/// Surface that renders nothing and records every call
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    visible: AtomicBool,
}

impl HeadlessSurface {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the visible state is currently applied
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Calls recorded so far
    #[must_use]
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    /// Drain the recorded calls
    pub fn take_calls(&self) -> Vec<SurfaceCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().push(call);
    }
}

impl OverlaySurface for HeadlessSurface {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
        self.record(SurfaceCall::SetVisible(visible));
    }

    fn apply_content(&self, content: &OverlayContent) {
        self.record(SurfaceCall::ApplyContent(content.clone()));
    }

    fn resize_for_input_pane(&self, geometry: InputPaneGeometry) {
        self.record(SurfaceCall::ResizeForInputPane(geometry));
    }

    fn reset_input_pane_resize(&self) {
        self.record(SurfaceCall::ResetInputPaneResize);
    }

    fn focus_initial(&self) {
        self.record(SurfaceCall::FocusInitial);
    }

    fn restore_focus(&self) {
        self.record(SurfaceCall::RestoreFocus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_surface_records_calls() {
        let surface = HeadlessSurface::new();
        surface.set_visible(true);
        surface.focus_initial();
        surface.resize_for_input_pane(InputPaneGeometry::new(0, 400, 800, 200));

        assert!(surface.is_visible());
        assert_eq!(
            surface.take_calls(),
            vec![
                SurfaceCall::SetVisible(true),
                SurfaceCall::FocusInitial,
                SurfaceCall::ResizeForInputPane(InputPaneGeometry::new(0, 400, 800, 200)),
            ]
        );
        assert!(surface.calls().is_empty());
    }

    #[test]
    fn test_default_focus_hooks_are_noops() {
        struct Bare;
        impl OverlaySurface for Bare {
            fn set_visible(&self, _visible: bool) {}
            fn apply_content(&self, _content: &OverlayContent) {}
            fn resize_for_input_pane(&self, _geometry: InputPaneGeometry) {}
            fn reset_input_pane_resize(&self) {}
        }
        Bare.focus_initial();
        Bare.restore_focus();
    }
}
