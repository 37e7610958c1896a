//! Overlay State Machine
//!
//! Every overlay is in exactly one [`State`]. Each state defines what every
//! operation does (exhaustive matches, no wildcard arms) and what happens
//! when the state is entered.
//!
//! # Lifecycle
//!
//! ```text
//!   Init ──► Hidden ──show──► BeforeShow ──► Showing ──► Shown
//!              ▲                  │                        │ hide
//!              │            (hide captured)                ▼
//!              │◄─────────────────┘     prevented ◄── BeforeHide
//!              │                                           │ allowed
//!              └──────────────────── Hiding ◄──────────────┘
//!
//!   any ──dispose──► Disposed (terminal)
//! ```
//!
//! # Transitions
//!
//! [`Machine::set_state`] cancels the outgoing state's [`CancelScope`], swaps
//! in a fresh scope and the new state, publishes it, then runs the new
//! state's entry actions. Synchronous entry work happens under the overlay's
//! state lock. Asynchronous work (yield, event dispatch, animation) runs in a
//! spawned task wrapped in the state's scope, and every continuation
//! re-acquires the lock and re-checks the scope before touching anything.
//! Work belonging to an exited state therefore never applies.

use std::mem;
use std::sync::Arc;

use crate::animation::{play_cancelable, AnimationKind};
use crate::error::OverlayError;
use crate::events::OverlayEventKind;
use crate::overlay::OverlayInner;
use crate::registry::ExclusivityPolicy;
use crate::scope::CancelScope;
use crate::signal::{Signal, SignalFuture};
use crate::types::{CommandSlot, DismissInfo, DismissReason, InputPaneGeometry, StateName};

/// A lifecycle state
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Init,
    Hidden,
    BeforeShow,
    Showing,
    Shown,
    BeforeHide { reason: DismissReason },
    Hiding { reason: DismissReason },
    Disposed,
}

impl State {
    pub(crate) fn name(&self) -> StateName {
        match self {
            Self::Init => StateName::Init,
            Self::Hidden => StateName::Hidden,
            Self::BeforeShow => StateName::BeforeShow,
            Self::Showing => StateName::Showing,
            Self::Shown => StateName::Shown,
            Self::BeforeHide { .. } => StateName::BeforeHide,
            Self::Hiding { .. } => StateName::Hiding,
            Self::Disposed => StateName::Disposed,
        }
    }
}

/// The single buffered request replayed at a rest state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum PendingOperation {
    #[default]
    None,
    Show,
    Hide(DismissReason),
}

/// Mutable state of one overlay, guarded by the overlay's state lock
pub(crate) struct Machine {
    state: State,
    scope: CancelScope,
    dismissal: Signal<DismissInfo>,
    pending: PendingOperation,
    disposed: bool,
    surface_visible: bool,
    focus_held: bool,
    transitions: u64,
}

impl Machine {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Init,
            scope: CancelScope::new(),
            dismissal: Signal::new(),
            pending: PendingOperation::None,
            disposed: false,
            surface_visible: false,
            focus_held: false,
            transitions: 0,
        }
    }

    pub(crate) fn state_name(&self) -> StateName {
        self.state.name()
    }

    pub(crate) fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Run the `Init` entry actions
    pub(crate) fn start(&mut self, inner: &Arc<OverlayInner>) {
        self.enter(inner);
    }

    // ========================================================================
    // Operations
    // ========================================================================

    pub(crate) fn show(
        &mut self,
        inner: &Arc<OverlayInner>,
    ) -> Result<SignalFuture<DismissInfo>, OverlayError> {
        match self.state {
            State::Init => Err(self.illegal("show")),
            State::Hidden => self.begin_show(inner),
            State::BeforeShow
            | State::Showing
            | State::Shown
            | State::BeforeHide { .. } => Err(OverlayError::AlreadyShowing { id: inner.id }),
            State::Hiding { .. } => match self.pending {
                PendingOperation::None => {
                    self.pending = PendingOperation::Show;
                    Ok(self.dismissal.promise())
                }
                PendingOperation::Show | PendingOperation::Hide(_) => {
                    Err(OverlayError::AlreadyShowing { id: inner.id })
                }
            },
            State::Disposed => Err(OverlayError::Disposed { id: inner.id }),
        }
    }

    pub(crate) fn hide(&mut self, reason: DismissReason, inner: &Arc<OverlayInner>) {
        match self.state {
            State::Init | State::Hidden | State::BeforeHide { .. } | State::Disposed => {}
            State::BeforeShow | State::Showing => {
                self.pending = PendingOperation::Hide(reason);
            }
            State::Shown => self.set_state(State::BeforeHide { reason }, inner),
            State::Hiding { .. } => match self.pending {
                PendingOperation::Show => {
                    // Last request wins: the buffered show is answered now.
                    self.pending = PendingOperation::None;
                    self.settle_dismissal(Ok(DismissInfo { reason }), inner);
                }
                PendingOperation::None | PendingOperation::Hide(_) => {}
            },
        }
    }

    pub(crate) fn command_clicked(&mut self, slot: CommandSlot, inner: &Arc<OverlayInner>) -> bool {
        match self.state {
            State::Shown => {
                self.set_state(
                    State::BeforeHide {
                        reason: slot.reason(),
                    },
                    inner,
                );
                true
            }
            State::Init
            | State::Hidden
            | State::BeforeShow
            | State::Showing
            | State::BeforeHide { .. }
            | State::Hiding { .. }
            | State::Disposed => false,
        }
    }

    pub(crate) fn light_dismiss(&mut self, inner: &Arc<OverlayInner>) -> bool {
        match self.state {
            State::Shown => {
                self.set_state(
                    State::BeforeHide {
                        reason: DismissReason::None,
                    },
                    inner,
                );
                true
            }
            State::Init
            | State::Hidden
            | State::BeforeShow
            | State::Showing
            | State::BeforeHide { .. }
            | State::Hiding { .. }
            | State::Disposed => false,
        }
    }

    pub(crate) fn input_pane_shown(
        &mut self,
        geometry: InputPaneGeometry,
        inner: &Arc<OverlayInner>,
    ) -> bool {
        match self.state {
            State::Showing | State::Shown => {
                inner.surface.resize_for_input_pane(geometry);
                true
            }
            State::Init
            | State::Hidden
            | State::BeforeShow
            | State::BeforeHide { .. }
            | State::Hiding { .. }
            | State::Disposed => false,
        }
    }

    pub(crate) fn input_pane_hidden(&mut self, inner: &Arc<OverlayInner>) -> bool {
        match self.state {
            State::Showing | State::Shown => {
                inner.surface.reset_input_pane_resize();
                true
            }
            State::Init
            | State::Hidden
            | State::BeforeShow
            | State::BeforeHide { .. }
            | State::Hiding { .. }
            | State::Disposed => false,
        }
    }

    /// Returns true if this call performed the disposal
    pub(crate) fn dispose(&mut self, inner: &Arc<OverlayInner>) -> bool {
        match self.state {
            State::Disposed => false,
            State::Init
            | State::Hidden
            | State::BeforeShow
            | State::Showing
            | State::Shown
            | State::BeforeHide { .. }
            | State::Hiding { .. } => {
                self.set_state(State::Disposed, inner);
                true
            }
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn set_state(&mut self, next: State, inner: &Arc<OverlayInner>) {
        if self.disposed && next != State::Disposed {
            let _ = self.illegal("transition");
            return;
        }

        self.scope.cancel();
        self.scope = CancelScope::new();

        let from = self.state.name();
        self.state = next;
        let to = self.state.name();
        self.transitions += 1;

        tracing::debug!(overlay_id = %inner.id, from = %from, to = %to, "Overlay transition");
        inner.publish(to);

        self.enter(inner);
    }

    fn begin_show(
        &mut self,
        inner: &Arc<OverlayInner>,
    ) -> Result<SignalFuture<DismissInfo>, OverlayError> {
        if let Err(holder) = inner.registry.try_engage(inner.id) {
            tracing::debug!(overlay_id = %inner.id, blocked_by = %holder, "Show blocked by sibling");
            return Err(OverlayError::AlreadyShowing { id: inner.id });
        }
        let view = self.dismissal.promise();
        self.set_state(State::BeforeShow, inner);
        Ok(view)
    }

    /// Settle the current dismissal and start a fresh one for the next cycle
    fn settle_dismissal(
        &mut self,
        outcome: Result<DismissInfo, OverlayError>,
        inner: &Arc<OverlayInner>,
    ) {
        let settled = match outcome {
            Ok(info) => self.dismissal.complete(info),
            Err(err) => self.dismissal.error(err),
        };
        if let Err(err) = settled {
            tracing::warn!(overlay_id = %inner.id, error = %err, "Dismissal settled twice");
        }
        self.dismissal = Signal::new();
    }

    fn illegal(&self, operation: &'static str) -> OverlayError {
        let err = OverlayError::IllegalTransition {
            state: self.state.name(),
            operation,
        };
        tracing::error!(error = %err, "State machine invariant violated");
        debug_assert!(false, "{err}");
        err
    }

    fn enter(&mut self, inner: &Arc<OverlayInner>) {
        match self.state.clone() {
            State::Init => {
                self.dismissal = Signal::new();
                self.pending = PendingOperation::None;
                self.set_state(State::Hidden, inner);
            }
            State::Hidden => {
                inner.registry.release(&inner.id);
                self.replay_pending_show(inner);
            }
            State::BeforeShow => self.enter_before_show(inner),
            State::Showing => self.enter_showing(inner),
            State::Shown => match mem::take(&mut self.pending) {
                PendingOperation::Hide(reason) => {
                    self.set_state(State::BeforeHide { reason }, inner);
                }
                PendingOperation::Show | PendingOperation::None => {}
            },
            State::BeforeHide { reason } => self.enter_before_hide(reason, inner),
            State::Hiding { reason } => self.enter_hiding(reason, inner),
            State::Disposed => {
                self.disposed = true;
                self.pending = PendingOperation::None;
                if let Err(err) = self.dismissal.error(OverlayError::Disposed { id: inner.id }) {
                    tracing::trace!(overlay_id = %inner.id, error = %err, "Dismissal already settled");
                }
                if self.surface_visible {
                    self.surface_visible = false;
                    inner.surface.set_visible(false);
                }
                if self.focus_held {
                    self.focus_held = false;
                    inner.surface.restore_focus();
                }
                inner.registry.detach(&inner.id);
                inner.detach_listeners();
            }
        }
    }

    fn replay_pending_show(&mut self, inner: &Arc<OverlayInner>) {
        match mem::take(&mut self.pending) {
            PendingOperation::Show => {
                if inner.registry.policy() == ExclusivityPolicy::LightDismiss {
                    let registry = inner.registry.clone();
                    let id = inner.id;
                    inner.runtime.spawn(async move {
                        registry.hide_all_except(&id, &DismissReason::None);
                    });
                }
                if let Err(err) = self.begin_show(inner) {
                    tracing::warn!(overlay_id = %inner.id, error = %err, "Buffered show rejected");
                    self.settle_dismissal(Err(err), inner);
                }
            }
            PendingOperation::Hide(_) | PendingOperation::None => {}
        }
    }

    // ========================================================================
    // Entry Bodies
    // ========================================================================

    fn enter_before_show(&mut self, inner: &Arc<OverlayInner>) {
        inner.spawn_body(&self.scope, |weak, scope| async move {
            tokio::task::yield_now().await;
            let Some(inner) = weak.upgrade() else { return };
            if scope.is_cancelled() {
                return;
            }
            inner.fire(OverlayEventKind::BeforeShow, None).await;
            inner.resume(&scope, |machine, inner| machine.finish_before_show(inner));
        });
    }

    fn finish_before_show(&mut self, inner: &Arc<OverlayInner>) {
        match mem::take(&mut self.pending) {
            PendingOperation::Hide(reason) => {
                tracing::debug!(overlay_id = %inner.id, reason = %reason, "Show aborted before entrance");
                self.settle_dismissal(Ok(DismissInfo { reason }), inner);
                self.set_state(State::Hidden, inner);
            }
            PendingOperation::Show | PendingOperation::None => {
                self.set_state(State::Showing, inner);
            }
        }
    }

    fn enter_showing(&mut self, inner: &Arc<OverlayInner>) {
        self.surface_visible = true;
        inner.surface.set_visible(true);
        self.focus_held = true;
        inner.surface.focus_initial();

        let animator = Arc::clone(&inner.animator);
        inner.spawn_body(&self.scope, |weak, scope| async move {
            let outcome = play_cancelable(animator.as_ref(), AnimationKind::Entrance, &scope).await;
            if !outcome.is_completed() {
                return;
            }
            let Some(inner) = weak.upgrade() else { return };
            if scope.is_cancelled() {
                return;
            }
            inner.fire(OverlayEventKind::AfterShow, None).await;
            inner.resume(&scope, |machine, inner| machine.set_state(State::Shown, inner));
        });
    }

    fn enter_before_hide(&mut self, reason: DismissReason, inner: &Arc<OverlayInner>) {
        inner.spawn_body(&self.scope, |weak, scope| async move {
            let Some(inner) = weak.upgrade() else { return };
            let detail = DismissInfo {
                reason: reason.clone(),
            };
            let allowed = inner.fire(OverlayEventKind::BeforeHide, Some(detail)).await;
            inner.resume(&scope, move |machine, inner| {
                if allowed {
                    machine.set_state(State::Hiding { reason }, inner);
                } else {
                    tracing::debug!(overlay_id = %inner.id, "Hide prevented by listener");
                    machine.set_state(State::Shown, inner);
                }
            });
        });
    }

    fn enter_hiding(&mut self, reason: DismissReason, inner: &Arc<OverlayInner>) {
        self.settle_dismissal(
            Ok(DismissInfo {
                reason: reason.clone(),
            }),
            inner,
        );
        if self.focus_held {
            self.focus_held = false;
            inner.surface.restore_focus();
        }

        let animator = Arc::clone(&inner.animator);
        inner.spawn_body(&self.scope, |weak, scope| async move {
            let outcome = play_cancelable(animator.as_ref(), AnimationKind::Exit, &scope).await;
            if !outcome.is_completed() {
                return;
            }
            let Some(inner) = weak.upgrade() else { return };
            inner.resume(&scope, |machine, inner| {
                machine.surface_visible = false;
                inner.surface.set_visible(false);
            });
            if scope.is_cancelled() {
                return;
            }
            inner
                .fire(OverlayEventKind::AfterHide, Some(DismissInfo { reason }))
                .await;
            inner.resume(&scope, |machine, inner| machine.set_state(State::Hidden, inner));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names_cover_every_state() {
        let states = [
            State::Init,
            State::Hidden,
            State::BeforeShow,
            State::Showing,
            State::Shown,
            State::BeforeHide {
                reason: DismissReason::None,
            },
            State::Hiding {
                reason: DismissReason::Primary,
            },
            State::Disposed,
        ];
        let names: Vec<_> = states.iter().map(State::name).collect();
        assert_eq!(
            names,
            vec![
                StateName::Init,
                StateName::Hidden,
                StateName::BeforeShow,
                StateName::Showing,
                StateName::Shown,
                StateName::BeforeHide,
                StateName::Hiding,
                StateName::Disposed,
            ]
        );
    }

    #[test]
    fn test_new_machine_starts_in_init() {
        let machine = Machine::new();
        assert_eq!(machine.state_name(), StateName::Init);
        assert_eq!(machine.pending, PendingOperation::None);
        assert!(!machine.dismissal.is_settled());
        assert_eq!(machine.transitions(), 0);
    }
}
