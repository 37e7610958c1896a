//! Overlay Façade
//!
//! [`Overlay`] is the public handle consumers hold. It is cheap to clone;
//! every clone drives the same state machine. Operations lock the machine,
//! forward to the current state, and return.
//!
//! # Usage
//!
//! ```ignore
//! let registry = OverlayRegistry::modal();
//! let dialog = Overlay::builder(registry)
//!     .title("Discard draft?")
//!     .primary_command(CommandSpec::new("Discard"))
//!     .secondary_command(CommandSpec::new("Keep editing"))
//!     .build()?;
//!
//! let dismissal = dialog.show();
//! // ... later, the user clicks a command
//! dialog.command_clicked(CommandSlot::Primary);
//! assert_eq!(dismissal.await?.reason, DismissReason::Primary);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

use crate::animation::{animator_from_config, Animator};
use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::events::{EventDispatcher, EventHub, OverlayEvent, OverlayEventKind, OverlayHandlers};
use crate::machine::Machine;
use crate::registry::{ExclusiveMember, ExclusivityPolicy, OverlayRegistry};
use crate::scope::CancelScope;
use crate::signal::{Signal, SignalFuture};
use crate::surface::{HeadlessSurface, OverlaySurface};
use crate::types::{
    CommandSlot, CommandSpec, DismissInfo, DismissReason, InputPaneGeometry, OverlayContent,
    OverlayId, StateName,
};

/// Future returned by [`Overlay::show`]
///
/// Resolves with the reason of the `hide()` that ended the show cycle, or
/// rejects with [`OverlayError::AlreadyShowing`] / [`OverlayError::Disposed`].
pub type Dismissal = SignalFuture<DismissInfo>;

const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Shared Inner State
// ============================================================================

/// State shared between the façade handles and the state bodies
pub(crate) struct OverlayInner {
    pub(crate) id: OverlayId,
    pub(crate) surface: Arc<dyn OverlaySurface>,
    pub(crate) animator: Arc<dyn Animator>,
    events: RwLock<Option<Arc<dyn EventDispatcher>>>,
    pub(crate) registry: OverlayRegistry,
    pub(crate) runtime: Handle,
    machine: Mutex<Machine>,
    content: RwLock<OverlayContent>,
    hidden: AtomicBool,
    state_tx: watch::Sender<StateName>,
    event_tx: broadcast::Sender<OverlayEvent>,
}

impl OverlayInner {
    /// Publish a new current state to observers
    pub(crate) fn publish(&self, state: StateName) {
        self.hidden.store(state.is_hidden(), Ordering::SeqCst);
        self.state_tx.send_replace(state);
    }

    /// Spawn a state's async body inside its scope
    pub(crate) fn spawn_body<F, Fut>(self: &Arc<Self>, scope: &CancelScope, body: F)
    where
        F: FnOnce(Weak<Self>, CancelScope) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let work = body(Arc::downgrade(self), scope.clone());
        let scope = scope.clone();
        self.runtime.spawn(async move {
            scope.run(work).await;
        });
    }

    /// Apply a continuation if the scope that scheduled it is still live
    pub(crate) fn resume(
        self: &Arc<Self>,
        scope: &CancelScope,
        step: impl FnOnce(&mut Machine, &Arc<OverlayInner>),
    ) {
        let mut machine = self.machine.lock();
        if scope.is_cancelled() {
            tracing::trace!(overlay_id = %self.id, "Skipping continuation of exited state");
            return;
        }
        step(&mut *machine, self);
    }

    /// Dispatch an event; must be called without the machine lock held
    pub(crate) async fn fire(&self, kind: OverlayEventKind, detail: Option<DismissInfo>) -> bool {
        let event = OverlayEvent::new(self.id, kind, detail);
        tracing::trace!(overlay_id = %self.id, event = kind.name(), "Firing event");
        // No subscribers is fine.
        let _ = self.event_tx.send(event.clone());
        let dispatcher = self.events.read().clone();
        match dispatcher {
            Some(dispatcher) => dispatcher.fire(&event).await,
            None => true,
        }
    }

    /// Release the dispatcher and every listener registered on it
    pub(crate) fn detach_listeners(&self) {
        let dispatcher = self.events.write().take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.detach_all();
            tracing::debug!(overlay_id = %self.id, "Listeners detached");
        }
    }

    fn state(&self) -> StateName {
        *self.state_tx.borrow()
    }

    fn hide(self: &Arc<Self>, reason: DismissReason) {
        self.machine.lock().hide(reason, self);
    }
}

impl ExclusiveMember for OverlayInner {
    fn is_visible(&self) -> bool {
        !self.hidden.load(Ordering::SeqCst)
    }

    fn dismiss(self: Arc<Self>, reason: DismissReason) {
        self.hide(reason);
    }
}

impl Drop for OverlayInner {
    fn drop(&mut self) {
        self.registry.detach(&self.id);
    }
}

// ============================================================================
// Façade
// ============================================================================

/// A modal dialog, flyout or other transient surface
#[derive(Clone)]
pub struct Overlay {
    inner: Arc<OverlayInner>,
}

impl Overlay {
    /// Start building an overlay that belongs to `registry`'s exclusive class
    #[must_use]
    pub fn builder(registry: OverlayRegistry) -> OverlayBuilder {
        OverlayBuilder::new(registry)
    }

    /// Stable identifier
    #[must_use]
    pub fn id(&self) -> OverlayId {
        self.inner.id
    }

    /// Request the overlay to show
    ///
    /// Returns the dismissal future of this show cycle. Rejections
    /// ([`OverlayError::AlreadyShowing`], [`OverlayError::Disposed`]) are
    /// delivered through the returned future.
    pub fn show(&self) -> Dismissal {
        let inner = &self.inner;
        if inner.registry.policy() == ExclusivityPolicy::LightDismiss
            && inner.state() == StateName::Hidden
        {
            inner.registry.hide_all_except(&inner.id, &DismissReason::None);
        }

        let result = inner.machine.lock().show(inner);
        match result {
            Ok(dismissal) => dismissal,
            Err(err) => {
                tracing::warn!(overlay_id = %inner.id, error = %err, "Show rejected");
                Signal::rejected(err).promise()
            }
        }
    }

    /// Request the overlay to hide
    ///
    /// Never fails; states that cannot hide ignore the request.
    pub fn hide(&self, reason: impl Into<DismissReason>) {
        self.inner.hide(reason.into());
    }

    /// Tear the overlay down
    ///
    /// Rejects the outstanding dismissal with [`OverlayError::Disposed`] and
    /// detaches from the registry. Calling it again does nothing.
    pub fn dispose(&self) {
        let disposed = self.inner.machine.lock().dispose(&self.inner);
        if disposed {
            tracing::info!(overlay_id = %self.inner.id, "Overlay disposed");
        }
    }

    /// Whether the overlay currently reports itself hidden
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.hidden.load(Ordering::SeqCst)
    }

    /// Whether [`Overlay::dispose`] has run
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state() == StateName::Disposed
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> StateName {
        self.inner.state()
    }

    /// Number of transitions performed so far
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.inner.machine.lock().transitions()
    }

    /// Wait until the overlay reaches `state`
    ///
    /// States the machine passes through without resting may be missed.
    pub async fn wait_for_state(&self, state: StateName) -> bool {
        let mut rx = self.inner.state_tx.subscribe();
        let reached = rx.wait_for(|current| *current == state).await.is_ok();
        reached
    }

    /// Receive a copy of every event the overlay fires
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<OverlayEvent> {
        self.inner.event_tx.subscribe()
    }

    /// The registry this overlay belongs to
    #[must_use]
    pub fn registry(&self) -> &OverlayRegistry {
        &self.inner.registry
    }

    /// Non-owning handle
    #[must_use]
    pub fn downgrade(&self) -> WeakOverlay {
        WeakOverlay {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    /// Current content
    #[must_use]
    pub fn content(&self) -> OverlayContent {
        self.inner.content.read().clone()
    }

    /// Dialog title
    #[must_use]
    pub fn title(&self) -> String {
        self.inner.content.read().title.clone()
    }

    /// Set the dialog title
    pub fn set_title(&self, title: impl Into<String>) {
        self.update_content(|content| content.title = title.into());
    }

    /// Set or clear the primary command
    pub fn set_primary_command(&self, command: Option<CommandSpec>) {
        self.update_content(|content| content.primary = command);
    }

    /// Set or clear the secondary command
    pub fn set_secondary_command(&self, command: Option<CommandSpec>) {
        self.update_content(|content| content.secondary = command);
    }

    fn update_content(&self, change: impl FnOnce(&mut OverlayContent)) {
        let mut content = self.inner.content.write();
        change(&mut content);
        self.inner.surface.apply_content(&content);
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// A command button was clicked
    ///
    /// Returns true if the click started a hide.
    pub fn command_clicked(&self, slot: CommandSlot) -> bool {
        let enabled = self
            .inner
            .content
            .read()
            .command(slot)
            .is_some_and(|command| command.enabled);
        if !enabled {
            tracing::debug!(overlay_id = %self.inner.id, ?slot, "Ignoring click on missing or disabled command");
            return false;
        }
        self.inner.machine.lock().command_clicked(slot, &self.inner)
    }

    /// Escape key or click outside
    ///
    /// Returns true if the interaction started a hide.
    pub fn light_dismiss(&self) -> bool {
        self.inner.machine.lock().light_dismiss(&self.inner)
    }

    /// An input pane appeared over the overlay
    ///
    /// Returns true if the overlay handled it.
    pub fn input_pane_shown(&self, geometry: InputPaneGeometry) -> bool {
        self.inner.machine.lock().input_pane_shown(geometry, &self.inner)
    }

    /// The input pane went away
    ///
    /// Returns true if the overlay handled it.
    pub fn input_pane_hidden(&self) -> bool {
        self.inner.machine.lock().input_pane_hidden(&self.inner)
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("hidden", &self.is_hidden())
            .finish()
    }
}

/// Non-owning overlay handle
#[derive(Clone, Debug, Default)]
pub struct WeakOverlay {
    inner: Weak<OverlayInner>,
}

impl WeakOverlay {
    /// Get an owning handle if the overlay is still alive
    #[must_use]
    pub fn upgrade(&self) -> Option<Overlay> {
        self.inner.upgrade().map(|inner| Overlay { inner })
    }
}

impl fmt::Debug for OverlayInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayInner").field("id", &self.id).finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Overlay`]
pub struct OverlayBuilder {
    registry: OverlayRegistry,
    surface: Option<Arc<dyn OverlaySurface>>,
    animator: Option<Arc<dyn Animator>>,
    events: Option<Arc<dyn EventDispatcher>>,
    handlers: Option<OverlayHandlers>,
    content: OverlayContent,
    config: OverlayConfig,
}

impl OverlayBuilder {
    fn new(registry: OverlayRegistry) -> Self {
        Self {
            registry,
            surface: None,
            animator: None,
            events: None,
            handlers: None,
            content: OverlayContent::default(),
            config: OverlayConfig::default(),
        }
    }

    /// Rendering surface (default: [`HeadlessSurface`])
    #[must_use]
    pub fn surface(mut self, surface: Arc<dyn OverlaySurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Animator (default: derived from the configuration)
    #[must_use]
    pub fn animator(mut self, animator: Arc<dyn Animator>) -> Self {
        self.animator = Some(animator);
        self
    }

    /// Event dispatcher (default: an [`EventHub`] built from the handlers)
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Typed lifecycle handlers
    #[must_use]
    pub fn handlers(mut self, handlers: OverlayHandlers) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Dialog title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.content.title = title.into();
        self
    }

    /// Primary command
    #[must_use]
    pub fn primary_command(mut self, command: CommandSpec) -> Self {
        self.content.primary = Some(command);
        self
    }

    /// Secondary command
    #[must_use]
    pub fn secondary_command(mut self, command: CommandSpec) -> Self {
        self.content.secondary = Some(command);
        self
    }

    /// Configuration used for defaults
    #[must_use]
    pub fn config(mut self, config: OverlayConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the overlay and bring it to `Hidden`
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::NoRuntime`] when called outside a Tokio runtime.
    pub fn build(self) -> Result<Overlay> {
        let runtime = Handle::try_current().map_err(|_| OverlayError::NoRuntime)?;

        let events: Arc<dyn EventDispatcher> = match (self.events, self.handlers) {
            (Some(events), None) => events,
            (Some(events), Some(_)) => {
                tracing::warn!("Custom event dispatcher supplied; typed handlers ignored");
                events
            }
            (None, handlers) => Arc::new(EventHub::from_handlers(handlers.unwrap_or_default())),
        };
        let surface = self
            .surface
            .unwrap_or_else(|| Arc::new(HeadlessSurface::new()));
        let animator = self
            .animator
            .unwrap_or_else(|| animator_from_config(&self.config.animation));

        let (state_tx, _) = watch::channel(StateName::Init);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Arc::new(OverlayInner {
            id: OverlayId::new(),
            surface,
            animator,
            events: RwLock::new(Some(events)),
            registry: self.registry,
            runtime,
            machine: Mutex::new(Machine::new()),
            content: RwLock::new(self.content),
            hidden: AtomicBool::new(true),
            state_tx,
            event_tx,
        });

        let member: Weak<dyn ExclusiveMember> = Arc::downgrade(&inner) as Weak<dyn ExclusiveMember>;
        inner.registry.attach(inner.id, member);
        inner.surface.apply_content(&inner.content.read());
        inner.machine.lock().start(&inner);

        tracing::debug!(overlay_id = %inner.id, "Overlay created");
        Ok(Overlay { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::NoAnimation;
    use crate::surface::SurfaceCall;

    fn headless(registry: &OverlayRegistry) -> (Overlay, Arc<HeadlessSurface>) {
        let surface = Arc::new(HeadlessSurface::new());
        let overlay = Overlay::builder(registry.clone())
            .surface(surface.clone())
            .animator(Arc::new(NoAnimation))
            .title("Confirm")
            .primary_command(CommandSpec::new("OK"))
            .secondary_command(CommandSpec::new("Cancel").disabled())
            .build()
            .unwrap();
        (overlay, surface)
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let err = Overlay::builder(OverlayRegistry::modal()).build().unwrap_err();
        assert_eq!(err, OverlayError::NoRuntime);
    }

    #[tokio::test]
    async fn test_new_overlay_is_hidden_and_attached() {
        let registry = OverlayRegistry::modal();
        let (overlay, surface) = headless(&registry);

        assert_eq!(overlay.state(), StateName::Hidden);
        assert!(overlay.is_hidden());
        assert!(!overlay.is_disposed());
        assert!(registry.contains(&overlay.id()));
        assert_eq!(overlay.transition_count(), 1);
        assert_eq!(
            surface.calls(),
            vec![SurfaceCall::ApplyContent(overlay.content())]
        );
    }

    #[tokio::test]
    async fn test_content_changes_reach_surface() {
        let registry = OverlayRegistry::modal();
        let (overlay, surface) = headless(&registry);
        surface.take_calls();

        overlay.set_title("Delete file?");
        assert_eq!(overlay.title(), "Delete file?");
        assert!(matches!(
            surface.calls().as_slice(),
            [SurfaceCall::ApplyContent(content)] if content.title == "Delete file?"
        ));
    }

    #[tokio::test]
    async fn test_disabled_command_click_is_ignored() {
        let registry = OverlayRegistry::modal();
        let (overlay, _surface) = headless(&registry);
        let _dismissal = overlay.show();
        assert!(overlay.wait_for_state(StateName::Shown).await);

        assert!(!overlay.command_clicked(CommandSlot::Secondary));
        assert_eq!(overlay.state(), StateName::Shown);
        assert!(overlay.command_clicked(CommandSlot::Primary));
    }

    #[tokio::test]
    async fn test_dropping_last_handle_detaches() {
        let registry = OverlayRegistry::modal();
        let (overlay, _surface) = headless(&registry);
        let weak = overlay.downgrade();
        assert_eq!(registry.count(), 1);

        drop(overlay);
        assert!(weak.upgrade().is_none());
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_dismissal_abandoned_when_overlay_dropped() {
        let registry = OverlayRegistry::modal();
        let (overlay, _surface) = headless(&registry);
        let dismissal = overlay.show();
        assert!(overlay.wait_for_state(StateName::Shown).await);

        drop(overlay);
        assert_eq!(dismissal.await, Err(OverlayError::Abandoned));
    }
}
