//! Overlay Events
//!
//! The four lifecycle events an overlay fires, the dispatcher contract the
//! state machine fires them through, and [`EventHub`], the built-in
//! dispatcher that fans events out to registered listeners.
//!
//! # Event Order
//!
//! ```text
//! show():  beforeshow ──► [entrance] ──► aftershow
//! hide():  beforehide ──► [exit]     ──► afterhide
//!              │
//!              └── prevent_default() keeps the overlay shown
//! ```
//!
//! Events are always dispatched with the overlay's state lock released, so a
//! listener may call `show()` or `hide()` on the overlay that fired it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{DismissInfo, OverlayId};

// ============================================================================
// Event Types
// ============================================================================

/// Which lifecycle event is being fired
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayEventKind {
    /// The overlay is about to become visible (informational)
    BeforeShow,
    /// The entrance animation finished
    AfterShow,
    /// The overlay is about to hide; listeners may veto
    BeforeHide,
    /// The overlay finished hiding
    AfterHide,
}

impl OverlayEventKind {
    /// All kinds in lifecycle order
    pub const ALL: [Self; 4] = [
        Self::BeforeShow,
        Self::AfterShow,
        Self::BeforeHide,
        Self::AfterHide,
    ];

    /// Event name as consumers know it
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BeforeShow => "beforeshow",
            Self::AfterShow => "aftershow",
            Self::BeforeHide => "beforehide",
            Self::AfterHide => "afterhide",
        }
    }

    /// Only `beforehide` honours `prevent_default()`
    #[must_use]
    pub fn is_cancelable(self) -> bool {
        matches!(self, Self::BeforeHide)
    }
}

impl fmt::Display for OverlayEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fired lifecycle event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayEvent {
    /// Overlay that fired the event
    pub overlay_id: OverlayId,
    /// Which event
    pub kind: OverlayEventKind,
    /// Dismissal details (hide events only)
    pub detail: Option<DismissInfo>,
    /// Whether listeners may veto
    pub cancelable: bool,
}

impl OverlayEvent {
    /// Build an event, deriving `cancelable` from the kind
    #[must_use]
    pub fn new(overlay_id: OverlayId, kind: OverlayEventKind, detail: Option<DismissInfo>) -> Self {
        Self {
            overlay_id,
            kind,
            detail,
            cancelable: kind.is_cancelable(),
        }
    }
}

/// What a listener sees while an event is being dispatched
#[derive(Debug)]
pub struct EventArgs<'a> {
    event: &'a OverlayEvent,
    default_prevented: bool,
}

impl<'a> EventArgs<'a> {
    /// Wrap an event for dispatch
    #[must_use]
    pub fn new(event: &'a OverlayEvent) -> Self {
        Self {
            event,
            default_prevented: false,
        }
    }

    /// The event being dispatched
    #[must_use]
    pub fn event(&self) -> &OverlayEvent {
        self.event
    }

    /// Veto the default action
    ///
    /// Ignored for events that are not cancelable.
    pub fn prevent_default(&mut self) {
        if self.event.cancelable {
            self.default_prevented = true;
        }
    }

    /// Whether a listener vetoed the default action
    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

// ============================================================================
// Dispatcher Contract
// ============================================================================

/// Fires lifecycle events at consumers
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    /// Dispatch an event
    ///
    /// Returns true when the default action is allowed (nobody vetoed).
    async fn fire(&self, event: &OverlayEvent) -> bool;

    /// Drop every registered listener
    ///
    /// Called once when the owning overlay is disposed.
    fn detach_all(&self) {}
}

/// A synchronous event listener
pub type Listener = Arc<dyn Fn(&mut EventArgs<'_>) + Send + Sync>;

/// Typed handler set naming exactly the four lifecycle events
#[derive(Clone, Default)]
pub struct OverlayHandlers {
    /// Called on `beforeshow`
    pub on_before_show: Option<Listener>,
    /// Called on `aftershow`
    pub on_after_show: Option<Listener>,
    /// Called on `beforehide`; may call `prevent_default()`
    pub on_before_hide: Option<Listener>,
    /// Called on `afterhide`
    pub on_after_hide: Option<Listener>,
}

impl OverlayHandlers {
    /// Set the `beforeshow` handler
    #[must_use]
    pub fn before_show(mut self, f: impl Fn(&mut EventArgs<'_>) + Send + Sync + 'static) -> Self {
        self.on_before_show = Some(Arc::new(f));
        self
    }

    /// Set the `aftershow` handler
    #[must_use]
    pub fn after_show(mut self, f: impl Fn(&mut EventArgs<'_>) + Send + Sync + 'static) -> Self {
        self.on_after_show = Some(Arc::new(f));
        self
    }

    /// Set the `beforehide` handler
    #[must_use]
    pub fn before_hide(mut self, f: impl Fn(&mut EventArgs<'_>) + Send + Sync + 'static) -> Self {
        self.on_before_hide = Some(Arc::new(f));
        self
    }

    /// Set the `afterhide` handler
    #[must_use]
    pub fn after_hide(mut self, f: impl Fn(&mut EventArgs<'_>) + Send + Sync + 'static) -> Self {
        self.on_after_hide = Some(Arc::new(f));
        self
    }

    fn into_pairs(self) -> impl Iterator<Item = (OverlayEventKind, Listener)> {
        [
            (OverlayEventKind::BeforeShow, self.on_before_show),
            (OverlayEventKind::AfterShow, self.on_after_show),
            (OverlayEventKind::BeforeHide, self.on_before_hide),
            (OverlayEventKind::AfterHide, self.on_after_hide),
        ]
        .into_iter()
        .filter_map(|(kind, listener)| listener.map(|l| (kind, l)))
    }
}

impl fmt::Debug for OverlayHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayHandlers")
            .field("on_before_show", &self.on_before_show.is_some())
            .field("on_after_show", &self.on_after_show.is_some())
            .field("on_before_hide", &self.on_before_hide.is_some())
            .field("on_after_hide", &self.on_after_hide.is_some())
            .finish()
    }
}

// ============================================================================
// Event Hub
// ============================================================================

/// Handle returned by [`EventHub::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Listener registry that implements [`EventDispatcher`]
///
/// Listeners run in registration order. The listener list is snapshotted
/// before dispatch, so listeners may add or remove listeners while running.
#[derive(Default)]
pub struct EventHub {
    listeners: RwLock<HashMap<OverlayEventKind, Vec<(ListenerId, Listener)>>>,
}

impl EventHub {
    /// Create a hub with no listeners
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hub pre-populated from a handler set
    #[must_use]
    pub fn from_handlers(handlers: OverlayHandlers) -> Self {
        let hub = Self::new();
        for (kind, listener) in handlers.into_pairs() {
            hub.insert(kind, listener);
        }
        hub
    }

    /// Register a listener for one event kind
    pub fn add_listener(
        &self,
        kind: OverlayEventKind,
        listener: impl Fn(&mut EventArgs<'_>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.insert(kind, Arc::new(listener))
    }

    fn insert(&self, kind: OverlayEventKind, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, listener));
        tracing::trace!(listener_id = %id, event = kind.name(), "Listener added");
        id
    }

    /// Remove a listener
    ///
    /// Returns true if it was registered for `kind`.
    pub fn remove_listener(&self, kind: OverlayEventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        before != list.len()
    }

    /// Number of listeners registered for a kind
    #[must_use]
    pub fn listener_count(&self, kind: OverlayEventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Remove every listener
    ///
    /// Returns how many were removed. The listeners are dropped after the
    /// hub's lock is released.
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.listeners.write());
        let count = removed.values().map(Vec::len).sum();
        drop(removed);
        tracing::trace!(removed = count, "Listeners cleared");
        count
    }

    /// Run every listener for the event synchronously
    ///
    /// Returns true when the default action is allowed.
    pub fn dispatch(&self, event: &OverlayEvent) -> bool {
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .get(&event.kind)
            .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        let mut args = EventArgs::new(event);
        for listener in snapshot {
            listener(&mut args);
        }
        !args.is_default_prevented()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let counts: HashMap<_, _> = listeners
            .iter()
            .map(|(kind, list)| (kind.name(), list.len()))
            .collect();
        f.debug_struct("EventHub").field("listeners", &counts).finish()
    }
}

#[async_trait]
impl EventDispatcher for EventHub {
    async fn fire(&self, event: &OverlayEvent) -> bool {
        self.dispatch(event)
    }

    fn detach_all(&self) {
        self.clear();
    }
}
