//! Overlay Registry - Exclusivity Bookkeeping
//!
//! An [`OverlayRegistry`] tracks every overlay of one exclusive class (all
//! modal dialogs, or all flyouts) and decides whether a new show may begin.
//! Registries are plain values handed to overlays at construction; there is
//! no process-wide instance, so tests build as many independent classes as
//! they need.
//!
//! # Architecture
//!
//! ```text
//!                      OverlayRegistry
//!                     ┌──────────────────────────────────────┐
//!                     │ HashMap<OverlayId, MemberEntry>      │
//!                     │   - wrapped in Arc<RwLock<>>         │
//!                     │   - engaged: at most one (Modal)     │
//!                     └───────────────┬──────────────────────┘
//!                                     │ Weak<dyn ExclusiveMember>
//!              ┌──────────────────────┼──────────────────────┐
//!       ┌──────▼──────┐       ┌───────▼──────┐       ┌───────▼──────┐
//!       │  Dialog A   │       │  Dialog B    │       │  Dialog C    │
//!       └─────────────┘       └──────────────┘       └──────────────┘
//! ```
//!
//! # Engagement
//!
//! An overlay is *engaged* from the moment its `show()` is accepted until it
//! is back in `Hidden` (or disposed). Under [`ExclusivityPolicy::Modal`] the
//! engage check and the engage itself happen under one write lock, so two
//! shows can never both win.
//!
//! # Lock Ordering
//!
//! Overlays call into the registry while holding their own state lock. The
//! registry therefore never calls back into a member while holding its own
//! lock: [`OverlayRegistry::hide_all_except`] snapshots the members first.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{DismissReason, OverlayId};

/// How overlays of one class share the screen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusivityPolicy {
    /// A second show is rejected while one overlay is engaged
    #[default]
    Modal,
    /// Showing one overlay light-dismisses the others
    LightDismiss,
}

impl ExclusivityPolicy {
    /// Parse a policy name (`modal`, `light_dismiss`, `light-dismiss`)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "modal" => Some(Self::Modal),
            "light_dismiss" | "light-dismiss" | "lightdismiss" => Some(Self::LightDismiss),
            _ => None,
        }
    }
}

/// What the registry needs from a tracked overlay
pub trait ExclusiveMember: Send + Sync {
    /// Whether the member is non-hidden and not disposed
    fn is_visible(&self) -> bool;

    /// Ask the member to hide itself through its own `hide()`
    fn dismiss(self: Arc<Self>, reason: DismissReason);
}

struct MemberEntry {
    member: Weak<dyn ExclusiveMember>,
    engaged: bool,
    attached_at: Instant,
}

/// Registry for one exclusive class of overlays
///
/// Cloning the registry yields another handle to the same class.
#[derive(Clone)]
pub struct OverlayRegistry {
    policy: ExclusivityPolicy,
    inner: Arc<RwLock<HashMap<OverlayId, MemberEntry>>>,
}

impl Default for OverlayRegistry {
    fn default() -> Self {
        Self::new(ExclusivityPolicy::default())
    }
}

impl std::fmt::Debug for OverlayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRegistry")
            .field("policy", &self.policy)
            .field("members", &self.count())
            .finish()
    }
}

impl OverlayRegistry {
    /// Create an empty registry with a policy
    #[must_use]
    pub fn new(policy: ExclusivityPolicy) -> Self {
        Self {
            policy,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry where concurrent shows are rejected
    #[must_use]
    pub fn modal() -> Self {
        Self::new(ExclusivityPolicy::Modal)
    }

    /// Registry where a show dismisses the other members
    #[must_use]
    pub fn light_dismiss() -> Self {
        Self::new(ExclusivityPolicy::LightDismiss)
    }

    /// The class policy
    #[must_use]
    pub fn policy(&self) -> ExclusivityPolicy {
        self.policy
    }

    /// Start tracking an overlay
    pub fn attach(&self, id: OverlayId, member: Weak<dyn ExclusiveMember>) {
        self.inner.write().insert(
            id,
            MemberEntry {
                member,
                engaged: false,
                attached_at: Instant::now(),
            },
        );
        tracing::info!(overlay_id = %id, "Overlay attached to registry");
    }

    /// Stop tracking an overlay
    ///
    /// Returns true if it was tracked.
    pub fn detach(&self, id: &OverlayId) -> bool {
        let removed = self.inner.write().remove(id).is_some();
        if removed {
            tracing::info!(overlay_id = %id, "Overlay detached from registry");
        }
        removed
    }

    /// Number of tracked overlays
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether an overlay is tracked
    #[must_use]
    pub fn contains(&self, id: &OverlayId) -> bool {
        self.inner.read().contains_key(id)
    }

    /// True if any tracked overlay is non-hidden and not disposed
    #[must_use]
    pub fn is_any_visible(&self) -> bool {
        self.snapshot()
            .iter()
            .filter_map(|snap| snap.member.as_ref())
            .any(|member| member.is_visible())
    }

    /// The engaged overlay, if any
    #[must_use]
    pub fn engaged(&self) -> Option<OverlayId> {
        self.inner
            .read()
            .iter()
            .find(|(_, entry)| entry.engaged)
            .map(|(id, _)| *id)
    }

    /// Claim the class for `id` at the start of a show
    ///
    /// # Errors
    ///
    /// Under [`ExclusivityPolicy::Modal`], returns the ID of the overlay that
    /// already holds the class. Light-dismiss classes never refuse.
    pub fn try_engage(&self, id: OverlayId) -> Result<(), OverlayId> {
        let mut inner = self.inner.write();

        if self.policy == ExclusivityPolicy::Modal {
            let blocker = inner
                .iter()
                .find(|(other, entry)| **other != id && entry.engaged)
                .map(|(other, _)| *other);
            if let Some(blocker) = blocker {
                return Err(blocker);
            }
        }

        match inner.get_mut(&id) {
            Some(entry) => {
                entry.engaged = true;
                Ok(())
            }
            None => {
                tracing::warn!(overlay_id = %id, "Engage requested by untracked overlay");
                Ok(())
            }
        }
    }

    /// Give the class back once the overlay is hidden again
    pub fn release(&self, id: &OverlayId) {
        if let Some(entry) = self.inner.write().get_mut(id) {
            entry.engaged = false;
        }
    }

    /// Light-dismiss every other visible or engaged overlay
    ///
    /// Each sibling goes through its own `hide()`. Returns how many were
    /// asked to hide.
    pub fn hide_all_except(&self, id: &OverlayId, reason: &DismissReason) -> usize {
        let siblings: Vec<Arc<dyn ExclusiveMember>> = self
            .snapshot()
            .into_iter()
            .filter(|snap| snap.id != *id)
            .filter_map(|snap| {
                let member = snap.member?;
                (snap.engaged || member.is_visible()).then_some(member)
            })
            .collect();

        let count = siblings.len();
        for member in siblings {
            member.dismiss(reason.clone());
        }
        if count > 0 {
            tracing::debug!(overlay_id = %id, dismissed = count, "Light-dismissed siblings");
        }
        count
    }

    /// Drop entries whose overlay no longer exists
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_dropped(&self) -> usize {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|_, entry| entry.member.strong_count() > 0);
        let removed = before - inner.len();
        if removed > 0 {
            tracing::info!(removed = removed, "Cleaned up dropped overlays");
        }
        removed
    }

    /// Snapshot for diagnostics
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        let members = self.snapshot();
        let mut summary = RegistrySummary {
            policy: self.policy,
            total: members.len(),
            engaged: None,
            visible: 0,
            oldest_attached_secs: 0,
        };
        for snap in &members {
            if snap.engaged {
                summary.engaged = Some(snap.id);
            }
            if snap.member.as_ref().is_some_and(|m| m.is_visible()) {
                summary.visible += 1;
            }
            summary.oldest_attached_secs = summary
                .oldest_attached_secs
                .max(snap.attached_at.elapsed().as_secs());
        }
        summary
    }

    /// Upgrade every member under the read lock
    ///
    /// The guard is gone by the time the caller drops the upgraded handles,
    /// so a member whose last reference dies here can detach itself.
    fn snapshot(&self) -> Vec<MemberSnapshot> {
        let inner = self.inner.read();
        inner
            .iter()
            .map(|(id, entry)| MemberSnapshot {
                id: *id,
                engaged: entry.engaged,
                attached_at: entry.attached_at,
                member: entry.member.upgrade(),
            })
            .collect()
    }
}

struct MemberSnapshot {
    id: OverlayId,
    engaged: bool,
    attached_at: Instant,
    member: Option<Arc<dyn ExclusiveMember>>,
}

/// Diagnostic snapshot of a registry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    /// Class policy
    pub policy: ExclusivityPolicy,
    /// Tracked overlays
    pub total: usize,
    /// Overlay holding the class, if any
    pub engaged: Option<OverlayId>,
    /// Overlays currently non-hidden
    pub visible: usize,
    /// Age of the longest-tracked member
    pub oldest_attached_secs: u64,
}
