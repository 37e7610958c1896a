//! Overlay Value Types
//!
//! Identifiers, dismissal reasons, state names and content descriptions shared
//! by the state machine, the façade and the collaborators.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for an overlay instance
///
/// Assigned once at construction and stable for the lifetime of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayId(u64);

impl OverlayId {
    /// Create a new unique overlay ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Create an overlay ID from a raw value (for testing)
    #[cfg(test)]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for OverlayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

/// Why an overlay was dismissed
///
/// `primary`, `secondary` and `none` are the conventional tokens; anything
/// else a consumer passes is carried through as [`DismissReason::Custom`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DismissReason {
    /// The primary command was invoked
    Primary,
    /// The secondary command was invoked
    Secondary,
    /// Dismissed without a command (escape, light dismiss, plain `hide()`)
    #[default]
    None,
    /// Consumer-defined token
    Custom(String),
}

impl DismissReason {
    /// The token as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::None => "none",
            Self::Custom(token) => token,
        }
    }
}

impl From<&str> for DismissReason {
    fn from(token: &str) -> Self {
        match token {
            "primary" => Self::Primary,
            "secondary" => Self::Secondary,
            "none" | "" => Self::None,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for DismissReason {
    fn from(token: String) -> Self {
        Self::from(token.as_str())
    }
}

impl fmt::Display for DismissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value a dismissal future resolves with
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissInfo {
    /// The reason passed to the `hide()` that ended the show cycle
    pub reason: DismissReason,
}

impl DismissInfo {
    /// Create dismissal info for a reason
    pub fn new(reason: impl Into<DismissReason>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Name of a state in the overlay lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateName {
    /// Construction pseudostate
    Init,
    /// At rest, not visible
    Hidden,
    /// Firing `beforeshow`
    BeforeShow,
    /// Entrance animation in flight
    Showing,
    /// At rest, visible
    Shown,
    /// Firing the cancelable `beforehide`
    BeforeHide,
    /// Exit animation in flight
    Hiding,
    /// Terminal
    Disposed,
}

impl StateName {
    /// Whether the overlay reports itself hidden while in this state
    #[must_use]
    pub fn is_hidden(self) -> bool {
        match self {
            Self::Init | Self::Hidden | Self::BeforeShow | Self::Hiding | Self::Disposed => true,
            Self::Showing | Self::Shown | Self::BeforeHide => false,
        }
    }

    /// Rest states are the only ones that replay a pending operation
    #[must_use]
    pub fn is_at_rest(self) -> bool {
        matches!(self, Self::Hidden | Self::Shown)
    }

    /// Human-readable label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Hidden => "Hidden",
            Self::BeforeShow => "BeforeShow",
            Self::Showing => "Showing",
            Self::Shown => "Shown",
            Self::BeforeHide => "BeforeHide",
            Self::Hiding => "Hiding",
            Self::Disposed => "Disposed",
        }
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which dialog command a click landed on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandSlot {
    /// The primary command button
    Primary,
    /// The secondary command button
    Secondary,
}

impl CommandSlot {
    /// The dismissal reason a click on this slot produces
    #[must_use]
    pub fn reason(self) -> DismissReason {
        match self {
            Self::Primary => DismissReason::Primary,
            Self::Secondary => DismissReason::Secondary,
        }
    }
}

/// A dialog command button
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Button label
    pub label: String,
    /// Whether clicks are accepted
    pub enabled: bool,
}

impl CommandSpec {
    /// Create an enabled command
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
        }
    }

    /// Mark the command as disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Content mirrored onto the surface
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayContent {
    /// Title text
    pub title: String,
    /// Primary command, if any
    pub primary: Option<CommandSpec>,
    /// Secondary command, if any
    pub secondary: Option<CommandSpec>,
}

impl OverlayContent {
    /// The command in a slot
    #[must_use]
    pub fn command(&self, slot: CommandSlot) -> Option<&CommandSpec> {
        match slot {
            CommandSlot::Primary => self.primary.as_ref(),
            CommandSlot::Secondary => self.secondary.as_ref(),
        }
    }
}

/// Geometry of an occluding surface (on-screen keyboard)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPaneGeometry {
    /// Left edge of the occluded rectangle
    pub x: u32,
    /// Top edge of the occluded rectangle
    pub y: u32,
    /// Width of the occluded rectangle
    pub width: u32,
    /// Height of the occluded rectangle
    pub height: u32,
}

impl InputPaneGeometry {
    /// Occluded rectangle anchored at `(x, y)`
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
