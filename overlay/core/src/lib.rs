//! Overlay Core - Lifecycle State Machine for Modal Surfaces
//!
//! This crate drives the show/hide lifecycle of transient UI surfaces:
//! dialogs, flyouts and app bars. It owns no rendering. Surfaces, animations
//! and event listeners plug in through small collaborator traits, and the
//! state machine makes their interplay deterministic:
//!
//! - `show()` / `hide()` may be called at any time, including from inside
//!   event listeners and while animations are in flight
//! - work belonging to a state that has been left never takes effect
//! - at most one overlay of an exclusive class is showing at a time
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Overlay (façade)                         │
//! │   show() ─► Dismissal     hide(reason)     dispose()     hidden  │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ forwards to current state
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                          State Machine                           │
//! │  Init ─► Hidden ─► BeforeShow ─► Showing ─► Shown ─► BeforeHide  │
//! │            ▲                                             │       │
//! │            └──────────────── Hiding ◄────────────────────┘       │
//! │  each state: CancelScope + async body + exhaustive operations    │
//! └─────┬──────────────────┬──────────────────┬──────────────────────┘
//!       │                  │                  │
//! ┌─────▼──────┐   ┌───────▼───────┐   ┌──────▼──────────┐
//! │  Animator  │   │EventDispatcher│   │ OverlaySurface  │
//! └────────────┘   └───────────────┘   └─────────────────┘
//!                                 │
//!                  ┌──────────────▼─────────────┐
//!                  │ OverlayRegistry (per class)│
//!                  └────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use overlay_core::{CommandSlot, CommandSpec, Overlay, OverlayRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), overlay_core::OverlayError> {
//!     let registry = OverlayRegistry::modal();
//!     let dialog = Overlay::builder(registry)
//!         .title("Save changes?")
//!         .primary_command(CommandSpec::new("Save"))
//!         .secondary_command(CommandSpec::new("Discard"))
//!         .build()?;
//!
//!     let dismissal = dialog.show();
//!     dialog.wait_for_state(overlay_core::StateName::Shown).await;
//!     dialog.command_clicked(CommandSlot::Primary);
//!
//!     println!("dismissed with {}", dismissal.await?.reason);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`overlay`]: The public façade and its builder
//! - [`registry`]: Exclusivity bookkeeping per overlay class
//! - [`events`]: Lifecycle events, the dispatcher trait and [`EventHub`]
//! - [`animation`]: Animator contract and built-in animators
//! - [`surface`]: Rendering contract and [`HeadlessSurface`]
//! - [`signal`]: Externally-completed single-assignment futures
//! - [`scope`]: Per-state cancellation scopes
//! - [`reactor`]: Input-pane notification forwarding
//! - [`config`]: TOML / environment configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod config;
pub mod error;
pub mod events;
mod machine;
pub mod overlay;
pub mod reactor;
pub mod registry;
pub mod scope;
pub mod signal;
pub mod surface;
pub mod types;

// Re-exports for convenience
pub use animation::{
    animator_from_config, play_cancelable, AnimationKind, AnimationOutcome, Animator, NoAnimation,
    TimedAnimation,
};
pub use error::{OverlayError, Result};
pub use events::{
    EventArgs, EventDispatcher, EventHub, Listener, ListenerId, OverlayEvent, OverlayEventKind,
    OverlayHandlers,
};
pub use overlay::{Dismissal, Overlay, OverlayBuilder, WeakOverlay};
pub use reactor::{spawn_input_pane_reactor, InputPaneNotification, ReactorStats};
pub use registry::{ExclusiveMember, ExclusivityPolicy, OverlayRegistry, RegistrySummary};
pub use scope::CancelScope;
pub use signal::{Signal, SignalError, SignalFuture};
pub use surface::{HeadlessSurface, OverlaySurface, SurfaceCall};
pub use types::{
    CommandSlot, CommandSpec, DismissInfo, DismissReason, InputPaneGeometry, OverlayContent,
    OverlayId, StateName,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, AnimationConfig, ConfigError,
    ConfigOverrides, ConfigSource, OverlayConfig, OverlayToml,
};
