//! Animation Collaborator Contract
//!
//! The state machine does not render anything. It asks an [`Animator`] to
//! play the entrance or exit effect and waits for it to settle. Animators
//! never fail on their own; the only way an animation ends early is when the
//! state that started it is exited, and [`play_cancelable`] reports that as
//! [`AnimationOutcome::Canceled`].
//!
//! # Architecture
//!
//! ```text
//! Showing.enter ──► play_cancelable(Entrance) ──► Animator::play_entrance
//!                          │
//!                          └── CancelScope (closed by Showing.exit)
//! ```

mod timed;

pub use timed::{NoAnimation, TimedAnimation};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AnimationConfig;
use crate::scope::CancelScope;

/// Plays entrance and exit effects for one overlay surface
///
/// Implementations must not fail; dropping the returned future is how a
/// running animation is interrupted.
#[async_trait]
pub trait Animator: Send + Sync {
    /// Play the effect that reveals the surface
    async fn play_entrance(&self);

    /// Play the effect that removes the surface
    async fn play_exit(&self);
}

/// Which effect is being played
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationKind {
    /// Entrance effect
    Entrance,
    /// Exit effect
    Exit,
}

impl AnimationKind {
    /// Lowercase name for logs
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Entrance => "entrance",
            Self::Exit => "exit",
        }
    }
}

/// How a cancelable animation settled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationOutcome {
    /// The effect ran to completion
    Completed,
    /// The owning state was exited first
    Canceled,
}

impl AnimationOutcome {
    /// Whether the animation finished normally
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Play an animation inside a state's cancellation scope
pub async fn play_cancelable(
    animator: &dyn Animator,
    kind: AnimationKind,
    scope: &CancelScope,
) -> AnimationOutcome {
    let played = match kind {
        AnimationKind::Entrance => scope.run(animator.play_entrance()).await,
        AnimationKind::Exit => scope.run(animator.play_exit()).await,
    };
    match played {
        Some(()) => AnimationOutcome::Completed,
        None => {
            tracing::debug!(animation = kind.name(), "Animation canceled");
            AnimationOutcome::Canceled
        }
    }
}

/// Build the animator described by a configuration
#[must_use]
pub fn animator_from_config(config: &AnimationConfig) -> Arc<dyn Animator> {
    if config.enabled {
        Arc::new(TimedAnimation::new(config.entrance, config.exit))
    } else {
        Arc::new(NoAnimation)
    }
}
