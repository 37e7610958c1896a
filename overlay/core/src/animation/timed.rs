//! Built-in Animators
//!
//! Surfaces with real effects supply their own [`Animator`]. These two cover
//! headless use: an instant one, and one that only models duration.

use std::time::Duration;

use async_trait::async_trait;

use super::Animator;

/// Animator whose effects complete immediately
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAnimation;

#[async_trait]
impl Animator for NoAnimation {
    async fn play_entrance(&self) {}

    async fn play_exit(&self) {}
}

/// Animator that takes a fixed amount of time per effect
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedAnimation {
    entrance: Duration,
    exit: Duration,
}

impl TimedAnimation {
    /// Create an animator with the given durations
    #[must_use]
    pub fn new(entrance: Duration, exit: Duration) -> Self {
        Self { entrance, exit }
    }

    /// Entrance duration
    #[must_use]
    pub fn entrance(&self) -> Duration {
        self.entrance
    }

    /// Exit duration
    #[must_use]
    pub fn exit(&self) -> Duration {
        self.exit
    }
}

#[async_trait]
impl Animator for TimedAnimation {
    async fn play_entrance(&self) {
        tokio::time::sleep(self.entrance).await;
    }

    async fn play_exit(&self) {
        tokio::time::sleep(self.exit).await;
    }
}
