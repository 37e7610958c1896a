//! Shared fixtures for overlay integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use overlay_core::{
    AnimationKind, Animator, CommandSpec, EventHub, HeadlessSurface, Overlay, OverlayEventKind,
    OverlayRegistry, StateName,
};

/// Upper bound for any single wait in these tests
pub const WAIT: Duration = Duration::from_secs(5);

/// Animator that records every effect it starts and can be held closed
pub struct RecordingAnimator {
    started: Mutex<Vec<AnimationKind>>,
    gate: watch::Sender<bool>,
}

impl RecordingAnimator {
    /// Effects complete as soon as they start
    pub fn instant() -> Arc<Self> {
        Self::with_gate(true)
    }

    /// Effects wait until [`RecordingAnimator::open`] is called
    pub fn gated() -> Arc<Self> {
        Self::with_gate(false)
    }

    fn with_gate(open: bool) -> Arc<Self> {
        let (gate, _) = watch::channel(open);
        Arc::new(Self {
            started: Mutex::new(Vec::new()),
            gate,
        })
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    /// Hold effects started from now on
    pub fn close(&self) {
        self.gate.send_replace(false);
    }

    pub fn started(&self) -> Vec<AnimationKind> {
        self.started.lock().clone()
    }

    async fn play(&self, kind: AnimationKind) {
        self.started.lock().push(kind);
        let mut rx = self.gate.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl Animator for RecordingAnimator {
    async fn play_entrance(&self) {
        self.play(AnimationKind::Entrance).await;
    }

    async fn play_exit(&self) {
        self.play(AnimationKind::Exit).await;
    }
}

/// An overlay wired to recording collaborators
pub struct Harness {
    pub overlay: Overlay,
    pub surface: Arc<HeadlessSurface>,
    pub animator: Arc<RecordingAnimator>,
    pub hub: Arc<EventHub>,
    log: Arc<Mutex<Vec<OverlayEventKind>>>,
}

impl Harness {
    pub fn new(registry: &OverlayRegistry) -> Self {
        Self::with_animator(registry, RecordingAnimator::instant())
    }

    pub fn gated(registry: &OverlayRegistry) -> Self {
        Self::with_animator(registry, RecordingAnimator::gated())
    }

    pub fn with_animator(registry: &OverlayRegistry, animator: Arc<RecordingAnimator>) -> Self {
        let surface = Arc::new(HeadlessSurface::new());
        let hub = Arc::new(EventHub::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in OverlayEventKind::ALL {
            let log = Arc::clone(&log);
            hub.add_listener(kind, move |args| log.lock().push(args.event().kind));
        }

        let overlay = Overlay::builder(registry.clone())
            .surface(surface.clone())
            .animator(animator.clone())
            .events(hub.clone())
            .title("Unsaved changes")
            .primary_command(CommandSpec::new("Save"))
            .secondary_command(CommandSpec::new("Discard"))
            .build()
            .expect("overlay builds inside a runtime");

        Self {
            overlay,
            surface,
            animator,
            hub,
            log,
        }
    }

    /// Event kinds fired so far, in order
    pub fn events(&self) -> Vec<OverlayEventKind> {
        self.log.lock().clone()
    }

    /// Wait for a state, failing the test on timeout
    pub async fn reach(&self, state: StateName) {
        reach(&self.overlay, state).await;
    }
}

/// Wait for an overlay to reach a state, failing the test on timeout
pub async fn reach(overlay: &Overlay, state: StateName) {
    let reached = tokio::time::timeout(WAIT, overlay.wait_for_state(state))
        .await
        .unwrap_or_else(|_| panic!("{} never reached {state}; stuck in {}", overlay.id(), overlay.state()));
    assert!(reached);
}

/// Let spawned state bodies run for a while
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
}
