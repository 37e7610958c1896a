//! Demo Scenarios
//!
//! Each scenario drives one or more headless overlays through a scripted
//! sequence and records what happened as a [`Transcript`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use parking_lot::Mutex;
use serde::Serialize;

use overlay_core::{
    CommandSlot, CommandSpec, DismissReason, Dismissal, EventHub, Overlay, OverlayConfig,
    OverlayEventKind, OverlayId, OverlayRegistry, StateName,
};

/// How long any single wait may take before the scenario is declared stuck
const STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Named scenario
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Show a dialog and dismiss it with the primary command
    Basic,
    /// Hide immediately after show; the entrance never plays
    Rapid,
    /// A beforehide listener vetoes the first hide
    Veto,
    /// Two overlays compete for one exclusive class
    Exclusive,
    /// Dispose while a show is in flight
    Dispose,
}

impl Scenario {
    /// Scenario name as typed on the command line
    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Rapid => "rapid",
            Self::Veto => "veto",
            Self::Exclusive => "exclusive",
            Self::Dispose => "dispose",
        }
    }
}

/// One line of a transcript
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    /// An event fired
    Event {
        /// Firing overlay
        overlay: OverlayId,
        /// Event kind
        event: OverlayEventKind,
        /// Dismissal reason carried by hide events
        reason: Option<DismissReason>,
    },
    /// An overlay came to rest in a state
    State {
        /// Overlay
        overlay: OverlayId,
        /// State reached
        state: StateName,
    },
    /// A dismissal future resolved
    Dismissed {
        /// Overlay
        overlay: OverlayId,
        /// Resolved reason
        reason: DismissReason,
    },
    /// A dismissal future rejected
    Rejected {
        /// Overlay
        overlay: OverlayId,
        /// Rejection message
        error: String,
    },
    /// Narration
    Note {
        /// What the script is doing
        text: String,
    },
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event {
                overlay,
                event,
                reason: Some(reason),
            } => write!(f, "{overlay} event     {event} ({reason})"),
            Self::Event {
                overlay,
                event,
                reason: None,
            } => write!(f, "{overlay} event     {event}"),
            Self::State { overlay, state } => write!(f, "{overlay} state     {state}"),
            Self::Dismissed { overlay, reason } => {
                write!(f, "{overlay} dismissed {reason}")
            }
            Self::Rejected { overlay, error } => write!(f, "{overlay} rejected  {error}"),
            Self::Note { text } => write!(f, "-- {text}"),
        }
    }
}

/// Everything a scenario recorded
#[derive(Clone, Debug, Serialize)]
pub struct Transcript {
    /// Scenario that produced it
    pub scenario: Scenario,
    /// Entries in order
    pub entries: Vec<Entry>,
}

#[derive(Clone, Default)]
struct Recorder {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl Recorder {
    fn push(&self, entry: Entry) {
        tracing::debug!(%entry, "Transcript entry");
        self.entries.lock().push(entry);
    }

    fn note(&self, text: impl Into<String>) {
        self.push(Entry::Note { text: text.into() });
    }

    /// Event hub that records every event it dispatches
    fn hub(&self) -> Arc<EventHub> {
        let hub = Arc::new(EventHub::new());
        for kind in OverlayEventKind::ALL {
            let recorder = self.clone();
            hub.add_listener(kind, move |args| {
                let event = args.event();
                recorder.push(Entry::Event {
                    overlay: event.overlay_id,
                    event: event.kind,
                    reason: event.detail.as_ref().map(|d| d.reason.clone()),
                });
            });
        }
        hub
    }

    fn dialog(
        &self,
        registry: &OverlayRegistry,
        config: &OverlayConfig,
        hub: Arc<EventHub>,
        title: &str,
    ) -> Result<Overlay> {
        let overlay = Overlay::builder(registry.clone())
            .config(config.clone())
            .events(hub)
            .title(title)
            .primary_command(CommandSpec::new("OK"))
            .secondary_command(CommandSpec::new("Cancel"))
            .build()?;
        Ok(overlay)
    }

    async fn reach(&self, overlay: &Overlay, state: StateName) -> Result<()> {
        let reached = tokio::time::timeout(STEP_TIMEOUT, overlay.wait_for_state(state))
            .await
            .with_context(|| format!("{} never reached {state}", overlay.id()))?;
        if !reached {
            bail!("{} went away before reaching {state}", overlay.id());
        }
        self.push(Entry::State {
            overlay: overlay.id(),
            state,
        });
        Ok(())
    }

    async fn conclude(&self, overlay: OverlayId, dismissal: Dismissal) -> Result<()> {
        let outcome = tokio::time::timeout(STEP_TIMEOUT, dismissal)
            .await
            .with_context(|| format!("{overlay} dismissal never settled"))?;
        match outcome {
            Ok(info) => self.push(Entry::Dismissed {
                overlay,
                reason: info.reason,
            }),
            Err(err) => self.push(Entry::Rejected {
                overlay,
                error: err.to_string(),
            }),
        }
        Ok(())
    }

    fn finish(self, scenario: Scenario) -> Transcript {
        let entries = std::mem::take(&mut *self.entries.lock());
        Transcript { scenario, entries }
    }
}

/// Run one scenario to completion
///
/// # Errors
///
/// Fails if an overlay cannot be built or a step does not complete in time.
pub async fn run(scenario: Scenario, config: &OverlayConfig) -> Result<Transcript> {
    tracing::info!(scenario = scenario.name(), "Running scenario");
    let recorder = Recorder::default();
    let registry = OverlayRegistry::new(config.exclusivity);

    match scenario {
        Scenario::Basic => basic(&recorder, &registry, config).await?,
        Scenario::Rapid => rapid(&recorder, &registry, config).await?,
        Scenario::Veto => veto(&recorder, &registry, config).await?,
        Scenario::Exclusive => exclusive(&recorder, &registry, config).await?,
        Scenario::Dispose => dispose(&recorder, &registry, config).await?,
    }

    Ok(recorder.finish(scenario))
}

async fn basic(rec: &Recorder, registry: &OverlayRegistry, config: &OverlayConfig) -> Result<()> {
    let dialog = rec.dialog(registry, config, rec.hub(), "Save changes?")?;

    rec.note("show");
    let dismissal = dialog.show();
    rec.reach(&dialog, StateName::Shown).await?;

    rec.note("click primary command");
    dialog.command_clicked(CommandSlot::Primary);
    rec.conclude(dialog.id(), dismissal).await?;
    rec.reach(&dialog, StateName::Hidden).await
}

async fn rapid(rec: &Recorder, registry: &OverlayRegistry, config: &OverlayConfig) -> Result<()> {
    let dialog = rec.dialog(registry, config, rec.hub(), "Connecting")?;

    rec.note("show, then hide before the entrance starts");
    let dismissal = dialog.show();
    dialog.hide(DismissReason::Primary);
    rec.conclude(dialog.id(), dismissal).await?;
    rec.reach(&dialog, StateName::Hidden).await?;

    rec.note("second show is rejected while the first is in flight");
    let first = dialog.show();
    let second = dialog.show();
    rec.conclude(dialog.id(), second).await?;
    rec.reach(&dialog, StateName::Shown).await?;
    dialog.light_dismiss();
    rec.conclude(dialog.id(), first).await?;
    rec.reach(&dialog, StateName::Hidden).await
}

async fn veto(rec: &Recorder, registry: &OverlayRegistry, config: &OverlayConfig) -> Result<()> {
    let hub = rec.hub();
    let vetoed_once = Arc::new(AtomicBool::new(false));
    {
        let vetoed_once = Arc::clone(&vetoed_once);
        hub.add_listener(OverlayEventKind::BeforeHide, move |args| {
            if !vetoed_once.swap(true, Ordering::SeqCst) {
                args.prevent_default();
            }
        });
    }
    let dialog = rec.dialog(registry, config, hub, "Discard draft?")?;

    let dismissal = dialog.show();
    rec.reach(&dialog, StateName::Shown).await?;

    rec.note("first hide is vetoed by the beforehide listener");
    dialog.hide(DismissReason::Secondary);
    rec.reach(&dialog, StateName::Shown).await?;

    rec.note("second hide goes through");
    dialog.hide(DismissReason::Secondary);
    rec.conclude(dialog.id(), dismissal).await?;
    rec.reach(&dialog, StateName::Hidden).await
}

async fn exclusive(
    rec: &Recorder,
    registry: &OverlayRegistry,
    config: &OverlayConfig,
) -> Result<()> {
    let first = rec.dialog(registry, config, rec.hub(), "First")?;
    let second = rec.dialog(registry, config, rec.hub(), "Second")?;
    rec.note(format!("exclusivity policy: {:?}", registry.policy()));

    let first_dismissal = first.show();
    rec.reach(&first, StateName::Shown).await?;

    rec.note("second overlay asks to show");
    let second_dismissal = second.show();

    if second_dismissal.is_settled() {
        rec.conclude(second.id(), second_dismissal).await?;
        first.hide(DismissReason::None);
        rec.conclude(first.id(), first_dismissal).await?;
        rec.reach(&first, StateName::Hidden).await
    } else {
        rec.conclude(first.id(), first_dismissal).await?;
        rec.reach(&second, StateName::Shown).await?;
        second.hide(DismissReason::None);
        rec.conclude(second.id(), second_dismissal).await?;
        rec.reach(&second, StateName::Hidden).await
    }
}

async fn dispose(rec: &Recorder, registry: &OverlayRegistry, config: &OverlayConfig) -> Result<()> {
    let dialog = rec.dialog(registry, config, rec.hub(), "Uploading")?;

    rec.note("dispose while the show is in flight");
    let dismissal = dialog.show();
    dialog.dispose();
    rec.conclude(dialog.id(), dismissal).await?;
    rec.reach(&dialog, StateName::Disposed).await?;

    rec.note("show after dispose");
    rec.conclude(dialog.id(), dialog.show()).await?;
    dialog.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> OverlayConfig {
        let mut config = OverlayConfig::default();
        config.animation.enabled = false;
        config
    }

    fn dismissed(transcript: &Transcript) -> Vec<DismissReason> {
        transcript
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Dismissed { reason, .. } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_basic_dismisses_with_primary() {
        let transcript = run(Scenario::Basic, &instant()).await.unwrap();
        assert_eq!(dismissed(&transcript), vec![DismissReason::Primary]);
    }

    #[tokio::test]
    async fn test_veto_needs_two_hides() {
        let transcript = run(Scenario::Veto, &instant()).await.unwrap();
        let hides = transcript
            .entries
            .iter()
            .filter(|entry| {
                matches!(
                    entry,
                    Entry::Event {
                        event: OverlayEventKind::BeforeHide,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(hides, 2);
        assert_eq!(dismissed(&transcript), vec![DismissReason::Secondary]);
    }

    #[tokio::test]
    async fn test_every_scenario_completes() {
        for scenario in Scenario::value_variants() {
            let transcript = run(*scenario, &instant()).await.unwrap();
            assert!(!transcript.entries.is_empty(), "{}", scenario.name());
            serde_json::to_string(&transcript).unwrap();
        }
    }
}
