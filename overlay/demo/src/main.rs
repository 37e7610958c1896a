//! Overlay Demo - Scripted Lifecycle Scenarios
//!
//! Drives headless overlays through named scenarios and prints the event
//! transcript. Useful for seeing how the state machine reacts to re-entrant
//! calls, vetoes, exclusivity conflicts and disposal.
//!
//! # Usage
//!
//! ```bash
//! # Show and dismiss one dialog
//! overlay-demo basic
//!
//! # Two overlays under light-dismiss exclusivity, JSON transcript
//! overlay-demo exclusive --exclusivity light_dismiss --json
//!
//! # Instant animations, verbose logging
//! RUST_LOG=overlay_core=debug overlay-demo rapid --no-animations
//! ```

mod scenarios;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;

use overlay_core::{
    default_config_path, load_config_from_path, ConfigOverrides, ExclusivityPolicy, OverlayConfig,
};

use scenarios::Scenario;

/// Overlay Demo - run scripted overlay lifecycle scenarios
#[derive(Parser, Debug)]
#[command(name = "overlay-demo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(value_enum)]
    scenario: Scenario,

    /// Configuration file path
    #[arg(short = 'c', long, env = "OVERLAY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the transcript as JSON
    #[arg(long)]
    json: bool,

    /// Make entrance and exit effects instant
    #[arg(long)]
    no_animations: bool,

    /// Entrance duration in milliseconds
    #[arg(long, value_name = "MS")]
    entrance_ms: Option<u64>,

    /// Exit duration in milliseconds
    #[arg(long, value_name = "MS")]
    exit_ms: Option<u64>,

    /// Exclusivity policy (modal, light_dismiss)
    #[arg(short = 'x', long, value_name = "POLICY")]
    exclusivity: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "OVERLAY_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> Result<ConfigOverrides> {
        let mut overrides = ConfigOverrides::new();
        if self.no_animations {
            overrides = overrides.with_animations_enabled(false);
        }
        if let Some(ms) = self.entrance_ms {
            overrides = overrides.with_entrance_ms(ms);
        }
        if let Some(ms) = self.exit_ms {
            overrides = overrides.with_exit_ms(ms);
        }
        if let Some(ref name) = self.exclusivity {
            let policy = ExclusivityPolicy::parse(name)
                .ok_or_else(|| anyhow!("unknown exclusivity policy: {name}"))?;
            overrides = overrides.with_exclusivity(policy);
        }
        Ok(overrides)
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "overlay_demo={level},overlay_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// File and environment layers, then command-line overrides, validated as a whole
fn resolve_config(args: &Args) -> Result<OverlayConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides()?.apply(&mut config);
    config
        .validate()
        .context("Invalid command-line overrides")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = resolve_config(&args)?;
    info!(
        source = %config.source(),
        exclusivity = ?config.exclusivity,
        entrance_ms = config.animation.entrance.as_millis() as u64,
        exit_ms = config.animation.exit.as_millis() as u64,
        "Configuration resolved"
    );

    let transcript = scenarios::run(args.scenario, &config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    } else {
        println!("scenario: {}", transcript.scenario.name());
        for entry in &transcript.entries {
            println!("  {entry}");
        }
    }

    Ok(())
}
