//! Overlay Configuration
//!
//! Configuration for overlay animation timing and exclusivity, loaded from an
//! optional TOML file at `~/.config/overlay/overlay.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [animation]
//! enabled = true
//! entrance_ms = 250
//! exit_ms = 150
//!
//! [registry]
//! exclusivity = "modal"
//! ```
//!
//! # Environment Variables
//!
//! - `OVERLAY_ANIMATIONS`: `0`/`false` disables animations
//! - `OVERLAY_ENTRANCE_MS`: entrance duration in milliseconds
//! - `OVERLAY_EXIT_MS`: exit duration in milliseconds
//! - `OVERLAY_EXCLUSIVITY`: `modal` or `light_dismiss`

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::ExclusivityPolicy;

/// Longest animation a configuration may ask for
const MAX_ANIMATION_MS: u64 = 10_000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Animation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationToml {
    /// Whether entrance/exit effects take time at all
    pub enabled: Option<bool>,

    /// Entrance duration in milliseconds
    pub entrance_ms: Option<u64>,

    /// Exit duration in milliseconds
    pub exit_ms: Option<u64>,
}

/// Registry section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryToml {
    /// How overlays of one class share the screen
    pub exclusivity: Option<ExclusivityPolicy>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayToml {
    /// Animation configuration section
    pub animation: AnimationToml,

    /// Registry configuration section
    pub registry: RegistryToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Animation timing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationConfig {
    /// Whether effects take time (false = instant)
    pub enabled: bool,
    /// Entrance duration
    pub entrance: Duration,
    /// Exit duration
    pub exit: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entrance: Duration::from_millis(250),
            exit: Duration::from_millis(150),
        }
    }
}

/// Resolved overlay configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Animation timing
    pub animation: AnimationConfig,

    /// Exclusivity policy for registries built from this configuration
    pub exclusivity: ExclusivityPolicy,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            exclusivity: ExclusivityPolicy::Modal,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl OverlayConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_env_config(&mut config);
        config
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] when a duration exceeds the
    /// allowed maximum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = Duration::from_millis(MAX_ANIMATION_MS);
        if self.animation.entrance > max {
            return Err(ConfigError::ValidationError(format!(
                "entrance animation of {}ms exceeds {MAX_ANIMATION_MS}ms",
                self.animation.entrance.as_millis()
            )));
        }
        if self.animation.exit > max {
            return Err(ConfigError::ValidationError(format!(
                "exit animation of {}ms exceeds {MAX_ANIMATION_MS}ms",
                self.animation.exit.as_millis()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/overlay/overlay.toml` or
/// `~/.config/overlay/overlay.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("overlay").join("overlay.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resolved values fail validation. A missing file is not an error.
pub fn load_config() -> Result<OverlayConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the resolved values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<OverlayConfig, ConfigError> {
    let mut config = OverlayConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: OverlayToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded overlay configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut OverlayConfig, toml: &OverlayToml) {
    if let Some(enabled) = toml.animation.enabled {
        config.animation.enabled = enabled;
    }
    if let Some(ms) = toml.animation.entrance_ms {
        config.animation.entrance = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.animation.exit_ms {
        config.animation.exit = Duration::from_millis(ms);
    }
    if let Some(policy) = toml.registry.exclusivity {
        config.exclusivity = policy;
    }
}

fn apply_env_config(config: &mut OverlayConfig) {
    if let Ok(enabled) = std::env::var("OVERLAY_ANIMATIONS") {
        config.animation.enabled = enabled != "0" && enabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Ok(value) = std::env::var("OVERLAY_ENTRANCE_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.animation.entrance = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(value) = std::env::var("OVERLAY_EXIT_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.animation.exit = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(value) = std::env::var("OVERLAY_EXCLUSIVITY") {
        match ExclusivityPolicy::parse(&value) {
            Some(policy) => {
                config.exclusivity = policy;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %value, "Ignoring unknown OVERLAY_EXCLUSIVITY"),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Animations enabled override
    pub animations_enabled: Option<bool>,

    /// Entrance duration override (milliseconds)
    pub entrance_ms: Option<u64>,

    /// Exit duration override (milliseconds)
    pub exit_ms: Option<u64>,

    /// Exclusivity policy override
    pub exclusivity: Option<ExclusivityPolicy>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set animations enabled override
    #[must_use]
    pub fn with_animations_enabled(mut self, enabled: bool) -> Self {
        self.animations_enabled = Some(enabled);
        self
    }

    /// Set entrance duration override
    #[must_use]
    pub fn with_entrance_ms(mut self, ms: u64) -> Self {
        self.entrance_ms = Some(ms);
        self
    }

    /// Set exit duration override
    #[must_use]
    pub fn with_exit_ms(mut self, ms: u64) -> Self {
        self.exit_ms = Some(ms);
        self
    }

    /// Set exclusivity override
    #[must_use]
    pub fn with_exclusivity(mut self, policy: ExclusivityPolicy) -> Self {
        self.exclusivity = Some(policy);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut OverlayConfig) {
        if self.animations_enabled.is_some()
            || self.entrance_ms.is_some()
            || self.exit_ms.is_some()
            || self.exclusivity.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(enabled) = self.animations_enabled {
            config.animation.enabled = enabled;
        }
        if let Some(ms) = self.entrance_ms {
            config.animation.entrance = Duration::from_millis(ms);
        }
        if let Some(ms) = self.exit_ms {
            config.animation.exit = Duration::from_millis(ms);
        }
        if let Some(policy) = self.exclusivity {
            config.exclusivity = policy;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Serializes tests that touch `OVERLAY_*` variables
    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    fn clear_config_env_vars() {
        std::env::remove_var("OVERLAY_ANIMATIONS");
        std::env::remove_var("OVERLAY_ENTRANCE_MS");
        std::env::remove_var("OVERLAY_EXIT_MS");
        std::env::remove_var("OVERLAY_EXCLUSIVITY");
    }

    #[test]
    fn test_default_config() {
        let config = OverlayConfig::default();

        assert!(config.animation.enabled);
        assert_eq!(config.animation.entrance, Duration::from_millis(250));
        assert_eq!(config.animation.exit, Duration::from_millis(150));
        assert_eq!(config.exclusivity, ExclusivityPolicy::Modal);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("overlay/overlay.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let toml_content = r#"
[animation]
enabled = true
entrance_ms = 400
exit_ms = 100

[registry]
exclusivity = "light_dismiss"
"#;
        let toml: OverlayToml = toml::from_str(toml_content).unwrap();
        let mut config = OverlayConfig::default();
        apply_toml_config(&mut config, &toml);

        assert_eq!(config.animation.entrance, Duration::from_millis(400));
        assert_eq!(config.animation.exit, Duration::from_millis(100));
        assert_eq!(config.exclusivity, ExclusivityPolicy::LightDismiss);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml: OverlayToml = toml::from_str("[animation]\nexit_ms = 90\n").unwrap();
        let mut config = OverlayConfig::default();
        apply_toml_config(&mut config, &toml);

        assert_eq!(config.animation.exit, Duration::from_millis(90));
        assert_eq!(config.animation.entrance, Duration::from_millis(250));
        assert_eq!(config.exclusivity, ExclusivityPolicy::Modal);
    }

    #[test]
    fn test_missing_file_graceful() {
        let path = PathBuf::from("/nonexistent/overlay/overlay.toml");
        let config = load_config_from_path(Some(path)).unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[animation\nentrance_ms = \"slow\"\n").unwrap();

        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_out_of_range_duration_fails_validation() {
        let mut config = OverlayConfig::default();
        config.animation.entrance = Duration::from_secs(60);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_file_values_are_loaded() {
        let _env = ENV_LOCK.lock();
        clear_config_env_vars();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[animation]\nenabled = false\n").unwrap();

        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert!(!config.animation.enabled);
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
    }

    #[test]
    fn test_env_overrides_file() {
        let _env = ENV_LOCK.lock();
        clear_config_env_vars();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[animation]\nentrance_ms = 400\nexit_ms = 100\n\n[registry]\nexclusivity = \"modal\"\n")
            .unwrap();
        std::env::set_var("OVERLAY_EXIT_MS", "320");
        std::env::set_var("OVERLAY_EXCLUSIVITY", "light-dismiss");

        let config = load_config_from_path(Some(file.path().to_path_buf()));
        clear_config_env_vars();
        let config = config.unwrap();

        assert_eq!(config.animation.entrance, Duration::from_millis(400));
        assert_eq!(config.animation.exit, Duration::from_millis(320));
        assert_eq!(config.exclusivity, ExclusivityPolicy::LightDismiss);
        assert_eq!(config.source(), ConfigSource::Env);
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
    }

    #[test]
    fn test_unparseable_env_values_are_ignored() {
        let _env = ENV_LOCK.lock();
        clear_config_env_vars();

        std::env::set_var("OVERLAY_ENTRANCE_MS", "slow");
        std::env::set_var("OVERLAY_EXCLUSIVITY", "stacked");
        let config = OverlayConfig::from_env();
        clear_config_env_vars();

        assert_eq!(config.animation.entrance, Duration::from_millis(250));
        assert_eq!(config.exclusivity, ExclusivityPolicy::Modal);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_from_env_disables_animations() {
        let _env = ENV_LOCK.lock();
        clear_config_env_vars();

        std::env::set_var("OVERLAY_ANIMATIONS", "false");
        let config = OverlayConfig::from_env();
        clear_config_env_vars();

        assert!(!config.animation.enabled);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = OverlayConfig::default();
        config.animation.enabled = true;
        config.set_source(ConfigSource::Env);

        ConfigOverrides::new()
            .with_animations_enabled(false)
            .with_exclusivity(ExclusivityPolicy::LightDismiss)
            .apply(&mut config);

        assert!(!config.animation.enabled);
        assert_eq!(config.exclusivity, ExclusivityPolicy::LightDismiss);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = OverlayConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config, OverlayConfig::default());
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ValidationError("bad".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad");
    }
}
