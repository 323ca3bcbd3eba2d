//! TOML Configuration File Support
//!
//! Engine configuration is loaded from `~/.config/showcase/showcase.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/showcase/showcase.toml` (typically `~/.config/showcase/showcase.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [engine]
//! strict = false
//! enable_failsafe_ms = 2000
//! reinit_failsafe_ms = 1000
//! image_retry_ms = 1000
//! transition_timeout_ms = 0
//!
//! [defaults]
//! width = 640
//! fade = false
//! expire = 10
//! ```
//!
//! Keys under `[defaults]` use the option names accepted by
//! `Showcase::set_defaults` and are validated the same way when the engine is
//! built.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

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
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
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
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Engine section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineToml {
    /// Re-raise every reported error
    pub strict: Option<bool>,

    /// Delay before the click guard engages on a new load (milliseconds)
    pub enable_failsafe_ms: Option<u64>,

    /// Delay before the click guard engages on navigation (milliseconds)
    pub reinit_failsafe_ms: Option<u64>,

    /// Delay before re-attempting an undecoded image (milliseconds)
    pub image_retry_ms: Option<u64>,

    /// Give up on a transition after this long (0 = wait indefinitely)
    pub transition_timeout_ms: Option<u64>,
}

/// Complete TOML configuration file structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseToml {
    /// Engine settings
    pub engine: EngineToml,

    /// Process-wide option defaults, by option name
    pub defaults: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Resolved engine configuration
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Re-raise every reported error to the caller
    pub strict: bool,

    /// Delay before the click guard engages on a new load
    pub enable_failsafe_delay: Duration,

    /// Delay before the click guard engages on navigation
    pub reinit_failsafe_delay: Duration,

    /// Delay before re-attempting an image that reported `0x0`
    pub image_retry_delay: Duration,

    /// Upper bound on any transition wait (`None` waits indefinitely)
    pub transition_timeout: Option<Duration>,

    /// Option defaults to apply when the engine is built
    pub defaults: serde_json::Map<String, serde_json::Value>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict: false,
            enable_failsafe_delay: Duration::from_millis(2000),
            reinit_failsafe_delay: Duration::from_millis(1000),
            image_retry_delay: Duration::from_millis(1000),
            transition_timeout: None,
            defaults: serde_json::Map::new(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus environment overrides
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_env_config(&mut config, |name| std::env::var(name).ok());
        config
    }

    /// Set strict mode
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the image retry delay
    #[must_use]
    pub fn with_image_retry_delay(mut self, delay: Duration) -> Self {
        self.image_retry_delay = delay;
        self
    }

    /// Set the transition timeout
    #[must_use]
    pub fn with_transition_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transition_timeout = timeout;
        self
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/showcase/showcase.toml` or
/// `~/.config/showcase/showcase.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("showcase").join("showcase.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<EngineConfig, ConfigError> {
    load_config_with_env(path, |name| std::env::var(name).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<EngineConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = EngineConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ShowcaseToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

fn apply_toml_config(config: &mut EngineConfig, toml: ShowcaseToml) {
    let engine = toml.engine;
    if let Some(strict) = engine.strict {
        config.strict = strict;
    }
    if let Some(ms) = engine.enable_failsafe_ms {
        config.enable_failsafe_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = engine.reinit_failsafe_ms {
        config.reinit_failsafe_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = engine.image_retry_ms {
        config.image_retry_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = engine.transition_timeout_ms {
        config.transition_timeout = timeout_from_ms(ms);
    }

    config.defaults = toml.defaults;
}

fn apply_env_config<F>(config: &mut EngineConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(strict) = env("SHOWCASE_STRICT") {
        config.strict = strict != "0" && strict.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("SHOWCASE_FAILSAFE_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.enable_failsafe_delay = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("SHOWCASE_RETRY_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.image_retry_delay = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("SHOWCASE_TRANSITION_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.transition_timeout = timeout_from_ms(ms);
        config.source = ConfigSource::Env;
    }
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

// =============================================================================
// Tests
// =============================================================================
