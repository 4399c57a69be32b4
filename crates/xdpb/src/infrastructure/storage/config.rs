//! TOML configuration for the daemon.
//!
//! The file is optional.  It is looked up at:
//! - the path given with `--config` (which must then exist), or
//! - `$XDG_CONFIG_HOME/xdpb/config.toml`, falling back to
//!   `~/.config/xdpb/config.toml`.
//!
//! Example:
//!
//! ```toml
//! [release]
//! mode = "double-tap"   # "speed" | "distance" | "double-tap"
//! threshold = 0.4       # px/event, px, or seconds depending on the mode
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! # Serde default values (for beginners)
//!
//! Every field has a `#[serde(default ...)]` attribute, so an empty file, a
//! file with only a `[logging]` table, or no file at all all produce a usable
//! configuration: distance mode with a 50 pixel threshold, logging at `info`.
//!
//! A release mode given on the command line replaces the `[release]` table
//! entirely; see `main.rs`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use xdpb_core::{PolicyError, ReleaseMode, DEFAULT_DISTANCE_THRESHOLD};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `release.threshold` is not a finite non-negative number.
    #[error("invalid release threshold: {0}")]
    InvalidThreshold(#[from] PolicyError),

    /// A mode without a built-in default was selected without a threshold.
    #[error("release mode \"{0}\" needs a threshold")]
    MissingThreshold(ModeName),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub release: ReleaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mode names accepted in `release.mode`.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ModeName {
    Speed,
    #[default]
    Distance,
    DoubleTap,
}

impl std::fmt::Display for ModeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ModeName::Speed => "speed",
            ModeName::Distance => "distance",
            ModeName::DoubleTap => "double-tap",
        })
    }
}

/// The `[release]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub mode: ModeName,
    /// Unit depends on `mode`.  Only distance mode has a default (50 px).
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// The `[logging]` table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl ReleaseConfig {
    /// Builds the validated [`ReleaseMode`] this table describes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThreshold`] for a negative or non-finite
    /// threshold and [`ConfigError::MissingThreshold`] when speed or
    /// double-tap mode is selected without one.
    pub fn to_release_mode(&self) -> Result<ReleaseMode, ConfigError> {
        let mode = match (self.mode, self.threshold) {
            (ModeName::Distance, threshold) => {
                ReleaseMode::distance(threshold.unwrap_or(DEFAULT_DISTANCE_THRESHOLD))?
            }
            (ModeName::Speed, Some(threshold)) => ReleaseMode::speed(threshold)?,
            (ModeName::DoubleTap, Some(window)) => ReleaseMode::double_tap(window)?,
            (name, None) => return Err(ConfigError::MissingThreshold(name)),
        };
        Ok(mode)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves `$XDG_CONFIG_HOME/xdpb/config.toml` or `~/.config/xdpb/config.toml`.
///
/// Returns `None` when neither variable is set.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("xdpb").join("config.toml"))
}

/// Parses configuration text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or has unknown keys.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the configuration.
///
/// With `explicit` set the file must exist.  Otherwise the default location
/// is tried and a missing file yields [`AppConfig::default()`].
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read (including a
/// missing explicit file) and [`ConfigError::Parse`] if it is malformed.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(AppConfig::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            parse_config(&content)
        }
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
