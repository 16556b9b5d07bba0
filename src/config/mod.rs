// SPDX-License-Identifier: MPL-2.0
//! This module handles the manager's configuration, including loading and saving
//! it to a `notifications.toml` file.
//!
//! # Configuration Sections
//!
//! - `[defaults]` - Default auto-dismiss delay and presentation variant
//! - `[limits]` - Optional cap on simultaneously active notifications
//!
//! # Path Resolution
//!
//! 1. Use `load_from_path()`/`save_to_path()` with explicit path
//! 2. Set `TOAST_MANAGER_CONFIG_DIR` environment variable
//! 3. Falls back to platform-specific config directory
//!
//! # Examples
//!
//! ```no_run
//! use toast_manager::config::{self, ManagerConfig};
//!
//! // Load existing configuration (returns tuple with optional warning)
//! let (mut config, _warning) = config::load();
//!
//! // Keep at most three toasts on screen
//! config.limits.max_count = Some(3);
//!
//! config::save(&config).expect("Failed to save config");
//! ```

pub mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use crate::notifications::Variant;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "notifications.toml";
const APP_NAME: &str = "toast_manager";

/// Environment variable to override the config directory.
pub const ENV_CONFIG_DIR: &str = "TOAST_MANAGER_CONFIG_DIR";

// =============================================================================
// Section Structs
// =============================================================================

/// Defaults applied to notifications that do not set their own values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultsConfig {
    /// Auto-dismiss delay in milliseconds. `0` keeps notifications until closed.
    ///
    /// Stored signed so that a negative value in a hand-edited file is
    /// reported by [`ManagerConfig::validate`] instead of a parse error.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: i64,

    /// Presentation variant for notifications that do not set one.
    #[serde(default)]
    pub variant: Variant,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            variant: Variant::default(),
        }
    }
}

/// Bounds on the number of notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LimitsConfig {
    /// Maximum number of active notifications. Opening a new one beyond this
    /// closes the oldest. `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<usize>,
}

// =============================================================================
// Main Config Struct (Sectioned)
// =============================================================================

/// Notification manager configuration with logical sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ManagerConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

impl ManagerConfig {
    /// Checks that every value is within its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a negative default duration or a
    /// `max_count` outside `MIN_MAX_COUNT..=MAX_MAX_COUNT`.
    pub fn validate(&self) -> Result<()> {
        if self.defaults.duration_ms < 0 {
            return Err(Error::invalid_config(format!(
                "defaults.duration_ms must not be negative (got {})",
                self.defaults.duration_ms
            )));
        }
        if let Some(max) = self.limits.max_count {
            if !(MIN_MAX_COUNT..=MAX_MAX_COUNT).contains(&max) {
                return Err(Error::invalid_config(format!(
                    "limits.max_count must be between {MIN_MAX_COUNT} and {MAX_MAX_COUNT} (got {max})"
                )));
            }
        }
        Ok(())
    }

    /// Returns the default auto-dismiss delay, `Duration::ZERO` when persistent.
    ///
    /// Negative values are clamped to zero; call [`validate`](Self::validate)
    /// to reject them instead.
    #[must_use]
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.defaults.duration_ms).unwrap_or(0))
    }
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_duration_ms() -> i64 {
    i64::try_from(DEFAULT_DURATION_MS).unwrap_or(i64::MAX)
}

// =============================================================================
// Config Path Resolution
// =============================================================================

/// Returns the config directory with an optional override.
///
/// 1. `override_path` parameter (if `Some`)
/// 2. `TOAST_MANAGER_CONFIG_DIR` environment variable (if set and non-empty)
/// 3. Platform-specific config directory (with app name appended)
pub fn config_dir_with_override(override_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path);
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_DIR) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path
    })
}

fn get_config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    config_dir_with_override(base_dir).map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

// =============================================================================
// Load Functions
// =============================================================================

/// Loads the configuration from the default path.
///
/// Returns a tuple of (config, optional_warning). If loading fails, returns
/// default config with a warning message explaining what went wrong.
pub fn load() -> (ManagerConfig, Option<String>) {
    load_with_override(None)
}

/// Loads the configuration from a custom directory.
pub fn load_with_override(base_dir: Option<PathBuf>) -> (ManagerConfig, Option<String>) {
    if let Some(path) = get_config_path_with_override(base_dir) {
        if path.exists() {
            match load_from_path(&path) {
                Ok(config) => return (config, None),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "falling back to default notification config");
                    return (ManagerConfig::default(), Some(err.to_string()));
                }
            }
        }
    }
    (ManagerConfig::default(), None)
}

/// Loads and validates configuration from a specific path.
pub fn load_from_path(path: &Path) -> Result<ManagerConfig> {
    let content = fs::read_to_string(path)?;
    from_toml_str(&content)
}

/// Parses and validates configuration from TOML text.
pub fn from_toml_str(content: &str) -> Result<ManagerConfig> {
    let config: ManagerConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

// =============================================================================
// Save Functions
// =============================================================================

/// Saves the configuration to the default path.
pub fn save(config: &ManagerConfig) -> Result<()> {
    save_with_override(config, None)
}

/// Saves the configuration to a custom directory.
pub fn save_with_override(config: &ManagerConfig, base_dir: Option<PathBuf>) -> Result<()> {
    if let Some(path) = get_config_path_with_override(base_dir) {
        return save_to_path(config, &path);
    }
    Ok(())
}

/// Saves configuration to a specific path.
pub fn save_to_path(config: &ManagerConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
