//! TOML-based application configuration.
//!
//! Stores the distracting-site pattern list and timer policy knobs.
//! Configuration is stored at `~/.config/mindtap/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::classifier::{SiteClassifier, DEFAULT_PATTERNS};
use crate::error::ConfigError;
use crate::timer::Purpose;

/// Site classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

/// Timer policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Minutes a snooze adds (and the restarted window grows by).
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u64,
    /// Elapsed minutes before the first reminder notification.
    #[serde(default = "default_reminder_after")]
    pub reminder_after_minutes: u64,
    /// Minutes before a reminded timer becomes eligible to remind again.
    #[serde(default = "default_reminder_cooldown")]
    pub reminder_cooldown_minutes: u64,
    /// How often the coordinator re-evaluates elapsed-time thresholds.
    #[serde(default = "default_reminder_check_secs")]
    pub reminder_check_secs: u64,
    /// Default allotment when starting a work timer without --minutes.
    #[serde(default = "default_work_minutes")]
    pub default_work_minutes: u64,
    /// Default allotment when starting a fun timer without --minutes.
    #[serde(default = "default_fun_minutes")]
    pub default_fun_minutes: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mindtap/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sites: SitesConfig,
    #[serde(default)]
    pub timer: TimerConfig,
}

fn default_patterns() -> Vec<String> {
    DEFAULT_PATTERNS.iter().map(|p| (*p).to_string()).collect()
}
fn default_snooze_minutes() -> u64 {
    5
}
fn default_reminder_after() -> u64 {
    5
}
fn default_reminder_cooldown() -> u64 {
    5
}
fn default_reminder_check_secs() -> u64 {
    60
}
fn default_work_minutes() -> u64 {
    15
}
fn default_fun_minutes() -> u64 {
    5
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            snooze_minutes: default_snooze_minutes(),
            reminder_after_minutes: default_reminder_after(),
            reminder_cooldown_minutes: default_reminder_cooldown(),
            reminder_check_secs: default_reminder_check_secs(),
            default_work_minutes: default_work_minutes(),
            default_fun_minutes: default_fun_minutes(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/mindtap"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults if the file does not
    /// exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save the configuration.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let text =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, text).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// A classifier over the configured pattern set.
    pub fn classifier(&self) -> SiteClassifier {
        SiteClassifier::new(self.sites.patterns.clone())
    }

    /// Default allotment for a purpose, mirroring the popup's preselection.
    pub fn default_minutes(&self, purpose: Purpose) -> u64 {
        match purpose {
            Purpose::Work => self.timer.default_work_minutes,
            Purpose::Fun => self.timer.default_fun_minutes,
        }
    }
}
