//! User settings and view timing
//!
//! Settings live in a small YAML file. A missing or unreadable file simply
//! yields the defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Directory name used under the platform config and data directories
pub const APP_DIR_NAME: &str = "fueling-requests";

/// Environment variable overriding the settings file location
pub const CONFIG_ENV_VAR: &str = "FUEL_CONFIG";

/// Which role the application runs as
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Requester view
    #[default]
    Client,
    /// Operator view
    Company,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Client => write!(f, "client"),
            ViewMode::Company => write!(f, "company"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "client" | "requester" => Ok(ViewMode::Client),
            "company" | "operator" => Ok(ViewMode::Company),
            _ => Err(ConfigError::InvalidView(s.to_string())),
        }
    }
}

impl ViewMode {
    /// Reads a view name given on the command line. Unknown names fall back
    /// to the client view with a warning.
    pub fn from_param(value: &str) -> Self {
        value.parse().unwrap_or_else(|e: ConfigError| {
            log::warn!("{}, using the client view", e);
            ViewMode::Client
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown view '{0}', expected 'client' or 'company'")]
    InvalidView(String),
}

/// Delays used by the requester view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTiming {
    /// Simulated latency between submitting and the request appearing
    pub submit_delay: Duration,
    /// How long the success acknowledgment stays visible
    pub toast_duration: Duration,
}

impl Default for ViewTiming {
    fn default() -> Self {
        Self {
            submit_delay: Duration::from_millis(DEFAULT_SUBMIT_DELAY_MS),
            toast_duration: Duration::from_millis(DEFAULT_TOAST_DURATION_MS),
        }
    }
}

impl ViewTiming {
    /// No submission delay; the toast keeps its normal duration
    pub fn immediate() -> Self {
        Self {
            submit_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

const DEFAULT_SUBMIT_DELAY_MS: u64 = 1500;
const DEFAULT_TOAST_DURATION_MS: u64 = 3000;

fn default_submit_delay_ms() -> u64 {
    DEFAULT_SUBMIT_DELAY_MS
}

fn default_toast_duration_ms() -> u64 {
    DEFAULT_TOAST_DURATION_MS
}

/// Persistent user settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_submit_delay_ms")]
    pub submit_delay_ms: u64,
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    /// Data directory; the platform default is used when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// View used when none is given on the command line
    #[serde(default)]
    pub default_view: Option<ViewMode>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            submit_delay_ms: DEFAULT_SUBMIT_DELAY_MS,
            toast_duration_ms: DEFAULT_TOAST_DURATION_MS,
            data_dir: None,
            default_view: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("settings.yaml")
    }

    /// Load settings from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    /// Load settings from `path`, or return defaults if absent or malformed
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Ignoring malformed settings file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn timing(&self) -> ViewTiming {
        ViewTiming {
            submit_delay: Duration::from_millis(self.submit_delay_ms),
            toast_duration: Duration::from_millis(self.toast_duration_ms),
        }
    }
}

/// Platform data directory for the application, if the platform has one
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join(APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_view_mode_from_str() {
        assert_eq!("client".parse::<ViewMode>().unwrap(), ViewMode::Client);
        assert_eq!("Company".parse::<ViewMode>().unwrap(), ViewMode::Company);
        assert_eq!("operator".parse::<ViewMode>().unwrap(), ViewMode::Company);
        assert!("pilot".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::default(), ViewMode::Client);
    }

    #[test]
    fn test_unknown_view_param_falls_back_to_client() {
        assert_eq!(ViewMode::from_param("company"), ViewMode::Company);
        assert_eq!(ViewMode::from_param(" Operator "), ViewMode::Company);
        assert_eq!(ViewMode::from_param("pilot"), ViewMode::Client);
        assert_eq!(ViewMode::from_param(""), ViewMode::Client);
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("settings.yaml"));

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timing().toast_duration, Duration::from_secs(3));
    }

    #[test]
    fn test_partial_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        std::fs::write(&path, "submit_delay_ms: 0\ndefault_view: company\n").unwrap();

        let settings = Settings::load_from(&path);

        assert_eq!(settings.submit_delay_ms, 0);
        assert_eq!(settings.toast_duration_ms, 3000);
        assert_eq!(settings.default_view, Some(ViewMode::Company));
    }

    #[test]
    fn test_malformed_settings_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        std::fs::write(&path, "submit_delay_ms: [oops").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_settings_with_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        std::fs::write(&path, "toast_duration_ms: 10\ndata_dir: /tmp/fuel\n").unwrap();

        let settings = Settings::load_from(&path);

        assert_eq!(settings.data_dir, Some(PathBuf::from("/tmp/fuel")));
        assert_eq!(settings.timing().toast_duration, Duration::from_millis(10));
        assert_eq!(settings.timing().submit_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_immediate_timing() {
        let timing = ViewTiming::immediate();
        assert_eq!(timing.submit_delay, Duration::ZERO);
        assert_eq!(timing.toast_duration, Duration::from_secs(3));
    }
}
