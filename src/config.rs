use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::playback::PlaybackConfig;

/// Service configuration, read from a JSON file. Every field has a
/// default so a missing file just means "run with defaults".
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub directions_url: String,
    pub predictions_url: String,
    /// Delay between simulated route points, in milliseconds.
    pub step_interval_ms: u64,
    /// Alert radius around a predicted accident point, statute miles.
    pub alert_threshold_miles: f64,
    /// Location pair used by the demo endpoint.
    pub demo_start_location: String,
    pub demo_end_location: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            directions_url: "http://localhost:3001".to_string(),
            predictions_url: "http://localhost:5000".to_string(),
            step_interval_ms: 1000,
            alert_threshold_miles: 0.1,
            demo_start_location: "Wall Street".to_string(),
            demo_end_location: "Times Square".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise falls back to defaults.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig {
            step_interval: Duration::from_millis(self.step_interval_ms),
            alert_threshold_miles: self.alert_threshold_miles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "step_interval_ms": 500, "bind_addr": "127.0.0.1:8080" }"#)
                .unwrap();
        assert_eq!(config.step_interval_ms, 500);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.alert_threshold_miles, 0.1);
        assert_eq!(config.demo_start_location, "Wall Street");
    }

    #[test]
    fn playback_config_carries_the_interval() {
        let config = AppConfig {
            step_interval_ms: 750,
            ..AppConfig::default()
        };
        assert_eq!(config.playback().step_interval, Duration::from_millis(750));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default(Path::new("/nonexistent/riskroute.json")).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }
}
