use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

const fn default_interval() -> u32 {
    if let Some(secs) = option_env!("SCHED_LOCATION_INTERVAL") {
        const_str::parse!(secs, u32)
    } else {
        60
    }
}

/// Polling interval used when nothing else is configured, can be overridden at build time
/// with `SCHED_LOCATION_INTERVAL`
pub const DEFAULT_INTERVAL_SECONDS: u32 = default_interval();

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Thresholds for dropping fixes that aren't worth reporting
pub struct FilterSettings {
    /// Fixes with a horizontal accuracy worse than this (in meters) are dropped
    pub max_horizontal_accuracy: f64,
    /// Fixes closer than this (in meters) to the last reported fix are dropped
    pub min_distance_meters: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            max_horizontal_accuracy: 100.0,
            min_distance_meters: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Settings for a [ScheduledLocationManager](crate::ScheduledLocationManager)
pub struct ManagerSettings {
    /// Seconds between location requests
    pub interval_seconds: u32,
    /// Significance filter, `None` forwards every fix
    pub filter: Option<FilterSettings>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            filter: None,
        }
    }
}

impl ManagerSettings {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse manager settings")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let settings = ManagerSettings::from_json("{}").expect("Failed to parse");
        assert_eq!(settings, ManagerSettings::default());
        assert_eq!(settings.interval_seconds, DEFAULT_INTERVAL_SECONDS);
    }

    #[test]
    fn test_partial_filter() {
        let settings =
            ManagerSettings::from_json(r#"{"interval_seconds": 15, "filter": {"min_distance_meters": 5.0}}"#)
                .expect("Failed to parse");
        assert_eq!(settings.interval_seconds, 15);
        let filter = settings.filter.expect("Filter missing");
        assert_eq!(filter.min_distance_meters, 5.0);
        assert_eq!(filter.max_horizontal_accuracy, 100.0);
    }

    #[test]
    fn test_bad_json() {
        assert!(ManagerSettings::from_json(r#"{"interval_seconds": "soon"}"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ManagerSettings::load(Path::new("/nonexistent/settings.json"))
            .expect_err("Loaded a missing file");
        assert!(err.to_string().contains("/nonexistent/settings.json"));
    }
}
