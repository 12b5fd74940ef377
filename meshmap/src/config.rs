//! Viewer configuration.
//!
//! Every field has a default matching the shipped viewer, so an empty JSON
//! object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::classify::RuleSet;
use crate::collect::global_variables::{
    BUILDINGS_BY_REGION_TEMPLATE, MESH_DIMMED_OPACITY, MESH_OPACITY, MESH_USAGE_URL,
    SHOW_BUILDINGS_ZOOM, SHOW_BUILDING_LABELS_ZOOM,
};
use crate::error::ConfigError;
use crate::geometric::region::{RegionTable, REGION_PLACEHOLDER};

/// Rule set selection: a preset name or an inline threshold table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSetChoice {
    Preset(String),
    Inline(RuleSet),
}

impl RuleSetChoice {
    pub fn resolve(&self) -> Result<RuleSet, ConfigError> {
        let rules = match self {
            RuleSetChoice::Preset(name) => RuleSet::preset(name)?,
            RuleSetChoice::Inline(rules) => *rules,
        };
        rules.validate()?;
        Ok(rules)
    }
}

impl Default for RuleSetChoice {
    fn default() -> Self {
        RuleSetChoice::Preset("revised_min50".to_string())
    }
}

/// Network behaviour of the native HTTP source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-attempt timeout
    pub timeout_secs: u64,
    /// Total attempts for transient failures, including the first
    pub max_attempts: u32,
    /// First backoff delay; doubles on each further attempt
    pub backoff_base_ms: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before attempt `attempt + 1`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: 30,
            max_attempts: 3,
            backoff_base_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub mesh_url: String,
    pub building_partition_template: String,
    pub show_buildings_zoom: f64,
    pub show_building_labels_zoom: f64,
    pub mesh_opacity: f64,
    pub mesh_dimmed_opacity: f64,
    pub rule_set: RuleSetChoice,
    pub regions: RegionTable,
    pub fetch: FetchConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            mesh_url: MESH_USAGE_URL.to_string(),
            building_partition_template: BUILDINGS_BY_REGION_TEMPLATE.to_string(),
            show_buildings_zoom: SHOW_BUILDINGS_ZOOM,
            show_building_labels_zoom: SHOW_BUILDING_LABELS_ZOOM,
            mesh_opacity: MESH_OPACITY,
            mesh_dimmed_opacity: MESH_DIMMED_OPACITY,
            rule_set: RuleSetChoice::default(),
            regions: RegionTable::fukuoka_default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn rules(&self) -> Result<RuleSet, ConfigError> {
        self.rule_set.resolve()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules()?;

        for (name, value) in [
            ("show_buildings_zoom", self.show_buildings_zoom),
            ("show_building_labels_zoom", self.show_building_labels_zoom),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{} must be a finite zoom", name)));
            }
        }
        if self.show_building_labels_zoom < self.show_buildings_zoom {
            return Err(ConfigError::Invalid(format!(
                "label zoom {} is below building zoom {}",
                self.show_building_labels_zoom, self.show_buildings_zoom
            )));
        }
        for (name, value) in [
            ("mesh_opacity", self.mesh_opacity),
            ("mesh_dimmed_opacity", self.mesh_dimmed_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        if !self.building_partition_template.contains(REGION_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "building_partition_template must contain {}",
                REGION_PLACEHOLDER
            )));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
