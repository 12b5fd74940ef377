use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Thresholds for mesh land-use classification.
///
/// Shares are fractions in `[0, 1]`; counts are building totals. The viewer
/// shipped three of these over time, kept here as named presets so they can
/// be swapped through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Meshes with fewer buildings than this are never classified
    pub min_total: f64,
    pub residential: f64,
    pub commercial: f64,
    pub office: f64,
    /// Share each of the three groups must reach for "diverse"
    pub diverse: f64,
    /// Meshes below this total skip the diverse check entirely
    #[serde(default)]
    pub diverse_min_total: Option<f64>,
}

impl RuleSet {
    /// First published thresholds: 50/40/40, diverse 20.
    pub const ORIGINAL: RuleSet = RuleSet {
        min_total: 10.0,
        residential: 0.5,
        commercial: 0.4,
        office: 0.4,
        diverse: 0.2,
        diverse_min_total: None,
    };

    /// Relaxed thresholds: 60/30/30, diverse 15.
    pub const REVISED: RuleSet = RuleSet {
        min_total: 10.0,
        residential: 0.6,
        commercial: 0.3,
        office: 0.3,
        diverse: 0.15,
        diverse_min_total: None,
    };

    /// Relaxed thresholds with diverse restricted to meshes of 50+ buildings.
    pub const REVISED_MIN50: RuleSet = RuleSet {
        diverse_min_total: Some(50.0),
        ..RuleSet::REVISED
    };

    pub const PRESET_NAMES: [&'static str; 3] = ["original", "revised", "revised_min50"];

    /// Look up a named preset.
    pub fn preset(name: &str) -> Result<RuleSet, ConfigError> {
        match name {
            "original" => Ok(RuleSet::ORIGINAL),
            "revised" => Ok(RuleSet::REVISED),
            "revised_min50" => Ok(RuleSet::REVISED_MIN50),
            other => Err(ConfigError::Invalid(format!(
                "unknown rule set `{}` (expected one of {})",
                other,
                RuleSet::PRESET_NAMES.join(", ")
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let shares = [
            ("residential", self.residential),
            ("commercial", self.commercial),
            ("office", self.office),
            ("diverse", self.diverse),
        ];
        for (name, value) in shares {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} threshold {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        if !self.min_total.is_finite() || self.min_total < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_total {} must be a non-negative number",
                self.min_total
            )));
        }
        if let Some(min) = self.diverse_min_total {
            if !min.is_finite() || min < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "diverse_min_total {} must be a non-negative number",
                    min
                )));
            }
        }
        Ok(())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet::REVISED_MIN50
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_by_name() {
        for name in RuleSet::PRESET_NAMES {
            let rules = RuleSet::preset(name).unwrap();
            rules.validate().unwrap();
        }
        assert_eq!(
            RuleSet::preset("revised_min50").unwrap().diverse_min_total,
            Some(50.0)
        );
        assert!(RuleSet::preset("strict").is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let rules = RuleSet {
            office: 1.5,
            ..RuleSet::ORIGINAL
        };
        assert!(rules.validate().is_err());
    }
}
