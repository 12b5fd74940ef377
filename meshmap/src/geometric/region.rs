use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::ConfigError;

/// Placeholder substituted by the region id in partition URL templates.
pub const REGION_PLACEHOLDER: &str = "{region}";

/// A longitude bin `[min, max)` backing one building partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LonRange {
    pub id: String,
    pub min: f64,
    pub max: f64,
}

impl LonRange {
    pub fn new(id: impl Into<String>, min: f64, max: f64) -> Self {
        LonRange {
            id: id.into(),
            min,
            max,
        }
    }

    /// Lower bound inclusive, upper bound exclusive.
    pub fn contains(&self, lon: f64) -> bool {
        self.min <= lon && lon < self.max
    }
}

/// Ordered, non-overlapping longitude bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RegionTable {
    ranges: Vec<LonRange>,
}

impl RegionTable {
    pub fn new(ranges: Vec<LonRange>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for range in &ranges {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min >= range.max {
                return Err(ConfigError::Invalid(format!(
                    "region `{}` has an empty interval [{}, {})",
                    range.id, range.min, range.max
                )));
            }
            if !seen.insert(range.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate region id `{}`",
                    range.id
                )));
            }
        }

        let mut sorted: Vec<&LonRange> = ranges.iter().collect();
        sorted.sort_by(|a, b| a.min.total_cmp(&b.min));
        for pair in sorted.windows(2) {
            if pair[1].min < pair[0].max {
                return Err(ConfigError::Invalid(format!(
                    "regions `{}` and `{}` overlap",
                    pair[0].id, pair[1].id
                )));
            }
        }

        Ok(RegionTable { ranges })
    }

    /// Eight 0.2° bins from 130.0 to 131.6, the layout written by the
    /// building sharding tool.
    pub fn fukuoka_default() -> Self {
        let ranges = (0..8)
            .map(|i| {
                // Integer tenths avoid drift from repeated float addition
                let min = (1300 + 2 * i) as f64 / 10.0;
                let max = (1302 + 2 * i) as f64 / 10.0;
                LonRange::new(format!("lon_{}", i), min, max)
            })
            .collect();
        RegionTable { ranges }
    }

    pub fn ranges(&self) -> &[LonRange] {
        &self.ranges
    }

    pub fn get(&self, id: &str) -> Option<&LonRange> {
        self.ranges.iter().find(|r| r.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Id of the first bin containing `lon`, or `None` outside coverage.
    pub fn determine_region(&self, lon: f64) -> Option<&str> {
        let found = self
            .ranges
            .iter()
            .find(|r| r.contains(lon))
            .map(|r| r.id.as_str());
        if found.is_none() {
            debug!(lon, "viewport center outside building coverage");
        }
        found
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        RegionTable::fukuoka_default()
    }
}

impl<'de> Deserialize<'de> for RegionTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ranges = Vec::<LonRange>::deserialize(deserializer)?;
        RegionTable::new(ranges).map_err(serde::de::Error::custom)
    }
}

/// Build the partition location for a region from a `{region}` template.
pub fn partition_url(template: &str, region: &str) -> String {
    template.replace(REGION_PLACEHOLDER, region)
}
