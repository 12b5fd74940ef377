//! Offline splitting of a line-delimited building file into region partitions.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::collect::geojsonl::parse_feature_line;
use crate::geometric::region::RegionTable;

/// Per-region record counts written by [`split_by_region`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardReport {
    pub counts: BTreeMap<String, usize>,
    /// Lines that could not be parsed or had no point coordinates
    pub skipped: usize,
    /// Records outside every bin, written to the last region
    pub clamped: usize,
}

impl ShardReport {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

fn point_lon(feature: &geojson::Feature) -> Option<f64> {
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(geojson::Value::Point(coords)) => coords.first().copied().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Split `reader` into one `{region}.geojsonl` file per region under `out_dir`.
///
/// Every region gets a file, possibly empty. Each written record is the
/// original line, unchanged.
pub fn split_by_region<R: BufRead>(
    reader: R,
    regions: &RegionTable,
    out_dir: &Path,
) -> Result<ShardReport> {
    let last = regions
        .ranges()
        .last()
        .context("region table has no regions")?
        .id
        .clone();

    create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

    let mut writers = BTreeMap::new();
    let mut report = ShardReport::default();
    for range in regions.ranges() {
        let path = out_dir.join(format!("{}.geojsonl", range.id));
        let file =
            File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        writers.insert(range.id.clone(), BufWriter::new(file));
        report.counts.insert(range.id.clone(), 0);
    }

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", idx + 1))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let lon = match parse_feature_line(line).ok().as_ref().and_then(point_lon) {
            Some(lon) => lon,
            None => {
                warn!(line = idx + 1, "skipping record without point coordinates");
                report.skipped += 1;
                continue;
            }
        };

        let region = match regions.determine_region(lon) {
            Some(id) => id.to_string(),
            None => {
                report.clamped += 1;
                last.clone()
            }
        };

        if let Some(writer) = writers.get_mut(&region) {
            writeln!(writer, "{}", line)
                .with_context(|| format!("Failed to write record to region {}", region))?;
            *report.counts.entry(region).or_insert(0) += 1;
        }
    }

    for (id, mut writer) in writers {
        writer
            .flush()
            .with_context(|| format!("Failed to flush region {}", id))?;
    }

    info!(
        total = report.total(),
        skipped = report.skipped,
        clamped = report.clamped,
        "building records split by region"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::geojsonl::parse_feature_lines;
    use std::fs;
    use std::io::Cursor;

    fn record(lon: f64) -> String {
        format!(
            r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{},33.6]}},"properties":{{"usage_code":"402"}}}}"#,
            lon
        )
    }

    #[test]
    fn test_split_assigns_bins() {
        let dir = tempfile::tempdir().unwrap();
        let input = [
            record(130.05),
            record(130.2),
            record(130.41),
            "garbage".to_string(),
            String::new(),
            record(131.9),
            record(129.5),
        ]
        .join("\n");

        let report = split_by_region(
            Cursor::new(input),
            &RegionTable::fukuoka_default(),
            dir.path(),
        )
        .unwrap();

        assert_eq!(report.counts["lon_0"], 1);
        assert_eq!(report.counts["lon_1"], 1);
        assert_eq!(report.counts["lon_2"], 1);
        assert_eq!(report.counts["lon_7"], 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.clamped, 2);
        assert_eq!(report.total(), 5);

        let lon_1 = fs::read_to_string(dir.path().join("lon_1.geojsonl")).unwrap();
        let parsed = parse_feature_lines(&lon_1);
        assert_eq!(parsed.features.len(), 1);
        assert_eq!(parsed.features[0].lon(), 130.2);

        // Empty regions still get a file
        assert!(dir.path().join("lon_5.geojsonl").exists());
    }
}
