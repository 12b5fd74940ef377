use geojson::Feature;
use tracing::warn;

use crate::error::RecordParseError;
use crate::geometric::building::BuildingFeature;

/// Result of parsing a line-delimited partition: the good records and a
/// report of the lines that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLines {
    pub features: Vec<BuildingFeature>,
    pub errors: Vec<RecordParseError>,
}

/// Iterate non-blank lines with their 1-based line numbers. A trailing `\r`
/// is stripped so CRLF files parse the same as LF files.
pub fn record_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Parse one line as a GeoJSON Feature.
pub fn parse_feature_line(line: &str) -> Result<Feature, String> {
    serde_json::from_str::<Feature>(line).map_err(|e| e.to_string())
}

/// Parse every record of a partition. Malformed lines are logged and
/// reported, never fatal.
pub fn parse_feature_lines(text: &str) -> ParsedLines {
    let mut parsed = ParsedLines::default();

    for (line, raw) in record_lines(text) {
        let result = parse_feature_line(raw).and_then(|f| BuildingFeature::from_feature(&f));
        match result {
            Ok(building) => parsed.features.push(building),
            Err(message) => {
                warn!(line, %message, "skipping malformed building record");
                parsed.errors.push(RecordParseError { line, message });
            }
        }
    }

    parsed
}
