use geo::Point;
use geojson::{feature::Id, Feature, Value};
use serde::{Deserialize, Serialize};

use crate::commons::basic_functions::string_property;

/// Color used for buildings whose usage code is missing or unmapped.
pub const FALLBACK_USAGE_COLOR: &str = "#888888";
pub const FALLBACK_USAGE_LABEL: &str = "不明";

const RESIDENTIAL_COLOR: &str = "#66c2a5";
const COMMERCIAL_COLOR: &str = "#fc8d62";
const OFFICE_COLOR: &str = "#8da0cb";

/// A building point from a region partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingFeature {
    pub location: Point<f64>,
    /// Building-use code from the urban planning survey ("411", ...)
    pub usage_code: Option<String>,
    pub id: Option<String>,
    /// Display label carried by the record (usually the usage name)
    pub label: Option<String>,
}

impl BuildingFeature {
    pub fn new(location: Point<f64>) -> Self {
        BuildingFeature {
            location,
            usage_code: None,
            id: None,
            label: None,
        }
    }

    /// Convert one GeoJSON feature. Only Point geometries are accepted.
    pub fn from_feature(feature: &Feature) -> Result<Self, String> {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| "feature has no geometry".to_string())?;

        let location = match &geometry.value {
            Value::Point(coords) if coords.len() >= 2 => {
                let (lon, lat) = (coords[0], coords[1]);
                if !lon.is_finite() || !lat.is_finite() {
                    return Err("point coordinates are not finite".to_string());
                }
                Point::new(lon, lat)
            }
            Value::Point(_) => return Err("point has fewer than two coordinates".to_string()),
            other => {
                return Err(format!(
                    "expected Point geometry, got {}",
                    geometry_kind(other)
                ))
            }
        };

        let mut building = BuildingFeature::new(location);
        if let Some(props) = feature.properties.as_ref() {
            building.usage_code = string_property(props, &["usage_code", "用途"]);
            building.id = string_property(props, &["id", "building_id"]);
            building.label = string_property(props, &["usage_ja", "name"]);
        }
        if building.id.is_none() {
            building.id = feature.id.as_ref().map(|id| match id {
                Id::String(s) => s.clone(),
                Id::Number(n) => n.to_string(),
            });
        }

        Ok(building)
    }

    pub fn lon(&self) -> f64 {
        self.location.x()
    }

    pub fn popup(&self, table: &UsageTable) -> BuildingPopup {
        let style = table.style_for(self);
        BuildingPopup {
            id: self.id.clone(),
            label: self.label.clone().unwrap_or_else(|| style.label.to_string()),
            usage: style.label.to_string(),
            color: style.color.to_string(),
        }
    }
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Label and color for one building-use code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageStyle {
    pub code: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

const FALLBACK_STYLE: UsageStyle = UsageStyle {
    code: "",
    label: FALLBACK_USAGE_LABEL,
    color: FALLBACK_USAGE_COLOR,
};

/// Fixed building-use code table. Residential, commercial and office codes
/// share the colors of the matching mesh categories.
#[derive(Debug, Clone)]
pub struct UsageTable {
    entries: Vec<UsageStyle>,
}

impl UsageTable {
    pub fn standard() -> Self {
        let entries = [
            ("401", "業務施設", OFFICE_COLOR),
            ("402", "商業施設", COMMERCIAL_COLOR),
            ("403", "宿泊施設", "#a6d854"),
            ("404", "商業系複合施設", COMMERCIAL_COLOR),
            ("411", "住宅", RESIDENTIAL_COLOR),
            ("412", "共同住宅", RESIDENTIAL_COLOR),
            ("413", "店舗等併用住宅", RESIDENTIAL_COLOR),
            ("414", "店舗等併用共同住宅", RESIDENTIAL_COLOR),
            ("415", "作業所併用住宅", RESIDENTIAL_COLOR),
            ("421", "官公庁施設", "#bdbdbd"),
            ("422", "文教厚生施設", "#ffd92f"),
            ("431", "運輸倉庫施設", "#b3b3b3"),
            ("441", "工場", "#e5c494"),
            ("451", "農林漁業用施設", "#b3de69"),
            ("452", "供給処理施設", "#bebada"),
            ("453", "防衛施設", "#9e9e9e"),
            ("454", "その他", FALLBACK_USAGE_COLOR),
            ("461", "不明", FALLBACK_USAGE_COLOR),
        ]
        .into_iter()
        .map(|(code, label, color)| UsageStyle { code, label, color })
        .collect();

        UsageTable { entries }
    }

    /// Style of a usage code; unmapped or missing codes get the neutral fallback.
    pub fn style(&self, code: Option<&str>) -> UsageStyle {
        code.and_then(|c| self.entries.iter().find(|e| e.code == c.trim()))
            .copied()
            .unwrap_or(FALLBACK_STYLE)
    }

    /// Lookup by usage name, for shards that only carry `usage_ja`.
    pub fn style_for_label(&self, label: Option<&str>) -> UsageStyle {
        label
            .and_then(|l| self.entries.iter().find(|e| e.label == l.trim()))
            .copied()
            .unwrap_or(FALLBACK_STYLE)
    }

    /// Prefer the code, fall back to the label.
    pub fn style_for(&self, building: &BuildingFeature) -> UsageStyle {
        match building.usage_code.as_deref() {
            Some(code) => self.style(Some(code)),
            None => self.style_for_label(building.label.as_deref()),
        }
    }

    pub fn entries(&self) -> &[UsageStyle] {
        &self.entries
    }
}

impl Default for UsageTable {
    fn default() -> Self {
        UsageTable::standard()
    }
}

/// Content of the popup shown when a building point is clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingPopup {
    pub id: Option<String>,
    pub label: String,
    pub usage: String,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(value: serde_json::Value) -> Feature {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_point_feature() {
        let f = feature(json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [130.41, 33.59] },
            "properties": { "usage_code": 411, "building_id": "b-1", "usage_ja": "住宅" }
        }));
        let b = BuildingFeature::from_feature(&f).unwrap();
        assert_eq!(b.lon(), 130.41);
        assert_eq!(b.usage_code.as_deref(), Some("411"));
        assert_eq!(b.id.as_deref(), Some("b-1"));
        assert_eq!(b.label.as_deref(), Some("住宅"));
    }

    #[test]
    fn test_feature_id_fallback() {
        let f = feature(json!({
            "type": "Feature",
            "id": 42,
            "geometry": { "type": "Point", "coordinates": [130.41, 33.59] },
            "properties": null
        }));
        let b = BuildingFeature::from_feature(&f).unwrap();
        assert_eq!(b.id.as_deref(), Some("42"));
        assert!(b.usage_code.is_none());
    }

    #[test]
    fn test_rejects_non_point() {
        let f = feature(json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] },
            "properties": {}
        }));
        assert!(BuildingFeature::from_feature(&f).is_err());
    }

    #[test]
    fn test_usage_styles_and_fallback() {
        let table = UsageTable::standard();
        assert_eq!(table.style(Some("411")).label, "住宅");
        assert_eq!(table.style(Some("402")).color, COMMERCIAL_COLOR);
        assert_eq!(table.style(Some("999")).color, FALLBACK_USAGE_COLOR);
        assert_eq!(table.style(None).label, FALLBACK_USAGE_LABEL);
        assert_eq!(table.style_for_label(Some("業務施設")).code, "401");
    }

    #[test]
    fn test_popup_uses_usage_label_when_record_has_none() {
        let mut b = BuildingFeature::new(Point::new(130.5, 33.6));
        b.usage_code = Some("401".into());
        let popup = b.popup(&UsageTable::standard());
        assert_eq!(popup.label, "業務施設");
        assert_eq!(popup.usage, "業務施設");
        assert_eq!(popup.id, None);
    }
}
