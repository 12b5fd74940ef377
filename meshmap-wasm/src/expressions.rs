//! Map-library style expressions and layer data built from meshmap state.
//!
//! Everything here is plain JSON so it can be tested off the browser.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use meshmap::classify::attributes::keys;
use meshmap::classify::style::{CategoryStyle, MeshFilter, MeshStyle, HEATMAP_STEPS, TRANSPARENT};
use meshmap::geometric::building::{BuildingFeature, UsageTable};
use meshmap::geometric::mesh::CATEGORY_PROPERTY;
use meshmap::Category;
use serde_json::{json, Map, Value as JsonValue};

/// `fill-color` for the mesh fill layer.
pub fn fill_color(style: MeshStyle) -> JsonValue {
    match style {
        MeshStyle::ByCategory => {
            let mut expr = vec![json!("match"), json!(["get", CATEGORY_PROPERTY])];
            for category in Category::SELECTABLE {
                if let Some(tag) = category.tag() {
                    expr.push(json!(tag));
                    expr.push(json!(CategoryStyle::of(category).color));
                }
            }
            expr.push(json!(TRANSPARENT));
            JsonValue::Array(expr)
        }
        MeshStyle::HeatmapByCount => {
            let mut expr = vec![
                json!("step"),
                json!(["coalesce", ["get", keys::TOTAL], 0]),
                json!(HEATMAP_STEPS[0].1),
            ];
            for (min, color) in &HEATMAP_STEPS[1..] {
                expr.push(json!(min));
                expr.push(json!(color));
            }
            JsonValue::Array(expr)
        }
    }
}

/// Layer filter for both mesh layers.
pub fn filter(filter: MeshFilter) -> JsonValue {
    match filter {
        MeshFilter::All => json!(true),
        MeshFilter::Nothing => json!(false),
        MeshFilter::CategoryEquals(category) => match category.tag() {
            Some(tag) => json!(["==", ["get", CATEGORY_PROPERTY], tag]),
            None => json!(["==", ["typeof", ["get", CATEGORY_PROPERTY]], "null"]),
        },
    }
}

/// Building points with their resolved usage label and color.
pub fn building_collection(buildings: &[BuildingFeature], usage: &UsageTable) -> FeatureCollection {
    let features = buildings
        .iter()
        .map(|building| {
            let style = usage.style_for(building);
            let mut properties = Map::new();
            properties.insert("id".to_string(), json!(building.id));
            properties.insert("usage_code".to_string(), json!(building.usage_code));
            properties.insert("usage".to_string(), json!(style.label));
            properties.insert("color".to_string(), json!(style.color));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    building.location.x(),
                    building.location.y(),
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Legend rows for the selectable categories.
pub fn legend() -> JsonValue {
    let rows: Vec<JsonValue> = Category::SELECTABLE
        .iter()
        .map(|category| {
            let style = CategoryStyle::of(*category);
            json!({ "category": category, "label": style.label, "color": style.color })
        })
        .collect();
    JsonValue::Array(rows)
}
