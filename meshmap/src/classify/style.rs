use serde::Serialize;

use super::category::Category;

/// Fill used for meshes with no category.
pub const TRANSPARENT: &str = "rgba(0,0,0,0)";

/// Paint color and legend label of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryStyle {
    pub color: &'static str,
    pub label: &'static str,
}

impl CategoryStyle {
    pub fn of(category: Category) -> CategoryStyle {
        match category {
            Category::Residential => CategoryStyle {
                color: "#66c2a5",
                label: "住居が多い地域",
            },
            Category::Commercial => CategoryStyle {
                color: "#fc8d62",
                label: "商業施設が多い地域",
            },
            Category::Office => CategoryStyle {
                color: "#8da0cb",
                label: "オフィスが多い地域",
            },
            Category::Diverse => CategoryStyle {
                color: "#e78ac3",
                label: "多用途地域",
            },
            Category::None => CategoryStyle {
                color: TRANSPARENT,
                label: "該当なし",
            },
        }
    }
}

/// Mode picked in the selector control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "category", rename_all = "snake_case")]
pub enum DisplayMode {
    /// Show only meshes of one category (never `Category::None`)
    Category(Category),
    AllCategories,
    HeatmapByCount,
    Hidden,
}

impl DisplayMode {
    /// Map a selector value to a mode. Unknown or empty values hide the mesh layer.
    pub fn parse(value: &str) -> DisplayMode {
        match value.trim() {
            "all" => DisplayMode::AllCategories,
            "heatmap" => DisplayMode::HeatmapByCount,
            other => match Category::from_tag(other) {
                Some(cat) => DisplayMode::Category(cat),
                None => DisplayMode::Hidden,
            },
        }
    }

    pub fn filter(self) -> MeshFilter {
        match self {
            DisplayMode::Category(Category::None) | DisplayMode::Hidden => MeshFilter::Nothing,
            DisplayMode::Category(cat) => MeshFilter::CategoryEquals(cat),
            DisplayMode::AllCategories | DisplayMode::HeatmapByCount => MeshFilter::All,
        }
    }

    pub fn style(self) -> MeshStyle {
        match self {
            DisplayMode::HeatmapByCount => MeshStyle::HeatmapByCount,
            _ => MeshStyle::ByCategory,
        }
    }
}

/// Filter predicate handed to the renderer for the mesh layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeshFilter {
    All,
    CategoryEquals(Category),
    Nothing,
}

impl MeshFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            MeshFilter::All => true,
            MeshFilter::CategoryEquals(wanted) => category == wanted,
            MeshFilter::Nothing => false,
        }
    }
}

/// Which paint mapping the mesh fill uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeshStyle {
    ByCategory,
    HeatmapByCount,
}

impl MeshStyle {
    pub fn color(self, category: Category, total: f64) -> &'static str {
        match self {
            MeshStyle::ByCategory => CategoryStyle::of(category).color,
            MeshStyle::HeatmapByCount => heatmap_color(total),
        }
    }
}

/// Stepped ramp over total building count (lower bounds, inclusive).
pub const HEATMAP_STEPS: [(f64, &str); 6] = [
    (0.0, "#ffffcc"),
    (10.0, "#c7e9b4"),
    (50.0, "#7fcdbb"),
    (100.0, "#41b6c4"),
    (200.0, "#2c7fb8"),
    (400.0, "#253494"),
];

pub fn heatmap_color(total: f64) -> &'static str {
    HEATMAP_STEPS
        .iter()
        .rev()
        .find(|(min, _)| total >= *min)
        .map(|(_, color)| *color)
        .unwrap_or(HEATMAP_STEPS[0].1)
}
