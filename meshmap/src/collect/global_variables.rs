/// Default location of the whole-dataset mesh statistics file.
pub const MESH_USAGE_URL: &str = "web_data/mesh_usage.geojson";

/// Default location template of the region-sharded building files.
pub const BUILDINGS_BY_REGION_TEMPLATE: &str = "web_data/buildings_by_region/{region}.geojsonl";

/// Zoom at which building points appear.
pub const SHOW_BUILDINGS_ZOOM: f64 = 14.0;

/// Zoom at which building usage labels appear.
pub const SHOW_BUILDING_LABELS_ZOOM: f64 = 15.0;

/// Mesh fill opacity when buildings are hidden.
pub const MESH_OPACITY: f64 = 0.18;

/// Mesh fill opacity while building points are shown on top.
pub const MESH_DIMMED_OPACITY: f64 = 0.06;
