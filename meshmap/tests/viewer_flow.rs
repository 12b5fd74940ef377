//! End to end: shard a building file, then drive a viewer over the shards
//! from a local directory.

use meshmap::classify::style::{DisplayMode, MeshFilter, MeshStyle};
use meshmap::collect::shard::split_by_region;
use meshmap::geometric::building::BuildingFeature;
use meshmap::viewer::{BuildingLoad, HandlerKind, LayerId, MeshLoadStatus};
use meshmap::{
    Category, FileSource, MeshDataset, RegionTable, Renderer, UsageTable, Viewer, ViewerConfig,
    Viewport,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Cursor;

#[derive(Default)]
struct RecordingRenderer {
    categories: Vec<Category>,
    filter: Option<MeshFilter>,
    style: Option<MeshStyle>,
    opacity: Option<f64>,
    building_colors: Vec<&'static str>,
    visible: HashMap<LayerId, bool>,
    handlers: HashSet<(LayerId, HandlerKind)>,
    registrations: usize,
}

impl Renderer for RecordingRenderer {
    fn set_mesh_data(&mut self, meshes: &MeshDataset) {
        self.categories = meshes.meshes().iter().map(|m| m.category).collect();
    }
    fn set_mesh_style(&mut self, style: MeshStyle) {
        self.style = Some(style);
    }
    fn set_mesh_filter(&mut self, filter: MeshFilter) {
        self.filter = Some(filter);
    }
    fn set_mesh_opacity(&mut self, opacity: f64) {
        self.opacity = Some(opacity);
    }
    fn set_building_data(&mut self, buildings: &[BuildingFeature], usage: &UsageTable) {
        self.building_colors = buildings.iter().map(|b| usage.style_for(b).color).collect();
    }
    fn set_layer_visibility(&mut self, layer: LayerId, visible: bool) {
        self.visible.insert(layer, visible);
    }
    fn has_handler(&self, layer: LayerId, kind: HandlerKind) -> bool {
        self.handlers.contains(&(layer, kind))
    }
    fn register_handler(&mut self, layer: LayerId, kind: HandlerKind) {
        self.registrations += 1;
        self.handlers.insert((layer, kind));
    }
}

fn mesh(props: &str) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{{}}},"geometry":{{"type":"Polygon","coordinates":[[[130.4,33.5],[130.41,33.5],[130.41,33.51],[130.4,33.5]]]}}}}"#,
        props
    )
}

fn building(lon: f64, code: &str) -> String {
    format!(
        r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{},33.6]}},"properties":{{"usage_code":"{}"}}}}"#,
        lon, code
    )
}

fn web_data() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();

    let meshes = [
        mesh(r#""建物総数":100,"建物_共同住宅":30,"建物_住宅":20,"建物_商業施設":20,"建物_業務施設":20"#),
        mesh(r#""建物総数":100,"建物_住宅":70"#),
        mesh(r#""建物総数":5,"建物_住宅":5"#),
        mesh(r#""建物総数":40,"建物_業務施設":40"#),
    ];
    fs::write(
        dir.path().join("mesh_usage.geojson"),
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            meshes.join(",")
        ),
    )
    .unwrap();

    let lines = [
        building(130.41, "401"),
        building(130.42, "411"),
        "not json".to_string(),
        building(130.25, "402"),
        building(131.9, "999"),
    ];
    let report = split_by_region(
        Cursor::new(lines.join("\n")),
        &RegionTable::fukuoka_default(),
        &dir.path().join("buildings_by_region"),
    )
    .unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.clamped, 1);
    assert_eq!(report.counts["lon_2"], 2);

    dir
}

fn config() -> ViewerConfig {
    ViewerConfig::from_json_str(
        r#"{ "mesh_url": "mesh_usage.geojson",
             "building_partition_template": "buildings_by_region/{region}.geojsonl" }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_session_over_local_shards() {
    let dir = web_data();
    let viewer = Viewer::new(config(), FileSource::new(dir.path()), RecordingRenderer::default())
        .unwrap();

    assert_eq!(
        viewer.load_meshes().await.unwrap(),
        MeshLoadStatus::Loaded { meshes: 4 }
    );
    assert_eq!(
        viewer.renderer().categories,
        vec![
            Category::Diverse,
            Category::Residential,
            Category::None,
            Category::Office
        ]
    );

    viewer.set_mode(DisplayMode::parse("diverse"));
    assert_eq!(
        viewer.renderer().filter,
        Some(MeshFilter::CategoryEquals(Category::Diverse))
    );

    // Overview zoom: no building traffic at all
    let update = viewer
        .on_viewport_change(Viewport::new(11.0, 130.41, 33.59))
        .await;
    assert_eq!(update.buildings, BuildingLoad::NotShown);
    assert_eq!(viewer.loader().fetch_count(), 0);

    let update = viewer
        .on_viewport_change(Viewport::new(15.0, 130.41, 33.59))
        .await;
    assert_eq!(update.region.as_deref(), Some("lon_2"));
    assert_eq!(
        update.buildings,
        BuildingLoad::Loaded {
            features: 2,
            skipped: 0
        }
    );
    {
        let renderer = viewer.renderer();
        assert_eq!(renderer.building_colors.len(), 2);
        assert_eq!(renderer.opacity, Some(0.06));
        assert_eq!(renderer.visible.get(&LayerId::BuildingLabels), Some(&true));
    }

    // Pan west into lon_1 and back
    viewer
        .on_viewport_change(Viewport::new(15.0, 130.25, 33.59))
        .await;
    let update = viewer
        .on_viewport_change(Viewport::new(15.0, 130.45, 33.59))
        .await;
    assert!(matches!(update.buildings, BuildingLoad::Loaded { .. }));
    assert_eq!(viewer.loader().fetch_count(), 3);

    // Popup handlers are bound once however many loads happen
    assert_eq!(viewer.renderer().registrations, 2);
}

#[tokio::test]
async fn test_missing_mesh_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let viewer = Viewer::new(config(), FileSource::new(dir.path()), RecordingRenderer::default())
        .unwrap();
    let err = viewer.load_meshes().await.unwrap_err();
    assert!(err.to_string().contains("mesh_usage.geojson"));
    assert!(viewer.meshes().error().is_some());
    assert!(viewer.renderer().categories.is_empty());
}
