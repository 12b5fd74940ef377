//! Viewer orchestration: owns the application state and drives the
//! renderer from viewport and selection changes.
//!
//! All operations take `&self` so viewport changes may overlap on the one
//! UI thread; the renderer is only borrowed between awaits.

pub mod renderer;
pub mod state;

use serde::Serialize;
use std::cell::{Cell, Ref, RefCell};
use tracing::{debug, info, warn};

use crate::classify::style::DisplayMode;
use crate::classify::RuleSet;
use crate::collect::loader::{LoadOutcome, RegionLoader};
use crate::collect::source::DataSource;
use crate::config::ViewerConfig;
use crate::error::{ConfigError, LoadError};
use crate::geo_core::Viewport;
use crate::geometric::building::{BuildingPopup, UsageTable};
use crate::geometric::mesh::{MeshDataset, MeshPopup};

pub use renderer::{ensure_handler, HandlerKind, LayerId, Renderer};
pub use state::DataSlot;

/// Result of [`Viewer::load_meshes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MeshLoadStatus {
    Loaded { meshes: usize },
    AlreadyLoaded,
    InProgress,
}

/// What happened to the building layer on a viewport change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BuildingLoad {
    /// Zoom is below the building threshold
    NotShown,
    /// Center is outside every region; layer emptied
    OutOfCoverage,
    AlreadyResident,
    Loaded { features: usize, skipped: usize },
    /// An earlier viewport change is already fetching this region
    InFlight,
    /// A newer viewport change took over while this load was in flight
    Superseded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportUpdate {
    pub show_buildings: bool,
    pub show_labels: bool,
    pub region: Option<String>,
    pub buildings: BuildingLoad,
    pub mesh_opacity: f64,
}

pub struct Viewer<S, R> {
    config: ViewerConfig,
    rules: Cell<RuleSet>,
    usage: UsageTable,
    source: S,
    renderer: RefCell<R>,
    mode: Cell<DisplayMode>,
    meshes: RefCell<DataSlot<MeshDataset>>,
    loader: RegionLoader,
    viewport: Cell<Option<Viewport>>,
}

impl<S: DataSource, R: Renderer> Viewer<S, R> {
    pub fn new(config: ViewerConfig, source: S, renderer: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = config.rules()?;
        let loader = RegionLoader::new(
            config.regions.clone(),
            config.building_partition_template.clone(),
        );

        Ok(Viewer {
            rules: Cell::new(rules),
            usage: UsageTable::standard(),
            source,
            renderer: RefCell::new(renderer),
            mode: Cell::new(DisplayMode::AllCategories),
            meshes: RefCell::new(DataSlot::Unloaded),
            loader,
            viewport: Cell::new(None),
            config,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn rules(&self) -> RuleSet {
        self.rules.get()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode.get()
    }

    pub fn renderer(&self) -> Ref<'_, R> {
        self.renderer.borrow()
    }

    pub fn loader(&self) -> &RegionLoader {
        &self.loader
    }

    pub fn meshes(&self) -> Ref<'_, DataSlot<MeshDataset>> {
        self.meshes.borrow()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport.get()
    }

    /// Fetch and classify the mesh dataset once per session, then hand it to
    /// the renderer and bind the mesh popup.
    pub async fn load_meshes(&self) -> Result<MeshLoadStatus, LoadError> {
        {
            let mut slot = self.meshes.borrow_mut();
            if slot.is_ready() {
                return Ok(MeshLoadStatus::AlreadyLoaded);
            }
            if !slot.begin_loading() {
                return Ok(MeshLoadStatus::InProgress);
            }
        }

        info!(url = %self.config.mesh_url, "loading mesh dataset");
        let result = match self.source.fetch_text(&self.config.mesh_url).await {
            // Rules may have been swapped while the fetch was in flight
            Ok(text) => MeshDataset::from_geojson_str(&text, &self.rules.get()),
            Err(err) => Err(LoadError::from(err)),
        };

        let dataset = match result {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(error = %err, "mesh dataset load failed");
                self.meshes.borrow_mut().finish(Err(err.clone()));
                return Err(err);
            }
        };

        let count = dataset.len();
        {
            let mut renderer = self.renderer.borrow_mut();
            let mode = self.mode.get();
            renderer.set_mesh_data(&dataset);
            renderer.set_mesh_style(mode.style());
            renderer.set_mesh_filter(mode.filter());
            renderer.set_layer_visibility(LayerId::MeshFill, true);
            renderer.set_layer_visibility(LayerId::MeshOutline, true);
            ensure_handler(&mut *renderer, LayerId::MeshFill, HandlerKind::MeshPopup);
        }
        self.meshes.borrow_mut().finish::<LoadError>(Ok(dataset));

        Ok(MeshLoadStatus::Loaded { meshes: count })
    }

    /// Apply a selector choice to the mesh layers.
    pub fn set_mode(&self, mode: DisplayMode) {
        self.mode.set(mode);
        debug!(?mode, "display mode changed");
        let mut renderer = self.renderer.borrow_mut();
        renderer.set_mesh_style(mode.style());
        renderer.set_mesh_filter(mode.filter());
    }

    /// Swap the classification rule set and reclassify loaded meshes.
    pub fn set_rules(&self, rules: RuleSet) -> Result<(), ConfigError> {
        rules.validate()?;
        self.rules.set(rules);

        let mut slot = self.meshes.borrow_mut();
        if let Some(dataset) = slot.ready_mut() {
            dataset.annotate(&rules);
            self.renderer.borrow_mut().set_mesh_data(dataset);
        }
        Ok(())
    }

    /// React to a zoom or center change.
    pub async fn on_viewport_change(&self, viewport: Viewport) -> ViewportUpdate {
        self.viewport.set(Some(viewport));

        let zoomed_in = viewport.zoom >= self.config.show_buildings_zoom;
        let region = if zoomed_in {
            self.loader
                .determine_region(viewport.center_lon)
                .map(str::to_string)
        } else {
            None
        };
        // Outside coverage the building layers are hidden as well as emptied
        let show_buildings = zoomed_in && region.is_some();
        let show_labels =
            show_buildings && viewport.zoom >= self.config.show_building_labels_zoom;
        let mesh_opacity = if show_buildings {
            self.config.mesh_dimmed_opacity
        } else {
            self.config.mesh_opacity
        };

        {
            let mut renderer = self.renderer.borrow_mut();
            renderer.set_mesh_opacity(mesh_opacity);
            renderer.set_layer_visibility(LayerId::BuildingPoints, show_buildings);
            renderer.set_layer_visibility(LayerId::BuildingLabels, show_labels);
        }

        let buildings = match (zoomed_in, region.as_deref()) {
            (false, _) => BuildingLoad::NotShown,
            (true, None) => {
                self.loader.clear();
                self.renderer
                    .borrow_mut()
                    .set_building_data(&[], &self.usage);
                BuildingLoad::OutOfCoverage
            }
            (true, Some(region)) => self.load_region(region).await,
        };

        ViewportUpdate {
            show_buildings,
            show_labels,
            region,
            buildings,
            mesh_opacity,
        }
    }

    async fn load_region(&self, region: &str) -> BuildingLoad {
        match self.loader.ensure_region_loaded(&self.source, region).await {
            Ok(LoadOutcome::AlreadyResident(_)) => BuildingLoad::AlreadyResident,
            Ok(LoadOutcome::Loaded(partition)) => {
                let mut renderer = self.renderer.borrow_mut();
                renderer.set_building_data(&partition.features, &self.usage);
                ensure_handler(
                    &mut *renderer,
                    LayerId::BuildingPoints,
                    HandlerKind::BuildingPopup,
                );
                BuildingLoad::Loaded {
                    features: partition.features.len(),
                    skipped: partition.errors.len(),
                }
            }
            Ok(LoadOutcome::InFlight { .. }) => BuildingLoad::InFlight,
            Ok(LoadOutcome::Superseded { .. }) => BuildingLoad::Superseded,
            Err(err) => BuildingLoad::Failed(err.to_string()),
        }
    }

    pub fn mesh_popup(&self, index: usize) -> Option<MeshPopup> {
        self.meshes.borrow().ready().and_then(|d| d.popup(index))
    }

    /// Popup for a building of the resident partition, looked up by id.
    pub fn building_popup(&self, id: &str) -> Option<BuildingPopup> {
        let partition = self.loader.resident()?;
        partition
            .features
            .iter()
            .find(|b| b.id.as_deref() == Some(id))
            .map(|b| b.popup(&self.usage))
    }
}
