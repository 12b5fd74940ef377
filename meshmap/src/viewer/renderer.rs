use serde::Serialize;

use crate::classify::style::{MeshFilter, MeshStyle};
use crate::geometric::building::{BuildingFeature, UsageTable};
use crate::geometric::mesh::MeshDataset;

/// Map layers the viewer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LayerId {
    MeshFill,
    MeshOutline,
    BuildingPoints,
    BuildingLabels,
}

impl LayerId {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerId::MeshFill => "mesh-usage-base",
            LayerId::MeshOutline => "mesh-usage-outline",
            LayerId::BuildingPoints => "buildings-points",
            LayerId::BuildingLabels => "buildings-labels",
        }
    }
}

/// Click handlers bound to layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HandlerKind {
    MeshPopup,
    BuildingPopup,
}

/// The map renderer the viewer feeds. Implemented over the browser map
/// library in the wasm bindings, and by recording fakes in tests.
pub trait Renderer {
    fn set_mesh_data(&mut self, meshes: &MeshDataset);
    fn set_mesh_style(&mut self, style: MeshStyle);
    fn set_mesh_filter(&mut self, filter: MeshFilter);
    fn set_mesh_opacity(&mut self, opacity: f64);
    /// Replace the building layer contents. An empty slice clears it.
    fn set_building_data(&mut self, buildings: &[BuildingFeature], usage: &UsageTable);
    fn set_layer_visibility(&mut self, layer: LayerId, visible: bool);
    fn has_handler(&self, layer: LayerId, kind: HandlerKind) -> bool;
    fn register_handler(&mut self, layer: LayerId, kind: HandlerKind);
}

/// Bind `kind` on `layer` unless it is already bound. Returns whether a
/// handler was registered.
pub fn ensure_handler<R: Renderer + ?Sized>(
    renderer: &mut R,
    layer: LayerId,
    kind: HandlerKind,
) -> bool {
    if renderer.has_handler(layer, kind) {
        return false;
    }
    renderer.register_handler(layer, kind);
    true
}
