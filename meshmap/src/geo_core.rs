use geo::Point;
use serde::{Deserialize, Serialize};

/// Map viewport state as reported by the map renderer.
/// Coordinates are WGS84 (EPSG:4326) longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    pub center_lon: f64,
    pub center_lat: f64,
}

impl Viewport {
    pub fn new(zoom: f64, center_lon: f64, center_lat: f64) -> Self {
        Viewport {
            zoom,
            center_lon,
            center_lat,
        }
    }

    pub fn center(&self) -> Point<f64> {
        Point::new(self.center_lon, self.center_lat)
    }
}

impl Default for Viewport {
    /// Initial view of the viewer: central Fukuoka at zoom 10
    fn default() -> Self {
        Viewport::new(10.0, 130.4017, 33.5904)
    }
}
