//! Thematic land-use map core: mesh classification, region-sharded
//! building loading and viewport orchestration.
//!
//! The crate is renderer-agnostic. Browser bindings live in `meshmap-wasm`.

pub mod classify;
pub mod collect;
pub mod commons;
pub mod config;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod logging;
pub mod viewer;

pub use classify::{classify, Category, MeshAttributes, RuleSet, Shares};
pub use collect::loader::{LoadOutcome, Partition, RegionLoader};
pub use collect::source::DataSource;
#[cfg(feature = "native")]
pub use collect::source::{FileSource, HttpSource};
pub use config::ViewerConfig;
pub use error::{ConfigError, FetchError, LoadError, RecordParseError};
pub use geo_core::Viewport;
pub use geometric::building::{BuildingFeature, UsageTable};
pub use geometric::mesh::MeshDataset;
pub use geometric::region::{LonRange, RegionTable};
pub use viewer::{Renderer, Viewer, ViewportUpdate};
