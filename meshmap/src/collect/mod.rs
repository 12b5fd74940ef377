pub mod geojsonl;
pub mod global_variables;
pub mod loader;
pub mod shard;
pub mod source;
