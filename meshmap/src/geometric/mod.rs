//! Map features: classified meshes, building points and their region bins.

pub mod building;
pub mod mesh;
pub mod region;
