use geojson::{Feature, FeatureCollection, GeoJson, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::classify::style::{CategoryStyle, MeshFilter};
use crate::classify::{classify, Category, MeshAttributes, RuleSet};
use crate::error::LoadError;

/// Property written on each mesh feature with its category tag.
pub const CATEGORY_PROPERTY: &str = "__char";

/// One classified mesh polygon.
#[derive(Debug, Clone)]
pub struct MeshFeature {
    pub feature: Feature,
    pub attributes: MeshAttributes,
    pub category: Category,
}

/// Whole-dataset mesh collection, classified with one rule set.
#[derive(Debug, Clone)]
pub struct MeshDataset {
    meshes: Vec<MeshFeature>,
    rules: RuleSet,
    skipped_geometry: usize,
}

impl MeshDataset {
    /// Parse a GeoJSON FeatureCollection and classify every mesh.
    ///
    /// Features without an areal geometry are kept (they still carry counts)
    /// but are counted in [`MeshDataset::skipped_geometry`].
    pub fn from_geojson_str(text: &str, rules: &RuleSet) -> Result<Self, LoadError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| LoadError::InvalidDataset(format!("failed to parse GeoJSON: {}", e)))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(f) => FeatureCollection {
                bbox: None,
                foreign_members: None,
                features: vec![f],
            },
            GeoJson::Geometry(_) => {
                return Err(LoadError::InvalidDataset(
                    "GeoJSON must be a Feature or FeatureCollection".to_string(),
                ))
            }
        };

        Ok(Self::from_features(collection.features, rules))
    }

    pub fn from_features(features: Vec<Feature>, rules: &RuleSet) -> Self {
        let mut skipped_geometry = 0;
        let meshes = features
            .into_iter()
            .map(|feature| {
                let areal = matches!(
                    feature.geometry.as_ref().map(|g| &g.value),
                    Some(Value::Polygon(_)) | Some(Value::MultiPolygon(_))
                );
                if !areal {
                    skipped_geometry += 1;
                }
                let attributes = feature
                    .properties
                    .as_ref()
                    .map(MeshAttributes::from_properties)
                    .unwrap_or_default();
                MeshFeature {
                    feature,
                    attributes,
                    category: Category::None,
                }
            })
            .collect();

        let mut dataset = MeshDataset {
            meshes,
            rules: *rules,
            skipped_geometry,
        };
        dataset.annotate(rules);
        dataset
    }

    /// Reclassify with `rules` and write the tag into each feature's properties.
    pub fn annotate(&mut self, rules: &RuleSet) {
        self.rules = *rules;
        for mesh in &mut self.meshes {
            mesh.category = classify(&mesh.attributes, rules);
            let tag = mesh
                .category
                .tag()
                .map(|t| serde_json::Value::String(t.to_string()))
                .unwrap_or(serde_json::Value::Null);
            mesh.feature
                .properties
                .get_or_insert_with(Default::default)
                .insert(CATEGORY_PROPERTY.to_string(), tag);
        }

        if self.skipped_geometry > 0 {
            debug!(
                skipped = self.skipped_geometry,
                "mesh features without polygon geometry"
            );
        }
        info!(meshes = self.meshes.len(), counts = ?self.counts(), "mesh dataset classified");
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn skipped_geometry(&self) -> usize {
        self.skipped_geometry
    }

    pub fn meshes(&self) -> &[MeshFeature] {
        &self.meshes
    }

    /// Number of meshes per category, `None` included.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for mesh in &self.meshes {
            *counts.entry(mesh.category.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn filtered(&self, filter: MeshFilter) -> impl Iterator<Item = &MeshFeature> {
        self.meshes
            .iter()
            .filter(move |mesh| filter.matches(mesh.category))
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            foreign_members: None,
            features: self.meshes.iter().map(|m| m.feature.clone()).collect(),
        }
    }

    pub fn to_geojson(&self) -> String {
        GeoJson::from(self.to_feature_collection()).to_string()
    }

    pub fn popup(&self, index: usize) -> Option<MeshPopup> {
        self.meshes.get(index).map(MeshPopup::from_mesh)
    }
}

/// Content of the popup shown when a mesh is clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshPopup {
    pub category: Category,
    pub label: String,
    pub total: f64,
    /// Percentages rounded to one decimal, absent for empty meshes
    pub residential_pct: Option<f64>,
    pub commercial_pct: Option<f64>,
    pub office_pct: Option<f64>,
}

impl MeshPopup {
    pub fn from_mesh(mesh: &MeshFeature) -> Self {
        let shares = mesh.attributes.shares();
        let pct = |v: f64| (v * 1000.0).round() / 10.0;
        MeshPopup {
            category: mesh.category,
            label: CategoryStyle::of(mesh.category).label.to_string(),
            total: mesh.attributes.total,
            residential_pct: shares.map(|s| pct(s.residential)),
            commercial_pct: shares.map(|s| pct(s.commercial)),
            office_pct: shares.map(|s| pct(s.office)),
        }
    }
}
