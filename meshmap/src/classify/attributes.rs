use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::commons::basic_functions::count_property;

/// Attribute keys used by the mesh statistics files.
pub mod keys {
    pub const TOTAL: &str = "建物総数";
    pub const APARTMENT: &str = "建物_共同住宅";
    pub const HOUSE: &str = "建物_住宅";
    pub const MIXED_RESIDENTIAL_RETAIL: &str = "建物_店舗等併用住宅";
    pub const MIXED_COLLECTIVE_RETAIL: &str = "建物_店舗等併用共同住宅";
    pub const COMMERCIAL: &str = "建物_商業施設";
    pub const COMMERCIAL_COMPLEX: &str = "建物_商業系複合施設";
    pub const OFFICE: &str = "建物_業務施設";
}

/// Building counts of one mesh. Absent counts are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshAttributes {
    pub total: f64,
    pub apartment: f64,
    pub house: f64,
    pub mixed_residential_retail: f64,
    pub mixed_collective_retail: f64,
    pub commercial: f64,
    pub commercial_complex: f64,
    pub office: f64,
}

/// Shares of the three building groups over the mesh total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Shares {
    pub residential: f64,
    pub commercial: f64,
    pub office: f64,
}

impl MeshAttributes {
    pub fn from_properties(props: &Map<String, Value>) -> Self {
        MeshAttributes {
            total: count_property(props, keys::TOTAL),
            apartment: count_property(props, keys::APARTMENT),
            house: count_property(props, keys::HOUSE),
            mixed_residential_retail: count_property(props, keys::MIXED_RESIDENTIAL_RETAIL),
            mixed_collective_retail: count_property(props, keys::MIXED_COLLECTIVE_RETAIL),
            commercial: count_property(props, keys::COMMERCIAL),
            commercial_complex: count_property(props, keys::COMMERCIAL_COMPLEX),
            office: count_property(props, keys::OFFICE),
        }
    }

    pub fn residential_sum(&self) -> f64 {
        self.apartment + self.house + self.mixed_residential_retail + self.mixed_collective_retail
    }

    pub fn commercial_sum(&self) -> f64 {
        self.commercial + self.commercial_complex
    }

    pub fn office_sum(&self) -> f64 {
        self.office
    }

    /// Group shares, or `None` for an empty mesh.
    pub fn shares(&self) -> Option<Shares> {
        if self.total <= 0.0 {
            return None;
        }
        Some(Shares {
            residential: self.residential_sum() / self.total,
            commercial: self.commercial_sum() / self.total,
            office: self.office_sum() / self.total,
        })
    }
}
