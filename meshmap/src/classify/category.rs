use serde::{Deserialize, Serialize};
use std::fmt;

/// Land-use category assigned to a mesh.
///
/// Exactly one value per mesh; `None` means no rule matched or the mesh has
/// too few buildings to be judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Residential,
    Commercial,
    Office,
    Diverse,
    None,
}

impl Category {
    /// Categories a user can select, in legend order.
    pub const SELECTABLE: [Category; 4] = [
        Category::Residential,
        Category::Commercial,
        Category::Office,
        Category::Diverse,
    ];

    /// Tag stored in the `__char` mesh property. `None` has no tag and is
    /// written as JSON null.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Category::Residential => Some("residential"),
            Category::Commercial => Some("commercial"),
            Category::Office => Some("office"),
            Category::Diverse => Some("diverse"),
            Category::None => None,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Category> {
        match tag {
            "residential" => Some(Category::Residential),
            "commercial" => Some(Category::Commercial),
            "office" => Some(Category::Office),
            "diverse" => Some(Category::Diverse),
            _ => None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Category::None
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().unwrap_or("none"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_for_selectable() {
        for cat in Category::SELECTABLE {
            let tag = cat.tag().unwrap();
            assert_eq!(Category::from_tag(tag), Some(cat));
        }
        assert_eq!(Category::None.tag(), None);
        assert_eq!(Category::from_tag("none"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Category::Diverse).unwrap();
        assert_eq!(json, "\"diverse\"");
    }
}
