//! Mesh land-use classification.
//!
//! A mesh is judged from its building counts against a [`RuleSet`]. Checks
//! run in a fixed order and the first match wins: diverse, residential,
//! commercial, office. All comparisons are inclusive.

pub mod attributes;
pub mod category;
pub mod rules;
pub mod style;

pub use attributes::{MeshAttributes, Shares};
pub use category::Category;
pub use rules::RuleSet;

/// Assign at most one category to a mesh. Pure and total.
pub fn classify(attrs: &MeshAttributes, rules: &RuleSet) -> Category {
    let total = attrs.total;
    if total < rules.min_total || total <= 0.0 {
        return Category::None;
    }

    let r_res = attrs.residential_sum() / total;
    let r_com = attrs.commercial_sum() / total;
    let r_off = attrs.office_sum() / total;

    let diverse_allowed = rules.diverse_min_total.map_or(true, |min| total >= min);
    if diverse_allowed
        && r_res >= rules.diverse
        && r_com >= rules.diverse
        && r_off >= rules.diverse
    {
        return Category::Diverse;
    }
    if r_res >= rules.residential {
        return Category::Residential;
    }
    if r_com >= rules.commercial {
        return Category::Commercial;
    }
    if r_off >= rules.office {
        return Category::Office;
    }
    Category::None
}
