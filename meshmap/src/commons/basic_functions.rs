use serde_json::{Map, Value};

/// Read a non-negative count from a GeoJSON property map.
///
/// Accepts JSON numbers and numeric strings ("12", "12.0"). Missing, null,
/// non-numeric, non-finite and negative values all read as zero.
pub fn count_property(props: &Map<String, Value>, key: &str) -> f64 {
    let value = match props.get(key) {
        Some(v) => v,
        None => return 0.0,
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n.is_finite() && n > 0.0 => n,
        _ => 0.0,
    }
}

/// Read a property as a string, taking the first key that is present.
///
/// Numbers are rendered without a fractional part when they are integral,
/// so a usage code stored as `411` or `"411"` reads the same.
pub fn string_property(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match props.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Some(i.to_string());
                }
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.is_finite() {
                        return Some(format!("{}", f as i64));
                    }
                    return Some(f.to_string());
                }
            }
            _ => {}
        }
    }
    None
}
