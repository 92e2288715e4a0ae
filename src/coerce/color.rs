use serde_json::{Number, Value};

use super::palettes::{DEFAULT_PALETTE, palette};

/// Whether `value` is a CSS color string (hex, `rgb()`, `hsl()`, names, ...).
pub fn is_valid_color(value: &Value) -> bool {
    match value {
        Value::String(raw) => csscolorparser::parse(raw.trim()).is_ok(),
        _ => false,
    }
}

/// A non-empty sequence of valid colors.
pub fn is_valid_color_list(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty() && items.iter().all(is_valid_color),
        _ => false,
    }
}

/// Explicit scale check: at least two `[position, color]` pairs, positions
/// non-decreasing from exactly 0 to exactly 1.
pub fn is_valid_scale_array(value: &Value) -> bool {
    let Value::Array(stops) = value else {
        return false;
    };
    if stops.len() < 2 {
        return false;
    }

    let mut previous = f64::NEG_INFINITY;
    for stop in stops {
        let Some([position, color]) = stop.as_array().map(Vec::as_slice).and_then(pair) else {
            return false;
        };
        let Some(position) = position.as_f64() else {
            return false;
        };
        if position < previous || !is_valid_color(color) {
            return false;
        }
        previous = position;
    }

    let first = stops[0][0].as_f64();
    let last = stops[stops.len() - 1][0].as_f64();
    first == Some(0.0) && last == Some(1.0)
}

fn pair(items: &[Value]) -> Option<&[Value; 2]> {
    items.try_into().ok()
}

/// Scale for a palette name, case-insensitive.
pub fn palette_scale(name: &str) -> Option<Value> {
    let stops = palette(name)?;
    Some(Value::Array(
        stops
            .iter()
            .map(|(position, color)| {
                let position = Number::from_f64(*position).map_or(Value::Null, Value::Number);
                Value::Array(vec![position, Value::String((*color).to_string())])
            })
            .collect(),
    ))
}

pub fn default_scale() -> Value {
    palette_scale(DEFAULT_PALETTE).unwrap_or(Value::Null)
}

/// Normalize a color-scale candidate into its explicit array form.
///
/// Accepts a palette name, a JSON-encoded scale string or an explicit scale.
pub fn parse_scale(value: &Value) -> Option<Value> {
    match value {
        Value::String(raw) => {
            if let Some(scale) = palette_scale(raw.trim()) {
                return Some(scale);
            }
            let decoded: Value = serde_json::from_str(raw).ok()?;
            is_valid_scale_array(&decoded).then_some(decoded)
        }
        Value::Array(_) => is_valid_scale_array(value).then(|| value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_css_color_forms() {
        for color in ["#fff", "#a0b1c2", "rgb(255, 0, 0)", "rgba(0,0,0,0.5)", "hsl(0, 100%, 50%)"] {
            assert!(is_valid_color(&json!(color)), "{color}");
        }
        assert!(!is_valid_color(&json!("not-a-color")));
        assert!(!is_valid_color(&json!(12)));
    }

    #[test]
    fn color_lists_must_be_non_empty() {
        assert!(is_valid_color_list(&json!(["#000", "#111"])));
        assert!(!is_valid_color_list(&json!([])));
        assert!(!is_valid_color_list(&json!(["#000", "nope"])));
    }

    #[test]
    fn scale_arrays_span_zero_to_one() {
        assert!(is_valid_scale_array(&json!([[0, "#000"], [0.5, "#555"], [1, "#fff"]])));
        assert!(!is_valid_scale_array(&json!([[0, "#000"]])));
        assert!(!is_valid_scale_array(&json!([[0.1, "#000"], [1, "#fff"]])));
        assert!(!is_valid_scale_array(&json!([[0, "#000"], [0.9, "#fff"]])));
        assert!(!is_valid_scale_array(&json!([[0, "#000"], [0.6, "#111"], [0.4, "#222"], [1, "#fff"]])));
        assert!(!is_valid_scale_array(&json!([[0, "#000", 3], [1, "#fff"]])));
    }

    #[test]
    fn palette_names_are_case_insensitive() {
        let scale = parse_scale(&json!("greys")).unwrap();
        assert_eq!(scale, json!([[0.0, "rgb(0,0,0)"], [1.0, "rgb(255,255,255)"]]));
    }

    #[test]
    fn json_encoded_scales_are_decoded() {
        let scale = parse_scale(&json!("[[0, \"#000\"], [1, \"#fff\"]]")).unwrap();
        assert_eq!(scale, json!([[0, "#000"], [1, "#fff"]]));
        assert!(parse_scale(&json!("Rainbowish")).is_none());
    }

    #[test]
    fn default_scale_is_rdbu() {
        assert_eq!(default_scale(), palette_scale("RdBu").unwrap());
    }
}
