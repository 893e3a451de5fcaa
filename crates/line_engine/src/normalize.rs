//! Upstream numbers arrive as `110`, `"+110"`, `-3.5` or `"8.5"`.
//! Anything else is unknown (`None`), never zero.

use serde_json::Value;

pub fn normalize(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => normalize_str(s),
        _ => None,
    }
}

pub fn normalize_opt(raw: Option<&Value>) -> Option<f64> {
    raw.and_then(normalize)
}

pub fn normalize_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    // "++110" or "+-110" are not numbers
    if unsigned.starts_with(&['+', '-'][..]) && trimmed.starts_with('+') {
        return None;
    }
    unsigned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_numbers_and_signed_strings() {
        assert_eq!(normalize(&json!(110)), Some(110.0));
        assert_eq!(normalize(&json!(-150)), Some(-150.0));
        assert_eq!(normalize(&json!(-3.5)), Some(-3.5));
        assert_eq!(normalize(&json!("+110")), Some(110.0));
        assert_eq!(normalize(&json!("-110")), Some(-110.0));
        assert_eq!(normalize(&json!(" 8.5 ")), Some(8.5));
    }

    #[test]
    fn unparseable_is_unknown_not_zero() {
        assert_eq!(normalize(&json!("")), None);
        assert_eq!(normalize(&json!("EVEN")), None);
        assert_eq!(normalize(&json!("+-110")), None);
        assert_eq!(normalize(&json!("NaN")), None);
        assert_eq!(normalize(&json!("inf")), None);
        assert_eq!(normalize(&json!(null)), None);
        assert_eq!(normalize(&json!(true)), None);
        assert_eq!(normalize(&json!([110])), None);
        assert_eq!(normalize_opt(None), None);
    }
}
