//! Presentation filters for the rendering layer
//!
//! Stateless formatting helpers exposed to templates as named functions.
//! Every filter is total over its input domain: malformed input degrades
//! to a documented fallback value instead of an error.

use serde_json::{Map, Value, json};

/// Placeholder shown for phone numbers that were never captured.
const NOT_SPECIFIED: &str = "No especificado";

/// Format a Mexican or NANP phone number for display.
///
/// Non-digit characters are stripped before matching:
/// - 10 digits: `(AAA) BBB-CCCC`
/// - 12 digits with a `52` country code: `+52 (AAA) BBB-CCCC`
/// - 11 digits with a `1` country code: `+1 (AAA) BBB-CCCC`
///
/// Empty input renders the `"No especificado"` placeholder. Anything
/// else is returned unchanged, including strings with no digits at all.
pub fn phone_format(value: &str) -> String {
    if value.is_empty() {
        return NOT_SPECIFIED.to_string();
    }

    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => format_national(&digits),
        12 if digits.starts_with("52") => format!("+52 {}", format_national(&digits[2..])),
        11 if digits.starts_with('1') => format!("+1 {}", format_national(&digits[1..])),
        _ => value.to_string(),
    }
}

/// `(AAA) BBB-CCCC` from exactly ten digits.
fn format_national(digits: &str) -> String {
    debug_assert_eq!(digits.len(), 10);
    format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
}

/// Current wall-clock time in whole seconds since the Unix epoch.
///
/// Used as a cache-busting token for static assets. Monotonically
/// non-decreasing, but not unique across calls within the same second.
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Append a cache-busting query parameter to a static asset path.
pub fn static_with_timestamp(path: &str) -> String {
    format!("{}?v={}", path, current_timestamp())
}

/// Look up `key` in a JSON object, defaulting to numeric `0` when absent.
///
/// The zero default (rather than null or an empty string) is a
/// long-standing contract of the reporting templates; callers that need
/// to distinguish "absent" from "zero" must not use this filter.
pub fn get_item(map: &Map<String, Value>, key: &str) -> Value {
    map.get(key).cloned().unwrap_or_else(|| json!(0))
}

/// Multiply two values, coercing each to a number. Returns 0.0 if either
/// operand is non-numeric.
pub fn mul(a: &Value, b: &Value) -> f64 {
    match (coerce_f64(a), coerce_f64(b)) {
        (Some(a), Some(b)) => a * b,
        _ => 0.0,
    }
}

/// Divide `a` by `b` with numeric coercion. Returns 0.0 on non-numeric
/// input and on division by zero.
pub fn div(a: &Value, b: &Value) -> f64 {
    match (coerce_f64(a), coerce_f64(b)) {
        (Some(_), Some(b)) if b == 0.0 => 0.0,
        (Some(a), Some(b)) => a / b,
        _ => 0.0,
    }
}

/// Final segment of a path, or the empty string for empty input.
pub fn basename(path: &str) -> &str {
    if path.is_empty() {
        return "";
    }
    path.rsplit('/').next().unwrap_or(path)
}

/// Numeric coercion shared by the arithmetic filters. Accepts JSON
/// numbers, booleans are not numbers, and strings are parsed after
/// trimming.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_format_national() {
        assert_eq!(phone_format("5512345678"), "(551) 234-5678");
    }

    #[test]
    fn test_phone_format_strips_punctuation() {
        assert_eq!(phone_format("55-12-34-56-78"), "(551) 234-5678");
        assert_eq!(phone_format("(551) 234 5678"), "(551) 234-5678");
    }

    #[test]
    fn test_phone_format_mexico_country_code() {
        assert_eq!(phone_format("525512345678"), "+52 (551) 234-5678");
    }

    #[test]
    fn test_phone_format_nanp_country_code() {
        assert_eq!(phone_format("15512345678"), "+1 (551) 234-5678");
    }

    #[test]
    fn test_phone_format_empty_is_placeholder() {
        assert_eq!(phone_format(""), "No especificado");
    }

    #[test]
    fn test_phone_format_unrecognized_passthrough() {
        // Wrong length and wrong prefix both pass through untouched.
        assert_eq!(phone_format("12345"), "12345");
        assert_eq!(phone_format("995512345678"), "995512345678");
        assert_eq!(phone_format("ext. oficina"), "ext. oficina");
    }

    #[test]
    fn test_static_with_timestamp_shape() {
        let tagged = static_with_timestamp("/static/css/main.css");
        let (path, token) = tagged.split_once("?v=").expect("missing ?v= parameter");
        assert_eq!(path, "/static/css/main.css");
        assert!(token.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn test_current_timestamp_non_decreasing() {
        let a = current_timestamp();
        let b = current_timestamp();
        assert!(b >= a);
    }

    #[test]
    fn test_get_item_present() {
        let map = serde_json::from_value::<Map<String, Value>>(json!({"a": 1})).unwrap();
        assert_eq!(get_item(&map, "a"), json!(1));
    }

    #[test]
    fn test_get_item_missing_defaults_to_zero() {
        let map = Map::new();
        assert_eq!(get_item(&map, "missing"), json!(0));
    }

    #[test]
    fn test_mul_coercion() {
        assert_eq!(mul(&json!(3), &json!(4)), 12.0);
        assert_eq!(mul(&json!("2.5"), &json!(4)), 10.0);
        assert_eq!(mul(&json!("abc"), &json!(2)), 0.0);
        assert_eq!(mul(&json!(null), &json!(2)), 0.0);
    }

    #[test]
    fn test_div_by_zero_is_zero() {
        assert_eq!(div(&json!(10), &json!(0)), 0.0);
        assert_eq!(div(&json!(10), &json!(4)), 2.5);
        assert_eq!(div(&json!("x"), &json!(4)), 0.0);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/srv/uploads/acta.pdf"), "acta.pdf");
        assert_eq!(basename("acta.pdf"), "acta.pdf");
        assert_eq!(basename(""), "");
        assert_eq!(basename("/srv/uploads/"), "");
    }
}
