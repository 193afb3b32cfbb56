//! License numbers were historically stored as integers, floats and text.
//! Everything is compared as the canonical text form produced here.

use crate::table::CellValue;

/// Canonical text form of a license-number cell. `123`, `123.0` and `"123"`
/// all become `"123"`; missing values become the empty string.
pub fn normalize(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) if f.is_nan() => String::new(),
        CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        CellValue::Float(f) => f.to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Text(s) => normalize_str(s),
    }
}

pub fn normalize_str(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        return String::new();
    }
    match trimmed.strip_suffix(".0") {
        Some(head) if !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) => {
            head.to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Numeric value of a license, when it has one.
pub fn as_number(value: &str) -> Option<u64> {
    normalize_str(value).parse().ok()
}

/// Next free license number: one above the numeric maximum, ignoring values
/// that are not numbers. `None` once the maximum is `u64::MAX`.
pub fn next_after<'a>(existing: impl IntoIterator<Item = &'a str>) -> Option<u64> {
    match existing.into_iter().filter_map(as_number).max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}
