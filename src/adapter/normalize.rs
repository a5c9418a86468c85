//! Conversions from platform-native element state to [`FieldValue`]s

use std::collections::BTreeSet;

use serde_json::Value;

use crate::common::{Error, Result};
use crate::form::{FieldSpec, FieldValue};

/// Normalize a `checked` attribute
///
/// Android reports `"true"`/`"false"`; browsers report `"true"` or nothing.
pub fn parse_checked(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None | Some("false") | Some("null") => false,
        Some(_) => true,
    }
}

/// Normalize a browser's `checked` property
pub fn checked_property(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => parse_checked(Some(s)),
        _ => false,
    }
}

/// Text of a string-valued property; `null` reads as empty
pub fn property_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Drop a leading field label from rendered text
///
/// Mobile renders a select as its label followed by the value, e.g.
/// `Currency €`.
pub fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    let text = text.trim();
    if label.is_empty() {
        return text;
    }
    match text.strip_prefix(label) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => text,
    }
}

/// Split a rendered multi-select value (`$, €`) into its option labels
pub fn split_labels(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a rendered number
///
/// An empty input reads as empty text, so a lost value surfaces as a
/// mismatch rather than a fault.
pub fn parse_number(field: &FieldSpec, text: &str) -> Result<FieldValue> {
    let text = strip_label(text, &field.label);
    if text.is_empty() {
        return Ok(FieldValue::text(""));
    }
    text.parse::<f64>()
        .map(FieldValue::Number)
        .map_err(|_| Error::unexpected_state(field.key.as_str(), format!("'{}' is not a number", text)))
}

/// Text to type into a number input; whole numbers are typed without a fraction
pub fn number_input(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Collapse the selected options of a radio group into one value
///
/// No selection normalizes to empty text; more than one is a fault.
pub fn single_selection(field: &FieldSpec, mut selected: Vec<String>) -> Result<FieldValue> {
    match selected.len() {
        0 => Ok(FieldValue::text("")),
        1 => Ok(FieldValue::Text(selected.remove(0))),
        n => Err(Error::unexpected_state(
            field.key.as_str(),
            format!("{} options selected in a radio group: {}", n, selected.join(", ")),
        )),
    }
}

/// Option labels a value selects, for select-type fields
pub fn selected_labels(field: &FieldSpec, value: &FieldValue) -> Result<Vec<String>> {
    match value {
        FieldValue::Text(label) => Ok(vec![label.clone()]),
        FieldValue::Set(labels) => Ok(labels.iter().cloned().collect()),
        other => Err(Error::unexpected_state(
            field.key.as_str(),
            format!("cannot select {}", other),
        )),
    }
}

/// Stored option value for a label, falling back to the label itself
pub fn option_value<'a>(field: &'a FieldSpec, label: &'a str) -> &'a str {
    field
        .option_by_label(label)
        .map(|o| o.value.as_str())
        .unwrap_or(label)
}
