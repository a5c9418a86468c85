//! Form records
//!
//! A `FormRecord` is what the scenario saw: either read back field by field
//! from the screen, or parsed from the JSON payload the app exposes for the
//! record being edited.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::common::{Error, Result};

use super::{FieldExpectation, FieldKind, FieldSpec, FieldValue, LocatorKey};

/// Mapping from field key to its normalized value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormRecord {
    values: BTreeMap<LocatorKey, FieldValue>,
}

impl FormRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: LocatorKey, value: FieldValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &LocatorKey) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocatorKey, &FieldValue)> {
        self.values.iter()
    }

    /// Build a record from the app's JSON payload
    ///
    /// Field values are looked up under `values` when present, otherwise at
    /// the top level. Option values are mapped to their labels so the result
    /// compares equal to what the adapters read off the screen. Fields that
    /// are absent or `null` are left out.
    pub fn from_json(payload: &Value, fields: &[FieldSpec]) -> Result<Self> {
        let object = payload
            .get("values")
            .unwrap_or(payload)
            .as_object()
            .ok_or_else(|| Error::MalformedPayload("expected a JSON object".to_string()))?;

        let mut record = Self::new();
        for field in fields {
            match object.get(field.key.as_str()) {
                None | Some(Value::Null) => continue,
                Some(raw) => {
                    record.insert(field.key.clone(), normalize_json(field, raw)?);
                }
            }
        }
        Ok(record)
    }

    /// Extract the record id from the first of `keys` present in the payload
    pub fn record_id(payload: &Value, keys: &[String]) -> Option<String> {
        keys.iter().find_map(|key| match payload.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Check every expectation; the first mismatch is an assertion failure
    pub fn verify(&self, expectations: &[FieldExpectation]) -> Result<()> {
        for expectation in expectations {
            match self.get(&expectation.key) {
                None => {
                    return Err(Error::assertion(format!(
                        "{}: expected:<{}> but was missing",
                        expectation.key, expectation.expected
                    )))
                }
                Some(actual) if *actual != expectation.expected => {
                    return Err(Error::assertion(format!(
                        "{}: expected:<{}> but was:<{}>",
                        expectation.key, expectation.expected, actual
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn normalize_json(field: &FieldSpec, raw: &Value) -> Result<FieldValue> {
    let malformed = || {
        Error::MalformedPayload(format!(
            "'{}' has unexpected value {} for a {:?} field",
            field.key, raw, field.kind
        ))
    };

    let value = match (field.kind, raw) {
        (FieldKind::Text, Value::String(s)) => FieldValue::Text(s.clone()),
        (FieldKind::Text, Value::Number(n)) => FieldValue::Text(n.to_string()),

        (FieldKind::Number, Value::Number(n)) => {
            FieldValue::Number(n.as_f64().ok_or_else(malformed)?)
        }
        (FieldKind::Number, Value::String(s)) => {
            FieldValue::Number(s.trim().parse().map_err(|_| malformed())?)
        }

        (FieldKind::Checkbox, Value::Bool(b)) => FieldValue::Bool(*b),
        (FieldKind::Checkbox, Value::String(s)) => match s.as_str() {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            _ => return Err(malformed()),
        },

        (FieldKind::Select | FieldKind::RadioGroup, Value::String(s)) => {
            FieldValue::Text(field.label_for_value(s).to_string())
        }

        (FieldKind::MultiSelect, Value::Array(items)) => {
            let mut labels = std::collections::BTreeSet::new();
            for item in items {
                let s = item.as_str().ok_or_else(malformed)?;
                labels.insert(field.label_for_value(s).to_string());
            }
            FieldValue::Set(labels)
        }
        (FieldKind::MultiSelect, Value::String(s)) => {
            FieldValue::set([field.label_for_value(s)])
        }

        _ => return Err(malformed()),
    };
    Ok(value)
}
