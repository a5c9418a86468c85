//! Normalized form model
//!
//! Both adapters translate what they read from the screen into these
//! types, so scenario code compares values without knowing which platform
//! produced them.

mod fixture;
mod record;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use fixture::{FixtureField, FormFixture, PlatformLocators, Sections};
pub use record::FormRecord;

/// Platform-neutral identifier of a UI element, e.g. `email-field`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorKey(String);

impl LocatorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LocatorKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for LocatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a field is rendered and therefore how it is filled and read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Select,
    MultiSelect,
    Checkbox,
    RadioGroup,
}

/// One choice of a select, multi-select or radio group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Value stored in the record, e.g. `EUR`
    pub value: String,
    /// Label shown on screen, e.g. `€`
    pub label: String,
}

/// Description of one form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: LocatorKey,
    pub kind: FieldKind,
    /// Field label as rendered next to the value
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

impl FieldSpec {
    pub fn new(key: &str, kind: FieldKind, label: &str) -> Self {
        Self {
            key: LocatorKey::from(key),
            kind,
            label: label.to_string(),
            options: Vec::new(),
        }
    }

    /// Builder: add `(value, label)` options
    pub fn with_options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = options
            .iter()
            .map(|(value, label)| FieldOption {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect();
        self
    }

    pub fn option_by_label(&self, label: &str) -> Option<&FieldOption> {
        self.options.iter().find(|o| o.label == label)
    }

    /// Label for a stored value; values without an option map to themselves
    pub fn label_for_value<'a>(&'a self, value: &'a str) -> &'a str {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
            .unwrap_or(value)
    }
}

/// A normalized, comparison-ready field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Selected option labels of a multi-select
    Set(BTreeSet<String>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Whether this value has the shape a field of `kind` produces
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (kind, self),
            (FieldKind::Text, FieldValue::Text(_))
                | (FieldKind::Number, FieldValue::Number(_))
                | (FieldKind::Select, FieldValue::Text(_))
                | (FieldKind::RadioGroup, FieldValue::Text(_))
                | (FieldKind::MultiSelect, FieldValue::Set(_))
                | (FieldKind::Checkbox, FieldValue::Bool(_))
        )
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Numbers render the way the app's number inputs do: 1 -> "1.0"
            FieldValue::Number(n) => write!(f, "{:?}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Set(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    f.write_str(item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Expected value of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpectation {
    pub key: LocatorKey,
    pub expected: FieldValue,
}

impl FieldExpectation {
    pub fn new(key: impl Into<LocatorKey>, expected: FieldValue) -> Self {
        Self {
            key: key.into(),
            expected,
        }
    }
}
