//! Form fixtures
//!
//! A fixture names the form under test, the navigation elements around it,
//! and the value every field should be filled with. Fixtures are loaded
//! from YAML; `FormFixture::astro_sky()` is the built-in reference form.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::session::Platform;

use super::{FieldExpectation, FieldKind, FieldOption, FieldSpec, FieldValue, LocatorKey};

/// A form and the values to enter into it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFixture {
    /// Name of the form, used in reports
    pub name: String,
    /// Navigation tabs used to open the form and to leave it
    pub sections: Sections,
    /// Button that opens a new, empty record
    pub new_record: LocatorKey,
    #[serde(default = "default_submit")]
    pub submit: LocatorKey,
    /// Prompt the app shows when leaving a form with unsaved changes
    #[serde(default)]
    pub confirm_leave: Option<LocatorKey>,
    /// Element whose text is the JSON payload of the current record
    #[serde(default = "default_payload")]
    pub payload: LocatorKey,
    /// Payload keys that may hold the record id, in lookup order
    #[serde(default = "default_record_id_keys")]
    pub record_id_keys: Vec<String>,
    /// Per-platform locator overrides for keys that don't follow the default scheme
    #[serde(default)]
    pub locators: BTreeMap<LocatorKey, PlatformLocators>,
    pub fields: Vec<FixtureField>,
}

/// Section tabs of the app's navigation bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sections {
    /// Tab holding the form under test
    pub home: LocatorKey,
    /// Any other tab, used to navigate away and back
    pub alternate: LocatorKey,
}

/// Locator strings for one key, by platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformLocators {
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub web: Option<String>,
}

/// A field and the value it is filled with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureField {
    pub key: LocatorKey,
    pub kind: FieldKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    pub value: FieldValue,
}

impl FixtureField {
    pub fn spec(&self) -> FieldSpec {
        FieldSpec {
            key: self.key.clone(),
            kind: self.kind,
            label: self.label.clone(),
            options: self.options.clone(),
        }
    }
}

fn default_submit() -> LocatorKey {
    LocatorKey::from("submit")
}

fn default_payload() -> LocatorKey {
    LocatorKey::from("form-json")
}

fn default_record_id_keys() -> Vec<String> {
    vec!["_id".to_string(), "record_id".to_string()]
}

impl FormFixture {
    /// Load and validate a fixture from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            Error::FixtureParse { reason, .. } => Error::FixtureParse {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate a fixture from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        let fixture: FormFixture = serde_yaml::from_str(content).map_err(|e| Error::FixtureParse {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Check every value has the shape its field kind produces
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::FixtureParse {
            path: self.name.clone(),
            reason,
        };

        if self.fields.is_empty() {
            return Err(invalid("fixture has no fields".to_string()));
        }

        for field in &self.fields {
            if !field.value.fits(field.kind) {
                return Err(invalid(format!(
                    "'{}' is a {:?} field but its value is {}",
                    field.key, field.kind, field.value
                )));
            }

            let labels: Vec<&str> = match &field.value {
                FieldValue::Text(label)
                    if matches!(field.kind, FieldKind::Select | FieldKind::RadioGroup) =>
                {
                    vec![label.as_str()]
                }
                FieldValue::Set(labels) => labels.iter().map(String::as_str).collect(),
                _ => Vec::new(),
            };
            // Radio groups may be rendered without an options list
            let check_options = !field.options.is_empty() || field.kind != FieldKind::RadioGroup;
            for label in labels {
                if check_options && !field.options.iter().any(|o| o.label == label) {
                    return Err(invalid(format!(
                        "'{}' has no option labelled '{}'",
                        field.key, label
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn field_specs(&self) -> Vec<FieldSpec> {
        self.fields.iter().map(FixtureField::spec).collect()
    }

    pub fn expectations(&self) -> Vec<FieldExpectation> {
        self.fields
            .iter()
            .map(|f| FieldExpectation::new(f.key.clone(), f.value.clone()))
            .collect()
    }

    /// Locator overrides for one platform
    pub fn overrides_for(&self, platform: Platform) -> BTreeMap<LocatorKey, String> {
        self.locators
            .iter()
            .filter_map(|(key, locators)| {
                let locator = match platform {
                    Platform::Mobile => locators.mobile.as_ref(),
                    Platform::Web => locators.web.as_ref(),
                }?;
                Some((key.clone(), locator.clone()))
            })
            .collect()
    }

    /// The reference "Astro Sky" observation form
    pub fn astro_sky() -> Self {
        let currencies = [("USD", "$"), ("EUR", "€"), ("BTC", "฿"), ("JPY", "¥")];
        let numbers = [("1", "1"), ("2", "2"), ("3", "3"), ("4", "4")];

        let field = |spec: FieldSpec, value: FieldValue| FixtureField {
            key: spec.key,
            kind: spec.kind,
            label: spec.label,
            options: spec.options,
            value,
        };

        let mut locators = BTreeMap::new();
        locators.insert(
            LocatorKey::from("submit"),
            PlatformLocators {
                mobile: Some("//*[@text='SUBMIT']".to_string()),
                web: Some("xpath://button[@type='submit']".to_string()),
            },
        );
        locators.insert(
            LocatorKey::from("save-and-new"),
            PlatformLocators {
                mobile: Some("//*[@text='SAVE AND NEW']".to_string()),
                web: Some("xpath://button[normalize-space()='Save and new']".to_string()),
            },
        );

        Self {
            name: "Astro Sky".to_string(),
            sections: Sections {
                home: LocatorKey::from("project-nav-scrollable-tab-astro_sky"),
                alternate: LocatorKey::from("project-nav-scrollable-tab-projectB"),
            },
            new_record: LocatorKey::from("new-observation"),
            submit: default_submit(),
            confirm_leave: Some(LocatorKey::from("save-and-new")),
            payload: default_payload(),
            record_id_keys: default_record_id_keys(),
            locators,
            fields: vec![
                field(
                    FieldSpec::new("email-field", FieldKind::Text, "Email Address"),
                    FieldValue::text("unittest@email.com"),
                ),
                field(
                    FieldSpec::new("str-field", FieldKind::Text, "Favourite Colour"),
                    FieldValue::text("purple"),
                ),
                field(
                    FieldSpec::new("multi-str-field", FieldKind::Text, "Textarea Field Label"),
                    FieldValue::text("Unicode testing: ♥ ✓ € 日本語"),
                ),
                field(
                    FieldSpec::new("int-field", FieldKind::Number, "Integer Field Label"),
                    FieldValue::Number(1.0),
                ),
                field(
                    FieldSpec::new("select-field", FieldKind::Select, "Currency")
                        .with_options(&currencies),
                    FieldValue::text("€"),
                ),
                field(
                    FieldSpec::new("multi-select-field", FieldKind::MultiSelect, "Currencies")
                        .with_options(&currencies),
                    FieldValue::set(["$", "€"]),
                ),
                field(
                    FieldSpec::new("checkbox-field", FieldKind::Checkbox, "Terms and Conditions"),
                    FieldValue::Bool(true),
                ),
                field(
                    FieldSpec::new("radio-group-field", FieldKind::RadioGroup, "Pick a number")
                        .with_options(&numbers),
                    FieldValue::text("4"),
                ),
            ],
        }
    }
}
