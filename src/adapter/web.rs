//! Web adapter (browser driver)
//!
//! Elements are addressed by DOM id. Live input state is read from DOM
//! properties, since attributes only reflect the initial markup; Material UI selects render the chosen labels as text
//! and open a listbox of `li[data-value]` options.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::form::{FieldKind, FieldSpec, FieldValue, LocatorKey};
use crate::session::Platform;
use crate::webdriver::{css_string, Driver, ElementRef, Locator};

use super::normalize;
use super::{wait_for_element, Locators, PlatformAdapter, ScrollDirection, WaitPolicy};

/// WebDriver key code for Escape
const KEY_ESCAPE: &str = "\u{E00C}";

pub struct WebAdapter {
    driver: Arc<dyn Driver>,
    locators: Locators,
    wait: WaitPolicy,
}

fn dom_id(key: &LocatorKey) -> Locator {
    Locator::Css(format!("#{}", key))
}

fn radio_inputs() -> Locator {
    Locator::Css("input[type='radio']".to_string())
}

impl WebAdapter {
    pub fn new(
        driver: Arc<dyn Driver>,
        overrides: BTreeMap<LocatorKey, String>,
        wait: WaitPolicy,
    ) -> Self {
        Self {
            driver,
            locators: Locators::new(overrides, dom_id),
            wait,
        }
    }

    async fn field_element(&self, field: &FieldSpec) -> Result<ElementRef> {
        self.resolve(&field.key, self.wait.timeout).await
    }

    async fn input_value(&self, field: &FieldSpec) -> Result<String> {
        let element = self.field_element(field).await?;
        let value = self.driver.property(&element, "value").await?;
        Ok(normalize::property_text(value))
    }

    async fn is_checked(&self, element: &ElementRef) -> Result<bool> {
        let checked = self.driver.property(element, "checked").await?;
        Ok(normalize::checked_property(&checked))
    }

    /// Open the listbox and click each option; returns the last option clicked
    async fn pick_options(&self, field: &FieldSpec, labels: &[String]) -> Result<Option<ElementRef>> {
        let element = self.field_element(field).await?;
        self.driver.click(&element).await?;

        let mut last = None;
        for label in labels {
            let value = normalize::option_value(field, label);
            let locator = Locator::Css(format!("li[data-value={}]", css_string(value)));
            let option = wait_for_element(
                &self.driver,
                label,
                &locator,
                self.wait.timeout,
                self.wait.interval,
            )
            .await?;
            self.driver.click(&option).await?;
            last = Some(option);
        }
        Ok(last)
    }
}

#[async_trait]
impl PlatformAdapter for WebAdapter {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    async fn resolve(&self, key: &LocatorKey, timeout: Duration) -> Result<ElementRef> {
        let locator = self.locators.locate(key)?;
        wait_for_element(&self.driver, key.as_str(), &locator, timeout, self.wait.interval).await
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.driver.click(element).await
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<()> {
        let sign = match direction {
            ScrollDirection::Up => -1,
            ScrollDirection::Down => 1,
        };
        tracing::debug!(%direction, "Scrolling");
        self.driver
            .execute(
                "window.scrollBy(0, arguments[0] * window.innerHeight);",
                vec![serde_json::json!(sign)],
            )
            .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        self.driver.text(element).await
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        self.driver.attribute(element, name).await
    }

    async fn fill(&self, field: &FieldSpec, value: &FieldValue) -> Result<()> {
        tracing::debug!(field = %field.key, %value, "Filling field");
        match (field.kind, value) {
            (FieldKind::Text, FieldValue::Text(text)) => {
                let element = self.field_element(field).await?;
                self.driver.clear(&element).await?;
                self.driver.send_keys(&element, text).await
            }
            (FieldKind::Number, FieldValue::Number(n)) => {
                let element = self.field_element(field).await?;
                self.driver.clear(&element).await?;
                self.driver
                    .send_keys(&element, &normalize::number_input(*n))
                    .await
            }
            (FieldKind::Select, _) => {
                let labels = normalize::selected_labels(field, value)?;
                self.pick_options(field, &labels).await?;
                Ok(())
            }
            (FieldKind::MultiSelect, _) => {
                let labels = normalize::selected_labels(field, value)?;
                // The listbox stays open after a multi-select pick
                if let Some(option) = self.pick_options(field, &labels).await? {
                    self.driver.send_keys(&option, KEY_ESCAPE).await?;
                }
                Ok(())
            }
            (FieldKind::Checkbox, FieldValue::Bool(wanted)) => {
                let element = self.field_element(field).await?;
                if self.is_checked(&element).await? != *wanted {
                    self.driver.click(&element).await?;
                }
                Ok(())
            }
            (FieldKind::RadioGroup, FieldValue::Text(label)) => {
                let value = normalize::option_value(field, label);
                let locator = Locator::Css(format!(
                    "input[name={}][value={}]",
                    css_string(field.key.as_str()),
                    css_string(value)
                ));
                let input = wait_for_element(
                    &self.driver,
                    label,
                    &locator,
                    self.wait.timeout,
                    self.wait.interval,
                )
                .await?;
                self.driver.click(&input).await
            }
            (kind, value) => Err(Error::unexpected_state(
                field.key.as_str(),
                format!("cannot fill a {:?} field with {}", kind, value),
            )),
        }
    }

    async fn read(&self, field: &FieldSpec) -> Result<FieldValue> {
        match field.kind {
            FieldKind::Text => Ok(FieldValue::Text(self.input_value(field).await?)),
            FieldKind::Number => {
                let value = self.input_value(field).await?;
                normalize::parse_number(field, &value)
            }
            FieldKind::Select => {
                let element = self.field_element(field).await?;
                let text = self.driver.text(&element).await?;
                Ok(FieldValue::text(normalize::strip_label(&text, &field.label)))
            }
            FieldKind::MultiSelect => {
                let element = self.field_element(field).await?;
                let text = self.driver.text(&element).await?;
                Ok(FieldValue::Set(normalize::split_labels(
                    normalize::strip_label(&text, &field.label),
                )))
            }
            FieldKind::Checkbox => {
                let element = self.field_element(field).await?;
                Ok(FieldValue::Bool(self.is_checked(&element).await?))
            }
            FieldKind::RadioGroup => {
                let group = self.field_element(field).await?;
                let mut selected = Vec::new();
                for input in self.driver.find_elements_from(&group, &radio_inputs()).await? {
                    if self.is_checked(&input).await? {
                        let value = self.driver.property(&input, "value").await?;
                        let value = normalize::property_text(value);
                        selected.push(field.label_for_value(&value).to_string());
                    }
                }
                normalize::single_selection(field, selected)
            }
        }
    }
}
