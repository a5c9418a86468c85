//! Native mobile adapter (Appium / UiAutomator2)
//!
//! Elements are addressed by Android resource id. Form widgets render their
//! label and value as a single text node, so reads strip the label.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::Result;
use crate::form::{FieldKind, FieldSpec, FieldValue, LocatorKey};
use crate::session::Platform;
use crate::webdriver::{xpath_literal, Driver, ElementRef, Locator};

use super::normalize;
use super::{wait_for_element, Locators, PlatformAdapter, ScrollDirection, WaitPolicy};

const RADIO_BUTTON_CLASS: &str = "android.widget.RadioButton";

/// Android keycode for BACK, used to dismiss option pickers
const KEYCODE_BACK: i64 = 4;

pub struct MobileAdapter {
    driver: Arc<dyn Driver>,
    locators: Locators,
    wait: WaitPolicy,
}

fn resource_id(key: &LocatorKey) -> Locator {
    Locator::XPath(format!("//*[@resource-id={}]", xpath_literal(key.as_str())))
}

fn with_text(text: &str) -> Locator {
    Locator::XPath(format!("//*[@text={}]", xpath_literal(text)))
}

impl MobileAdapter {
    pub fn new(
        driver: Arc<dyn Driver>,
        overrides: BTreeMap<LocatorKey, String>,
        wait: WaitPolicy,
    ) -> Self {
        Self {
            driver,
            locators: Locators::new(overrides, resource_id),
            wait,
        }
    }

    async fn wait_for(&self, what: &str, locator: &Locator) -> Result<ElementRef> {
        wait_for_element(&self.driver, what, locator, self.wait.timeout, self.wait.interval).await
    }

    async fn field_element(&self, field: &FieldSpec) -> Result<ElementRef> {
        self.resolve(&field.key, self.wait.timeout).await
    }

    /// Text of a field with its rendered label removed
    async fn field_value_text(&self, field: &FieldSpec) -> Result<String> {
        let element = self.field_element(field).await?;
        let text = self.driver.text(&element).await?;
        Ok(normalize::strip_label(&text, &field.label).to_string())
    }

    /// Open a picker and tap each option label
    async fn pick_options(&self, field: &FieldSpec, labels: &[String]) -> Result<()> {
        let element = self.field_element(field).await?;
        self.driver.click(&element).await?;
        for label in labels {
            let option = self.wait_for(label, &with_text(label)).await?;
            self.driver.click(&option).await?;
        }
        Ok(())
    }

    /// Radio buttons inside the group's container
    async fn radio_buttons(&self, field: &FieldSpec) -> Result<Vec<ElementRef>> {
        let group = self.field_element(field).await?;
        let buttons = Locator::ClassName(RADIO_BUTTON_CLASS.to_string());
        self.driver.find_elements_from(&group, &buttons).await
    }
}

#[async_trait]
impl PlatformAdapter for MobileAdapter {
    fn platform(&self) -> Platform {
        Platform::Mobile
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
        tracing::debug!(%direction, "Scrolling");
        self.driver
            .execute(
                "mobile: scrollGesture",
                vec![serde_json::json!({
                    "left": 100, "top": 300, "width": 600, "height": 900,
                    "direction": direction.to_string(),
                    "percent": 0.75
                })],
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
                self.pick_options(field, &labels).await
            }
            (FieldKind::MultiSelect, _) => {
                let labels = normalize::selected_labels(field, value)?;
                self.pick_options(field, &labels).await?;
                self.driver
                    .execute(
                        "mobile: pressKey",
                        vec![serde_json::json!({ "keycode": KEYCODE_BACK })],
                    )
                    .await?;
                Ok(())
            }
            (FieldKind::Checkbox, FieldValue::Bool(wanted)) => {
                let element = self.field_element(field).await?;
                let checked = self.driver.attribute(&element, "checked").await?;
                if normalize::parse_checked(checked.as_deref()) != *wanted {
                    self.driver.click(&element).await?;
                }
                Ok(())
            }
            (FieldKind::RadioGroup, FieldValue::Text(label)) => {
                self.field_element(field).await?;
                let locator = Locator::XPath(format!(
                    "//*[@resource-id={}]//{}[@text={}]",
                    xpath_literal(field.key.as_str()),
                    RADIO_BUTTON_CLASS,
                    xpath_literal(label)
                ));
                let button = self.wait_for(label, &locator).await?;
                self.driver.click(&button).await
            }
            (kind, value) => Err(crate::common::Error::unexpected_state(
                field.key.as_str(),
                format!("cannot fill a {:?} field with {}", kind, value),
            )),
        }
    }

    async fn read(&self, field: &FieldSpec) -> Result<FieldValue> {
        match field.kind {
            FieldKind::Text => {
                let element = self.field_element(field).await?;
                Ok(FieldValue::Text(self.driver.text(&element).await?))
            }
            FieldKind::Number => {
                let element = self.field_element(field).await?;
                let text = self.driver.text(&element).await?;
                normalize::parse_number(field, &text)
            }
            FieldKind::Select => Ok(FieldValue::Text(self.field_value_text(field).await?)),
            FieldKind::MultiSelect => {
                let text = self.field_value_text(field).await?;
                Ok(FieldValue::Set(normalize::split_labels(&text)))
            }
            FieldKind::Checkbox => {
                let element = self.field_element(field).await?;
                let checked = self.driver.attribute(&element, "checked").await?;
                Ok(FieldValue::Bool(normalize::parse_checked(checked.as_deref())))
            }
            FieldKind::RadioGroup => {
                let mut selected = Vec::new();
                for button in self.radio_buttons(field).await? {
                    let checked = self.driver.attribute(&button, "checked").await?;
                    if normalize::parse_checked(checked.as_deref()) {
                        selected.push(self.driver.text(&button).await?);
                    }
                }
                normalize::single_selection(field, selected)
            }
        }
    }
}
