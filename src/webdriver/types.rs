//! WebDriver message types
//!
//! These types represent the W3C WebDriver wire format, plus the Appium
//! locator strategies the mobile backend understands.
//! See: https://www.w3.org/TR/webdriver2/

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{Error, Result};

/// W3C key holding an element reference
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Pre-W3C (JSONWire) key, still returned by some Appium drivers
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

// === Locators ===

/// A concrete, backend-specific element locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Appium resource id / DOM id
    Id(String),
    XPath(String),
    Css(String),
    AccessibilityId(String),
    ClassName(String),
}

impl Locator {
    /// Strategy name sent as `using`
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::XPath(_) => "xpath",
            Locator::Css(_) => "css selector",
            Locator::AccessibilityId(_) => "accessibility id",
            Locator::ClassName(_) => "class name",
        }
    }

    /// Selector sent as `value`
    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v)
            | Locator::XPath(v)
            | Locator::Css(v)
            | Locator::AccessibilityId(v)
            | Locator::ClassName(v) => v,
        }
    }

    /// Parse a prefixed locator string
    ///
    /// Accepts `xpath:`, `css:`, `id:`, `accessibility:` and `class:`
    /// prefixes. A bare string starting with `/` or `(` is XPath.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidLocator(s.to_string()));
        }

        if let Some((prefix, rest)) = s.split_once(':') {
            let rest = rest.trim().to_string();
            let locator = match prefix {
                "xpath" => Some(Locator::XPath(rest)),
                "css" => Some(Locator::Css(rest)),
                "id" => Some(Locator::Id(rest)),
                "accessibility" => Some(Locator::AccessibilityId(rest)),
                "class" => Some(Locator::ClassName(rest)),
                _ => None,
            };
            if let Some(locator) = locator {
                if locator.value().is_empty() {
                    return Err(Error::InvalidLocator(s.to_string()));
                }
                return Ok(locator);
            }
        }

        if s.starts_with('/') || s.starts_with('(') {
            return Ok(Locator::XPath(s.to_string()));
        }

        Err(Error::InvalidLocator(s.to_string()))
    }

    /// Request body for the find element(s) endpoints
    pub fn to_request(&self) -> Value {
        serde_json::json!({
            "using": self.strategy(),
            "value": self.value(),
        })
    }
}

/// Quote `text` as an XPath string literal
///
/// XPath 1.0 has no escape sequences, so text holding both quote kinds is
/// spliced together with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Quote `text` as a single-quoted CSS string
pub fn css_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

// === Elements ===

/// Opaque reference to an element inside one session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Extract an element reference from a wire value
    pub fn from_value(value: &Value) -> Result<Self> {
        value
            .get(ELEMENT_KEY)
            .or_else(|| value.get(LEGACY_ELEMENT_KEY))
            .and_then(|v| v.as_str())
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| {
                Error::MalformedSession(format!("Expected an element reference, got {}", value))
            })
    }

    /// Wire value for passing the element as a script argument
    pub fn to_value(&self) -> Value {
        serde_json::json!({ ELEMENT_KEY: self.0 })
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// === Responses ===

/// Envelope every WebDriver response is wrapped in
#[derive(Debug, Clone, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub value: Value,
}

/// Error payload carried in `value` on failure
#[derive(Debug, Clone, Deserialize)]
pub struct WireError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Error code meaning "nothing matched"
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// New session response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
    pub session_id: String,
    #[serde(default)]
    pub capabilities: Value,
}

/// Grid readiness report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}
