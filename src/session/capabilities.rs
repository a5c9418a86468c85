//! Session capabilities
//!
//! The configuration payload describing the device or browser a session
//! should run on. Capabilities are plain data: once a session has been
//! created from them they are never mutated.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::{Error, Result};

/// Which family of backend a session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Native mobile app through Appium
    Mobile,
    /// Web app through a browser driver
    Web,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mobile => write!(f, "mobile"),
            Self::Web => write!(f, "web"),
        }
    }
}

/// Desired environment of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// e.g. "Android", "Windows"
    #[serde(default)]
    pub platform_name: Option<String>,

    /// App identifier (mobile only)
    #[serde(default)]
    pub app: Option<String>,

    /// Browser name (web only)
    #[serde(default)]
    pub browser_name: Option<String>,

    #[serde(default)]
    pub device_name: Option<String>,

    #[serde(default)]
    pub platform_version: Option<String>,

    /// Human-readable run name shown on the grid dashboard
    #[serde(default)]
    pub session_name: Option<String>,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub build: Option<String>,

    /// Run against the local backend instead of the grid
    #[serde(default)]
    pub is_local: bool,

    #[serde(default)]
    pub enable_verbose_console_log: bool,

    #[serde(default)]
    pub enable_network_capture: bool,

    /// Additional capabilities passed through verbatim
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl Capabilities {
    /// Platform family implied by these capabilities
    ///
    /// An app identifier means mobile; otherwise a browser name means web.
    pub fn platform(&self) -> Result<Platform> {
        if self.app.is_some() {
            Ok(Platform::Mobile)
        } else if self.browser_name.is_some() {
            Ok(Platform::Web)
        } else {
            Err(Error::Config(
                "Capabilities need either 'app' (mobile) or 'browser_name' (web)".to_string(),
            ))
        }
    }

    /// Copy of these capabilities with verbose logging and network capture on
    pub fn with_diagnostics(&self) -> Capabilities {
        Capabilities {
            enable_verbose_console_log: true,
            enable_network_capture: true,
            ..self.clone()
        }
    }

    /// Name to report the run under
    pub fn display_name(&self) -> String {
        self.session_name
            .clone()
            .or_else(|| self.app.clone())
            .or_else(|| self.browser_name.clone())
            .unwrap_or_else(|| "unnamed session".to_string())
    }

    /// W3C new-session payload
    pub fn to_w3c(&self) -> Result<Value> {
        let platform = self.platform()?;
        let mut always = Map::new();

        if let Some(name) = &self.platform_name {
            always.insert("platformName".into(), Value::from(name.as_str()));
        }

        match platform {
            Platform::Mobile => {
                insert_opt(&mut always, "appium:app", &self.app);
                insert_opt(&mut always, "appium:deviceName", &self.device_name);
                insert_opt(&mut always, "appium:platformVersion", &self.platform_version);
            }
            Platform::Web => {
                insert_opt(&mut always, "browserName", &self.browser_name);
                insert_opt(&mut always, "browserVersion", &self.platform_version);
            }
        }

        if self.is_local {
            // Local drivers have no dashboard; route diagnostics to driver logs
            let mut prefs = Map::new();
            if self.enable_verbose_console_log {
                prefs.insert("browser".into(), Value::from("ALL"));
            }
            if self.enable_network_capture {
                prefs.insert("performance".into(), Value::from("ALL"));
            }
            if platform == Platform::Web && !prefs.is_empty() {
                always.insert("goog:loggingPrefs".into(), Value::Object(prefs));
            }
        } else {
            let mut vendor = Map::new();
            insert_opt(&mut vendor, "sessionName", &self.session_name);
            insert_opt(&mut vendor, "projectName", &self.project);
            insert_opt(&mut vendor, "buildName", &self.build);
            if self.enable_verbose_console_log {
                vendor.insert("consoleLogs".into(), Value::from("verbose"));
            }
            if self.enable_network_capture {
                vendor.insert("networkLogs".into(), Value::Bool(true));
                vendor.insert(
                    "networkLogsOptions".into(),
                    serde_json::json!({ "captureContent": true }),
                );
            }
            if !vendor.is_empty() {
                always.insert("bstack:options".into(), Value::Object(vendor));
            }
        }

        for (key, value) in &self.extra {
            always.insert(key.clone(), value.clone());
        }

        Ok(serde_json::json!({
            "capabilities": { "alwaysMatch": Value::Object(always) }
        }))
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_string(), Value::from(v.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn android() -> Capabilities {
        Capabilities {
            platform_name: Some("Android".into()),
            app: Some("bs://faims".into()),
            device_name: Some("Google Pixel 3".into()),
            session_name: Some("Test Data Entry - Android".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_platform_detection() {
        assert_eq!(android().platform().unwrap(), Platform::Mobile);

        let chrome = Capabilities {
            browser_name: Some("chrome".into()),
            ..Default::default()
        };
        assert_eq!(chrome.platform().unwrap(), Platform::Web);

        assert!(Capabilities::default().platform().is_err());
    }

    #[test]
    fn test_with_diagnostics_does_not_mutate_input() {
        let caps = android();
        let diagnostic = caps.with_diagnostics();

        assert!(!caps.enable_verbose_console_log);
        assert!(!caps.enable_network_capture);
        assert!(diagnostic.enable_verbose_console_log);
        assert!(diagnostic.enable_network_capture);
        assert_eq!(diagnostic.app, caps.app);
    }

    #[test]
    fn test_remote_payload_carries_vendor_options() {
        let payload = android().with_diagnostics().to_w3c().unwrap();
        let always = &payload["capabilities"]["alwaysMatch"];

        assert_eq!(always["platformName"], "Android");
        assert_eq!(always["appium:app"], "bs://faims");
        assert_eq!(always["bstack:options"]["consoleLogs"], "verbose");
        assert_eq!(always["bstack:options"]["networkLogs"], true);
        assert_eq!(
            always["bstack:options"]["networkLogsOptions"]["captureContent"],
            true
        );
        assert_eq!(always["bstack:options"]["sessionName"], "Test Data Entry - Android");
    }

    #[test]
    fn test_local_payload_has_no_vendor_options() {
        let caps = Capabilities {
            browser_name: Some("chrome".into()),
            is_local: true,
            ..Default::default()
        }
        .with_diagnostics();
        let payload = caps.to_w3c().unwrap();
        let always = &payload["capabilities"]["alwaysMatch"];

        assert!(always.get("bstack:options").is_none());
        assert_eq!(always["browserName"], "chrome");
        assert_eq!(always["goog:loggingPrefs"]["browser"], "ALL");
    }

    #[test]
    fn test_extra_passed_through() {
        let mut caps = android();
        caps.extra
            .insert("appium:autoGrantPermissions".into(), Value::Bool(true));
        let payload = caps.to_w3c().unwrap();
        assert_eq!(
            payload["capabilities"]["alwaysMatch"]["appium:autoGrantPermissions"],
            true
        );
    }
}
