//! Configuration file handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;
use crate::session::Capabilities;

/// Environment variable overriding `grid.username`
pub const GRID_USERNAME_ENV: &str = "FORMCHECK_GRID_USERNAME";
/// Environment variable overriding `grid.access_key`
pub const GRID_ACCESS_KEY_ENV: &str = "FORMCHECK_GRID_ACCESS_KEY";

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Remote grid settings
    #[serde(default)]
    pub grid: GridConfig,

    /// Local backend settings
    #[serde(default)]
    pub local: LocalConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Named capability profiles, e.g. `[profiles.android]`
    #[serde(default)]
    pub profiles: BTreeMap<String, Capabilities>,

    /// Local result sink settings
    #[serde(default)]
    pub results: ResultsConfig,
}

/// Remote grid configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GridConfig {
    /// WebDriver hub endpoint
    #[serde(default = "default_grid_url")]
    pub url: String,

    /// Grid account name
    #[serde(default)]
    pub username: Option<String>,

    /// Grid access key
    #[serde(default)]
    pub access_key: Option<String>,

    /// Session status endpoint; `{session_id}` is substituted
    #[serde(default = "default_status_url")]
    pub status_url: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            url: default_grid_url(),
            username: None,
            access_key: None,
            status_url: default_status_url(),
        }
    }
}

fn default_grid_url() -> String {
    "https://hub-cloud.browserstack.com/wd/hub".to_string()
}

fn default_status_url() -> String {
    "https://api.browserstack.com/automate/sessions/{session_id}.json".to_string()
}

impl GridConfig {
    /// Credentials for the grid, with environment overrides applied
    pub fn credentials(&self) -> Option<(String, String)> {
        self.credentials_with(
            std::env::var(GRID_USERNAME_ENV).ok(),
            std::env::var(GRID_ACCESS_KEY_ENV).ok(),
        )
    }

    /// Credentials given explicit override values; both halves are required
    pub fn credentials_with(
        &self,
        username: Option<String>,
        access_key: Option<String>,
    ) -> Option<(String, String)> {
        let username = username.or_else(|| self.username.clone())?;
        let access_key = access_key.or_else(|| self.access_key.clone())?;
        Some((username, access_key))
    }

    /// Status endpoint for one session
    pub fn status_url_for(&self, session_id: &str) -> String {
        self.status_url.replace("{session_id}", session_id)
    }
}

/// Local backend configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    /// Local Appium server or browser driver endpoint
    #[serde(default = "default_local_url")]
    pub url: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            url: default_local_url(),
        }
    }
}

fn default_local_url() -> String {
    "http://127.0.0.1:4723".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Bounded wait for an element to appear
    #[serde(default = "default_element_wait")]
    pub element_wait_secs: u64,

    /// Delay between element lookups while waiting
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for a single WebDriver request
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element_wait_secs: default_element_wait(),
            poll_interval_ms: default_poll_interval(),
            request_secs: default_request(),
        }
    }
}

fn default_element_wait() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    500
}
fn default_request() -> u64 {
    60
}

impl Timeouts {
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Local result sink configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ResultsConfig {
    /// JSON-lines file receiving one entry per report
    #[serde(default)]
    pub path: Option<std::path::PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Get a capability profile by name
    pub fn profile(&self, name: &str) -> Result<Capabilities> {
        self.profiles.get(name).cloned().ok_or_else(|| {
            let known = self.profiles.keys().cloned().collect::<Vec<_>>().join(", ");
            super::Error::Config(format!(
                "Unknown profile '{}'. Configured profiles: {}",
                name,
                if known.is_empty() { "(none)" } else { &known }
            ))
        })
    }
}
