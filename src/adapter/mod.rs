//! Platform adapters
//!
//! An adapter turns logical operations ("fill the currency select with €")
//! into the concrete locators and wire calls one platform needs, and turns
//! whatever that platform renders back into normalized [`FieldValue`]s.
//! Scenario code only ever talks to the [`PlatformAdapter`] trait.

mod mobile;
pub mod normalize;
mod web;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::config::Timeouts;
use crate::common::{Error, Result};
use crate::form::{FieldSpec, FieldValue, LocatorKey};
use crate::session::{Platform, Session};
use crate::webdriver::{Driver, ElementRef, Locator};

pub use mobile::MobileAdapter;
pub use web::WebAdapter;

/// Default bounded wait for an element to appear
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10);

/// Default delay between lookups while waiting
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Bounded polling policy for element lookups
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl From<&Timeouts> for WaitPolicy {
    fn from(timeouts: &Timeouts) -> Self {
        Self {
            timeout: timeouts.element_wait(),
            interval: timeouts.poll_interval(),
        }
    }
}

/// Interaction primitives shared by every platform
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Wait policy applied when no explicit timeout is given
    fn wait_policy(&self) -> WaitPolicy;

    /// Resolve a logical key to an element, polling until `timeout`
    async fn resolve(&self, key: &LocatorKey, timeout: Duration) -> Result<ElementRef>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn scroll(&self, direction: ScrollDirection) -> Result<()>;

    async fn text(&self, element: &ElementRef) -> Result<String>;

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Enter a normalized value into a field
    async fn fill(&self, field: &FieldSpec, value: &FieldValue) -> Result<()>;

    /// Read a field back as a normalized value
    async fn read(&self, field: &FieldSpec) -> Result<FieldValue>;

    /// Resolve with the default timeout and click
    async fn tap(&self, key: &LocatorKey) -> Result<()> {
        let element = self.resolve(key, self.wait_policy().timeout).await?;
        self.click(&element).await
    }

    /// Poll the text of `key` until `condition` accepts it
    async fn wait_until_text(
        &self,
        key: &LocatorKey,
        condition: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
        timeout: Duration,
    ) -> Result<String> {
        let started = tokio::time::Instant::now();
        let element = self.resolve(key, timeout).await?;
        loop {
            let text = self.text(&element).await?;
            if condition(&text) {
                return Ok(text);
            }
            if started.elapsed() >= timeout {
                return Err(Error::WaitTimeout {
                    condition: format!("text of '{}'", key),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.wait_policy().interval).await;
        }
    }
}

/// Bind the adapter matching the session's platform
pub fn bind(
    session: &Session,
    overrides: BTreeMap<LocatorKey, String>,
    wait: WaitPolicy,
) -> Box<dyn PlatformAdapter> {
    let driver = session.driver();
    match session.platform() {
        Platform::Mobile => Box::new(MobileAdapter::new(driver, overrides, wait)),
        Platform::Web => Box::new(WebAdapter::new(driver, overrides, wait)),
    }
}

/// Locator resolution and bounded polling shared by both adapters
pub(crate) struct Locators {
    overrides: BTreeMap<LocatorKey, String>,
    default: fn(&LocatorKey) -> Locator,
}

impl Locators {
    pub(crate) fn new(
        overrides: BTreeMap<LocatorKey, String>,
        default: fn(&LocatorKey) -> Locator,
    ) -> Self {
        Self { overrides, default }
    }

    pub(crate) fn locate(&self, key: &LocatorKey) -> Result<Locator> {
        match self.overrides.get(key) {
            Some(raw) => Locator::parse(raw),
            None => Ok((self.default)(key)),
        }
    }
}

/// Poll `locator` until it matches or `timeout` elapses
///
/// Only "nothing matched" is retried; any backend error ends the wait.
pub(crate) async fn wait_for_element(
    driver: &Arc<dyn Driver>,
    what: &str,
    locator: &Locator,
    timeout: Duration,
    interval: Duration,
) -> Result<ElementRef> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(element) = driver.find_element(locator).await? {
            return Ok(element);
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            tracing::debug!(%locator, "Gave up waiting for element");
            return Err(Error::element_not_found(what, timeout));
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
