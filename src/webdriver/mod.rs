//! WebDriver protocol implementation
//!
//! This module implements the client side of the W3C WebDriver protocol,
//! which mobile (Appium) and browser grids both speak. Adapters only see
//! the [`Driver`] trait, so tests can substitute an in-memory backend.

pub mod client;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::Result;

pub use client::{Credentials, WebDriverClient};
pub use types::*;

/// Wire-level primitives of one live automation session
#[async_trait]
pub trait Driver: Send + Sync {
    /// Session id assigned by the backend
    fn session_id(&self) -> &str;

    /// Look up one element; `None` when nothing currently matches
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementRef>>;

    /// Look up every element currently matching
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>>;

    /// Look up every descendant of `parent` currently matching
    async fn find_elements_from(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn clear(&self, element: &ElementRef) -> Result<()>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// Visible text of an element
    async fn text(&self, element: &ElementRef) -> Result<String>;

    /// Content attribute as written in the markup; `None` when absent
    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Live DOM property, e.g. an input's current `value`
    async fn property(&self, element: &ElementRef, name: &str) -> Result<Value>;

    /// Run a script (browser) or a `mobile:` command (Appium)
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// End the remote session
    async fn quit(&self) -> Result<()>;
}
