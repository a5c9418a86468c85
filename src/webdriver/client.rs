//! WebDriver client for communicating with a grid or local driver
//!
//! One `WebDriverClient` is bound to exactly one remote session. It speaks
//! the W3C HTTP protocol, which both Appium (mobile) and Selenium-style
//! browser grids implement.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::common::{Error, Result};

use super::types::*;
use super::Driver;

/// HTTP basic-auth credentials for a grid
pub type Credentials = (String, String);

/// WebDriver client bound to one session
pub struct WebDriverClient {
    http: reqwest::Client,
    /// Hub endpoint, without trailing slash
    base_url: String,
    credentials: Option<Credentials>,
    session_id: String,
}

impl std::fmt::Debug for WebDriverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials stay out of logs
        f.debug_struct("WebDriverClient")
            .field("base_url", &self.base_url)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl WebDriverClient {
    /// Open a new session on `base_url` with a W3C capabilities payload
    ///
    /// Any failure (unreachable endpoint, rejected capabilities, garbled
    /// reply) is reported as `Error::SessionCreation`.
    pub async fn create_session(
        base_url: &str,
        credentials: Option<Credentials>,
        capabilities: &Value,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::SessionCreation(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        tracing::debug!("WebDriver >>> POST {}/session {}", base_url, capabilities);
        let value = send(
            &http,
            credentials.as_ref(),
            Method::POST,
            &format!("{}/session", base_url),
            Some(capabilities.clone()),
        )
        .await
        .map_err(|e| Error::SessionCreation(e.to_string()))?;

        let created: NewSessionResponse = serde_json::from_value(value).map_err(|e| {
            Error::SessionCreation(format!("Unexpected new session response: {}", e))
        })?;

        Ok(Self {
            http,
            base_url,
            credentials,
            session_id: created.session_id,
        })
    }

    /// Query a hub's readiness without opening a session
    pub async fn grid_status(
        base_url: &str,
        credentials: Option<Credentials>,
        request_timeout: Duration,
    ) -> Result<GridStatus> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        let value = send(
            &http,
            credentials.as_ref(),
            Method::GET,
            &format!("{}/status", base_url.trim_end_matches('/')),
            None,
        )
        .await?;
        Ok(serde_json::from_value(value)?)
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    /// Send a session-scoped command and return the unwrapped `value`
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.session_url(path);
        tracing::debug!("WebDriver >>> {} {}", method, url);
        send(&self.http, self.credentials.as_ref(), method, &url, body).await
    }
}

/// Send one request and unwrap the WebDriver response envelope
async fn send(
    http: &reqwest::Client,
    credentials: Option<&Credentials>,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value> {
    let method_is_post = method == Method::POST;
    let mut request = http.request(method, url);
    if let Some((username, access_key)) = credentials {
        request = request.basic_auth(username, Some(access_key));
    }
    // POST endpoints without parameters still require an empty object
    if method_is_post {
        request = request.json(&body.unwrap_or_else(|| serde_json::json!({})));
    } else if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    tracing::trace!("WebDriver <<< {} {}", status, text);

    let envelope: WireResponse = if text.trim().is_empty() {
        WireResponse { value: Value::Null }
    } else {
        serde_json::from_str(&text).map_err(|e| {
            Error::MalformedSession(format!("Invalid JSON from {} ({}): {}", url, status, e))
        })?
    };

    if let Some(error) = wire_error(&envelope.value) {
        return Err(Error::backend(&error.error, &error.message));
    }
    if !status.is_success() {
        return Err(Error::backend(
            "unknown error",
            &format!("HTTP {} from {}", status, url),
        ));
    }

    Ok(envelope.value)
}

fn wire_error(value: &Value) -> Option<WireError> {
    value.get("error")?;
    serde_json::from_value(value.clone()).ok()
}

#[async_trait]
impl Driver for WebDriverClient {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        match self
            .command(Method::POST, "/element", Some(locator.to_request()))
            .await
        {
            Ok(value) => ElementRef::from_value(&value).map(Some),
            Err(Error::Backend { code, .. }) if code == NO_SUCH_ELEMENT => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let value = self
            .command(Method::POST, "/elements", Some(locator.to_request()))
            .await?;
        let items = value.as_array().ok_or_else(|| {
            Error::MalformedSession(format!("Expected an element list, got {}", value))
        })?;
        items.iter().map(ElementRef::from_value).collect()
    }

    async fn find_elements_from(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>> {
        let value = self
            .command(
                Method::POST,
                &format!("/element/{}/elements", parent.id()),
                Some(locator.to_request()),
            )
            .await?;
        let items = value.as_array().ok_or_else(|| {
            Error::MalformedSession(format!("Expected an element list, got {}", value))
        })?;
        items.iter().map(ElementRef::from_value).collect()
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.command(Method::POST, &format!("/element/{}/click", element.id()), None)
            .await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        self.command(Method::POST, &format!("/element/{}/clear", element.id()), None)
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.id()),
            Some(serde_json::json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await?;
        match value {
            Value::String(text) => Ok(text),
            other => Err(Error::MalformedSession(format!(
                "Expected element text, got {}",
                other
            ))),
        }
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{}/attribute/{}", element.id(), name),
                None,
            )
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Value> {
        self.command(
            Method::GET,
            &format!("/element/{}/property/{}", element.id(), name),
            None,
        )
        .await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(serde_json::json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn quit(&self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }
}
