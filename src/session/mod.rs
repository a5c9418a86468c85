//! Remote session lifecycle
//!
//! A [`Session`] owns one live connection to an automation backend for the
//! duration of a single test. Sessions are created by a [`SessionProvider`]
//! and closed exactly once; closing again is a no-op.

mod capabilities;

use std::sync::Arc;

use async_trait::async_trait;

use crate::common::config::{GridConfig, LocalConfig, Timeouts};
use crate::common::{Config, Error, Result};
use crate::webdriver::{Driver, WebDriverClient};

pub use capabilities::{Capabilities, Platform};

/// One live automation session
pub struct Session {
    /// Backend connection bound to this session
    driver: Arc<dyn Driver>,
    /// Capabilities the session was created with
    capabilities: Capabilities,
    /// Platform family, derived once from the capabilities
    platform: Platform,
    /// Id of the record created during the scenario
    record_id: Option<String>,
    /// Whether `close` has already run
    closed: bool,
}

impl Session {
    /// Wrap a live driver connection
    pub fn new(driver: Arc<dyn Driver>, capabilities: Capabilities) -> Result<Self> {
        let platform = capabilities.platform()?;
        Ok(Self {
            driver,
            capabilities,
            platform,
            record_id: None,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        self.driver.session_id()
    }

    pub fn is_local(&self) -> bool {
        self.capabilities.is_local
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Driver handle for binding a platform adapter to this session
    pub fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn set_record_id(&mut self, id: impl Into<String>) {
        self.record_id = Some(id.into());
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// End the remote session
    ///
    /// Idempotent: the second and later calls return `Ok(())` without
    /// touching the backend, even if the first quit failed.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            tracing::debug!(session_id = %self.id(), "Session already closed");
            return Ok(());
        }
        self.closed = true;

        tracing::info!(session_id = %self.id(), "Closing session");
        self.driver.quit().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Best-effort: we can't await in drop, so hand the quit to the runtime
        tracing::warn!(session_id = %self.id(), "Session dropped without close");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let driver = Arc::clone(&self.driver);
            handle.spawn(async move {
                if let Err(e) = driver.quit().await {
                    tracing::warn!(
                        session_id = %driver.session_id(),
                        error = %e,
                        "Failed to quit dropped session"
                    );
                }
            });
        }
    }
}

/// Source of sessions for the orchestrator
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a session for `capabilities`
    async fn create(&self, capabilities: &Capabilities) -> Result<Session>;

    /// Release a session; safe to call more than once
    async fn close(&self, session: &mut Session) -> Result<()> {
        session.close().await
    }
}

/// Creates sessions on the remote grid or the local backend
pub struct SessionManager {
    grid: GridConfig,
    local: LocalConfig,
    timeouts: Timeouts,
}

impl SessionManager {
    pub fn new(config: &Config) -> Self {
        Self {
            grid: config.grid.clone(),
            local: config.local.clone(),
            timeouts: config.timeouts.clone(),
        }
    }

    /// Copy of `capabilities` with verbose logging and network capture on
    pub fn with_diagnostics(capabilities: &Capabilities) -> Capabilities {
        capabilities.with_diagnostics()
    }

    /// Endpoint a session for `capabilities` is opened on
    pub fn endpoint(&self, capabilities: &Capabilities) -> &str {
        if capabilities.is_local {
            &self.local.url
        } else {
            &self.grid.url
        }
    }
}

#[async_trait]
impl SessionProvider for SessionManager {
    async fn create(&self, capabilities: &Capabilities) -> Result<Session> {
        let payload = capabilities
            .to_w3c()
            .map_err(|e| Error::SessionCreation(e.to_string()))?;
        let endpoint = self.endpoint(capabilities);
        let credentials = if capabilities.is_local {
            None
        } else {
            self.grid.credentials()
        };

        tracing::info!(
            endpoint,
            local = capabilities.is_local,
            name = %capabilities.display_name(),
            "Creating session"
        );

        let client = WebDriverClient::create_session(
            endpoint,
            credentials,
            &payload,
            self.timeouts.request(),
        )
        .await?;

        tracing::info!(session_id = %client.session_id(), "Session created");
        Session::new(Arc::new(client), capabilities.clone())
    }
}
