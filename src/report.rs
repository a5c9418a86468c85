//! Result reporting
//!
//! Every test run ends with exactly one report. Remote sessions tag their run
//! on the grid's status API; local sessions go to a JSON-lines file.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;

use crate::common::config::{Config, GridConfig};
use crate::common::{paths, Error, FailureKind, Result};
use crate::session::Session;

/// Final verdict of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum ScenarioOutcome {
    #[serde(rename = "passed")]
    Pass,
    #[serde(rename = "failed")]
    Fail { kind: FailureKind, message: String },
}

impl ScenarioOutcome {
    /// Classify a scenario result into a tagged outcome
    pub fn from_result(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self::Pass,
            Err(e) => Self::from_error(e),
        }
    }

    /// Runtime faults read `<FaultName>: <description>`; assertion failures
    /// read `Assertion Error: '<text>'`
    pub fn from_error(error: &Error) -> Self {
        let kind = error.kind();
        let message = match kind {
            FailureKind::RuntimeFault => format!("{}: {}", error.fault_name(), error),
            FailureKind::AssertionFailure => format!("Assertion Error: '{}'", error),
        };
        Self::Fail { kind, message }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Status string understood by the grid
    pub fn status(&self) -> &'static str {
        match self {
            Self::Pass => "passed",
            Self::Fail { .. } => "failed",
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Pass => None,
            Self::Fail { kind, .. } => Some(*kind),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::Fail { message, .. } => Some(message),
        }
    }
}

/// Destination for one session's verdict
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(&self, session_id: &str, outcome: &ScenarioOutcome) -> Result<()>;
}

/// The grid's session status API
pub struct GridStatusApi {
    http: reqwest::Client,
    grid: GridConfig,
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    status: &'a str,
    reason: &'a str,
}

impl GridStatusApi {
    pub fn new(grid: GridConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, grid })
    }
}

#[async_trait]
impl StatusSink for GridStatusApi {
    async fn publish(&self, session_id: &str, outcome: &ScenarioOutcome) -> Result<()> {
        let url = self.grid.status_url_for(session_id);
        let body = StatusUpdate {
            status: outcome.status(),
            reason: outcome.message().unwrap_or_default(),
        };

        let mut request = self.http.put(&url).json(&body);
        if let Some((user, key)) = self.grid.credentials() {
            request = request.basic_auth(user, Some(key));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::ReportRejected {
                session_id: session_id.to_string(),
                reason: format!("{}: {}", status, text.trim()),
            });
        }

        tracing::info!(session_id, status = outcome.status(), "Reported to grid");
        Ok(())
    }
}

#[derive(Serialize)]
struct LocalEntry<'a> {
    timestamp: u64,
    session_id: &'a str,
    #[serde(flatten)]
    outcome: &'a ScenarioOutcome,
}

/// JSON-lines file of local verdicts
pub struct LocalSink {
    path: Option<PathBuf>,
}

impl LocalSink {
    /// Sink at `path`, or the default results file when `None`
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.or_else(paths::results_path),
        }
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl StatusSink for LocalSink {
    async fn publish(&self, session_id: &str, outcome: &ScenarioOutcome) -> Result<()> {
        match outcome {
            ScenarioOutcome::Pass => tracing::info!(session_id, "Test passed"),
            ScenarioOutcome::Fail { kind, message } => {
                tracing::warn!(session_id, %kind, %message, "Test failed")
            }
        }

        let Some(path) = &self.path else {
            return Ok(());
        };

        let entry = LocalEntry {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            session_id,
            outcome,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        paths::ensure_parent(path)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Routes each verdict to the grid or the local sink
pub struct ResultReporter {
    remote: Arc<dyn StatusSink>,
    local: Arc<dyn StatusSink>,
}

impl ResultReporter {
    pub fn new(remote: Arc<dyn StatusSink>, local: Arc<dyn StatusSink>) -> Self {
        Self { remote, local }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(GridStatusApi::new(
                config.grid.clone(),
                config.timeouts.request(),
            )?),
            Arc::new(LocalSink::new(config.results.path.clone())),
        ))
    }

    /// Report the verdict for `session`
    pub async fn report(&self, session: &Session, outcome: &ScenarioOutcome) -> Result<()> {
        let sink = if session.is_local() {
            &self.local
        } else {
            &self.remote
        };
        sink.publish(session.id(), outcome).await
    }
}
