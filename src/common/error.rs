//! Error types for formcheck
//!
//! Every failure that can end a scenario is one of two kinds: a runtime
//! fault (something went wrong talking to the app or the grid) or an
//! assertion failure (the app answered, but with the wrong value). The
//! orchestrator relies on [`Error::kind`] to tell them apart.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a scenario failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unexpected failure while interacting with the backend
    RuntimeFault,
    /// Expected-vs-actual mismatch during validation
    AssertionFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeFault => write!(f, "runtime fault"),
            Self::AssertionFailure => write!(f, "assertion failure"),
        }
    }
}

/// Main error type for formcheck
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Failed to create session: {0}")]
    SessionCreation(String),

    #[error("Malformed session response: {0}")]
    MalformedSession(String),

    // === Element Errors ===
    #[error("No element for '{key}' appeared within {timeout_ms} ms")]
    ElementNotFound { key: String, timeout_ms: u64 },

    #[error("Timed out after {timeout_ms} ms waiting for {condition}")]
    WaitTimeout { condition: String, timeout_ms: u64 },

    #[error("Unexpected state for '{key}': {reason}")]
    UnexpectedElementState { key: String, reason: String },

    #[error("Invalid locator '{0}'")]
    InvalidLocator(String),

    #[error("Malformed record payload: {0}")]
    MalformedPayload(String),

    // === Backend Errors ===
    #[error("Backend returned '{code}': {message}")]
    Backend { code: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Reporting Errors ===
    #[error("Status report for session {session_id} rejected: {reason}")]
    ReportRejected { session_id: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid fixture '{path}': {reason}")]
    FixtureParse { path: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Validation Errors ===
    #[error("{0}")]
    Assertion(String),

    #[error("Scenario failed ({kind}): {message}")]
    ScenarioFailed { kind: FailureKind, message: String },
}

impl Error {
    /// Create an element-not-found error
    pub fn element_not_found(key: &str, timeout: std::time::Duration) -> Self {
        Self::ElementNotFound {
            key: key.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a backend error from a WebDriver error body
    pub fn backend(code: &str, message: &str) -> Self {
        Self::Backend {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an assertion failure
    pub fn assertion(text: impl Into<String>) -> Self {
        Self::Assertion(text.into())
    }

    /// Create an unexpected element state error
    pub fn unexpected_state(key: &str, reason: impl Into<String>) -> Self {
        Self::UnexpectedElementState {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Which failure kind this error counts as
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Assertion(_) => FailureKind::AssertionFailure,
            Error::ScenarioFailed { kind, .. } => *kind,
            _ => FailureKind::RuntimeFault,
        }
    }

    /// Stable name for the fault, used as the prefix of fault reports
    pub fn fault_name(&self) -> &'static str {
        match self {
            Error::SessionCreation(_) => "SessionCreationError",
            Error::MalformedSession(_) => "MalformedSession",
            Error::ElementNotFound { .. } => "ElementNotFound",
            Error::WaitTimeout { .. } => "WaitTimeout",
            Error::UnexpectedElementState { .. } => "UnexpectedElementState",
            Error::InvalidLocator(_) => "InvalidLocator",
            Error::MalformedPayload(_) => "MalformedPayload",
            Error::Backend { .. } => "BackendError",
            Error::Http(_) => "HttpError",
            Error::ReportRejected { .. } => "ReportRejected",
            Error::Config(_) | Error::ConfigParse(_) => "ConfigError",
            Error::FixtureParse { .. } => "FixtureError",
            Error::Io(_) | Error::FileRead { .. } => "IoError",
            Error::Json(_) => "JsonError",
            Error::Assertion(_) => "AssertionError",
            Error::ScenarioFailed { .. } => "ScenarioFailed",
        }
    }
}
