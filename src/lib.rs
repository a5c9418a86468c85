//! formcheck - cross-platform form acceptance tests
//!
//! Scenario contracts are written once against [`adapter::PlatformAdapter`]
//! and executed unchanged on a native mobile app and a web app, each test on
//! its own remote automation session.

pub mod adapter;
pub mod cli;
pub mod commands;
pub mod common;
pub mod form;
pub mod orchestrator;
pub mod report;
pub mod scenario;
pub mod session;
pub mod webdriver;

// Re-export commonly used types for tests
pub use common::{Error, FailureKind, Result};
pub use orchestrator::{TestOrchestrator, TestRun};
pub use report::{ResultReporter, ScenarioOutcome};
pub use scenario::{ScenarioContract, ScenarioKind, ScenarioState};
