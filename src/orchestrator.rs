//! Test orchestration
//!
//! One test is: acquire a session, run one contract against the adapter
//! bound to it, report the verdict once, release the session. Release is
//! the last action on every path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use crate::adapter::{self, WaitPolicy};
use crate::common::{Error, Result};
use crate::report::{ResultReporter, ScenarioOutcome};
use crate::scenario::{ScenarioContract, ScenarioState, TestContext};
use crate::session::{Capabilities, Platform, SessionProvider};

/// Result of one test
#[derive(Debug, Clone)]
pub struct TestRun {
    pub scenario: String,
    /// Profile or capability name the test ran on
    pub target: String,
    pub platform: Option<Platform>,
    /// `None` when no session could be created
    pub session_id: Option<String>,
    pub outcome: ScenarioOutcome,
    pub trace: Vec<ScenarioState>,
    pub record_id: Option<String>,
    pub duration: Duration,
}

impl TestRun {
    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }

    /// Hand a failed run back to the caller as an error
    ///
    /// The grid has already been told; this is the second, local channel.
    pub fn into_result(self) -> Result<Self> {
        match &self.outcome {
            ScenarioOutcome::Pass => Ok(self),
            ScenarioOutcome::Fail { kind, message } => Err(Error::ScenarioFailed {
                kind: *kind,
                message: message.clone(),
            }),
        }
    }
}

pub struct TestOrchestrator {
    sessions: Arc<dyn SessionProvider>,
    reporter: ResultReporter,
    wait: WaitPolicy,
}

impl TestOrchestrator {
    pub fn new(sessions: Arc<dyn SessionProvider>, reporter: ResultReporter, wait: WaitPolicy) -> Self {
        Self {
            sessions,
            reporter,
            wait,
        }
    }

    /// Run one contract on a fresh session
    pub async fn run(&self, contract: &ScenarioContract, capabilities: &Capabilities) -> TestRun {
        let started = Instant::now();
        let scenario = contract.name();
        let target = capabilities.display_name();

        let mut session = match self.sessions.create(capabilities).await {
            Ok(session) => session,
            Err(e) => {
                // Nothing to tag on the grid without a session
                tracing::error!(scenario = %scenario, error = %e, "Could not acquire session");
                return TestRun {
                    scenario,
                    target,
                    platform: capabilities.platform().ok(),
                    session_id: None,
                    outcome: ScenarioOutcome::from_error(&e),
                    trace: vec![ScenarioState::Init],
                    record_id: None,
                    duration: started.elapsed(),
                };
            }
        };

        let platform = session.platform();
        let session_id = session.id().to_string();
        let adapter = adapter::bind(
            &session,
            contract.fixture().overrides_for(platform),
            self.wait,
        );

        tracing::info!(scenario = %scenario, session_id = %session_id, %platform, "Running scenario");

        let execution = {
            let mut ctx = TestContext {
                session: &mut session,
                adapter: adapter.as_ref(),
            };
            contract.execute(&mut ctx).await
        };
        let mut trace = execution.trace;
        let outcome = ScenarioOutcome::from_result(&execution.result);

        if let Err(e) = self.reporter.report(&session, &outcome).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to report result");
        }
        trace.push(ScenarioState::ResultReported);

        let record_id = session.record_id().map(str::to_string);
        if let Err(e) = self.sessions.close(&mut session).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to close session");
        }
        trace.push(ScenarioState::Closed);

        TestRun {
            scenario,
            target,
            platform: Some(platform),
            session_id: Some(session_id),
            outcome,
            trace,
            record_id,
            duration: started.elapsed(),
        }
    }

    /// Run independent tests concurrently, one session each
    pub async fn run_all(&self, tests: &[(ScenarioContract, Capabilities)]) -> Vec<TestRun> {
        join_all(
            tests
                .iter()
                .map(|(contract, capabilities)| self.run(contract, capabilities)),
        )
        .await
    }
}
