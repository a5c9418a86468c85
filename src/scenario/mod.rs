//! Scenario contracts
//!
//! A [`ScenarioContract`] is written once against [`PlatformAdapter`] and a
//! [`FormFixture`]; the same contract drives the mobile and the web app.
//! Execution walks a fixed state machine:
//!
//! ```text
//! INIT -> FORM_LOADED -> FIELDS_FILLED -> VALIDATED -> SUBMITTED
//!                                                   \-> TAB_SWITCHED -> VALIDATED
//! ```
//!
//! The orchestrator appends `RESULT_REPORTED` and `CLOSED`. A failed step
//! stops the walk; no later step runs.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::adapter::{PlatformAdapter, ScrollDirection};
use crate::common::{Error, Result};
use crate::form::{FormFixture, FormRecord};
use crate::session::Session;

/// Position of a test run in the scenario state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioState {
    Init,
    FormLoaded,
    FieldsFilled,
    Validated,
    Submitted,
    TabSwitched,
    ResultReported,
    Closed,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::FormLoaded => "FORM_LOADED",
            Self::FieldsFilled => "FIELDS_FILLED",
            Self::Validated => "VALIDATED",
            Self::Submitted => "SUBMITTED",
            Self::TabSwitched => "TAB_SWITCHED",
            Self::ResultReported => "RESULT_REPORTED",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Built-in scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Fill every field, validate, submit
    Populate,
    /// Fill and validate, leave the form and come back, validate again
    SwitchTab,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Populate => write!(f, "populate"),
            Self::SwitchTab => write!(f, "switch-tab"),
        }
    }
}

/// Per-test state threaded through the steps
pub struct TestContext<'a> {
    pub session: &'a mut Session,
    pub adapter: &'a dyn PlatformAdapter,
}

/// Visited states and how the walk ended
#[derive(Debug)]
pub struct Execution {
    pub trace: Vec<ScenarioState>,
    pub result: Result<()>,
}

/// A platform-independent test workflow over one form
#[derive(Debug, Clone)]
pub struct ScenarioContract {
    kind: ScenarioKind,
    fixture: FormFixture,
}

impl ScenarioContract {
    pub fn new(kind: ScenarioKind, fixture: FormFixture) -> Self {
        Self { kind, fixture }
    }

    pub fn populate(fixture: FormFixture) -> Self {
        Self::new(ScenarioKind::Populate, fixture)
    }

    pub fn switch_tab(fixture: FormFixture) -> Self {
        Self::new(ScenarioKind::SwitchTab, fixture)
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    pub fn fixture(&self) -> &FormFixture {
        &self.fixture
    }

    /// Display name, e.g. `switch-tab (Astro Sky)`
    pub fn name(&self) -> String {
        format!("{} ({})", self.kind, self.fixture.name)
    }

    /// Run the steps from `INIT` until the terminal state or the first failure
    pub async fn execute(&self, ctx: &mut TestContext<'_>) -> Execution {
        let mut trace = vec![ScenarioState::Init];
        let mut state = ScenarioState::Init;

        loop {
            let switched = trace.contains(&ScenarioState::TabSwitched);
            match self.advance(ctx, state, switched).await {
                Ok(Some(next)) => {
                    tracing::info!(
                        session_id = %ctx.session.id(),
                        from = %state,
                        to = %next,
                        "State transition"
                    );
                    trace.push(next);
                    state = next;
                }
                Ok(None) => {
                    return Execution {
                        trace,
                        result: Ok(()),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %ctx.session.id(),
                        state = %state,
                        error = %e,
                        "Step failed"
                    );
                    return Execution {
                        trace,
                        result: Err(e),
                    };
                }
            }
        }
    }

    /// Run the step leaving `state`; `None` once the contract is complete
    pub async fn advance(
        &self,
        ctx: &mut TestContext<'_>,
        state: ScenarioState,
        switched: bool,
    ) -> Result<Option<ScenarioState>> {
        use ScenarioState::*;

        let next = match (state, self.kind) {
            (Init, _) => {
                self.load_form(ctx).await?;
                FormLoaded
            }
            (FormLoaded, _) => {
                self.fill(ctx).await?;
                FieldsFilled
            }
            (FieldsFilled, _) | (TabSwitched, _) => {
                self.validate(ctx).await?;
                Validated
            }
            (Validated, ScenarioKind::Populate) => {
                self.submit(ctx).await?;
                Submitted
            }
            (Validated, ScenarioKind::SwitchTab) if !switched => {
                self.switch_away_and_back(ctx).await?;
                TabSwitched
            }
            _ => return Ok(None),
        };
        Ok(Some(next))
    }

    async fn load_form(&self, ctx: &mut TestContext<'_>) -> Result<()> {
        let adapter = ctx.adapter;
        adapter.tap(&self.fixture.sections.home).await?;
        adapter.tap(&self.fixture.new_record).await?;

        // The form is loaded once its first field renders
        if let Some(first) = self.fixture.fields.first() {
            adapter
                .resolve(&first.key, adapter.wait_policy().timeout)
                .await?;
        }
        Ok(())
    }

    async fn fill(&self, ctx: &mut TestContext<'_>) -> Result<()> {
        for field in &self.fixture.fields {
            ctx.adapter.fill(&field.spec(), &field.value).await?;
        }
        Ok(())
    }

    /// Read the form back twice: field by field from the screen, then as
    /// the JSON payload the app renders for the record
    async fn validate(&self, ctx: &mut TestContext<'_>) -> Result<()> {
        let fields = self.fixture.field_specs();
        let expectations = self.fixture.expectations();

        let mut on_screen = FormRecord::new();
        for field in &fields {
            on_screen.insert(field.key.clone(), ctx.adapter.read(field).await?);
        }
        on_screen.verify(&expectations)?;

        ctx.adapter.scroll(ScrollDirection::Down).await?;
        let payload = self.read_payload(ctx).await?;

        let record_id = FormRecord::record_id(&payload, &self.fixture.record_id_keys);
        let assigned = ctx.session.record_id().map(str::to_string);
        match (assigned, record_id) {
            (None, Some(id)) => {
                tracing::debug!(session_id = %ctx.session.id(), record_id = %id, "Record id assigned");
                ctx.session.set_record_id(id);
            }
            (None, None) => {
                return Err(Error::MalformedPayload(format!(
                    "no record id under any of {:?}",
                    self.fixture.record_id_keys
                )))
            }
            (Some(expected), actual) if actual.as_deref() != Some(expected.as_str()) => {
                return Err(Error::assertion(format!(
                    "record id: expected:<{}> but was:<{}>",
                    expected,
                    actual.as_deref().unwrap_or("none")
                )))
            }
            (Some(_), _) => {}
        }

        FormRecord::from_json(&payload, &fields)?.verify(&expectations)?;
        ctx.adapter.scroll(ScrollDirection::Up).await
    }

    async fn read_payload(&self, ctx: &TestContext<'_>) -> Result<Value> {
        let adapter = ctx.adapter;
        // The app renders the payload after the form settles
        let text = adapter
            .wait_until_text(
                &self.fixture.payload,
                &|text: &str| !text.trim().is_empty(),
                adapter.wait_policy().timeout,
            )
            .await?;
        serde_json::from_str(&text).map_err(|e| Error::MalformedPayload(e.to_string()))
    }

    async fn submit(&self, ctx: &mut TestContext<'_>) -> Result<()> {
        ctx.adapter.scroll(ScrollDirection::Down).await?;
        ctx.adapter.tap(&self.fixture.submit).await
    }

    async fn switch_away_and_back(&self, ctx: &mut TestContext<'_>) -> Result<()> {
        let adapter = ctx.adapter;
        adapter.tap(&self.fixture.sections.alternate).await?;
        if let Some(confirm) = &self.fixture.confirm_leave {
            adapter.tap(confirm).await?;
        }
        adapter.tap(&self.fixture.sections.home).await
    }
}
