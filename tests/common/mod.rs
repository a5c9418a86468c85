//! In-memory stand-in for the app under test
//!
//! `FakeApp` implements `Driver` and renders the Astro Sky form the way each
//! platform does: the mobile app shows label and value in one text node and
//! reports `checked="false"`, the web app only exposes live input state
//! through DOM properties, its attributes being the initial markup. Both
//! render the record JSON.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use formcheck::adapter::WaitPolicy;
use formcheck::common::{Error, Result};
use formcheck::form::{FieldKind, FieldSpec, FormFixture, LocatorKey};
use formcheck::report::{ResultReporter, ScenarioOutcome, StatusSink};
use formcheck::session::{Capabilities, Platform, Session, SessionProvider};
use formcheck::webdriver::{Driver, ElementRef, Locator};
use formcheck::TestOrchestrator;

/// Shared, ordered log of observable side effects
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

/// Short waits so timeouts resolve quickly
pub fn fast_wait() -> WaitPolicy {
    WaitPolicy {
        timeout: Duration::from_millis(100),
        interval: Duration::from_millis(5),
    }
}

pub fn mobile_caps() -> Capabilities {
    Capabilities {
        platform_name: Some("Android".into()),
        app: Some("bs://astro-sky".into()),
        device_name: Some("Google Pixel 7".into()),
        session_name: Some("android".into()),
        ..Default::default()
    }
}

pub fn web_caps() -> Capabilities {
    Capabilities {
        browser_name: Some("chrome".into()),
        session_name: Some("chrome".into()),
        ..Default::default()
    }
}

/// Misbehaviours the fake can be configured with
#[derive(Debug, Clone, Default)]
pub struct Quirks {
    /// Keys that never render
    pub hidden: BTreeSet<String>,
    /// Keys whose clicks are ignored
    pub unresponsive: BTreeSet<String>,
    /// Clear entered values when leaving the form's tab
    pub reset_on_leave: bool,
    /// Report a different record id after leaving the tab
    pub new_id_on_leave: bool,
}

impl Quirks {
    pub fn hide(mut self, key: &str) -> Self {
        self.hidden.insert(key.to_string());
        self
    }

    pub fn ignore_clicks(mut self, key: &str) -> Self {
        self.unresponsive.insert(key.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Element {
    Field(String),
    Tab(String),
    NewRecord,
    Payload,
    Submit,
    Confirm,
    Option { field: String, value: String },
    Radio { field: String, value: String },
}

impl Element {
    fn to_ref(&self) -> ElementRef {
        ElementRef(serde_json::to_string(&self.encode()).unwrap())
    }

    fn encode(&self) -> Vec<String> {
        match self {
            Element::Field(k) => vec!["field".into(), k.clone()],
            Element::Tab(k) => vec!["tab".into(), k.clone()],
            Element::NewRecord => vec!["new".into()],
            Element::Payload => vec!["payload".into()],
            Element::Submit => vec!["submit".into()],
            Element::Confirm => vec!["confirm".into()],
            Element::Option { field, value } => vec!["option".into(), field.clone(), value.clone()],
            Element::Radio { field, value } => vec!["radio".into(), field.clone(), value.clone()],
        }
    }

    fn from_ref(element: &ElementRef) -> Self {
        let parts: Vec<String> = serde_json::from_str(element.id()).unwrap();
        match parts.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["field", k] => Element::Field(k.to_string()),
            ["tab", k] => Element::Tab(k.to_string()),
            ["new"] => Element::NewRecord,
            ["payload"] => Element::Payload,
            ["submit"] => Element::Submit,
            ["confirm"] => Element::Confirm,
            ["option", f, v] => Element::Option {
                field: f.to_string(),
                value: v.to_string(),
            },
            ["radio", f, v] => Element::Radio {
                field: f.to_string(),
                value: v.to_string(),
            },
            other => panic!("unknown element {:?}", other),
        }
    }
}

#[derive(Debug, Default)]
struct AppState {
    tab: Option<String>,
    form_open: bool,
    leave_prompt: bool,
    picker: Option<String>,
    record_id: Option<String>,
    records_created: usize,
    text: BTreeMap<String, String>,
    selected: BTreeMap<String, BTreeSet<String>>,
    checked: BTreeMap<String, bool>,
    submitted: bool,
}

pub struct FakeApp {
    platform: Platform,
    session_id: String,
    fixture: FormFixture,
    quirks: Quirks,
    state: Mutex<AppState>,
    events: Events,
}

static SESSIONS: AtomicUsize = AtomicUsize::new(0);

impl FakeApp {
    pub fn new(platform: Platform, quirks: Quirks, events: Events) -> Self {
        let n = SESSIONS.fetch_add(1, Ordering::SeqCst);
        Self {
            platform,
            session_id: format!("fake-{}-{}", platform, n),
            fixture: FormFixture::astro_sky(),
            quirks,
            state: Mutex::new(AppState::default()),
            events,
        }
    }

    pub fn submitted(&self) -> bool {
        self.state.lock().unwrap().submitted
    }

    fn log(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn field(&self, key: &str) -> Option<FieldSpec> {
        self.fixture
            .field_specs()
            .into_iter()
            .find(|f| f.key.as_str() == key)
    }

    fn label_of(&self, field: &FieldSpec, value: &str) -> String {
        field.label_for_value(value).to_string()
    }

    fn value_of(&self, field: &FieldSpec, label: &str) -> String {
        field
            .option_by_label(label)
            .map(|o| o.value.clone())
            .unwrap_or_else(|| label.to_string())
    }

    /// Element named by a bare key, if it is currently on screen
    fn by_key(&self, state: &AppState, key: &str) -> Option<Element> {
        if self.quirks.hidden.contains(key) {
            return None;
        }
        let sections = &self.fixture.sections;
        let on_form = state.form_open && state.tab.as_deref() == Some(sections.home.as_str());

        if key == sections.home.as_str() || key == sections.alternate.as_str() {
            Some(Element::Tab(key.to_string()))
        } else if key == self.fixture.new_record.as_str() {
            (state.tab.as_deref() == Some(sections.home.as_str())).then_some(Element::NewRecord)
        } else if key == self.fixture.payload.as_str() {
            on_form.then_some(Element::Payload)
        } else if self.field(key).is_some() {
            on_form.then(|| Element::Field(key.to_string()))
        } else {
            None
        }
    }

    fn option(&self, state: &AppState, value: String) -> Option<Element> {
        let field = state.picker.clone()?;
        Some(Element::Option { field, value })
    }

    fn locate(&self, state: &AppState, locator: &Locator) -> Option<Element> {
        match (self.platform, locator) {
            (Platform::Mobile, Locator::XPath(x)) => {
                if let Some(rest) = x.strip_prefix("//*[@resource-id='") {
                    let (key, tail) = rest.split_once("']")?;
                    if tail.is_empty() {
                        return self.by_key(state, key);
                    }
                    let label = tail
                        .strip_prefix("//android.widget.RadioButton[@text='")?
                        .strip_suffix("']")?;
                    let field = self.field(key)?;
                    self.by_key(state, key)?;
                    return Some(Element::Radio {
                        field: key.to_string(),
                        value: self.value_of(&field, label),
                    });
                }
                let text = x.strip_prefix("//*[@text='")?.strip_suffix("']")?;
                match text {
                    "SUBMIT" => state.form_open.then_some(Element::Submit),
                    "SAVE AND NEW" => state.leave_prompt.then_some(Element::Confirm),
                    label => {
                        let field = self.field(state.picker.as_deref()?)?;
                        let value = self.value_of(&field, label);
                        self.option(state, value)
                    }
                }
            }
            (Platform::Web, Locator::Css(css)) => {
                if let Some(key) = css.strip_prefix('#') {
                    return self.by_key(state, key);
                }
                if let Some(value) = css
                    .strip_prefix("li[data-value='")
                    .and_then(|r| r.strip_suffix("']"))
                {
                    return self.option(state, value.to_string());
                }
                let rest = css.strip_prefix("input[name='")?;
                let (key, tail) = rest.split_once("']")?;
                let value = tail.strip_prefix("[value='")?.strip_suffix("']")?;
                self.by_key(state, key)?;
                Some(Element::Radio {
                    field: key.to_string(),
                    value: value.to_string(),
                })
            }
            (Platform::Web, Locator::XPath(x)) => match x.as_str() {
                "//button[@type='submit']" => state.form_open.then_some(Element::Submit),
                "//button[normalize-space()='Save and new']" => {
                    state.leave_prompt.then_some(Element::Confirm)
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether `locator` selects the buttons inside a radio group
    fn is_radio_locator(&self, locator: &Locator) -> bool {
        match (self.platform, locator) {
            (Platform::Mobile, Locator::ClassName(class)) => class == "android.widget.RadioButton",
            (Platform::Web, Locator::Css(css)) => css == "input[type='radio']",
            _ => false,
        }
    }

    fn radio_on(&self, state: &AppState, field: &str, value: &str) -> bool {
        state.selected.get(field).is_some_and(|s| s.contains(value))
    }

    fn selected_labels(&self, state: &AppState, field: &FieldSpec) -> Vec<String> {
        // Rendered in option order
        let selected = state.selected.get(field.key.as_str());
        field
            .options
            .iter()
            .filter(|o| selected.is_some_and(|s| s.contains(&o.value)))
            .map(|o| o.label.clone())
            .collect()
    }

    fn payload(&self, state: &AppState) -> Value {
        let mut values = serde_json::Map::new();
        for field in self.fixture.field_specs() {
            let key = field.key.as_str();
            let value = match field.kind {
                FieldKind::Text => state.text.get(key).map(|t| json!(t)),
                FieldKind::Number => state
                    .text
                    .get(key)
                    .and_then(|t| t.parse::<f64>().ok())
                    .map(|n| json!(n)),
                FieldKind::Select | FieldKind::RadioGroup => state
                    .selected
                    .get(key)
                    .and_then(|s| s.iter().next())
                    .map(|v| json!(v)),
                FieldKind::MultiSelect => state
                    .selected
                    .get(key)
                    .map(|s| json!(s.iter().collect::<Vec<_>>())),
                FieldKind::Checkbox => Some(json!(state.checked.get(key).copied().unwrap_or(false))),
            };
            values.insert(key.to_string(), value.unwrap_or(Value::Null));
        }
        json!({ "_id": state.record_id, "values": values })
    }

    fn checked_attr(&self, checked: bool) -> Option<String> {
        match (self.platform, checked) {
            (Platform::Mobile, c) => Some(c.to_string()),
            (Platform::Web, true) => Some("true".to_string()),
            (Platform::Web, false) => None,
        }
    }
}

#[async_trait]
impl Driver for FakeApp {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        let state = self.state.lock().unwrap();
        Ok(self.locate(&state, locator).map(|e| e.to_ref()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let state = self.state.lock().unwrap();
        Ok(self.locate(&state, locator).map(|e| e.to_ref()).into_iter().collect())
    }

    async fn find_elements_from(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>> {
        let Element::Field(key) = Element::from_ref(parent) else {
            return Ok(Vec::new());
        };
        let field = self.field(&key).expect("field");
        if field.kind != FieldKind::RadioGroup || !self.is_radio_locator(locator) {
            return Ok(Vec::new());
        }
        Ok(field
            .options
            .iter()
            .map(|o| {
                Element::Radio {
                    field: key.clone(),
                    value: o.value.clone(),
                }
                .to_ref()
            })
            .collect())
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let element = Element::from_ref(element);
        match element {
            Element::Tab(key) => {
                let leaving = state.tab.as_deref() != Some(key.as_str());
                if leaving && key == self.fixture.sections.alternate.as_str() && state.form_open {
                    state.leave_prompt = true;
                    if self.quirks.reset_on_leave {
                        state.text.clear();
                        state.selected.clear();
                        state.checked.clear();
                    }
                    if self.quirks.new_id_on_leave {
                        state.record_id = Some("rec-other".to_string());
                    }
                }
                state.tab = Some(key);
            }
            Element::Confirm => state.leave_prompt = false,
            Element::NewRecord => {
                state.records_created += 1;
                state.record_id = Some(format!("rec-{}", state.records_created));
                state.form_open = true;
                state.text.clear();
                state.selected.clear();
                state.checked.clear();
            }
            Element::Field(key) => {
                if self.quirks.unresponsive.contains(&key) {
                    return Ok(());
                }
                let field = self.field(&key).expect("field");
                match field.kind {
                    FieldKind::Checkbox => {
                        let checked = state.checked.entry(key).or_default();
                        *checked = !*checked;
                    }
                    FieldKind::Select | FieldKind::MultiSelect => state.picker = Some(key),
                    _ => {}
                }
            }
            Element::Option { field, value } => {
                let spec = self.field(&field).expect("field");
                let selected = state.selected.entry(field).or_default();
                if spec.kind == FieldKind::MultiSelect {
                    if !selected.remove(&value) {
                        selected.insert(value);
                    }
                } else {
                    selected.clear();
                    selected.insert(value);
                    state.picker = None;
                }
            }
            Element::Radio { field, value } => {
                state.selected.insert(field, BTreeSet::from([value]));
            }
            Element::Submit => {
                state.submitted = true;
                drop(state);
                self.log("submit");
            }
            Element::Payload => {}
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        if let Element::Field(key) = Element::from_ref(element) {
            self.state.lock().unwrap().text.insert(key, String::new());
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match Element::from_ref(element) {
            Element::Option { .. } if text == "\u{E00C}" => state.picker = None,
            Element::Field(key) => state.text.entry(key).or_default().push_str(text),
            other => {
                return Err(Error::backend(
                    "element not interactable",
                    &format!("cannot type into {:?}", other),
                ))
            }
        }
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let state = self.state.lock().unwrap();
        let text = match Element::from_ref(element) {
            Element::Payload => self.payload(&state).to_string(),
            Element::Field(key) => {
                let field = self.field(&key).expect("field");
                let value = match field.kind {
                    FieldKind::Text => state.text.get(&key).cloned().unwrap_or_default(),
                    FieldKind::Number => state
                        .text
                        .get(&key)
                        .and_then(|t| t.parse::<f64>().ok())
                        .map(|n| format!("{:?}", n))
                        .unwrap_or_default(),
                    FieldKind::Select | FieldKind::MultiSelect => {
                        self.selected_labels(&state, &field).join(", ")
                    }
                    FieldKind::Checkbox | FieldKind::RadioGroup => String::new(),
                };
                match (self.platform, field.kind) {
                    (Platform::Mobile, FieldKind::Select | FieldKind::MultiSelect) => {
                        format!("{} {}", field.label, value)
                    }
                    (_, FieldKind::Checkbox | FieldKind::RadioGroup) => field.label.clone(),
                    _ => value,
                }
            }
            Element::Radio { field, value } => {
                let spec = self.field(&field).expect("field");
                self.label_of(&spec, &value)
            }
            Element::Option { field, value } => {
                let spec = self.field(&field).expect("field");
                self.label_of(&spec, &value)
            }
            Element::Tab(key) => key,
            Element::NewRecord => "NEW OBSERVATION".to_string(),
            Element::Submit => "SUBMIT".to_string(),
            Element::Confirm => "SAVE AND NEW".to_string(),
        };
        Ok(text)
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        if self.platform == Platform::Web {
            // Markup only: inputs render without an initial value or checked state
            return Ok(match (Element::from_ref(element), name) {
                (Element::Radio { value, .. }, "value") => Some(value),
                _ => None,
            });
        }
        let state = self.state.lock().unwrap();
        let value = match (Element::from_ref(element), name) {
            (Element::Field(key), "checked") => {
                self.checked_attr(state.checked.get(&key).copied().unwrap_or(false))
            }
            (Element::Radio { field, value }, "checked") => {
                self.checked_attr(self.radio_on(&state, &field, &value))
            }
            _ => None,
        };
        Ok(value)
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Value> {
        if self.platform == Platform::Mobile {
            return Err(Error::backend(
                "unknown command",
                "element properties are not supported on native contexts",
            ));
        }
        let state = self.state.lock().unwrap();
        let value = match (Element::from_ref(element), name) {
            (Element::Field(key), "checked") => {
                json!(state.checked.get(&key).copied().unwrap_or(false))
            }
            (Element::Field(key), "value") => json!(state.text.get(&key).cloned().unwrap_or_default()),
            (Element::Radio { field, value }, "checked") => json!(self.radio_on(&state, &field, &value)),
            (Element::Radio { value, .. }, "value") => json!(value),
            _ => Value::Null,
        };
        Ok(value)
    }

    async fn execute(&self, script: &str, _args: Vec<Value>) -> Result<Value> {
        match (self.platform, script) {
            (Platform::Mobile, "mobile: pressKey") => self.state.lock().unwrap().picker = None,
            (Platform::Mobile, "mobile: scrollGesture") => {}
            (Platform::Web, s) if s.starts_with("window.scrollBy") => {}
            (_, other) => {
                return Err(Error::backend(
                    "unknown command",
                    &format!("{} is not supported on {}", other, self.platform),
                ))
            }
        }
        Ok(Value::Null)
    }

    async fn quit(&self) -> Result<()> {
        self.log("quit");
        Ok(())
    }
}

/// Hands out a fresh `FakeApp` per session
pub struct FakeProvider {
    pub quirks: Quirks,
    pub events: Events,
    pub refuse: bool,
}

impl FakeProvider {
    pub fn new(events: Events) -> Self {
        Self {
            quirks: Quirks::default(),
            events,
            refuse: false,
        }
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn create(&self, capabilities: &Capabilities) -> Result<Session> {
        if self.refuse {
            return Err(Error::SessionCreation("grid has no free devices".into()));
        }
        let platform = capabilities.platform()?;
        let app = FakeApp::new(platform, self.quirks.clone(), self.events.clone());
        Session::new(Arc::new(app), capabilities.clone())
    }
}

/// Records every verdict it receives
pub struct RecordingSink {
    channel: &'static str,
    events: Events,
}

impl RecordingSink {
    pub fn new(channel: &'static str, events: Events) -> Arc<Self> {
        Arc::new(Self { channel, events })
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn publish(&self, _session_id: &str, outcome: &ScenarioOutcome) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.channel, outcome.status()));
        Ok(())
    }
}

/// Orchestrator over fake sessions with recording sinks
pub fn orchestrator(provider: FakeProvider) -> TestOrchestrator {
    let events = provider.events.clone();
    TestOrchestrator::new(
        Arc::new(provider),
        ResultReporter::new(
            RecordingSink::new("grid", events.clone()),
            RecordingSink::new("local", events),
        ),
        fast_wait(),
    )
}

pub fn key(k: &str) -> LocatorKey {
    LocatorKey::from(k)
}
