//! Scripted drivers, recording renderers and store helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dealroom_bus::NotificationBus;
use dealroom_db::{StoreConfig, TermSpec, TermStore};
use dealroom_protocol::{Role, Timeouts};
use dealroom_session::{
    Action, ActionSource, ComputationError, NegotiationSession, Notice, Prompt, Renderer,
    SessionContext, SettlementView, TermSheet, TermValues, TermsView,
};
use tokio::sync::mpsc;

pub const GAME: &str = "formula";

/// `A * multiple / (1 + rate)` over terms `{A, rate, multiple}`.
pub fn formula_sheet() -> TermSheet {
    fn formula(v: &TermValues) -> Result<f64, ComputationError> {
        let a = v.get("A")?;
        let rate = v.get("rate")?;
        let multiple = v.get("multiple")?;
        TermValues::checked_div(a * multiple, 1.0 + rate, "rate")
    }
    TermSheet::new(
        GAME,
        vec![
            TermSpec::new("A", "$"),
            TermSpec::new("rate", "%"),
            TermSpec::new("multiple", "x"),
        ],
        "",
        formula,
    )
}

pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        listener_read: Duration::from_millis(20),
        listener_join: Duration::from_millis(500),
        ..Timeouts::default()
    }
}

pub async fn memory_store() -> TermStore {
    TermStore::open(&StoreConfig::sqlite_memory(), GAME)
        .await
        .unwrap()
}

pub async fn seeded_store() -> TermStore {
    let store = memory_store().await;
    store.initialize(formula_sheet().terms()).await.unwrap();
    store
}

pub fn session(
    role: Role,
    store: &TermStore,
    bus: NotificationBus,
    renderer: &Arc<RecordingRenderer>,
) -> NegotiationSession {
    let ctx = SessionContext {
        store: store.clone(),
        bus,
        sheet: formula_sheet(),
        timeouts: fast_timeouts(),
    };
    NegotiationSession::new(role, ctx, renderer.clone())
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Debug, Clone)]
pub enum Event {
    Terms { role: Role, live: bool },
    Settlement(SettlementView),
    Notice(Notice),
}

#[derive(Default)]
pub struct RecordingRenderer {
    events: Mutex<Vec<Event>>,
}

impl RecordingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn settlements(&self) -> Vec<SettlementView> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Settlement(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn terms_renders(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Terms { .. }))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn render_terms(&self, view: &TermsView) {
        self.events.lock().unwrap().push(Event::Terms {
            role: view.role,
            live: view.notifications_live,
        });
    }

    fn render_settlement(&self, view: &SettlementView) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Settlement(view.clone()));
    }

    fn notice(&self, notice: &Notice) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Notice(notice.clone()));
    }
}

// ============================================================================
// Drivers
// ============================================================================

/// What a scripted driver does once its script runs out.
#[derive(Debug, Clone, Copy)]
pub enum WhenDone {
    Exit,
    /// Block forever; the session must end on its own.
    Wait,
}

pub struct ScriptedDriver {
    script: VecDeque<Action>,
    when_done: WhenDone,
    pub prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl ScriptedDriver {
    pub fn new(actions: impl IntoIterator<Item = Action>, when_done: WhenDone) -> Self {
        Self {
            script: actions.into_iter().collect(),
            when_done,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn initial_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| match p {
                Prompt::InitialValue { term, .. } => Some(term.clone()),
                Prompt::Menu { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ActionSource for ScriptedDriver {
    async fn next_action(&mut self, prompt: &Prompt) -> dealroom_session::Result<Action> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match self.script.pop_front() {
            Some(action) => Ok(action),
            None => match self.when_done {
                WhenDone::Exit => Ok(Action::Exit),
                WhenDone::Wait => std::future::pending().await,
            },
        }
    }
}

/// Driver fed by the test while the session runs.
pub struct ChannelDriver {
    rx: mpsc::UnboundedReceiver<Action>,
}

impl ChannelDriver {
    pub fn new() -> (mpsc::UnboundedSender<Action>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl ActionSource for ChannelDriver {
    async fn next_action(&mut self, _prompt: &Prompt) -> dealroom_session::Result<Action> {
        match self.rx.recv().await {
            Some(action) => Ok(action),
            None => std::future::pending().await,
        }
    }
}

/// Poll `cond` every 10ms until it holds or `limit` passes.
pub async fn wait_until<F>(limit: Duration, mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
