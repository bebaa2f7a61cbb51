//! Per-party negotiation session.

use std::sync::Arc;

use dealroom_bus::NotificationBus;
use dealroom_db::{DbError, TermStore};
use dealroom_protocol::{ApprovalStatus, Role, Timeouts};
use tracing::{debug, info, warn};

use crate::driver::{Action, ActionSource, Prompt};
use crate::error::{Result, SessionError};
use crate::listener::{show_final_view, Listener, SessionSignals};
use crate::render::{Notice, RenderGate, Renderer, TermsView};
use crate::settlement::SettlementView;
use crate::sheet::TermSheet;
use crate::state::SessionState;

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Settled(SettlementView),
    /// Left before settlement; the shared terms are untouched
    Abandoned,
}

impl SessionOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionOutcome::Settled(_))
    }
}

/// Explicitly constructed collaborators for one session.
pub struct SessionContext {
    pub store: TermStore,
    pub bus: NotificationBus,
    pub sheet: TermSheet,
    pub timeouts: Timeouts,
}

enum Flow {
    Continue,
    Stop,
}

/// One party's side of a negotiation: the interactive loop plus one
/// background listener, joined on every exit path.
pub struct NegotiationSession {
    role: Role,
    store: TermStore,
    bus: NotificationBus,
    sheet: TermSheet,
    timeouts: Timeouts,
    state: SessionState,
    signals: Arc<SessionSignals>,
    gate: Arc<RenderGate>,
}

impl NegotiationSession {
    pub fn new(role: Role, ctx: SessionContext, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            role,
            store: ctx.store,
            bus: ctx.bus,
            sheet: ctx.sheet,
            timeouts: ctx.timeouts,
            state: SessionState::initial(role),
            signals: Arc::new(SessionSignals::new()),
            gate: Arc::new(RenderGate::new(renderer)),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Shared with the driver so prompts and listener output never interleave.
    pub fn render_gate(&self) -> Arc<RenderGate> {
        Arc::clone(&self.gate)
    }

    /// Shared signals, for callers that need to request shutdown from
    /// outside (e.g. Ctrl-C).
    pub fn signals(&self) -> Arc<SessionSignals> {
        Arc::clone(&self.signals)
    }

    /// Run the session to a terminal state.
    ///
    /// Store failures and term-set mismatches are fatal. The listener is
    /// stopped and joined before this returns, on success and on error.
    pub async fn run<D>(&mut self, driver: &mut D) -> Result<SessionOutcome>
    where
        D: ActionSource + ?Sized,
    {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: self.state,
            });
        }

        info!(
            role = %self.role,
            game = %self.sheet.name(),
            notifications = self.bus.is_available(),
            "Starting negotiation session"
        );

        if let Err(e) = self.prepare_store().await {
            self.gate.close();
            return Err(e.into());
        }

        if self.state == SessionState::CollectingInitial {
            match self.collect_initial(driver).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    self.transition(SessionState::Abandoned)?;
                    self.gate.close();
                    return Ok(SessionOutcome::Abandoned);
                }
                Err(e) => {
                    self.gate.close();
                    return Err(e);
                }
            }
            self.transition(SessionState::Negotiating)?;
        }

        let topic = self.role.listen_topic(self.sheet.name());
        let subscription = self.bus.subscribe(&topic).await;
        let closer = subscription.closer();
        if !subscription.is_live() && self.signals.mark_degraded() {
            warn!(
                role = %self.role,
                topic = %topic,
                "Live updates unavailable; use refresh to see the other team's changes"
            );
            self.gate.render(|r| r.notice(&Notice::BusDegraded));
        }

        let listener = Listener {
            role: self.role,
            store: self.store.clone(),
            sheet: self.sheet.clone(),
            signals: Arc::clone(&self.signals),
            gate: Arc::clone(&self.gate),
            read_timeout: self.timeouts.listener_read,
        };
        let mut handle = tokio::spawn(listener.run(subscription));

        let result = self.negotiate(driver).await;

        // Signal first so the listener stops reading, then close the
        // subscription, then join.
        self.signals.shutdown.cancel();
        closer.close();
        match tokio::time::timeout(self.timeouts.listener_join, &mut handle).await {
            Ok(Ok(())) => debug!(role = %self.role, "Listener joined"),
            Ok(Err(e)) => warn!(role = %self.role, error = %e, "Listener task failed"),
            Err(_) => {
                warn!(
                    role = %self.role,
                    timeout_ms = self.timeouts.listener_join.as_millis() as u64,
                    "Listener did not stop in time; aborting"
                );
                handle.abort();
            }
        }

        let outcome = match result {
            Ok(()) => self.conclude().await,
            Err(e) => Err(e),
        };
        self.gate.close();
        outcome
    }

    /// Seed the game on first use, then check both parties agree on the
    /// term set.
    async fn prepare_store(&self) -> dealroom_db::Result<()> {
        if self.store.initialize(self.sheet.terms()).await? {
            info!(game = %self.sheet.name(), "Seeded new negotiation");
        }
        self.store.verify_terms(self.sheet.terms()).await
    }

    /// Prompt for every term that has no value yet.
    async fn collect_initial<D>(&mut self, driver: &mut D) -> Result<Flow>
    where
        D: ActionSource + ?Sized,
    {
        let snapshot = self.store.get_all().await?;
        let unset: Vec<_> = snapshot
            .iter()
            .filter(|t| t.value.is_none())
            .map(|t| (t.name.clone(), t.unit.clone()))
            .collect();

        if unset.is_empty() {
            info!("All terms already have values; resuming negotiation");
            return Ok(Flow::Continue);
        }

        for (name, unit) in unset {
            let prompt = Prompt::InitialValue {
                term: name.clone(),
                unit,
            };

            loop {
                let action = tokio::select! {
                    biased;
                    _ = self.signals.shutdown.cancelled() => return Ok(Flow::Stop),
                    action = driver.next_action(&prompt) => action?,
                };

                match action {
                    Action::InitializeTerm { name: n, value } | Action::EditTerm { name: n, value }
                        if n == name =>
                    {
                        if self.write_value(&name, value).await? {
                            break;
                        }
                    }
                    Action::Exit => {
                        info!(role = %self.role, "Exit during initial collection");
                        self.signals.shutdown.cancel();
                        return Ok(Flow::Stop);
                    }
                    _ => self.reject(format!("Enter a value for {name} first")),
                }
            }
        }

        Ok(Flow::Continue)
    }

    async fn negotiate<D>(&mut self, driver: &mut D) -> Result<()>
    where
        D: ActionSource + ?Sized,
    {
        loop {
            if self.signals.shutdown.is_cancelled() {
                return Ok(());
            }

            if self.store.is_fully_approved().await? {
                show_final_view(&self.store, &self.sheet, &self.signals, &self.gate).await?;
                return Ok(());
            }

            let snapshot = self.store.get_all().await?;
            let view = TermsView {
                role: self.role,
                state: self.state,
                snapshot: snapshot.clone(),
                notifications_live: self.bus.is_available() && !self.signals.is_degraded(),
            };
            self.gate.render(|r| r.render_terms(&view));

            if self.signals.take_refresh() {
                continue;
            }

            let prompt = Prompt::Menu {
                role: self.role,
                snapshot,
            };
            let action = tokio::select! {
                biased;
                _ = self.signals.shutdown.cancelled() => return Ok(()),
                action = driver.next_action(&prompt) => action?,
            };

            if let Flow::Stop = self.apply(action).await? {
                return Ok(());
            }
        }
    }

    async fn apply(&mut self, action: Action) -> Result<Flow> {
        match (self.role, action) {
            (_, Action::Refresh) => {
                debug!(role = %self.role, "Manual refresh");
            }
            (_, Action::Exit) => {
                info!(role = %self.role, "Leaving negotiation; it can be resumed later");
                self.signals.shutdown.cancel();
                return Ok(Flow::Stop);
            }
            (Role::Proposer, Action::EditTerm { name, value }) => {
                self.write_value(&name, value).await?;
            }
            (Role::Counterparty, Action::SetStatus { name, status }) => {
                if status == ApprovalStatus::Approved && !self.has_value(&name).await? {
                    self.reject(format!("{name} has no value yet; wait for Team 1 to propose one"));
                    return Ok(Flow::Continue);
                }
                self.store.set_status(&name, status).await?;
                info!(term = %name, status = %status, "Status set");
                self.publish(&name).await;
            }
            (Role::Proposer, Action::SetStatus { .. }) => {
                self.reject("Only Team 2 can approve or reject terms".to_string());
            }
            (Role::Counterparty, Action::EditTerm { .. }) => {
                self.reject("Only Team 1 can change term values".to_string());
            }
            (_, Action::InitializeTerm { name, .. }) => {
                self.reject(format!("{name} is already initialized; edit it instead"));
            }
        }
        Ok(Flow::Continue)
    }

    /// Unknown names report true so the write itself fails with `UnknownTerm`.
    async fn has_value(&self, name: &str) -> Result<bool> {
        let snapshot = self.store.get_all().await?;
        Ok(snapshot.get(name).map_or(true, |term| term.value.is_some()))
    }

    /// Write a value and notify. Returns false when the value was refused.
    async fn write_value(&self, name: &str, value: f64) -> Result<bool> {
        match self.store.set_value(name, value).await {
            Ok(()) => {
                info!(term = %name, value, "Value set");
                self.publish(name).await;
                Ok(true)
            }
            Err(DbError::InvalidValue { term, value }) => {
                self.reject(format!("{value} is not a valid value for {term}"));
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(&self, term: &str) {
        let topic = self.role.publish_topic(self.sheet.name());
        self.bus.publish(&topic, term).await;
    }

    fn reject(&self, reason: String) {
        debug!(role = %self.role, reason = %reason, "Action rejected");
        self.gate
            .render(|r| r.notice(&Notice::ActionRejected(reason.clone())));
    }

    /// Decide the outcome from a fresh read, after the listener is gone.
    async fn conclude(&mut self) -> Result<SessionOutcome> {
        if self.store.is_fully_approved().await? {
            show_final_view(&self.store, &self.sheet, &self.signals, &self.gate).await?;
            self.transition(SessionState::Settled)?;
            let snapshot = self.store.get_all().await?;
            let view = SettlementView::compute(&self.sheet, snapshot);
            info!(role = %self.role, settlement = %view.display_value(), "Negotiation settled");
            Ok(SessionOutcome::Settled(view))
        } else {
            self.transition(SessionState::Abandoned)?;
            info!(role = %self.role, "Negotiation paused");
            Ok(SessionOutcome::Abandoned)
        }
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(role = %self.role, from = %self.state, to = %next, "Session transition");
        self.state = next;
        Ok(())
    }
}
