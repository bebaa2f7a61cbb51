//! Background listener: turns remote notifications into refreshes or the
//! final settlement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dealroom_bus::Subscription;
use dealroom_db::TermStore;
use dealroom_protocol::{Notification, Role};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::render::{Notice, RenderGate};
use crate::settlement::SettlementView;
use crate::sheet::TermSheet;

/// Flags shared by the main loop and the listener. Nothing else crosses
/// between them.
#[derive(Debug, Default)]
pub struct SessionSignals {
    pub shutdown: CancellationToken,
    refresh_pending: AtomicBool,
    degraded: AtomicBool,
    final_view_shown: AtomicBool,
}

impl SessionSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_refresh(&self) {
        self.refresh_pending.store(true, Ordering::SeqCst);
    }

    /// Clear the refresh flag, returning whether it was set.
    pub fn take_refresh(&self) -> bool {
        self.refresh_pending.swap(false, Ordering::SeqCst)
    }

    /// Mark the bus degraded. Returns true for the first caller only.
    pub fn mark_degraded(&self) -> bool {
        !self.degraded.swap(true, Ordering::SeqCst)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Claim the single final-view render. Returns true for the first
    /// caller only.
    pub fn claim_final_view(&self) -> bool {
        self.final_view_shown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Render the settlement from a fresh read, at most once per session.
pub(crate) async fn show_final_view(
    store: &TermStore,
    sheet: &TermSheet,
    signals: &SessionSignals,
    gate: &RenderGate,
) -> dealroom_db::Result<()> {
    // Claim only after the read succeeds, so a failed read leaves the view
    // to whoever checks next.
    let snapshot = store.get_all().await?;
    if !signals.claim_final_view() {
        return Ok(());
    }
    let view = SettlementView::compute(sheet, snapshot);
    gate.render(|r| r.render_settlement(&view));
    Ok(())
}

pub(crate) struct Listener {
    pub role: Role,
    pub store: TermStore,
    pub sheet: TermSheet,
    pub signals: Arc<SessionSignals>,
    pub gate: Arc<RenderGate>,
    pub read_timeout: Duration,
}

impl Listener {
    pub async fn run(self, mut subscription: Subscription) {
        debug!(role = %self.role, topic = %subscription.topic(), "Listener started");

        loop {
            if self.signals.shutdown.is_cancelled() {
                break;
            }

            if !subscription.is_live() {
                self.degrade("subscription unavailable");
                self.signals.shutdown.cancelled().await;
                break;
            }

            let message = match subscription.next_message(self.read_timeout).await {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    warn!(role = %self.role, error = %e, "Notification read failed");
                    continue;
                }
            };

            if self.signals.shutdown.is_cancelled() {
                break;
            }

            if let Err(e) = self.handle(message).await {
                warn!(role = %self.role, error = %e, "Listener failed handling update");
                self.degrade("listener error");
                self.signals.shutdown.cancelled().await;
                break;
            }
        }

        subscription.close();
        debug!(role = %self.role, "Listener stopped");
    }

    async fn handle(&self, message: Notification) -> dealroom_db::Result<()> {
        let from = self.role.peer();
        debug!(from = %from, term = %message.payload, "Update received");

        // The message only says something changed; settlement is decided by
        // a fresh read.
        if self.store.is_fully_approved().await? {
            info!(role = %self.role, "All terms approved; settling");
            show_final_view(&self.store, &self.sheet, &self.signals, &self.gate).await?;
            self.signals.shutdown.cancel();
            return Ok(());
        }

        self.signals.request_refresh();
        self.gate.render(|r| {
            r.notice(&Notice::RemoteUpdate {
                from,
                term: message.payload.clone(),
            })
        });
        Ok(())
    }

    fn degrade(&self, reason: &str) {
        if self.signals.mark_degraded() {
            warn!(
                role = %self.role,
                reason,
                "Live updates offline; use refresh to see the other team's changes"
            );
            self.gate.render(|r| r.notice(&Notice::BusDegraded));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Renderer, TermsView};
    use dealroom_db::StoreConfig;
    use dealroom_protocol::ApprovalStatus;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingSettlements {
        settlements: AtomicUsize,
    }

    impl Renderer for CountingSettlements {
        fn render_terms(&self, _: &TermsView) {}
        fn render_settlement(&self, _: &SettlementView) {
            self.settlements.fetch_add(1, Ordering::SeqCst);
        }
        fn notice(&self, _: &Notice) {}
    }

    #[tokio::test]
    async fn test_failed_read_leaves_final_view_unclaimed() {
        let sheet = TermSheet::valuation();
        let store = TermStore::open(&StoreConfig::sqlite_memory(), sheet.name())
            .await
            .unwrap();
        store.initialize(sheet.terms()).await.unwrap();
        for term in sheet.terms() {
            store.set_value(&term.name, 1.0).await.unwrap();
            store
                .set_status(&term.name, ApprovalStatus::Approved)
                .await
                .unwrap();
        }

        let signals = SessionSignals::new();
        let renderer = Arc::new(CountingSettlements::default());
        let gate = RenderGate::new(renderer.clone());

        store.close().await;
        assert!(show_final_view(&store, &sheet, &signals, &gate).await.is_err());
        assert_eq!(renderer.settlements.load(Ordering::SeqCst), 0);
        assert!(signals.claim_final_view());
    }

    #[tokio::test]
    async fn test_final_view_rendered_once_after_success() {
        let sheet = TermSheet::valuation();
        let store = TermStore::open(&StoreConfig::sqlite_memory(), sheet.name())
            .await
            .unwrap();
        store.initialize(sheet.terms()).await.unwrap();

        let signals = SessionSignals::new();
        let renderer = Arc::new(CountingSettlements::default());
        let gate = RenderGate::new(renderer.clone());

        show_final_view(&store, &sheet, &signals, &gate).await.unwrap();
        show_final_view(&store, &sheet, &signals, &gate).await.unwrap();
        assert_eq!(renderer.settlements.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_final_view_claimed_once() {
        let signals = SessionSignals::new();
        assert!(signals.claim_final_view());
        assert!(!signals.claim_final_view());
    }

    #[test]
    fn test_refresh_flag_is_cleared_on_take() {
        let signals = SessionSignals::new();
        assert!(!signals.take_refresh());
        signals.request_refresh();
        assert!(signals.take_refresh());
        assert!(!signals.take_refresh());
    }

    #[test]
    fn test_degraded_reported_once() {
        let signals = SessionSignals::new();
        assert!(signals.mark_degraded());
        assert!(!signals.mark_degraded());
        assert!(signals.is_degraded());
    }
}
