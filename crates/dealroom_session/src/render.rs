//! Render boundary and the lock that serializes output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dealroom_db::TermSnapshot;
use dealroom_protocol::Role;

use crate::settlement::SettlementView;
use crate::state::SessionState;

/// Current terms as shown from one party's seat.
#[derive(Debug, Clone)]
pub struct TermsView {
    pub role: Role,
    pub state: SessionState,
    pub snapshot: TermSnapshot,
    /// False once the bus is degraded; manual refresh is then required
    pub notifications_live: bool,
}

/// Short out-of-band messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The other team changed something
    RemoteUpdate { from: Role, term: String },
    /// The action was not applied
    ActionRejected(String),
    /// Notifications are offline for the rest of the session
    BusDegraded,
    /// The driver could not parse what was typed
    InvalidInput(String),
}

/// Output sink. Implementations are called under the render lock, one at a
/// time, and must not block on input.
pub trait Renderer: Send + Sync {
    fn render_terms(&self, view: &TermsView);
    fn render_settlement(&self, view: &SettlementView);
    fn notice(&self, notice: &Notice);

    /// Input prompt written by the driver, without a trailing newline.
    fn prompt(&self, _text: &str) {}
}

/// Serializes renders from the main loop and the listener, and refuses all
/// output once the session has terminated.
pub struct RenderGate {
    renderer: Arc<dyn Renderer>,
    lock: Mutex<()>,
    closed: AtomicBool,
}

impl RenderGate {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Run `f` under the render lock. Returns false if the gate is closed.
    pub fn render<F>(&self, f: F) -> bool
    where
        F: FnOnce(&dyn Renderer),
    {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        f(self.renderer.as_ref());
        true
    }

    /// Waits for any in-flight render, then refuses further output.
    pub fn close(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
