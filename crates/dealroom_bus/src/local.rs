//! In-process notification hub backed by a tokio broadcast channel.

use std::sync::{Arc, Mutex};

use dealroom_protocol::Notification;
use tokio::sync::broadcast;

const LOCAL_CAPACITY: usize = 256;

/// Shared in-process hub. Every bus created from the same hub sees the same
/// messages; subscriptions filter by topic on receipt.
#[derive(Clone)]
pub struct LocalHub {
    sender: Arc<Mutex<Option<broadcast::Sender<Notification>>>>,
}

impl LocalHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(LOCAL_CAPACITY);
        Self {
            sender: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Shut the hub down. Open subscriptions observe a closed channel on
    /// their next read; later publishes are dropped.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }

    pub fn is_open(&self) -> bool {
        self.sender.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    pub(crate) fn send(&self, notification: Notification) -> bool {
        let guard = match self.sender.lock() {
            Ok(g) => g,
            Err(_) => return false,
        };
        match guard.as_ref() {
            // No receivers is not a failure: nobody is listening yet.
            Some(tx) => {
                let _ = tx.send(notification);
                true
            }
            None => false,
        }
    }

    pub(crate) fn receiver(&self) -> Option<broadcast::Receiver<Notification>> {
        self.sender.lock().ok()?.as_ref().map(|tx| tx.subscribe())
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}
