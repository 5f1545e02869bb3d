//! Connectivity signal.
//!
//! A boolean online/offline observable. The host application feeds it from
//! whatever real signal it has (OS network state, heartbeat probe); the
//! orchestrator reads the current value at submit time and the drainer
//! subscribes for offline-to-online transitions.

use tokio::sync::watch;

/// Shared online/offline flag with change notification.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update the state. No-op notifications are suppressed so observers only
    /// wake on actual transitions.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    /// Subscribe to state changes. The receiver initially sees the current
    /// value as unseen, so a fresh subscriber observes the present state.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
