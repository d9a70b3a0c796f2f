//! Runtime connectivity signal

use tokio::sync::watch;

/// Capability describing whether the network is reachable.
///
/// Injected rather than read from a global so the router and sync engine
/// can be exercised against a fake in tests.
pub trait Connectivity: Send + Sync {
    /// Current reachability
    fn is_online(&self) -> bool;

    /// Subscribe to online/offline transitions
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Watch-channel backed connectivity state, fed by the host platform's
/// network signal
pub struct NetworkState {
    tx: watch::Sender<bool>,
}

impl NetworkState {
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Report a reachability change from the host
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_replace(online) != online;
        if changed {
            if online {
                tracing::info!("Network is back online");
            } else {
                tracing::info!("Network went offline");
            }
        }
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for NetworkState {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
