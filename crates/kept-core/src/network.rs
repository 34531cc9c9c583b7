//! Connectivity state consumed by the accessors and the sync engine.

use std::sync::Arc;

use tokio::sync::watch;

/// Answers "is the client currently offline?".
///
/// The platform decides how connectivity is detected; the core only asks.
pub trait NetworkMonitor: Send + Sync {
    fn is_offline(&self) -> bool;
}

/// Connectivity flag that can be flipped by the host and observed for changes.
#[derive(Debug, Clone)]
pub struct ConnectivityState {
    online: Arc<watch::Sender<bool>>,
}

impl ConnectivityState {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self {
            online: Arc::new(sender),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Record the current connectivity. Returns `true` if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
        changed
    }

    /// Receiver that wakes on every connectivity change (`true` = online)
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::online()
    }
}

impl NetworkMonitor for ConnectivityState {
    fn is_offline(&self) -> bool {
        !self.is_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_online_reports_changes_only() {
        let state = ConnectivityState::offline();
        assert!(state.is_offline());
        assert!(state.set_online(true));
        assert!(!state.set_online(true));
        assert!(!state.is_offline());
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let state = ConnectivityState::offline();
        let mut receiver = state.subscribe();

        state.set_online(true);
        receiver.changed().await.unwrap();
        assert!(*receiver.borrow_and_update());
    }

    #[test]
    fn test_clones_share_state() {
        let state = ConnectivityState::online();
        let clone = state.clone();
        clone.set_online(false);
        assert!(state.is_offline());
    }
}
