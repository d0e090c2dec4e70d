//! Event system for coordinator subscribers.
//!
//! Subscribers receive an event after every refresh cycle. The number of
//! live subscriptions also decides whether the coordinator polls at all.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::error::RefreshError;
use crate::types::StoveSnapshot;

/// Event types that can be dispatched.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// A new snapshot was published.
    Updated(Arc<StoveSnapshot>),
    /// A refresh failed; the previous snapshot is still current.
    UpdateFailed(RefreshError),
}

impl CoordinatorEvent {
    /// Returns the snapshot for update events.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Arc<StoveSnapshot>> {
        match self {
            Self::Updated(snapshot) => Some(snapshot),
            Self::UpdateFailed(_) => None,
        }
    }

    /// Returns true for failure events.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::UpdateFailed(_))
    }
}

/// A subscription to coordinator events.
///
/// While at least one subscription is alive the coordinator polls the
/// stove. Dropping the subscription unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<CoordinatorEvent>,
    listeners: Arc<watch::Sender<usize>>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the coordinator is gone.
    pub async fn recv(&mut self) -> Option<CoordinatorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receives the next event, giving up after `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<CoordinatorEvent> {
        tokio::time::timeout(timeout, self.recv()).await.ok().flatten()
    }

    /// Ends the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.listeners.send_modify(|count| *count = count.saturating_sub(1));
    }
}

struct EventDispatcherInner {
    sender: broadcast::Sender<CoordinatorEvent>,
    listeners: Arc<watch::Sender<usize>>,
}

/// Dispatches events to subscribers and tracks how many there are.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (listeners, _) = watch::channel(0);

        let inner = Arc::new(EventDispatcherInner {
            sender,
            listeners: Arc::new(listeners),
        });

        Self { inner }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: CoordinatorEvent) {
        // No receivers is fine
        let _ = self.inner.sender.send(event);
    }

    /// Subscribes to events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let receiver = self.inner.sender.subscribe();
        self.inner.listeners.send_modify(|count| *count += 1);
        Subscription {
            receiver,
            listeners: Arc::clone(&self.inner.listeners),
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        *self.inner.listeners.borrow()
    }

    /// Returns a receiver that observes the subscription count.
    #[must_use]
    pub fn watch_listeners(&self) -> watch::Receiver<usize> {
        self.inner.listeners.subscribe()
    }
}
