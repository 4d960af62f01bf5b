//! Live connections that receive metadata after every rebuild.

use crate::error::PushError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Target a subscriber must declare to be admitted.
pub const WILDCARD_TARGET: &str = "*";

/// Opaque connection identity.
pub type ConnectionId = u64;

/// Delivers a serialized document to one subscriber. Must not block.
///
/// Broadcasts call push functions without holding the registry lock, so a
/// push function may subscribe or unsubscribe on the same registry.
pub type PushFn = Arc<dyn Fn(&str) -> Result<(), PushError> + Send + Sync>;

/// Wrap a bounded channel sender as a non-blocking push function.
pub fn channel_push(tx: mpsc::Sender<String>) -> PushFn {
    Arc::new(move |document: &str| {
        tx.try_send(document.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => PushError::Closed,
            mpsc::error::TrySendError::Full(_) => PushError::Backlogged,
        })
    })
}

/// A `user-connected` event from the transport layer.
pub struct UserConnected {
    pub id: ConnectionId,
    pub url: String,
    pub target: String,
    pub push: PushFn,
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Registry of live subscribers keyed by connection id.
pub struct ConnectionRegistry {
    endpoint: String,
    connections: RwLock<HashMap<ConnectionId, PushFn>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Create a registry for the unit endpoint (e.g. `/$pilet-api`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Allocate a fresh connection id.
    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Whether a connection declaring `target` on `url` may subscribe.
    ///
    /// The comparison is case-sensitive, after stripping one leading `/`
    /// from both sides.
    pub fn admits(&self, target: &str, url: &str) -> bool {
        target == WILDCARD_TARGET && strip_separator(url) == strip_separator(&self.endpoint)
    }

    /// Handle a `user-connected` event. Returns whether it was subscribed.
    pub fn connect(&self, event: UserConnected) -> bool {
        if !self.admits(&event.target, &event.url) {
            tracing::debug!(id = event.id, url = %event.url, declared = %event.target, "connection not admitted");
            return false;
        }
        self.subscribe(event.id, event.push)
    }

    /// Handle a `user-disconnected` event.
    pub fn disconnect(&self, id: ConnectionId) {
        self.unsubscribe(id);
    }

    /// Add a subscriber. An id that is already registered is rejected.
    pub fn subscribe(&self, id: ConnectionId, push: PushFn) -> bool {
        let mut connections = self.connections.write();
        if connections.contains_key(&id) {
            tracing::warn!(id, "duplicate connection id rejected");
            return false;
        }
        connections.insert(id, push);
        tracing::info!(id, total = connections.len(), "subscriber connected");
        true
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().remove(&id).is_some();
        if removed {
            tracing::info!(id, "subscriber disconnected");
        }
        removed
    }

    /// Push `document` to every subscriber.
    ///
    /// A failed push is logged and counted; it does not affect delivery to
    /// the others. Removal stays with [`ConnectionRegistry::unsubscribe`].
    pub fn broadcast(&self, document: &str) -> BroadcastReport {
        let subscribers: Vec<(ConnectionId, PushFn)> = self
            .connections
            .read()
            .iter()
            .map(|(id, push)| (*id, Arc::clone(push)))
            .collect();
        let mut report = BroadcastReport::default();

        for (id, push) in subscribers {
            match push(document) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(id, error = %e, "failed to push metadata");
                }
            }
        }

        tracing::debug!(delivered = report.delivered, failed = report.failed, "broadcast finished");
        report
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().contains_key(&id)
    }
}

fn strip_separator(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder() -> (PushFn, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let push: PushFn = Arc::new(move |doc: &str| {
            sink.lock().push(doc.to_string());
            Ok(())
        });
        (push, seen)
    }

    #[test]
    fn test_admits_wildcard_on_endpoint() {
        let registry = ConnectionRegistry::new("/$pilet-api");
        assert!(registry.admits("*", "$pilet-api"));
        assert!(registry.admits("*", "/$pilet-api"));
    }

    #[test]
    fn test_rejects_other_targets_and_paths() {
        let registry = ConnectionRegistry::new("/$pilet-api");
        assert!(!registry.admits("/$pilet-api", "$pilet-api"));
        assert!(!registry.admits("*", "$PILET-API"));
        assert!(!registry.admits("*", "$pilet-api/index.js"));
        assert!(!registry.admits("*", ""));
    }

    #[test]
    fn test_connect_respects_admission() {
        let registry = ConnectionRegistry::new("/api");
        let (push, _) = recorder();
        let admitted = registry.connect(UserConnected {
            id: 1,
            url: "other".into(),
            target: "*".into(),
            push,
        });
        assert!(!admitted);
        assert!(registry.is_empty());

        let (push, _) = recorder();
        assert!(registry.connect(UserConnected {
            id: 2,
            url: "api".into(),
            target: "*".into(),
            push,
        }));
        assert!(registry.contains(2));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = ConnectionRegistry::new("/api");
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();

        assert!(registry.subscribe(7, first));
        assert!(!registry.subscribe(7, second));
        assert_eq!(registry.len(), 1);

        registry.broadcast("doc");
        assert_eq!(first_seen.lock().len(), 1);
        assert!(second_seen.lock().is_empty());
    }

    #[test]
    fn test_unsubscribe_exactly_once() {
        let registry = ConnectionRegistry::new("/api");
        let (push, _) = recorder();
        registry.subscribe(1, push);

        assert!(registry.unsubscribe(1));
        assert!(!registry.unsubscribe(1));
    }

    #[test]
    fn test_failed_push_does_not_stop_others() {
        let registry = ConnectionRegistry::new("/api");
        registry.subscribe(1, Arc::new(|_: &str| Err(PushError::Closed)));
        let (push, seen) = recorder();
        registry.subscribe(2, push);

        let report = registry.broadcast("doc");
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(*seen.lock(), vec!["doc".to_string()]);
        // Failure does not remove the connection; disconnect does.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unsubscribed_receives_nothing() {
        let registry = ConnectionRegistry::new("/api");
        let (a, a_seen) = recorder();
        let (b, b_seen) = recorder();
        registry.subscribe(1, a);
        registry.subscribe(2, b);

        registry.disconnect(1);
        registry.broadcast("next");

        assert!(a_seen.lock().is_empty());
        assert_eq!(b_seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_channel_push_delivers_and_reports_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let push = channel_push(tx);

        push("one").unwrap();
        assert_eq!(push("two"), Err(PushError::Backlogged));
        assert_eq!(rx.recv().await.as_deref(), Some("one"));

        drop(rx);
        assert_eq!(push("three"), Err(PushError::Closed));
    }

    #[test]
    fn test_push_may_unsubscribe_itself() {
        let registry = Arc::new(ConnectionRegistry::new("/api"));
        let handle = Arc::clone(&registry);
        registry.subscribe(
            1,
            Arc::new(move |_: &str| {
                handle.unsubscribe(1);
                Ok(())
            }),
        );
        let (push, seen) = recorder();
        registry.subscribe(2, push);

        let report = registry.broadcast("doc");
        assert_eq!(report.delivered, 2);
        assert!(!registry.contains(1));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_next_id_unique() {
        let registry = ConnectionRegistry::new("/api");
        assert_ne!(registry.next_id(), registry.next_id());
    }
}
