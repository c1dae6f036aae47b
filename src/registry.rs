//! Session registry
//!
//! Maps display names to registered sessions behind a single reader/writer
//! lock. The router is the only writer; `snapshot` and `contains` may be
//! called from any task.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AppError;
use crate::session::SessionHandle;
use crate::types::DisplayName;

/// Name → session map shared between the router and connection handlers
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<DisplayName, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session under its name
    ///
    /// The uniqueness check and the insert happen under the same write
    /// lock, so a name that passed an earlier `contains` check can still
    /// fail here with `NameConflict`. The existing session is untouched.
    pub async fn register(&self, session: SessionHandle) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        match sessions.entry(session.name().clone()) {
            Entry::Occupied(entry) => Err(AppError::NameConflict(entry.key().to_string())),
            Entry::Vacant(entry) => {
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Remove a session by name, closing its outbound queue
    ///
    /// Returns false if no session was registered under `name`.
    pub async fn unregister(&self, name: &DisplayName) -> bool {
        let removed = self.sessions.write().await.remove(name);
        // dropping the handle drops the registry's sender
        removed.is_some()
    }

    /// Sorted copy of the registered names
    pub async fn snapshot(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut names: Vec<String> = sessions.keys().map(|n| n.to_string()).collect();
        names.sort();
        names
    }

    pub async fn contains(&self, name: &DisplayName) -> bool {
        self.sessions.read().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Look up one session for private delivery
    pub(crate) async fn get(&self, name: &DisplayName) -> Option<SessionHandle> {
        self.sessions.read().await.get(name).cloned()
    }

    /// Handles for every registered session, taken under one read lock
    pub(crate) async fn recipients(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Cancel and remove every session. Shutdown only.
    ///
    /// Returns the number of sessions closed.
    pub async fn close_all(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        for (name, session) in sessions.drain() {
            debug!("Closing session '{}' ({})", name, session.id());
            session.close();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChatMessage;
    use crate::types::ConnectionId;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn session(name: &str) -> (SessionHandle, mpsc::Receiver<ChatMessage>) {
        let (tx, rx) = mpsc::channel(10);
        let handle = SessionHandle::new(
            ConnectionId::new(),
            DisplayName::parse(name).unwrap(),
            tx,
            CancellationToken::new(),
        );
        (handle, rx)
    }

    fn name(s: &str) -> DisplayName {
        DisplayName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let registry = SessionRegistry::new();
        let (bob, _rx1) = session("bob");
        let (alice, _rx2) = session("alice");

        registry.register(bob).await.unwrap();
        registry.register(alice).await.unwrap();

        assert_eq!(registry.snapshot().await, vec!["alice", "bob"]);
        assert_eq!(registry.len().await, 2);
        assert!(registry.contains(&name("alice")).await);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = session("alice");
        let first_id = first.id();
        let (second, _rx2) = session("alice");

        registry.register(first).await.unwrap();
        let result = registry.register(second).await;

        assert!(matches!(result, Err(AppError::NameConflict(n)) if n == "alice"));
        let kept = registry.get(&name("alice")).await.unwrap();
        assert_eq!(kept.id(), first_id);
        assert!(!kept.is_closed());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_name_reusable_after_unregister() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = session("alice");
        let (second, _rx2) = session("alice");

        registry.register(first).await.unwrap();
        assert!(registry.unregister(&name("alice")).await);
        registry.register(second).await.unwrap();

        assert_eq!(registry.snapshot().await, vec!["alice"]);
    }

    #[tokio::test]
    async fn test_unregister_missing_is_noop() {
        let registry = SessionRegistry::new();
        assert!(!registry.unregister(&name("ghost")).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unregister_closes_queue() {
        let registry = SessionRegistry::new();
        let (alice, mut rx) = session("alice");

        registry.register(alice).await.unwrap();
        registry.unregister(&name("alice")).await;

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let registry = SessionRegistry::new();
        let (alice, _rx) = session("alice");
        registry.register(alice).await.unwrap();

        let before = registry.snapshot().await;
        registry.unregister(&name("alice")).await;

        assert_eq!(before, vec!["alice"]);
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_close_all_cancels_and_empties() {
        let registry = SessionRegistry::new();
        let parent = CancellationToken::new();
        let mut receivers = Vec::new();
        let mut tokens = Vec::new();

        for n in ["alice", "bob", "carol"] {
            let (tx, rx) = mpsc::channel(10);
            let token = parent.child_token();
            tokens.push(token.clone());
            receivers.push(rx);
            registry
                .register(SessionHandle::new(ConnectionId::new(), name(n), tx, token))
                .await
                .unwrap();
        }

        assert_eq!(registry.close_all().await, 3);
        assert!(registry.is_empty().await);
        assert!(tokens.iter().all(|t| t.is_cancelled()));
        for mut rx in receivers {
            assert!(rx.recv().await.is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_single_winner() {
        let registry = SessionRegistry::new();
        let mut tasks = Vec::new();

        for _ in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (handle, rx) = session("alice");
                let ok = registry.register(handle).await.is_ok();
                (ok, rx)
            }));
        }

        let mut winners = 0;
        let mut receivers = Vec::new();
        for task in tasks {
            let (ok, rx) = task.await.unwrap();
            if ok {
                winners += 1;
            }
            receivers.push(rx);
        }

        assert_eq!(winners, 1);
        assert_eq!(registry.len().await, 1);
    }
}
