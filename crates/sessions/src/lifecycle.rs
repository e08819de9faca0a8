//! Session lifecycle: lazy creation, coalescing, explicit reset.
//!
//! The token is read from the [`TokenStore`] first.  Only when none is
//! stored does the manager ask the backend for one; callers racing on an
//! empty store queue behind a single creation.  Reset forgets the token
//! locally without telling the backend.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use nd_domain::error::{Error, Result};
use nd_domain::trace::TraceEvent;

use crate::store::TokenStore;

/// Something that can mint a new session token (the chat backend).
#[async_trait]
pub trait SessionCreator: Send + Sync {
    async fn create_session(&self) -> Result<String>;
}

/// Owns the single session token for this client.
pub struct SessionManager {
    store: TokenStore,
    creator: Arc<dyn SessionCreator>,
    /// Held across the creation round trip so only one is in flight.
    create_lock: tokio::sync::Mutex<()>,
    /// Tokens dropped by `reset_session`; never handed out again.
    retired: Mutex<HashSet<String>>,
}

impl SessionManager {
    pub fn new(store: TokenStore, creator: Arc<dyn SessionCreator>) -> Self {
        Self {
            store,
            creator,
            create_lock: tokio::sync::Mutex::new(()),
            retired: Mutex::new(HashSet::new()),
        }
    }

    /// The stored token, without creating one.
    pub fn current(&self) -> Result<Option<String>> {
        self.store.load()
    }

    /// Return the stored token, creating and persisting one if needed.
    pub async fn get_or_create_session(&self) -> Result<String> {
        if let Some(token) = self.store.load()? {
            return Ok(token);
        }

        let _guard = self.create_lock.lock().await;

        // Another caller may have finished creating while we waited.
        if let Some(token) = self.store.load()? {
            return Ok(token);
        }

        let token = self.creator.create_session().await.map_err(|e| {
            tracing::warn!(error = %e, "session creation failed");
            e
        })?;

        let token = token.trim().to_owned();
        if token.is_empty() {
            return Err(Error::Session("backend returned an empty session id".into()));
        }
        if self.retired.lock().contains(&token) {
            return Err(Error::Session(format!(
                "backend reissued retired session id {token}"
            )));
        }

        self.store.save(&token)?;

        TraceEvent::SessionCreated {
            session_id: token.clone(),
        }
        .emit();

        Ok(token)
    }

    /// Forget the stored token.  Returns the token that was dropped.
    pub fn reset_session(&self) -> Result<Option<String>> {
        let old = self.store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read session token before reset");
            None
        });

        self.store.clear()?;

        if let Some(ref token) = old {
            self.retired.lock().insert(token.clone());
        }

        TraceEvent::SessionReset {
            old_session_id: old.clone(),
        }
        .emit();

        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out `sess-1`, `sess-2`, ... and counts calls.
    struct CountingCreator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionCreator for CountingCreator {
        async fn create_session(&self) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            Ok(format!("sess-{n}"))
        }
    }

    /// Always returns the same id, like a misbehaving backend.
    struct FixedCreator(&'static str);

    #[async_trait]
    impl SessionCreator for FixedCreator {
        async fn create_session(&self) -> Result<String> {
            Ok(self.0.to_owned())
        }
    }

    struct FailingCreator;

    #[async_trait]
    impl SessionCreator for FailingCreator {
        async fn create_session(&self) -> Result<String> {
            Err(Error::Http("503 Service Unavailable".into()))
        }
    }

    fn counting() -> Arc<CountingCreator> {
        Arc::new(CountingCreator {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn creates_once_then_reuses() {
        let creator = counting();
        let mgr = SessionManager::new(TokenStore::in_memory("k"), creator.clone());

        assert_eq!(mgr.get_or_create_session().await.unwrap(), "sess-1");
        assert_eq!(mgr.get_or_create_session().await.unwrap(), "sess-1");
        assert_eq!(creator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stored_token_skips_backend() {
        let creator = counting();
        let store = TokenStore::in_memory("k");
        store.save("existing").unwrap();
        let mgr = SessionManager::new(store, creator.clone());

        assert_eq!(mgr.get_or_create_session().await.unwrap(), "existing");
        assert_eq!(creator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_creation() {
        let creator = counting();
        let mgr = Arc::new(SessionManager::new(TokenStore::in_memory("k"), creator.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mgr = mgr.clone();
                tokio::spawn(async move { mgr.get_or_create_session().await.unwrap() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "sess-1");
        }
        assert_eq!(creator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_then_create_yields_new_token() {
        let creator = counting();
        let mgr = SessionManager::new(TokenStore::in_memory("k"), creator);

        let first = mgr.get_or_create_session().await.unwrap();
        assert_eq!(mgr.reset_session().unwrap().as_deref(), Some(first.as_str()));
        assert_eq!(mgr.current().unwrap(), None);

        let second = mgr.get_or_create_session().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn reissued_token_after_reset_is_rejected() {
        let mgr = SessionManager::new(TokenStore::in_memory("k"), Arc::new(FixedCreator("same")));

        assert_eq!(mgr.get_or_create_session().await.unwrap(), "same");
        mgr.reset_session().unwrap();

        let err = mgr.get_or_create_session().await.unwrap_err();
        assert!(matches!(err, Error::Session(_)));
        assert_eq!(mgr.current().unwrap(), None);
    }

    #[tokio::test]
    async fn creation_error_propagates_and_stores_nothing() {
        let mgr = SessionManager::new(TokenStore::in_memory("k"), Arc::new(FailingCreator));
        assert!(matches!(
            mgr.get_or_create_session().await,
            Err(Error::Http(_))
        ));
        assert_eq!(mgr.current().unwrap(), None);
    }

    #[tokio::test]
    async fn empty_token_is_an_error() {
        let mgr = SessionManager::new(TokenStore::in_memory("k"), Arc::new(FixedCreator("  ")));
        assert!(matches!(
            mgr.get_or_create_session().await,
            Err(Error::Session(_))
        ));
    }

    #[test]
    fn reset_without_token_is_fine() {
        let mgr = SessionManager::new(TokenStore::in_memory("k"), counting());
        assert_eq!(mgr.reset_session().unwrap(), None);
    }
}
