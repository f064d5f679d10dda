//! Owned session context shared by the guard, monitor and request client

use crate::storage::KeyValueStore;
use std::sync::Arc;
use suvidha_core::{PersistedSession, Result, Session};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Handle to the current admin session
///
/// Cloning is cheap; all clones observe the same state. Every mutation is
/// written through to durable storage under the configured key.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn KeyValueStore>,
    key: String,
    state: watch::Sender<Option<Session>>,
}

impl SessionContext {
    /// Create an empty (logged-out) context without reading storage
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                store,
                key: key.into(),
                state,
            }),
        }
    }

    /// Create a context re-hydrated from the envelope held in storage
    ///
    /// Unreadable or malformed envelopes yield a logged-out context.
    #[must_use]
    pub fn rehydrate(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let context = Self::new(store, key);
        let restored = read_envelope(context.inner.store.as_ref(), &context.inner.key)
            .and_then(PersistedSession::into_session);

        if let Some(ref session) = restored {
            info!(role = %session.user.role, "Restored session from storage");
        } else {
            debug!("No stored session to restore");
        }
        context.inner.state.send_replace(restored);
        context
    }

    /// Snapshot of the current session
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.inner.state.borrow().clone()
    }

    /// Whether a non-empty token is held
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner
            .state
            .borrow()
            .as_ref()
            .is_some_and(Session::has_token)
    }

    /// Whether the session may render protected views
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner
            .state
            .borrow()
            .as_ref()
            .is_some_and(Session::is_admin)
    }

    /// Establish a session and persist it
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be written; the in-memory
    /// session is left unchanged in that case.
    pub fn login(&self, session: Session) -> Result<()> {
        self.persist(Some(&session))?;
        info!(role = %session.user.role, user = %session.user.display_label(), "Session established");
        self.inner.state.send_replace(Some(session));
        Ok(())
    }

    /// Destroy the session and persist the cleared envelope
    ///
    /// The in-memory session is cleared even when persisting fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleared envelope cannot be written.
    pub fn logout(&self) -> Result<()> {
        let previous = self.inner.state.send_replace(None);
        if previous.is_some() {
            info!("Session cleared");
        }
        self.persist(None)
    }

    /// Subscribe to session changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.state.subscribe()
    }

    /// Durable storage backing this context
    #[must_use]
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.inner.store)
    }

    /// Storage key of the session envelope
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    fn persist(&self, session: Option<&Session>) -> Result<()> {
        let envelope = serde_json::to_string(&PersistedSession::from_session(session))?;
        self.inner.store.set_item(&self.inner.key, &envelope)
    }
}

/// Read and decode the session envelope, logging rather than failing
#[must_use]
pub fn read_envelope(store: &dyn KeyValueStore, key: &str) -> Option<PersistedSession> {
    let raw = match store.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read admin auth store: {}", e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!("Failed to parse admin auth store: {}", e);
            None
        }
    }
}
