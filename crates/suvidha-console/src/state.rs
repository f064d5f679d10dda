//! Application state wiring

use crate::api_client::ApiClient;
use crate::dashboard::MetricsPoller;
use crate::error::{ApiError, Result};
use crate::login::LoginFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use suvidha_core::Config;
use suvidha_session::{
    FileStore, GuardDecision, InactivityMonitor, KeyValueStore, MonitorHandle, Navigator,
    SessionContext, SessionGuard, View,
};
use tracing::{debug, info};

/// Application state holding configuration, the session and clients
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Current admin session
    pub session: SessionContext,
    /// View history
    pub navigator: Navigator,
    /// Guard in front of protected views
    pub guard: SessionGuard,
    /// Backend client
    pub client: ApiClient,
}

impl AppState {
    /// Create state backed by the configured storage file
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let path = expand_home(&config.session.storage_path);
        debug!(path = %path.display(), "Using session storage");
        Self::with_store(config, Arc::new(FileStore::new(path)))
    }

    /// Create state backed by `store`, re-hydrating any stored session
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let session = SessionContext::rehydrate(store, config.session.storage_key.clone());
        let navigator = Navigator::default();
        let guard = SessionGuard::new(session.clone(), navigator.clone());
        let client = ApiClient::from_config(&config.api, &session)?;

        Ok(Self {
            config,
            session,
            navigator,
            guard,
            client,
        })
    }

    /// Open `view` through the session guard
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the guard refuses the view;
    /// navigation has then moved to the login view.
    pub fn open(&self, view: View) -> Result<()> {
        match self.guard.navigate(view) {
            GuardDecision::Render => Ok(()),
            GuardDecision::Redirect(_) => Err(ApiError::Unauthorized { view }),
        }
    }

    /// Start a login at the phone step
    #[must_use]
    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(
            self.client.clone(),
            self.session.clone(),
            self.navigator.clone(),
        )
    }

    /// Clear the session and return to the login view
    ///
    /// # Errors
    ///
    /// Returns an error if the cleared session cannot be persisted; the
    /// in-memory session is cleared regardless.
    pub fn logout(&self) -> Result<()> {
        let result = self.session.logout();
        self.navigator.push(View::Login);
        info!("Logged out");
        result.map_err(ApiError::from)
    }

    /// Start the inactivity monitor for this session
    #[must_use]
    pub fn spawn_monitor(&self) -> MonitorHandle {
        InactivityMonitor::new(
            self.session.clone(),
            self.navigator.clone(),
            self.config.session.idle_timeout(),
        )
        .spawn()
    }

    /// Dashboard poller using the configured period
    #[must_use]
    pub fn metrics_poller(&self) -> MetricsPoller {
        MetricsPoller::new(self.client.clone(), self.config.dashboard.poll_interval())
    }

    /// Directory CSV exports go to
    #[must_use]
    pub fn export_directory(&self) -> PathBuf {
        expand_home(&self.config.export.directory)
    }
}

/// Expand a leading `~` to the user's home directory
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    directories::UserDirs::new()
        .map_or_else(|| path.to_path_buf(), |dirs| dirs.home_dir().join(rest))
}
