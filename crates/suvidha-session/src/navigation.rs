//! Views and the navigator that moves between them

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// A page of the admin console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Phone + OTP login
    Login,
    /// Metrics overview
    Dashboard,
    /// Grievance management table
    Complaints,
    /// Reporting and CSV export
    Analytics,
    /// Public advisories
    Advisories,
}

impl View {
    /// Every view, login first
    pub const ALL: [Self; 5] = [
        Self::Login,
        Self::Dashboard,
        Self::Complaints,
        Self::Analytics,
        Self::Advisories,
    ];

    /// Route path of the view
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
            Self::Complaints => "/complaints",
            Self::Analytics => "/analytics",
            Self::Advisories => "/advisories",
        }
    }

    /// View mounted at `path`, if any
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim();
        let normalized = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        Self::ALL.into_iter().find(|view| view.path() == normalized)
    }

    /// Whether the view sits behind the session guard
    #[must_use]
    pub const fn is_protected(self) -> bool {
        !matches!(self, Self::Login)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Session-history router
///
/// Reports the current view, performs push and replace navigation, and lets
/// observers subscribe to view changes. Clones share the same history.
#[derive(Debug, Clone)]
pub struct Navigator {
    inner: Arc<NavigatorInner>,
}

#[derive(Debug)]
struct NavigatorInner {
    history: Mutex<History>,
    current: watch::Sender<View>,
}

#[derive(Debug)]
struct History {
    entries: Vec<View>,
    index: usize,
}

impl History {
    fn current(&self) -> View {
        self.entries.get(self.index).copied().unwrap_or(View::Login)
    }
}

impl Navigator {
    /// Create a navigator positioned at `initial`
    #[must_use]
    pub fn new(initial: View) -> Self {
        let (current, _) = watch::channel(initial);
        Self {
            inner: Arc::new(NavigatorInner {
                history: Mutex::new(History {
                    entries: vec![initial],
                    index: 0,
                }),
                current,
            }),
        }
    }

    /// Current view
    #[must_use]
    pub fn current(&self) -> View {
        *self.inner.current.borrow()
    }

    /// Navigate to `view`, adding a history entry
    pub fn push(&self, view: View) {
        let mut history = self.inner.history.lock();
        let keep = history.index + 1;
        history.entries.truncate(keep);
        history.entries.push(view);
        history.index = history.entries.len() - 1;
        drop(history);

        debug!(view = %view, "Navigated");
        self.inner.current.send_replace(view);
    }

    /// Navigate to `view`, replacing the current history entry
    pub fn replace(&self, view: View) {
        let mut history = self.inner.history.lock();
        let index = history.index;
        if let Some(entry) = history.entries.get_mut(index) {
            *entry = view;
        }
        drop(history);

        debug!(view = %view, "Navigated (replace)");
        self.inner.current.send_replace(view);
    }

    /// Go back one history entry, returning the view landed on
    pub fn back(&self) -> Option<View> {
        let mut history = self.inner.history.lock();
        if history.index == 0 {
            return None;
        }
        history.index -= 1;
        let view = history.current();
        drop(history);

        self.inner.current.send_replace(view);
        Some(view)
    }

    /// Snapshot of the history entries, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<View> {
        self.inner.history.lock().entries.clone()
    }

    /// Subscribe to view changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.inner.current.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(View::Login)
    }
}
