//! Access control performed before a protected view renders

use crate::{
    context::SessionContext,
    navigation::{Navigator, View},
};
use suvidha_core::Session;
use tracing::{debug, warn};

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The view may render
    Render,
    /// The view must not render; navigation was replaced with the target view
    Redirect(View),
}

impl GuardDecision {
    /// Whether the view may render
    #[must_use]
    pub const fn allows(self) -> bool {
        matches!(self, Self::Render)
    }
}

/// Decide whether a protected view may render for `session`
///
/// Renders iff a non-empty token is held and the role is `ADMIN`; a token with
/// any other role is treated exactly like no token.
#[must_use]
pub fn authorize(session: Option<&Session>) -> GuardDecision {
    if session.is_some_and(Session::is_admin) {
        GuardDecision::Render
    } else {
        GuardDecision::Redirect(View::Login)
    }
}

/// Guard wired to the session context and navigator
#[derive(Debug, Clone)]
pub struct SessionGuard {
    session: SessionContext,
    navigator: Navigator,
}

impl SessionGuard {
    /// Create a guard over the given session and navigator
    #[must_use]
    pub const fn new(session: SessionContext, navigator: Navigator) -> Self {
        Self { session, navigator }
    }

    /// Check `view` against the current session without navigating
    #[must_use]
    pub fn check(&self, view: View) -> GuardDecision {
        if view.is_protected() {
            authorize(self.session.current().as_ref())
        } else {
            GuardDecision::Render
        }
    }

    /// Navigate to `view`, redirecting to login when the guard refuses it
    ///
    /// A refused view never becomes the current view: its history entry is
    /// replaced by the login view so going back cannot reveal it.
    pub fn navigate(&self, view: View) -> GuardDecision {
        let decision = self.check(view);
        match decision {
            GuardDecision::Render => self.navigator.push(view),
            GuardDecision::Redirect(target) => {
                warn!(view = %view, "Protected view refused, redirecting to login");
                self.navigator.push(target);
            }
        }
        decision
    }

    /// Navigate to the view mounted at `path`; unknown paths and `/` go to login
    pub fn navigate_path(&self, path: &str) -> GuardDecision {
        if let Some(view) = View::from_path(path) {
            self.navigate(view)
        } else {
            debug!(path, "No view mounted at path, redirecting to login");
            self.navigator.push(View::Login);
            GuardDecision::Redirect(View::Login)
        }
    }

    /// Re-check the current view, e.g. after the session changed
    pub fn revalidate(&self) -> GuardDecision {
        let decision = self.check(self.navigator.current());
        if let GuardDecision::Redirect(target) = decision {
            self.navigator.replace(target);
        }
        decision
    }

    /// Navigator driven by this guard
    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Session context checked by this guard
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }
}
