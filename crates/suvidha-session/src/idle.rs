//! Idle-timeout state machine
//!
//! Pure bookkeeping: callers feed it the current instant together with
//! activity, session and navigation changes. The machine owns a single
//! deadline slot, so re-arming always replaces the previous deadline and at
//! most one timeout can ever be pending.

use crate::navigation::View;
use std::time::Duration;
use tokio::time::Instant;

/// Default idle threshold: five minutes
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// A timeout is pending at `deadline`
    Armed {
        /// When the session expires without further activity
        deadline: Instant,
    },
    /// No timeout pending
    Disarmed,
}

impl MonitorState {
    /// Pending deadline, if armed
    #[must_use]
    pub const fn deadline(self) -> Option<Instant> {
        match self {
            Self::Armed { deadline } => Some(deadline),
            Self::Disarmed => None,
        }
    }

    /// Whether a timeout is pending
    #[must_use]
    pub const fn is_armed(self) -> bool {
        matches!(self, Self::Armed { .. })
    }
}

/// User interaction that resets the idle clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Pointer movement
    PointerMove,
    /// Key press
    KeyPress,
    /// Click
    Click,
    /// Scroll
    Scroll,
    /// Touch start
    TouchStart,
}

/// Single-slot idle timer
#[derive(Debug, Clone)]
pub struct IdleTimer {
    threshold: Duration,
    state: MonitorState,
}

impl IdleTimer {
    /// Create a disarmed timer with the given idle threshold
    #[must_use]
    pub const fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: MonitorState::Disarmed,
        }
    }

    /// Idle threshold
    #[must_use]
    pub const fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> MonitorState {
        self.state
    }

    /// Re-evaluate after a session or navigation change
    ///
    /// Arms with a fresh deadline when a token is held outside the login view,
    /// disarms otherwise.
    pub fn sync(&mut self, has_token: bool, view: View, now: Instant) -> MonitorState {
        self.state = if has_token && view != View::Login {
            MonitorState::Armed {
                deadline: now + self.threshold,
            }
        } else {
            MonitorState::Disarmed
        };
        self.state
    }

    /// Record user activity; only an armed timer is reset
    pub fn on_activity(&mut self, _activity: Activity, now: Instant) -> MonitorState {
        if self.state.is_armed() {
            self.state = MonitorState::Armed {
                deadline: now + self.threshold,
            };
        }
        self.state
    }

    /// Cancel any pending deadline
    pub const fn disarm(&mut self) {
        self.state = MonitorState::Disarmed;
    }

    /// Check the deadline; returns `true` exactly once per expiry
    ///
    /// An expired timer transitions to [`MonitorState::Disarmed`].
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        match self.state {
            MonitorState::Armed { deadline } if now >= deadline => {
                self.state = MonitorState::Disarmed;
                true
            }
            _ => false,
        }
    }
}

impl Default for IdleTimer {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const SECOND: Duration = Duration::from_secs(1);

    fn armed_timer(start: Instant) -> IdleTimer {
        let mut timer = IdleTimer::default();
        timer.sync(true, View::Dashboard, start);
        timer
    }

    #[rstest]
    #[case(true, View::Dashboard, true)]
    #[case(true, View::Analytics, true)]
    #[case(true, View::Login, false)]
    #[case(false, View::Dashboard, false)]
    #[case(false, View::Login, false)]
    fn test_sync_arms_only_with_token_outside_login(
        #[case] has_token: bool,
        #[case] view: View,
        #[case] armed: bool,
    ) {
        let mut timer = IdleTimer::default();
        assert_eq!(timer.sync(has_token, view, Instant::now()).is_armed(), armed);
    }

    #[test]
    fn test_armed_deadline_is_now_plus_threshold() {
        let start = Instant::now();
        let timer = armed_timer(start);
        assert_eq!(timer.state().deadline(), Some(start + DEFAULT_IDLE_THRESHOLD));
    }

    #[test]
    fn test_activity_resets_rather_than_accumulates() {
        let start = Instant::now();
        let mut timer = armed_timer(start);

        timer.on_activity(Activity::KeyPress, start + 299 * SECOND);
        timer.on_activity(Activity::Scroll, start + 300 * SECOND);

        assert_eq!(
            timer.state().deadline(),
            Some(start + 300 * SECOND + DEFAULT_IDLE_THRESHOLD)
        );
    }

    #[test]
    fn test_activity_while_disarmed_does_not_arm() {
        let mut timer = IdleTimer::default();
        let state = timer.on_activity(Activity::Click, Instant::now());
        assert_eq!(state, MonitorState::Disarmed);
    }

    #[test]
    fn test_expiry_fires_once() {
        let start = Instant::now();
        let mut timer = armed_timer(start);

        assert!(!timer.poll_expired(start + 299 * SECOND));
        assert!(timer.poll_expired(start + 301 * SECOND));
        assert!(!timer.poll_expired(start + 900 * SECOND));
        assert_eq!(timer.state(), MonitorState::Disarmed);
    }

    #[test]
    fn test_activity_spaced_under_threshold_never_expires() {
        let start = Instant::now();
        let mut timer = armed_timer(start);

        for minute in 1..=60_u32 {
            let now = start + minute * 4 * 60 * SECOND;
            assert!(!timer.poll_expired(now), "expired at minute {}", minute * 4);
            timer.on_activity(Activity::PointerMove, now);
        }
    }

    #[test]
    fn test_disarm_cancels_pending_deadline() {
        let start = Instant::now();
        let mut timer = armed_timer(start);

        timer.sync(true, View::Login, start + 60 * SECOND);

        assert!(!timer.poll_expired(start + 3600 * SECOND));
    }

    #[test]
    fn test_navigation_between_protected_views_rearms() {
        let start = Instant::now();
        let mut timer = armed_timer(start);

        timer.sync(true, View::Complaints, start + 100 * SECOND);

        assert_eq!(
            timer.state().deadline(),
            Some(start + 100 * SECOND + DEFAULT_IDLE_THRESHOLD)
        );
    }
}
