//! Inactivity monitor
//!
//! Drives an [`IdleTimer`] from a background task: activity signals, session
//! changes and navigation changes re-evaluate the timer, and a single sleep on
//! the current deadline fires the timeout. On timeout the session is cleared,
//! navigation is replaced with the login view and the timer disarms.

use crate::{
    context::SessionContext,
    idle::{Activity, IdleTimer, MonitorState},
    navigation::{Navigator, View},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

/// Spawns inactivity monitors
#[derive(Debug, Clone)]
pub struct InactivityMonitor {
    session: SessionContext,
    navigator: Navigator,
    threshold: Duration,
}

impl InactivityMonitor {
    /// Create a monitor over the given session and navigator
    #[must_use]
    pub const fn new(session: SessionContext, navigator: Navigator, threshold: Duration) -> Self {
        Self {
            session,
            navigator,
            threshold,
        }
    }

    /// Start monitoring on the current tokio runtime
    ///
    /// The returned handle owns the task: dropping it (or calling
    /// [`MonitorHandle::shutdown`]) removes the activity listener and cancels
    /// the pending timer.
    #[must_use]
    pub fn spawn(self) -> MonitorHandle {
        let (activity_tx, activity_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(MonitorState::Disarmed);
        let cancel = CancellationToken::new();
        let timeouts = Arc::new(AtomicU64::new(0));

        let driver = Driver {
            timer: IdleTimer::new(self.threshold),
            session_rx: self.session.subscribe(),
            view_rx: self.navigator.subscribe(),
            session: self.session,
            navigator: self.navigator,
            activity_rx,
            state_tx,
            cancel: cancel.clone(),
            timeouts: Arc::clone(&timeouts),
        };

        info!(threshold_secs = self.threshold.as_secs(), "Starting inactivity monitor");
        let task = tokio::spawn(driver.run());

        MonitorHandle {
            activity_tx,
            state_rx,
            cancel,
            timeouts,
            task: Some(task),
        }
    }
}

/// Owning handle to a running inactivity monitor
#[derive(Debug)]
pub struct MonitorHandle {
    activity_tx: mpsc::UnboundedSender<Activity>,
    state_rx: watch::Receiver<MonitorState>,
    cancel: CancellationToken,
    timeouts: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Report a user activity signal
    pub fn record(&self, activity: Activity) {
        if self.activity_tx.send(activity).is_err() {
            trace!(?activity, "Activity ignored, monitor stopped");
        }
    }

    /// Latest state published by the monitor
    #[must_use]
    pub fn state(&self) -> MonitorState {
        *self.state_rx.borrow()
    }

    /// Subscribe to state transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state_rx.clone()
    }

    /// Number of timeouts fired so far
    #[must_use]
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::SeqCst)
    }

    /// Stop the monitor and wait for its task to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
            && !e.is_cancelled()
        {
            error!("Inactivity monitor task failed: {}", e);
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Driver {
    timer: IdleTimer,
    session: SessionContext,
    navigator: Navigator,
    session_rx: watch::Receiver<Option<suvidha_core::Session>>,
    view_rx: watch::Receiver<View>,
    activity_rx: mpsc::UnboundedReceiver<Activity>,
    state_tx: watch::Sender<MonitorState>,
    cancel: CancellationToken,
    timeouts: Arc<AtomicU64>,
}

impl Driver {
    #[instrument(name = "inactivity_monitor", skip(self))]
    async fn run(mut self) {
        self.sync();

        loop {
            let deadline = self.timer.state().deadline();

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                Some(activity) = self.activity_rx.recv() => {
                    let state = self.timer.on_activity(activity, Instant::now());
                    trace!(?activity, ?state, "Activity recorded");
                    self.publish(state);
                }

                Ok(()) = self.session_rx.changed() => self.sync(),

                Ok(()) = self.view_rx.changed() => self.sync(),

                () = wait_for(deadline) => {
                    if self.timer.poll_expired(Instant::now()) {
                        self.fire_timeout();
                    }
                }
            }
        }

        self.timer.disarm();
        self.publish(MonitorState::Disarmed);
        debug!("Inactivity monitor stopped");
    }

    fn sync(&mut self) {
        let has_token = self
            .session_rx
            .borrow_and_update()
            .as_ref()
            .is_some_and(suvidha_core::Session::has_token);
        let view = *self.view_rx.borrow_and_update();

        let state = self.timer.sync(has_token, view, Instant::now());
        debug!(%view, has_token, armed = state.is_armed(), "Inactivity monitor re-evaluated");
        self.publish(state);
    }

    fn fire_timeout(&mut self) {
        self.timeouts.fetch_add(1, Ordering::SeqCst);
        info!(
            idle_secs = self.timer.threshold().as_secs(),
            "Admin session expired after inactivity"
        );

        if self.session.has_token()
            && let Err(e) = self.session.logout()
        {
            error!("Failed to persist cleared session: {}", e);
        }
        self.navigator.replace(View::Login);

        // Our own logout and navigation are already reflected in the disarmed timer.
        drop(self.session_rx.borrow_and_update());
        drop(self.view_rx.borrow_and_update());
        self.timer.disarm();
        self.publish(MonitorState::Disarmed);
    }

    fn publish(&self, state: MonitorState) {
        self.state_tx.send_replace(state);
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
