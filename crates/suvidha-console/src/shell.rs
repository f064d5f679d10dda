//! Interactive console session
//!
//! Every input line counts as a key press for the inactivity monitor. Views
//! are entered through the session guard, and the dashboard poller lives
//! exactly as long as the dashboard is the current view.

use crate::analytics::{AnalyticsReport, load_report};
use crate::complaints::{ComplaintFilter, ComplaintsView};
use crate::dashboard::PollerHandle;
use crate::error::{ApiError, Result};
use crate::login::{DEFAULT_PHONE, LoginFlow};
use crate::render;
use crate::state::AppState;
use std::str::FromStr;
use std::time::Duration;
use suvidha_core::{AnalyticsRange, ComplaintPriority, ComplaintStatus};
use suvidha_session::{Activity, GuardDecision, MonitorHandle, View};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  login [PHONE]              request an OTP (default phone 9876543210)
  otp CODE                   verify the OTP and open the dashboard
  dashboard                  show live metrics
  complaints [STATUS] [PRIORITY]
                             list grievances, optionally filtered
  update ID STATUS           set a grievance status
  analytics [week|month|year]
  export [week|month|year]   write the usage series as CSV
  open PATH                  navigate to a view, e.g. /advisories
  back                       go back one view
  status                     show the session
  logout                     end the session
  quit                       leave the console";

const ADVISORIES_PLACEHOLDER: &str = "Public advisories are not yet published by the gateway.";

/// How long `dashboard` waits for the first metrics fetch
const FIRST_FETCH_WAIT: Duration = Duration::from_secs(10);

/// A parsed shell input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Blank line
    Empty,
    /// Show the command list
    Help,
    /// Show the session
    Status,
    /// Navigate to a path
    Open(String),
    /// Go back one view
    Back,
    /// Request an OTP
    Login(Option<String>),
    /// Verify an OTP
    Otp(String),
    /// Show the dashboard
    Dashboard,
    /// List complaints
    Complaints(ComplaintFilter),
    /// Update a complaint status
    Update {
        /// Complaint id
        id: i64,
        /// New status
        status: ComplaintStatus,
    },
    /// Show analytics for a range
    Analytics(AnalyticsRange),
    /// Export analytics for a range
    Export(AnalyticsRange),
    /// End the session
    Logout,
    /// Leave the shell
    Quit,
}

impl FromStr for ShellCommand {
    type Err = ApiError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Self::Empty);
        };
        let args: Vec<&str> = words.collect();

        let parsed = match (command.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("help" | "?", []) => Self::Help,
            ("status", []) => Self::Status,
            ("open", [path]) => Self::Open((*path).to_string()),
            ("back", []) => Self::Back,
            ("login", []) => Self::Login(None),
            ("login", [phone]) => Self::Login(Some((*phone).to_string())),
            ("otp", [code]) => Self::Otp((*code).to_string()),
            ("dashboard", []) => Self::Dashboard,
            ("complaints", filters) => Self::Complaints(parse_filter(filters)?),
            ("update", [id, status]) => Self::Update {
                id: id
                    .parse()
                    .map_err(|_| ApiError::input("id", format!("'{id}' is not a complaint id")))?,
                status: status.parse()?,
            },
            ("analytics", []) => Self::Analytics(AnalyticsRange::default()),
            ("analytics", [range]) => Self::Analytics(range.parse()?),
            ("export", []) => Self::Export(AnalyticsRange::default()),
            ("export", [range]) => Self::Export(range.parse()?),
            ("logout", []) => Self::Logout,
            ("quit" | "exit", []) => Self::Quit,
            _ => {
                return Err(ApiError::input(
                    "command",
                    format!("'{}' not understood, try 'help'", line.trim()),
                ));
            }
        };
        Ok(parsed)
    }
}

fn parse_filter(words: &[&str]) -> Result<ComplaintFilter> {
    let mut filter = ComplaintFilter::all();
    for word in words {
        if let Ok(status) = word.parse::<ComplaintStatus>() {
            filter.status = Some(status);
        } else if let Ok(priority) = word.parse::<ComplaintPriority>() {
            filter.priority = Some(priority);
        } else {
            return Err(ApiError::input(
                "filter",
                format!("'{word}' is neither a status nor a priority"),
            ));
        }
    }
    Ok(filter)
}

/// Interactive session writing to `out`
#[derive(Debug)]
pub struct Shell<W> {
    state: AppState,
    out: W,
    login: Option<LoginFlow>,
    complaints: ComplaintsView,
    report: Option<AnalyticsReport>,
    poller: Option<PollerHandle>,
}

impl<W: AsyncWrite + Unpin + Send> Shell<W> {
    /// Create a shell over `state`
    #[must_use]
    pub fn new(state: AppState, out: W) -> Self {
        let complaints = ComplaintsView::new(state.client.clone());
        Self {
            state,
            out,
            login: None,
            complaints,
            report: None,
            poller: None,
        }
    }

    /// Read commands from `input` until it ends or `quit` is entered
    ///
    /// Returns the output sink.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails. Command
    /// failures are reported inline and do not end the session.
    pub async fn run<R>(mut self, input: R) -> Result<W>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let monitor = self.state.spawn_monitor();
        let mut session_rx = self.state.session.subscribe();
        let mut seen_timeouts = 0;
        let mut lines = input.lines();

        let summary = render::session(self.state.session.current().as_ref());
        self.say(&summary).await?;
        self.say("Type 'help' for commands.").await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    monitor.record(Activity::KeyPress);

                    match line.parse::<ShellCommand>() {
                        Ok(ShellCommand::Quit) => break,
                        Ok(command) => {
                            if let Err(e) = self.execute(command).await {
                                self.say(&format!("error: {e}")).await?;
                            }
                        }
                        Err(e) => self.say(&format!("error: {e}")).await?,
                    }
                    self.sync_poller();
                }

                Ok(()) = session_rx.changed() => {
                    drop(session_rx.borrow_and_update());
                    let timeouts = monitor.timeouts();
                    if timeouts > seen_timeouts {
                        seen_timeouts = timeouts;
                        self.login = None;
                        self.sync_poller();
                        self.say("Session expired after inactivity. Please log in again.").await?;
                    }
                }
            }
        }

        Self::stop(monitor, self.poller.take()).await;
        self.out.flush().await?;
        info!("Shell closed");
        Ok(self.out)
    }

    /// Write `text` followed by a newline
    async fn say(&mut self, text: &str) -> Result<()> {
        self.write(text).await?;
        self.write("\n").await
    }

    /// Write `text` as is
    async fn write(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn stop(monitor: MonitorHandle, poller: Option<PollerHandle>) {
        if let Some(poller) = poller {
            poller.shutdown().await;
        }
        monitor.shutdown().await;
    }

    async fn execute(&mut self, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::Empty | ShellCommand::Quit => {}
            ShellCommand::Help => self.say(HELP).await?,
            ShellCommand::Status => {
                let summary = render::session(self.state.session.current().as_ref());
                let at = self.state.navigator.current();
                self.say(&format!("{summary} (at {at})")).await?;
            }
            ShellCommand::Open(path) => self.open_path(&path).await?,
            ShellCommand::Back => {
                if self.state.navigator.back().is_some() {
                    self.state.guard.revalidate();
                }
                let at = self.state.navigator.current();
                self.say(&format!("At {at}")).await?;
            }
            ShellCommand::Login(phone) => {
                let phone = phone.unwrap_or_else(|| DEFAULT_PHONE.to_string());
                let mut flow = self.state.login_flow();
                flow.request_otp(&phone).await?;
                self.login = Some(flow);
                self.say(&format!("OTP sent to {phone}. Enter 'otp CODE'.")).await?;
            }
            ShellCommand::Otp(code) => {
                let flow = self
                    .login
                    .as_mut()
                    .ok_or_else(|| ApiError::input("otp", "request an OTP with 'login' first"))?;
                let session = flow.verify(&code).await?;
                self.login = None;
                self.say(&format!("Welcome, {}.", session.user.display_label())).await?;
            }
            ShellCommand::Dashboard => self.show_dashboard().await?,
            ShellCommand::Complaints(filter) => {
                self.enter(View::Complaints)?;
                let text = render::complaints(self.complaints.apply_filter(filter).await?);
                self.write(&text).await?;
            }
            ShellCommand::Update { id, status } => {
                self.enter(View::Complaints)?;
                let row = self.complaints.update_status(id, status).await?;
                let text = format!("{} is now {}", row.reference_number, row.status);
                self.say(&text).await?;
            }
            ShellCommand::Analytics(range) => {
                let text = render::analytics(self.load_analytics(range).await?);
                self.write(&text).await?;
            }
            ShellCommand::Export(range) => {
                let directory = self.state.export_directory();
                let path = self.load_analytics(range).await?.export_to(&directory)?;
                self.say(&format!("Exported to {}", path.display())).await?;
            }
            ShellCommand::Logout => {
                self.state.logout()?;
                self.say("Logged out.").await?;
            }
        }
        Ok(())
    }

    async fn open_path(&mut self, path: &str) -> Result<()> {
        match self.state.guard.navigate_path(path) {
            GuardDecision::Render => {
                let view = self.state.navigator.current();
                self.say(&format!("At {view}")).await?;
                if view == View::Advisories {
                    self.say(ADVISORIES_PLACEHOLDER).await?;
                }
            }
            GuardDecision::Redirect(target) => {
                self.say(&format!("Access denied, redirected to {target}")).await?;
            }
        }
        Ok(())
    }

    /// Make `view` current, re-checking the guard when already there
    fn enter(&self, view: View) -> Result<()> {
        if self.state.navigator.current() != view {
            return self.state.open(view);
        }
        match self.state.guard.revalidate() {
            GuardDecision::Render => Ok(()),
            GuardDecision::Redirect(_) => Err(ApiError::Unauthorized { view }),
        }
    }

    async fn show_dashboard(&mut self) -> Result<()> {
        self.enter(View::Dashboard)?;
        self.sync_poller();

        let Some(poller) = self.poller.as_ref() else {
            return Ok(());
        };
        let mut rx = poller.subscribe();
        let loaded = tokio::time::timeout(FIRST_FETCH_WAIT, rx.wait_for(|s| !s.is_loading()))
            .await
            .is_ok();
        if !loaded {
            debug!("Dashboard still loading");
        }
        let text = render::dashboard(&poller.snapshot());
        self.write(&text).await?;
        Ok(())
    }

    async fn load_analytics(&mut self, range: AnalyticsRange) -> Result<&AnalyticsReport> {
        self.enter(View::Analytics)?;
        let today = chrono::Utc::now().date_naive();
        let report = load_report(&self.state.client, range, today).await?;
        Ok(self.report.insert(report))
    }

    /// Run the poller only while the dashboard is the current view
    fn sync_poller(&mut self) {
        let on_dashboard = self.state.navigator.current() == View::Dashboard
            && self.state.guard.check(View::Dashboard).allows();

        match (on_dashboard, self.poller.is_some()) {
            (true, false) => self.poller = Some(self.state.metrics_poller().spawn()),
            (false, true) => {
                debug!("Leaving dashboard, stopping poller");
                self.poller = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use suvidha_core::Config;
    use suvidha_session::MemoryStore;

    #[rstest]
    #[case("", ShellCommand::Empty)]
    #[case("  help ", ShellCommand::Help)]
    #[case("login", ShellCommand::Login(None))]
    #[case("login 9000000001", ShellCommand::Login(Some("9000000001".to_string())))]
    #[case("otp 123456", ShellCommand::Otp("123456".to_string()))]
    #[case("open /advisories", ShellCommand::Open("/advisories".to_string()))]
    #[case("analytics", ShellCommand::Analytics(AnalyticsRange::Month))]
    #[case("export year", ShellCommand::Export(AnalyticsRange::Year))]
    #[case(
        "update 42 in_progress",
        ShellCommand::Update { id: 42, status: ComplaintStatus::InProgress }
    )]
    #[case(
        "complaints high registered",
        ShellCommand::Complaints(
            ComplaintFilter::all()
                .with_status(ComplaintStatus::Registered)
                .with_priority(ComplaintPriority::High)
        )
    )]
    #[case("EXIT", ShellCommand::Quit)]
    fn test_parse_command(#[case] line: &str, #[case] expected: ShellCommand) {
        assert_eq!(line.parse::<ShellCommand>().unwrap(), expected);
    }

    #[rstest]
    #[case("update abc resolved")]
    #[case("update 1 closed")]
    #[case("complaints urgent")]
    #[case("analytics decade")]
    #[case("launch")]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(line.parse::<ShellCommand>().is_err());
    }

    #[tokio::test]
    async fn test_output_streams_through_async_writer() {
        let state = AppState::with_store(Config::default(), Arc::new(MemoryStore::new())).unwrap();
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);

        let writer = Shell::new(state, writer)
            .run("help\nstatus\nquit\n".as_bytes())
            .await
            .unwrap();
        drop(writer);

        let mut out = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut out)
            .await
            .unwrap();
        assert!(out.starts_with("Not logged in\nType 'help' for commands.\n"));
        assert!(out.contains("export [week|month|year]"));
        assert!(out.ends_with("Not logged in (at /login)\n"));
    }

    #[tokio::test]
    async fn test_logged_out_shell_is_redirected_to_login() {
        let state = AppState::with_store(Config::default(), Arc::new(MemoryStore::new())).unwrap();
        let navigator = state.navigator.clone();
        let input = "open /dashboard\ncomplaints\nstatus\nquit\n";

        let out = Shell::new(state, Vec::new())
            .run(input.as_bytes())
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Not logged in"));
        assert!(out.contains("Access denied, redirected to /login"));
        assert!(out.contains("Administrative session required to open /complaints"));
        assert_eq!(navigator.current(), View::Login);
        assert!(!navigator.history().contains(&View::Dashboard));
    }
}
