//! SUVIDHA admin console
//!
//! Terminal front-end for civic-services administrators: OTP login, live
//! metrics, grievance management and usage reporting.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use suvidha_console::{
    ApiError, AppState, Result, analytics,
    complaints::{ComplaintFilter, ComplaintsView},
    dashboard::{DashboardSnapshot, FETCH_FAILED},
    login::DEFAULT_PHONE,
    render,
    shell::Shell,
    state::expand_home,
};
use suvidha_core::{AnalyticsRange, ComplaintPriority, ComplaintStatus, Config};
use suvidha_session::{Activity, View};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Command line interface for the SUVIDHA admin console
#[derive(Parser)]
#[command(
    name = "suvidha-admin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Admin console for the SUVIDHA civic-services portal",
    long_about = "Administrative console for the SUVIDHA civic-services portal. Logs administrators in with phone + OTP, shows live service metrics, manages citizen grievances and exports usage reports. Without a subcommand an interactive shell is started."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gateway base URL (overrides the configuration file)
    #[arg(long, value_name = "URL", env = "SUVIDHA_API_URL")]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long)]
    log_format: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    json: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Log in with phone number and OTP
    Login {
        /// Registered administrator phone number
        #[arg(short, long, default_value = DEFAULT_PHONE)]
        phone: String,

        /// One-time password (prompted for when omitted)
        #[arg(long)]
        otp: Option<String>,
    },

    /// End the stored session
    Logout,

    /// Show the stored session
    Status,

    /// Show service metrics
    Dashboard {
        /// Keep polling until interrupted or the session times out
        #[arg(short, long)]
        watch: bool,
    },

    /// Manage citizen grievances
    Complaints {
        /// Grievance subcommand
        #[command(subcommand)]
        action: ComplaintCommands,
    },

    /// Show usage analytics
    Analytics {
        /// Reporting window (week, month, year)
        #[arg(short, long, default_value = "month")]
        range: AnalyticsRange,

        /// Export the usage series as CSV, into DIR or the configured directory
        #[arg(long, value_name = "DIR", num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },

    /// Start an interactive session
    Shell,

    /// Show or validate configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Grievance subcommands
#[derive(Subcommand)]
enum ComplaintCommands {
    /// List grievances
    List {
        /// Only grievances with this status
        #[arg(long)]
        status: Option<ComplaintStatus>,

        /// Only grievances with this priority
        #[arg(long)]
        priority: Option<ComplaintPriority>,
    },

    /// Set the status of a grievance
    Update {
        /// Grievance id
        #[arg(value_name = "ID")]
        id: i64,

        /// New status (registered, in_progress, resolved)
        #[arg(value_name = "STATUS")]
        status: ComplaintStatus,
    },
}

/// Main entry point for the admin console
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if it exists (for development convenience)
    if let Err(e) = dotenvy::dotenv() {
        // It's okay if .env doesn't exist
        eprintln!("Note: .env file not loaded: {e}");
    }

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = suvidha_core::init_logging(&config.logging) {
        eprintln!("Warning: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        "SUVIDHA admin console starting"
    );

    match run(cli.command.unwrap_or(Commands::Shell), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load configuration and apply command line overrides
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or fails validation
fn load_config(cli: &Cli) -> suvidha_core::Result<Config> {
    let mut config = Config::load_from(cli.config.as_deref())?;

    if let Some(base_url) = &cli.base_url {
        config.api.base_url.clone_from(base_url);
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if cli.json {
        config.logging.format = "json".to_string();
    } else if let Some(format) = &cli.log_format {
        config.logging.format.clone_from(format);
    }

    config.validate()?;
    Ok(config)
}

/// Dispatch a subcommand
///
/// # Errors
///
/// Returns error if the subcommand fails
async fn run(command: Commands, config: Config) -> Result<()> {
    if let Commands::Config { show } = command {
        return handle_config_command(&config, show);
    }

    let state = AppState::new(config)?;
    match command {
        Commands::Login { phone, otp } => login(&state, &phone, otp).await,
        Commands::Logout => {
            state.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Status => {
            println!("{}", render::session(state.session.current().as_ref()));
            Ok(())
        }
        Commands::Dashboard { watch } => {
            if watch {
                watch_dashboard(&state).await
            } else {
                show_dashboard(&state).await
            }
        }
        Commands::Complaints { action } => handle_complaints_command(&state, action).await,
        Commands::Analytics { range, export } => show_analytics(&state, range, export).await,
        Commands::Shell => {
            Shell::new(state, tokio::io::stdout())
                .run(BufReader::new(tokio::io::stdin()))
                .await?;
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Run the two-step login, prompting for the OTP when not given
///
/// # Errors
///
/// Returns error if either step fails or the identity is not an administrator
async fn login(state: &AppState, phone: &str, otp: Option<String>) -> Result<()> {
    let mut flow = state.login_flow();
    flow.request_otp(phone).await?;
    println!("OTP sent to {}.", flow.phone());

    let otp = match otp {
        Some(otp) => otp,
        None => prompt("Enter OTP: ").await?,
    };

    let session = flow.verify(&otp).await?;
    println!("Welcome, {}.", session.user.display_label());
    Ok(())
}

async fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim().to_string())
}

/// Fetch and print metrics once
///
/// # Errors
///
/// Returns error if the dashboard is refused or the fetch fails
async fn show_dashboard(state: &AppState) -> Result<()> {
    state.open(View::Dashboard)?;

    let metrics = state.client.dashboard_metrics().await.map_err(|e| {
        warn!("Dashboard metrics fetch failed: {}", e);
        ApiError::operation(FETCH_FAILED)
    })?;

    let snapshot = DashboardSnapshot {
        metrics: Some(metrics),
        error: None,
        fetches: 1,
    };
    print!("{}", render::dashboard(&snapshot));
    Ok(())
}

/// Poll metrics until Ctrl+C or an inactivity timeout
///
/// Each line typed on stdin counts as activity.
///
/// # Errors
///
/// Returns error if the dashboard is refused
async fn watch_dashboard(state: &AppState) -> Result<()> {
    state.open(View::Dashboard)?;

    let monitor = state.spawn_monitor();
    let poller = state.metrics_poller().spawn();
    let mut snapshots = poller.subscribe();
    let mut views = state.navigator.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("Watching metrics. Press Enter to stay active, Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping dashboard");
                break;
            }
            Ok(()) = views.changed() => {
                if *views.borrow_and_update() == View::Login {
                    println!("Session expired after inactivity. Please log in again.");
                    break;
                }
            }
            Ok(()) = snapshots.changed() => {
                let snapshot = snapshots.borrow_and_update().clone();
                print!("{}", render::dashboard(&snapshot));
            }
            Ok(Some(_)) = stdin.next_line() => monitor.record(Activity::KeyPress),
        }
    }

    poller.shutdown().await;
    monitor.shutdown().await;
    Ok(())
}

/// Handle grievance subcommands
///
/// # Errors
///
/// Returns error if the complaints view is refused or a request fails
async fn handle_complaints_command(state: &AppState, action: ComplaintCommands) -> Result<()> {
    state.open(View::Complaints)?;
    let mut view = ComplaintsView::new(state.client.clone());

    match action {
        ComplaintCommands::List { status, priority } => {
            let rows = view
                .apply_filter(ComplaintFilter { status, priority })
                .await?;
            print!("{}", render::complaints(rows));
        }
        ComplaintCommands::Update { id, status } => {
            view.refresh().await?;
            let row = view.update_status(id, status).await?;
            println!("{} is now {}", row.reference_number, row.status);
        }
    }
    Ok(())
}

/// Show analytics and optionally export them
///
/// # Errors
///
/// Returns error if the analytics view is refused, a request fails, or the
/// export cannot be written
async fn show_analytics(
    state: &AppState,
    range: AnalyticsRange,
    export: Option<Option<PathBuf>>,
) -> Result<()> {
    state.open(View::Analytics)?;

    let today = chrono::Utc::now().date_naive();
    let report = analytics::load_report(&state.client, range, today).await?;
    print!("{}", render::analytics(&report));

    if let Some(directory) = export {
        let directory = directory.map_or_else(|| state.export_directory(), |d| expand_home(&d));
        let path = report.export_to(&directory)?;
        println!("Exported to {}", path.display());
    }
    Ok(())
}

/// Handle configuration commands
///
/// # Errors
///
/// Returns error if configuration cannot be serialized
fn handle_config_command(config: &Config, show: bool) -> Result<()> {
    if show {
        let config_toml = toml::to_string_pretty(config)
            .map_err(|e| ApiError::operation(format!("Failed to serialize configuration: {e}")))?;
        println!("{config_toml}");
    } else {
        println!("Configuration is valid");
    }
    Ok(())
}
