//! SUVIDHA admin console
//!
//! The presentation layer of the civic-services admin portal: an authenticated
//! REST client, the login flow, the dashboard poller, the complaints and
//! analytics views, and the interactive shell driving them.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod analytics;
pub mod api_client;
pub mod complaints;
pub mod dashboard;
pub mod error;
pub mod login;
pub mod render;
pub mod shell;
pub mod state;

pub use api_client::ApiClient;
pub use error::{ApiError, Result};
pub use state::AppState;
