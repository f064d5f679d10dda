//! Error types for the admin console

use suvidha_session::View;
use thiserror::Error;

/// Result type alias for console operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by the request client and the console views
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status
    #[error("Backend request failed with status {status}{}", detail(.message.as_deref()))]
    Backend {
        /// HTTP status code
        status: u16,
        /// `error` field of the response body, when present
        message: Option<String>,
    },

    /// The request never produced a response, or the body was unreadable
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// OTP verified for an identity that is not an administrator
    #[error("Access Denied. Identity verified but lacks Administrative privileges.")]
    AccessDenied,

    /// The session guard refused a protected view
    #[error("Administrative session required to open {view}")]
    Unauthorized {
        /// View that was refused
        view: View,
    },

    /// A console operation failed; the message is shown to the admin as is
    #[error("{message}")]
    Operation {
        /// User-facing message
        message: String,
    },

    /// Input rejected before any request was sent
    #[error("Invalid {field}: {message}")]
    Input {
        /// Offending input
        field: String,
        /// Reason for rejection
        message: String,
    },

    /// CSV export requested with no usage rows loaded
    #[error("No temporal data available to export.")]
    NoExportData,

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the core or session crates
    #[error(transparent)]
    Core(#[from] suvidha_core::Error),
}

fn detail(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

impl ApiError {
    /// Create a new operation error
    #[must_use]
    pub fn operation<S: Into<String>>(message: S) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Create a new input error
    #[must_use]
    pub fn input<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Input {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Message sent by the backend, if this error carries one
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Backend {
                message: Some(message),
                ..
            } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Convert into an [`ApiError::Operation`] carrying the backend's message,
    /// or `fallback` when the backend sent none
    #[must_use]
    pub fn or_message(self, fallback: &str) -> Self {
        let message = self.backend_message().unwrap_or(fallback).to_string();
        Self::Operation { message }
    }

    /// HTTP status, for backend errors
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}
