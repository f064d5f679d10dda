//! Two-step phone + OTP login
//!
//! Authentication itself is the backend's business; this flow only collects
//! the inputs, relays them, and refuses to keep a session whose role is not
//! `ADMIN`.

use crate::api_client::ApiClient;
use crate::error::{ApiError, Result};
use suvidha_core::Session;
use suvidha_session::{Navigator, SessionContext, View};
use tracing::{info, warn};

/// Phone number pre-filled on the login form
pub const DEFAULT_PHONE: &str = "9876543210";

/// Shortest phone number accepted before an OTP is requested
pub const MIN_PHONE_LEN: usize = 10;

/// Length of a one-time password
pub const OTP_LEN: usize = 6;

/// Shown when requesting an OTP fails without a backend message
pub const SEND_OTP_FAILED: &str = "Failed to initialize administrative auth sequence";

/// Shown when OTP verification fails without a backend message
pub const VERIFY_FAILED: &str = "Verification explicitly denied.";

/// Where the login flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Waiting for a phone number
    Phone,
    /// OTP requested, waiting for the code
    Otp,
}

/// Login view state
#[derive(Debug)]
pub struct LoginFlow {
    client: ApiClient,
    session: SessionContext,
    navigator: Navigator,
    phone: String,
    step: LoginStep,
}

impl LoginFlow {
    /// Start a login at the phone step
    #[must_use]
    pub fn new(client: ApiClient, session: SessionContext, navigator: Navigator) -> Self {
        Self {
            client,
            session,
            navigator,
            phone: DEFAULT_PHONE.to_string(),
            step: LoginStep::Phone,
        }
    }

    /// Phone number the OTP was (or will be) sent to
    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Current step
    #[must_use]
    pub const fn step(&self) -> LoginStep {
        self.step
    }

    /// Ask the backend to send an OTP to `phone`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Input`] for a phone shorter than ten characters, or
    /// an [`ApiError::Operation`] carrying the backend's message (or a generic
    /// one) when the request fails. The flow stays at the phone step on error.
    pub async fn request_otp(&mut self, phone: &str) -> Result<()> {
        let phone = phone.trim();
        if phone.chars().count() < MIN_PHONE_LEN {
            return Err(ApiError::input(
                "phone",
                format!("expected at least {MIN_PHONE_LEN} digits"),
            ));
        }

        self.client.send_otp(phone).await.map_err(|e| {
            warn!("OTP request failed: {}", e);
            e.or_message(SEND_OTP_FAILED)
        })?;

        phone.clone_into(&mut self.phone);
        self.step = LoginStep::Otp;
        info!("OTP requested");
        Ok(())
    }

    /// Verify `otp` and, for administrators, establish the session
    ///
    /// On success the session is stored and navigation moves to the dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Input`] before an OTP was requested or for a code
    /// that is not six characters, [`ApiError::AccessDenied`] when the verified
    /// identity is not an administrator (nothing is stored, whether or not a
    /// token came back), or an [`ApiError::Operation`] when verification fails
    /// or an administrator response carries no token.
    pub async fn verify(&mut self, otp: &str) -> Result<Session> {
        if self.step != LoginStep::Otp {
            return Err(ApiError::input("otp", "request an OTP first"));
        }
        let otp = otp.trim();
        if otp.chars().count() != OTP_LEN {
            return Err(ApiError::input(
                "otp",
                format!("expected {OTP_LEN} characters"),
            ));
        }

        let verified = self
            .client
            .verify_otp(&self.phone, otp)
            .await
            .map_err(|e| {
                warn!("OTP verification failed: {}", e);
                e.or_message(VERIFY_FAILED)
            })?;

        if !verified.user.role.is_admin() {
            warn!(role = %verified.user.role, "Verified identity lacks the administrative role");
            return Err(ApiError::AccessDenied);
        }

        let Some(token) = verified.token.filter(|token| !token.is_empty()) else {
            warn!("OTP verification returned no admin credential");
            return Err(ApiError::operation(VERIFY_FAILED));
        };

        let session = Session::new(token, verified.user);
        self.session.login(session.clone())?;
        self.navigator.push(View::Dashboard);
        Ok(session)
    }

    /// Return to the phone step, e.g. to correct the number
    pub fn restart(&mut self) {
        self.step = LoginStep::Phone;
    }
}
