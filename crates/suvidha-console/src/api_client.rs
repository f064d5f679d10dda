//! HTTP client for the SUVIDHA gateway
//!
//! Every request reads the bearer token from durable storage at send time, so
//! a login or logout (from this process or another) is honoured by the very
//! next request without any shared in-memory state.

use crate::complaints::ComplaintFilter;
use crate::error::{ApiError, Result};
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use suvidha_core::{
    Complaint, ComplaintStatus, DashboardMetrics, PeakHour, ServiceBreakdown, UsageRow, User,
    config::ApiConfig,
};
use suvidha_session::{KeyValueStore, SessionContext, read_envelope};
use tracing::{debug, instrument, trace, warn};

/// API client for making HTTP requests to the SUVIDHA backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
}

#[derive(Serialize)]
struct SendOtpRequest<'a> {
    phone: &'a str,
}

#[derive(Serialize)]
struct VerifyOtpRequest<'a> {
    phone: &'a str,
    otp: &'a str,
}

/// Body of a successful OTP verification
///
/// The token may be absent for identities the gateway does not issue an admin
/// credential to.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpResponse {
    /// Bearer credential
    #[serde(default)]
    pub token: Option<String>,
    /// Verified identity
    pub user: User,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: ComplaintStatus,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<dyn KeyValueStore>,
        storage_key: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            store,
            storage_key: storage_key.into(),
        })
    }

    /// Create a client reading its token from the storage behind `session`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &ApiConfig, session: &SessionContext) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.request_timeout(),
            session.store(),
            session.storage_key(),
        )
    }

    /// Gateway base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request a one-time password for `phone`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    #[instrument(skip_all)]
    pub async fn send_otp(&self, phone: &str) -> Result<()> {
        Self::send(
            self.request(Method::POST, "/auth/send-otp")
                .json(&SendOtpRequest { phone }),
        )
        .await?;
        Ok(())
    }

    /// Exchange a phone/OTP pair for the verified identity and its token
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the backend rejects the OTP, or
    /// the response carries no `user` object.
    #[instrument(skip_all)]
    pub async fn verify_otp(&self, phone: &str, otp: &str) -> Result<VerifyOtpResponse> {
        Self::fetch(
            self.request(Method::POST, "/auth/verify-otp")
                .json(&VerifyOtpRequest { phone, otp }),
        )
        .await
    }

    /// Aggregate dashboard metrics
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn dashboard_metrics(&self) -> Result<DashboardMetrics> {
        Self::fetch(self.request(Method::GET, "/admin/analytics/dashboard"))
            .await
    }

    /// List complaints matching `filter`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_complaints(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>> {
        let mut request = self.request(Method::GET, "/admin/complaints/list");
        if let Some(status) = filter.status {
            request = request.query(&[("status", status.as_str())]);
        }
        if let Some(priority) = filter.priority {
            request = request.query(&[("priority", priority.as_str())]);
        }
        Self::fetch(request).await
    }

    /// Set the status of complaint `id`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn update_complaint_status(&self, id: i64, status: ComplaintStatus) -> Result<()> {
        Self::send(
            self.request(Method::PATCH, &format!("/admin/complaints/{id}"))
                .json(&StatusUpdate { status }),
        )
        .await?;
        Ok(())
    }

    /// Daily usage between `from` and `to`, inclusive
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn usage(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<UsageRow>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        Self::fetch(
            self.request(Method::GET, "/admin/analytics/usage")
                .query(&[("fromDate", from), ("toDate", to)]),
        )
        .await
    }

    /// Engagement counters per service
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn service_breakdown(&self) -> Result<ServiceBreakdown> {
        Self::fetch(self.request(Method::GET, "/admin/analytics/service-breakdown"))
            .await
    }

    /// Transaction volume per hour of day
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn peak_hours(&self) -> Result<Vec<PeakHour>> {
        Self::fetch(self.request(Method::GET, "/admin/analytics/peak-hours"))
            .await
    }

    fn bearer_token(&self) -> Option<String> {
        read_envelope(self.store.as_ref(), &self.storage_key)
            .and_then(|envelope| envelope.token().map(str::to_string))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let request = self
            .client
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json");

        match self.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => {
                trace!(path, "Sending unauthenticated request");
                request
            }
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "Backend responded");

        if status.is_success() {
            Ok(response)
        } else {
            Err(Self::backend_error(response).await)
        }
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        Ok(Self::send(request).await?.json().await?)
    }

    async fn backend_error(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(e) => {
                trace!("Error response carried no JSON body: {}", e);
                None
            }
        };

        if status == 401 || status == 403 {
            warn!(status, "Backend refused the admin credential");
        }
        ApiError::Backend { status, message }
    }
}
