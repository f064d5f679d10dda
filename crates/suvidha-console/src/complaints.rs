//! Grievance management view model

use crate::api_client::ApiClient;
use crate::error::{ApiError, Result};
use suvidha_core::{Complaint, ComplaintPriority, ComplaintStatus};
use tracing::{info, warn};

/// Shown when a status update is rejected
pub const UPDATE_FAILED: &str = "Failed to update complaint status";

/// Server-side filter for the complaint listing; `None` means all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplaintFilter {
    /// Only complaints with this status
    pub status: Option<ComplaintStatus>,
    /// Only complaints with this priority
    pub priority: Option<ComplaintPriority>,
}

impl ComplaintFilter {
    /// Filter matching every complaint
    #[must_use]
    pub const fn all() -> Self {
        Self {
            status: None,
            priority: None,
        }
    }

    /// Restrict to `status`
    #[must_use]
    pub const fn with_status(mut self, status: ComplaintStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to `priority`
    #[must_use]
    pub const fn with_priority(mut self, priority: ComplaintPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Whether `complaint` passes this filter
    #[must_use]
    pub fn matches(&self, complaint: &Complaint) -> bool {
        self.status.is_none_or(|status| complaint.status == status)
            && self
                .priority
                .is_none_or(|priority| complaint.priority == priority)
    }
}

/// Complaint table state
#[derive(Debug)]
pub struct ComplaintsView {
    client: ApiClient,
    filter: ComplaintFilter,
    complaints: Vec<Complaint>,
}

impl ComplaintsView {
    /// Create an empty view; call [`ComplaintsView::refresh`] to load rows
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            filter: ComplaintFilter::all(),
            complaints: Vec::new(),
        }
    }

    /// Active filter
    #[must_use]
    pub const fn filter(&self) -> ComplaintFilter {
        self.filter
    }

    /// Loaded rows
    #[must_use]
    pub fn complaints(&self) -> &[Complaint] {
        &self.complaints
    }

    /// Change the filter and reload
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn apply_filter(&mut self, filter: ComplaintFilter) -> Result<&[Complaint]> {
        self.filter = filter;
        self.refresh().await
    }

    /// Reload rows for the active filter
    ///
    /// Rows from the previous load are kept when the fetch fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn refresh(&mut self) -> Result<&[Complaint]> {
        match self.client.list_complaints(&self.filter).await {
            Ok(complaints) => {
                info!(count = complaints.len(), filter = ?self.filter, "Complaints loaded");
                self.complaints = complaints;
                Ok(&self.complaints)
            }
            Err(e) => {
                warn!("Failed to fetch admin complaints view: {}", e);
                Err(e)
            }
        }
    }

    /// Move complaint `id` to `status`
    ///
    /// The local row changes only after the backend accepted the update.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Input`] when the complaint is not loaded, already has
    /// `status`, or `status` is not a known status; returns an
    /// [`ApiError::Operation`] when the backend rejects the update.
    pub async fn update_status(&mut self, id: i64, status: ComplaintStatus) -> Result<&Complaint> {
        if status == ComplaintStatus::Unknown {
            return Err(ApiError::input("status", "unknown complaint status"));
        }
        let current = self
            .complaints
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::input("complaint", format!("complaint {id} is not loaded")))?;
        if current.status == status {
            return Err(ApiError::input(
                "status",
                format!("{} is already {status}", current.reference_number),
            ));
        }

        self.client
            .update_complaint_status(id, status)
            .await
            .map_err(|e| {
                warn!(id, "Complaint status update rejected: {}", e);
                ApiError::operation(UPDATE_FAILED)
            })?;

        let row = self
            .complaints
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::input("complaint", format!("complaint {id} is not loaded")))?;
        row.status = status;
        info!(id, reference = %row.reference_number, %status, "Complaint status updated");
        Ok(row)
    }
}
