//! Read-through records fetched from the SUVIDHA backend
//!
//! None of these are owned by the console: they are fetched on demand and held
//! only for as long as the view displaying them.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    /// Newly registered
    Registered,
    /// Being worked on
    InProgress,
    /// Closed
    Resolved,
    /// Status introduced by the backend that this console does not know
    #[serde(other)]
    Unknown,
}

impl ComplaintStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "REGISTERED" => Ok(Self::Registered),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            _ => Err(crate::Error::validation(
                "status",
                format!("unknown complaint status '{s}'"),
            )),
        }
    }
}

/// Urgency of a complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintPriority {
    /// Needs immediate attention
    Emergency,
    /// High priority
    High,
    /// Normal priority
    Normal,
    /// Priority introduced by the backend that this console does not know
    #[serde(other)]
    Unknown,
}

impl ComplaintPriority {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "EMERGENCY",
            Self::High => "HIGH",
            Self::Normal => "NORMAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ComplaintPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintPriority {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMERGENCY" => Ok(Self::Emergency),
            "HIGH" => Ok(Self::High),
            "NORMAL" => Ok(Self::Normal),
            _ => Err(crate::Error::validation(
                "priority",
                format!("unknown complaint priority '{s}'"),
            )),
        }
    }
}

/// A citizen grievance as listed by the admin complaints endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    /// Backend identifier
    pub id: i64,
    /// Human-facing reference number
    pub reference_number: String,
    /// Category code, e.g. `WATER_SUPPLY`
    pub category: String,
    /// Free-text description
    pub description: String,
    /// Priority
    pub priority: ComplaintPriority,
    /// Current status
    pub status: ComplaintStatus,
    /// Creation timestamp as sent by the backend
    pub created_at: String,
}

impl Complaint {
    /// Category with its first underscore shown as a space
    #[must_use]
    pub fn category_label(&self) -> String {
        self.category.replacen('_', " ", 1)
    }
}

/// Complaint counters on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintCounters {
    /// Complaints logged this cycle
    pub total: u64,
    /// Complaints resolved
    pub resolved: u64,
    /// Complaints still open
    pub active: u64,
}

/// Bill payment counters on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillCounters {
    /// Payment attempts
    pub total_attempts: u64,
    /// Successful payments
    pub successful_payments: u64,
    /// Revenue collected, in rupees
    pub revenue_collected: f64,
}

/// Aggregate metrics shown on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Complaint counters
    pub complaints: ComplaintCounters,
    /// Bill counters
    pub bills: BillCounters,
}

impl DashboardMetrics {
    /// Percentage of complaints resolved, rounded; zero when nothing was logged
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn efficiency_rating(&self) -> u64 {
        if self.complaints.total == 0 {
            return 0;
        }
        let ratio = self.complaints.resolved as f64 / self.complaints.total as f64;
        (ratio * 100.0).round() as u64
    }
}

/// One day of portal usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRow {
    /// Day, `YYYY-MM-DD`
    pub date: String,
    /// Transactions processed
    pub transactions: u64,
    /// Bills paid
    pub bills_paid: u64,
    /// Grievances logged
    pub complaints: u64,
}

/// Per-service engagement counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    /// Bills paid through the service
    #[serde(default)]
    pub bills_paid: u64,
    /// Grievances logged against the service
    #[serde(default)]
    pub complaints: u64,
}

/// Service name to engagement counters
pub type ServiceBreakdown = BTreeMap<String, ServiceStats>;

/// Transaction volume for one hour of the day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakHour {
    /// Hour label as sent by the backend
    pub hour: serde_json::Value,
    /// Transactions in that hour
    pub volume: u64,
}

/// Total civic engagement of one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementSlice {
    /// Service name
    pub name: String,
    /// Bills paid plus grievances logged
    pub value: u64,
}

/// Engagement slices for every service with non-zero traffic
#[must_use]
pub fn engagement_slices(breakdown: &ServiceBreakdown) -> Vec<EngagementSlice> {
    breakdown
        .iter()
        .map(|(name, stats)| EngagementSlice {
            name: name.clone(),
            value: stats.bills_paid.saturating_add(stats.complaints),
        })
        .filter(|slice| slice.value > 0)
        .collect()
}

/// Reporting window for the analytics view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsRange {
    /// Past 7 days
    Week,
    /// Past calendar month
    #[default]
    Month,
    /// Past 12 months
    Year,
}

impl AnalyticsRange {
    /// Wire/file-name representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Inclusive date bounds ending at `today`
    #[must_use]
    pub fn bounds(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let from = match self {
            Self::Week => today - chrono::Days::new(7),
            Self::Month => today.checked_sub_months(Months::new(1)).unwrap_or(today),
            Self::Year => today.checked_sub_months(Months::new(12)).unwrap_or(today),
        };
        (from, today)
    }
}

impl fmt::Display for AnalyticsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyticsRange {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(crate::Error::validation(
                "range",
                format!("expected week, month or year, got '{s}'"),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_complaint_from_backend_json() {
        let complaint: Complaint = serde_json::from_str(
            r#"{
                "id": 42,
                "referenceNumber": "SUV-2024-0042",
                "category": "WATER_SUPPLY_LEAK",
                "description": "Pipe burst near market",
                "priority": "EMERGENCY",
                "status": "IN_PROGRESS",
                "createdAt": "2024-03-15T10:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(complaint.priority, ComplaintPriority::Emergency);
        assert_eq!(complaint.status, ComplaintStatus::InProgress);
        assert_eq!(complaint.category_label(), "WATER SUPPLY_LEAK");
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let status: ComplaintStatus = serde_json::from_str(r#""ESCALATED""#).unwrap();
        assert_eq!(status, ComplaintStatus::Unknown);
    }

    #[rstest]
    #[case("in_progress", ComplaintStatus::InProgress)]
    #[case("IN-PROGRESS", ComplaintStatus::InProgress)]
    #[case("resolved", ComplaintStatus::Resolved)]
    #[case("Registered", ComplaintStatus::Registered)]
    fn test_status_from_str(#[case] raw: &str, #[case] expected: ComplaintStatus) {
        assert_eq!(raw.parse::<ComplaintStatus>().unwrap(), expected);
    }

    #[test]
    fn test_status_from_str_rejects_unknown() {
        assert!("closed".parse::<ComplaintStatus>().is_err());
        assert!("urgent".parse::<ComplaintPriority>().is_err());
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(10, 5, 50)]
    #[case(3, 2, 67)]
    #[case(3, 1, 33)]
    fn test_efficiency_rating(#[case] total: u64, #[case] resolved: u64, #[case] expected: u64) {
        let metrics = DashboardMetrics {
            complaints: ComplaintCounters {
                total,
                resolved,
                active: total - resolved,
            },
            bills: BillCounters::default(),
        };
        assert_eq!(metrics.efficiency_rating(), expected);
    }

    #[test]
    fn test_dashboard_metrics_json() {
        let metrics: DashboardMetrics = serde_json::from_str(
            r#"{
                "complaints": {"total": 12, "resolved": 9, "active": 3},
                "bills": {"totalAttempts": 40, "successfulPayments": 38, "revenueCollected": 125000.5}
            }"#,
        )
        .unwrap();
        assert_eq!(metrics.bills.successful_payments, 38);
        assert_eq!(metrics.efficiency_rating(), 75);
    }

    #[test]
    fn test_engagement_slices_drop_idle_services() {
        let breakdown: ServiceBreakdown = serde_json::from_str(
            r#"{
                "ELECTRICITY": {"billsPaid": 10, "complaints": 2},
                "GAS": {"billsPaid": 0, "complaints": 0},
                "WATER": {"billsPaid": 1, "complaints": 4}
            }"#,
        )
        .unwrap();

        assert_eq!(
            engagement_slices(&breakdown),
            vec![
                EngagementSlice {
                    name: "ELECTRICITY".to_string(),
                    value: 12
                },
                EngagementSlice {
                    name: "WATER".to_string(),
                    value: 5
                },
            ]
        );
    }

    #[test]
    fn test_engagement_slice_saturates_on_huge_counters() {
        let breakdown: ServiceBreakdown = serde_json::from_str(&format!(
            r#"{{"ELECTRICITY": {{"billsPaid": {}, "complaints": 7}}}}"#,
            u64::MAX
        ))
        .unwrap();

        let slices = engagement_slices(&breakdown);
        assert_eq!(slices.first().unwrap().value, u64::MAX);
    }

    #[rstest]
    #[case(AnalyticsRange::Week, date(2024, 3, 8))]
    #[case(AnalyticsRange::Month, date(2024, 2, 15))]
    #[case(AnalyticsRange::Year, date(2023, 3, 15))]
    fn test_range_bounds(#[case] range: AnalyticsRange, #[case] expected_from: NaiveDate) {
        let today = date(2024, 3, 15);
        assert_eq!(range.bounds(today), (expected_from, today));
    }

    #[test]
    fn test_month_bound_clamps_to_month_end() {
        let (from, _) = AnalyticsRange::Month.bounds(date(2024, 3, 31));
        assert_eq!(from, date(2024, 2, 29));
    }

    #[test]
    fn test_range_round_trip_through_str() {
        for range in [AnalyticsRange::Week, AnalyticsRange::Month, AnalyticsRange::Year] {
            assert_eq!(range.as_str().parse::<AnalyticsRange>().unwrap(), range);
        }
        assert!("decade".parse::<AnalyticsRange>().is_err());
    }
}
