//! Plain-text rendering of the console views

use crate::analytics::AnalyticsReport;
use crate::dashboard::DashboardSnapshot;
use std::fmt::Write;
use suvidha_core::{Complaint, Session};

/// Dashboard panel
#[must_use]
pub fn dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::from("== Command Center ==\n");

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! {error}");
    }

    match &snapshot.metrics {
        Some(metrics) => {
            let c = metrics.complaints;
            let b = metrics.bills;
            let _ = writeln!(
                out,
                "Grievances     total {:>6}   resolved {:>6}   active {:>6}",
                c.total, c.resolved, c.active
            );
            let _ = writeln!(
                out,
                "Payments       attempts {:>6}   successful {:>6}   revenue Rs {:.2}",
                b.total_attempts, b.successful_payments, b.revenue_collected
            );
            let _ = writeln!(out, "Efficiency     {}%", metrics.efficiency_rating());
        }
        None if snapshot.is_loading() => out.push_str("Loading telemetry...\n"),
        None => {}
    }
    out
}

/// Complaint table
#[must_use]
pub fn complaints(rows: &[Complaint]) -> String {
    if rows.is_empty() {
        return "No grievances match the current filters.\n".to_string();
    }

    let mut out = format!(
        "{:<6} {:<18} {:<18} {:<10} {:<12} DESCRIPTION\n",
        "ID", "REFERENCE", "CATEGORY", "PRIORITY", "STATUS"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<6} {:<18} {:<18} {:<10} {:<12} {}",
            row.id,
            row.reference_number,
            row.category_label(),
            row.priority.as_str(),
            row.status.as_str(),
            row.description
        );
    }
    out
}

/// Analytics summary
#[must_use]
pub fn analytics(report: &AnalyticsReport) -> String {
    let mut out = format!(
        "== Analytics ({}: {} to {}) ==\n",
        report.range, report.from, report.to
    );

    out.push_str("Daily usage\n");
    if report.usage.is_empty() {
        out.push_str("  no data\n");
    }
    for row in &report.usage {
        let _ = writeln!(
            out,
            "  {}  transactions {:>6}  bills {:>6}  grievances {:>6}",
            row.date, row.transactions, row.bills_paid, row.complaints
        );
    }

    out.push_str("Civic engagement by service\n");
    for slice in report.engagement() {
        let _ = writeln!(out, "  {:<20} {:>8}", slice.name, slice.value);
    }

    if let Some(peak) = report.busiest_hour() {
        let hour = peak
            .hour
            .as_str()
            .map_or_else(|| peak.hour.to_string(), str::to_string);
        let _ = writeln!(out, "Peak hour: {hour} ({} transactions)", peak.volume);
    }
    out
}

/// One-line session summary
#[must_use]
pub fn session(session: Option<&Session>) -> String {
    match session {
        Some(session) if session.is_admin() => {
            format!("Logged in as {}", session.user.display_label())
        }
        Some(session) => format!(
            "Session held for role {} (not an administrator)",
            session.user.role
        ),
        None => "Not logged in".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suvidha_core::{
        ComplaintPriority, ComplaintStatus, DashboardMetrics, User,
        models::{BillCounters, ComplaintCounters},
    };

    #[test]
    fn test_dashboard_shows_efficiency() {
        let snapshot = DashboardSnapshot {
            metrics: Some(DashboardMetrics {
                complaints: ComplaintCounters {
                    total: 8,
                    resolved: 6,
                    active: 2,
                },
                bills: BillCounters::default(),
            }),
            error: None,
            fetches: 1,
        };

        assert!(dashboard(&snapshot).contains("Efficiency     75%"));
    }

    #[test]
    fn test_dashboard_shows_error_and_loading() {
        assert!(dashboard(&DashboardSnapshot::default()).contains("Loading"));

        let failed = DashboardSnapshot {
            error: Some("Failed to securely fetch telemetry statistics.".to_string()),
            fetches: 1,
            ..DashboardSnapshot::default()
        };
        let text = dashboard(&failed);
        assert!(text.contains("Failed to securely fetch telemetry statistics."));
        assert!(!text.contains("Loading"));
    }

    #[test]
    fn test_complaint_category_is_humanised() {
        let row = Complaint {
            id: 4,
            reference_number: "GRV-4".to_string(),
            category: "STREET_LIGHT_OUT".to_string(),
            description: "Dark lane".to_string(),
            priority: ComplaintPriority::Normal,
            status: ComplaintStatus::InProgress,
            created_at: String::new(),
        };

        let text = complaints(&[row]);
        assert!(text.contains("STREET LIGHT_OUT"));
        assert!(text.contains("IN_PROGRESS"));
    }

    #[test]
    fn test_session_summary() {
        assert_eq!(session(None), "Not logged in");
        assert_eq!(
            session(Some(&Session::new("abc", User::admin(7)))),
            "Logged in as Admin-7"
        );
    }
}
