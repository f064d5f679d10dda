//! Reporting view and CSV export

use crate::api_client::ApiClient;
use crate::error::{ApiError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use suvidha_core::{
    AnalyticsRange, PeakHour, ServiceBreakdown, UsageRow,
    models::{EngagementSlice, engagement_slices},
};
use tracing::{info, instrument};

/// Everything the analytics view shows for one range
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsReport {
    /// Requested range
    pub range: AnalyticsRange,
    /// First day of the usage series
    pub from: NaiveDate,
    /// Last day of the usage series
    pub to: NaiveDate,
    /// Daily usage
    pub usage: Vec<UsageRow>,
    /// Engagement per service
    pub breakdown: ServiceBreakdown,
    /// Volume per hour of day
    pub peak_hours: Vec<PeakHour>,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Date")]
    date: &'a str,
    #[serde(rename = "Transactions")]
    transactions: u64,
    #[serde(rename = "BillsPaid")]
    bills_paid: u64,
    #[serde(rename = "Grievances")]
    grievances: u64,
}

impl<'a> From<&'a UsageRow> for ExportRow<'a> {
    fn from(row: &'a UsageRow) -> Self {
        Self {
            date: &row.date,
            transactions: row.transactions,
            bills_paid: row.bills_paid,
            grievances: row.complaints,
        }
    }
}

/// Load usage, breakdown and peak hours for `range` ending at `today`
///
/// The three requests run concurrently and the load fails as a whole if any
/// of them fails.
///
/// # Errors
///
/// Returns the first request error encountered.
#[instrument(skip(client))]
pub async fn load_report(
    client: &ApiClient,
    range: AnalyticsRange,
    today: NaiveDate,
) -> Result<AnalyticsReport> {
    let (from, to) = range.bounds(today);

    let (usage, breakdown, peak_hours) = tokio::try_join!(
        client.usage(from, to),
        client.service_breakdown(),
        client.peak_hours(),
    )?;

    info!(
        days = usage.len(),
        services = breakdown.len(),
        "Analytics loaded"
    );

    Ok(AnalyticsReport {
        range,
        from,
        to,
        usage,
        breakdown,
        peak_hours,
    })
}

/// File name of the CSV export for `range`
#[must_use]
pub fn export_file_name(range: AnalyticsRange) -> String {
    format!("SUVIDHA_Analytics_Export_{range}.csv")
}

impl AnalyticsReport {
    /// Non-empty engagement slices of the service breakdown
    #[must_use]
    pub fn engagement(&self) -> Vec<EngagementSlice> {
        engagement_slices(&self.breakdown)
    }

    /// Hour with the highest volume, earliest first on ties
    #[must_use]
    pub fn busiest_hour(&self) -> Option<&PeakHour> {
        self.peak_hours
            .iter()
            .reduce(|best, hour| if hour.volume > best.volume { hour } else { best })
    }

    /// Write the usage series as CSV
    ///
    /// Rows are joined with `\n` with no terminator after the last row, and
    /// fields are written unquoted.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NoExportData`] when the series is empty (nothing is
    /// written), or an error if writing fails.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.usage.is_empty() {
            return Err(ApiError::NoExportData);
        }

        let mut csv = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(Vec::new());
        for row in &self.usage {
            csv.serialize(ExportRow::from(row))?;
        }
        let mut data = csv
            .into_inner()
            .map_err(|e| ApiError::Io(e.into_error()))?;
        if data.last() == Some(&b'\n') {
            data.pop();
        }

        writer.write_all(&data)?;
        writer.flush()?;
        Ok(())
    }

    /// Export the usage series into `directory`, returning the file written
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NoExportData`] when the series is empty (no file is
    /// created), or an error if the file cannot be written.
    pub fn export_to(&self, directory: &Path) -> Result<PathBuf> {
        if self.usage.is_empty() {
            return Err(ApiError::NoExportData);
        }

        std::fs::create_dir_all(directory)?;
        let path = directory.join(export_file_name(self.range));
        self.write_csv(File::create(&path)?)?;

        info!(path = %path.display(), rows = self.usage.len(), "Analytics exported");
        Ok(path)
    }
}
