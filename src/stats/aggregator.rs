//! Per-license, summary and activity statistics.
//!
//! Every figure is recomputed per call from the store; nothing is cached.

use crate::clock::Clock;
use crate::query::filter::RecordFilter;
use crate::query::page::Pagination;
use crate::record::model::ValidationRecord;
use crate::stats::snapshot::{fill_buckets, ActivityBucket, Granularity, StatsSnapshot};
use crate::store::RecordStore;
use crate::LicenseLogError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Recent records returned with per-license stats.
pub const LICENSE_RECENT_LIMIT: u32 = 10;

/// Recent records returned with the summary.
pub const SUMMARY_RECENT_LIMIT: u32 = 20;

/// Default activity window in days.
pub const DEFAULT_ACTIVITY_DAYS: u32 = 7;

/// Largest activity window in days.
pub const MAX_ACTIVITY_DAYS: u32 = 366;

/// Statistics for one license key.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseStats {
    /// The license key.
    pub license_key: String,
    /// Aggregate counts.
    pub stats: StatsSnapshot,
    /// Most recent records, newest first.
    pub recent_activity: Vec<ValidationRecord>,
}

/// Statistics over the whole store or a filtered subset.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    /// Aggregate counts.
    pub summary: StatsSnapshot,
    /// Per-day activity, oldest first.
    pub daily_activity: Vec<ActivityBucket>,
    /// Most recent matching records, newest first.
    pub recent_activity: Vec<ValidationRecord>,
}

/// Activity of one license over a trailing window.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    /// The license key.
    pub license_key: String,
    /// Window length in days.
    pub days: u32,
    /// Window start.
    pub from: DateTime<Utc>,
    /// Window end (now).
    pub to: DateTime<Utc>,
    /// Human-readable window label.
    pub period: String,
    /// Aggregate counts within the window.
    pub statistics: StatsSnapshot,
    /// Contiguous buckets covering the window, including empty ones.
    pub buckets: Vec<ActivityBucket>,
    /// Records within the window, newest first, at most one page.
    pub activity: Vec<ValidationRecord>,
}

/// Stats for one license.
///
/// # Errors
/// `NotFound` when the key has no records. An unknown key is reported as
/// absent rather than as a zero-valued snapshot.
pub fn per_license(
    store: &dyn RecordStore,
    license_key: &str,
) -> Result<LicenseStats, LicenseLogError> {
    let license_key = license_key.trim();
    if license_key.is_empty() {
        return Err(LicenseLogError::validation("license_key is required"));
    }

    let filter = RecordFilter::for_license(license_key);
    let stats = store.aggregate(&filter)?;
    if stats.total == 0 {
        return Err(LicenseLogError::NotFound(format!(
            "no records for license {}",
            license_key
        )));
    }

    let recent_activity = store.query(&filter, &Pagination::first(LICENSE_RECENT_LIMIT)?)?;

    Ok(LicenseStats {
        license_key: license_key.to_string(),
        stats,
        recent_activity,
    })
}

/// Stats over everything matching `filter`. An empty store yields zeros.
pub fn summary(
    store: &dyn RecordStore,
    filter: &RecordFilter,
) -> Result<SummaryStats, LicenseLogError> {
    filter.validate()?;

    let summary = store.aggregate(filter)?;
    let daily_activity = store.buckets(filter, Granularity::Day)?;
    let recent_activity = store.query(filter, &Pagination::first(SUMMARY_RECENT_LIMIT)?)?;

    Ok(SummaryStats {
        summary,
        daily_activity,
        recent_activity,
    })
}

/// Activity of `license_key` over the last `days` days, ending now.
///
/// Unlike [`per_license`], an idle license yields an empty report.
pub fn activity(
    store: &dyn RecordStore,
    clock: &dyn Clock,
    license_key: &str,
    days: u32,
    granularity: Granularity,
) -> Result<ActivityReport, LicenseLogError> {
    let license_key = license_key.trim();
    if license_key.is_empty() {
        return Err(LicenseLogError::validation("license_key is required"));
    }
    if days == 0 || days > MAX_ACTIVITY_DAYS {
        return Err(LicenseLogError::validation(format!(
            "days must be between 1 and {} (got {})",
            MAX_ACTIVITY_DAYS, days
        )));
    }

    let to = clock.now_utc();
    let from = to - Duration::days(i64::from(days));
    let filter = RecordFilter {
        license_key: Some(license_key.to_string()),
        from: Some(from),
        to: Some(to),
        ..RecordFilter::default()
    };

    let statistics = store.aggregate(&filter)?;
    let observed = store.buckets(&filter, granularity)?;
    let activity = store.query(&filter, &Pagination::default())?;

    Ok(ActivityReport {
        license_key: license_key.to_string(),
        days,
        from,
        to,
        period: format!("Last {} days", days),
        statistics,
        buckets: fill_buckets(granularity, from, to, observed),
        activity,
    })
}
