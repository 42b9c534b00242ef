//! Derived statistics types and deterministic period bucketing.
//!
//! Periods are formatted in UTC: `YYYY-MM-DDTHH:00` for hours,
//! `YYYY-MM-DD` for days, `YYYY-MM` for months.

use crate::LicenseLogError;
use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Timelike, Utc};
use serde::Serialize;
use std::str::FromStr;

/// Aggregate counts over a set of records. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Records in the set.
    pub total: u64,
    /// Records with outcome `success`.
    pub success: u64,
    /// Records with outcome `failure`.
    pub failure: u64,
    /// Records with outcome `expired`.
    pub expired: u64,
    /// Records with outcome `revoked`.
    pub revoked: u64,
    /// Records with outcome `unknown`.
    pub unknown: u64,
    /// `success / total`, 0.0 for an empty set.
    pub success_rate: f64,
    /// Distinct non-null device ids.
    pub unique_devices: u64,
    /// Distinct license keys.
    pub unique_licenses: u64,
    /// Distinct non-null peer addresses.
    pub unique_ips: u64,
    /// Oldest timestamp in the set.
    pub first_seen: Option<DateTime<Utc>>,
    /// Newest timestamp in the set.
    pub last_seen: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    /// Recompute `success_rate` from the counts.
    pub fn with_rate(mut self) -> Self {
        self.success_rate = if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64
        };
        self
    }
}

/// Activity within one time period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityBucket {
    /// Period label, see module docs.
    pub period: String,
    /// Records in the period.
    pub total: u64,
    /// Successful validations.
    pub success: u64,
    /// Failed, expired or revoked validations.
    pub failed: u64,
}

impl ActivityBucket {
    /// An empty bucket for `period`.
    pub fn empty(period: String) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }
}

/// Width of an activity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One bucket per UTC hour.
    Hour,
    /// One bucket per UTC day.
    #[default]
    Day,
    /// One bucket per UTC month.
    Month,
}

impl Granularity {
    /// `strftime` pattern producing the same labels as [`Granularity::period_of`].
    pub fn sqlite_format(&self) -> &'static str {
        match self {
            Self::Hour => "%Y-%m-%dT%H:00",
            Self::Day => "%Y-%m-%d",
            Self::Month => "%Y-%m",
        }
    }

    /// Label of the period containing `dt`.
    pub fn period_of(&self, dt: &DateTime<Utc>) -> String {
        match self {
            Self::Hour => format!(
                "{:04}-{:02}-{:02}T{:02}:00",
                dt.year(),
                dt.month(),
                dt.day(),
                dt.hour()
            ),
            Self::Day => format!("{:04}-{:02}-{:02}", dt.year(), dt.month(), dt.day()),
            Self::Month => format!("{:04}-{:02}", dt.year(), dt.month()),
        }
    }

    /// Truncate `dt` to the start of its period.
    fn floor(&self, dt: &DateTime<Utc>) -> DateTime<Utc> {
        let (y, m, d, h) = match self {
            Self::Hour => (dt.year(), dt.month(), dt.day(), dt.hour()),
            Self::Day => (dt.year(), dt.month(), dt.day(), 0),
            Self::Month => (dt.year(), dt.month(), 1, 0),
        };
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .unwrap_or(*dt)
    }

    fn step(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Hour => dt.checked_add_signed(Duration::hours(1)),
            Self::Day => dt.checked_add_signed(Duration::days(1)),
            Self::Month => dt.checked_add_months(Months::new(1)),
        }
    }

    /// Every period label from the one containing `from` through the one
    /// containing `to`, in order.
    pub fn periods_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = self.floor(&from);
        while cursor <= to {
            out.push(self.period_of(&cursor));
            match self.step(cursor) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        out
    }
}

impl FromStr for Granularity {
    type Err = LicenseLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hourly" => Ok(Self::Hour),
            "day" | "daily" => Ok(Self::Day),
            "month" | "monthly" => Ok(Self::Month),
            other => Err(LicenseLogError::Validation(format!(
                "bucket must be hour, day or month (got {:?})",
                other
            ))),
        }
    }
}

/// Fill gaps so that every period in `[from, to]` has a bucket.
pub fn fill_buckets(
    granularity: Granularity,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    observed: Vec<ActivityBucket>,
) -> Vec<ActivityBucket> {
    let mut observed = observed.into_iter().peekable();
    let mut out = Vec::new();
    for period in granularity.periods_between(from, to) {
        while observed.peek().is_some_and(|b| b.period < period) {
            observed.next();
        }
        match observed.peek() {
            Some(bucket) if bucket.period == period => {
                out.extend(observed.next());
            }
            _ => out.push(ActivityBucket::empty(period)),
        }
    }
    out
}
