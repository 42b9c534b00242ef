//! Record filters and query-string parsing.

use crate::record::model::ValidationOutcome;
use crate::LicenseLogError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Narrows which records are returned or aggregated. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Exact license key.
    pub license_key: Option<String>,

    /// Exact device identifier.
    pub device_id: Option<String>,

    /// Exact user identifier.
    pub user_id: Option<String>,

    /// Outcome.
    pub result: Option<ValidationOutcome>,

    /// Inclusive lower time bound.
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper time bound.
    pub to: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// Filter restricted to one license key.
    pub fn for_license(license_key: impl Into<String>) -> Self {
        Self {
            license_key: Some(license_key.into()),
            ..Self::default()
        }
    }

    /// Check the filter is internally consistent.
    ///
    /// # Errors
    /// `Validation` when both bounds are set and `from > to`.
    pub fn validate(&self) -> Result<(), LicenseLogError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(LicenseLogError::validation(format!(
                    "from ({}) must not be after to ({})",
                    from.to_rfc3339(),
                    to.to_rfc3339()
                )));
            }
        }
        Ok(())
    }
}

/// Which end of a range a date-only value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Start of the day.
    Start,
    /// Last microsecond of the day.
    End,
}

/// Parse a time bound.
///
/// Accepts RFC 3339 (`2025-01-15T12:00:00Z`), SQLite-style
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC) and date-only `YYYY-MM-DD`.
pub fn parse_time_bound(
    field: &str,
    raw: &str,
    bound: Bound,
) -> Result<DateTime<Utc>, LicenseLogError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let naive = match bound {
            Bound::Start => date.and_hms_opt(0, 0, 0),
            Bound::End => date.and_hms_micro_opt(23, 59, 59, 999_999),
        };
        if let Some(naive) = naive {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(LicenseLogError::validation(format!(
        "{} must be an RFC 3339 timestamp or YYYY-MM-DD date (got {:?})",
        field, raw
    )))
}

/// Raw query-string parameters shared by the search and summary endpoints.
///
/// Everything arrives as text so that parse failures become structured
/// validation errors instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    /// License key filter.
    pub license_key: Option<String>,
    /// Device filter.
    pub device_id: Option<String>,
    /// User filter.
    pub user_id: Option<String>,
    /// Outcome filter.
    #[serde(alias = "status")]
    pub result: Option<String>,
    /// Lower time bound.
    #[serde(alias = "start_date")]
    pub from: Option<String>,
    /// Upper time bound.
    #[serde(alias = "end_date")]
    pub to: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Rows to skip.
    pub offset: Option<String>,
    /// Opaque continuation token.
    pub cursor: Option<String>,
}

/// Treat `?name=` the same as an absent parameter.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl QueryParams {
    /// Build and validate the filter part.
    pub fn filter(&self) -> Result<RecordFilter, LicenseLogError> {
        let result = match non_blank(&self.result) {
            None => None,
            Some(raw) => Some(raw.parse::<ValidationOutcome>().map_err(|_| {
                LicenseLogError::validation(format!("unrecognized result filter {:?}", raw))
            })?),
        };

        let filter = RecordFilter {
            license_key: non_blank(&self.license_key).map(String::from),
            device_id: non_blank(&self.device_id).map(String::from),
            user_id: non_blank(&self.user_id).map(String::from),
            result,
            from: non_blank(&self.from)
                .map(|raw| parse_time_bound("from", raw, Bound::Start))
                .transpose()?,
            to: non_blank(&self.to)
                .map(|raw| parse_time_bound("to", raw, Bound::End))
                .transpose()?,
        };
        filter.validate()?;
        Ok(filter)
    }
}
