//! Record store: durable, append-mostly table of validation records.

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteRecordStore, IN_MEMORY_PATH};

use crate::query::filter::RecordFilter;
use crate::query::page::Pagination;
use crate::record::model::{RecordDraft, ValidationRecord};
use crate::stats::snapshot::{ActivityBucket, Granularity, StatsSnapshot};
use crate::LicenseLogError;
use chrono::{DateTime, Utc};

/// Result of a bounded count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCount {
    /// Matches counted, at most the cap.
    pub count: u64,
    /// True when more matches exist than were counted.
    pub capped: bool,
}

/// Storage backend for validation records.
///
/// Implementations serialize writes and never expose a partially written
/// record to readers.
pub trait RecordStore: Send + Sync {
    /// Assign `id` and `timestamp`, persist atomically, return the stored record.
    fn append(&self, draft: RecordDraft) -> Result<ValidationRecord, LicenseLogError>;

    /// Matching records, newest first, at most `page.limit`.
    fn query(
        &self,
        filter: &RecordFilter,
        page: &Pagination,
    ) -> Result<Vec<ValidationRecord>, LicenseLogError>;

    /// Count matches, stopping at `cap`.
    fn count(&self, filter: &RecordFilter, cap: u64) -> Result<MatchCount, LicenseLogError>;

    /// Aggregate counts over matching records without materializing them.
    fn aggregate(&self, filter: &RecordFilter) -> Result<StatsSnapshot, LicenseLogError>;

    /// Per-period activity over matching records, oldest period first.
    fn buckets(
        &self,
        filter: &RecordFilter,
        granularity: Granularity,
    ) -> Result<Vec<ActivityBucket>, LicenseLogError>;

    /// Total records stored.
    fn record_count(&self) -> Result<u64, LicenseLogError>;

    /// Cheap reachability check.
    fn ping(&self) -> Result<(), LicenseLogError>;

    /// Delete records older than `cutoff`. Returns the number removed.
    ///
    /// This is the retention interface; nothing in the service calls it on
    /// a schedule.
    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, LicenseLogError>;
}
