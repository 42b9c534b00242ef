//! Log Manager - the main public API for licenselog.
//!
//! The `LogManager` owns the configuration, the record store and the
//! clock, and exposes every operation the HTTP gateway needs:
//! - Ingestion of validation attempts
//! - Filtered, paginated search
//! - Per-license, summary and activity statistics
//! - Health and debug status

use crate::clock::{Clock, SystemClock};
use crate::config::LoggerConfig;
use crate::ingest::payload::ValidationPayload;
use crate::query::filter::RecordFilter;
use crate::query::page::{SearchPage, SearchQuery};
use crate::query::search;
use crate::record::key_fingerprint;
use crate::stats::aggregator::{self, ActivityReport, LicenseStats, SummaryStats};
use crate::stats::snapshot::Granularity;
use crate::store::{RecordStore, SqliteRecordStore};
use crate::LicenseLogError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Service name reported by the banner and health endpoints.
pub const SERVICE_NAME: &str = "license-logger";

/// Returned after a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    /// Store-assigned id.
    pub id: i64,
    /// Server-assigned timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Store reachability as seen by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store answered the ping.
    Healthy,
    /// Store did not answer.
    Degraded,
}

/// Health endpoint body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Ping failure reason, when degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Time of the check.
    pub timestamp: DateTime<Utc>,
}

/// Debug endpoint body.
#[derive(Debug, Clone, Serialize)]
pub struct DbStatus {
    /// Database file in use.
    pub database_path: String,
    /// Records stored.
    pub log_count: u64,
    /// Distinct license keys stored.
    pub license_count: u64,
    /// The five newest records.
    pub recent_logs: Vec<crate::record::model::ValidationRecord>,
    /// Time of the check.
    pub timestamp: DateTime<Utc>,
}

/// Main entry point for licenselog.
///
/// Create one instance per process and share it (it is `Send + Sync`).
pub struct LogManager {
    config: LoggerConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn RecordStore>,
}

impl LogManager {
    /// Open the store named by `config.db_path` using the system clock.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The database directory cannot be created
    /// - The database cannot be opened or its schema initialized
    pub fn new(config: LoggerConfig) -> Result<Self, LicenseLogError> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = SqliteRecordStore::open(&config.db_path, config.read_connections, clock.clone())?;
        Ok(Self::with_store(config, Arc::new(store), clock))
    }

    /// Assemble a manager from an existing store and clock.
    pub fn with_store(
        config: LoggerConfig,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            clock,
            store,
        }
    }

    /// Validate a payload and persist it as one record.
    ///
    /// # Errors
    /// - `Validation` - Payload rejected; nothing was written
    /// - `Storage` - Write failed
    pub fn ingest(
        &self,
        payload: ValidationPayload,
        ip_address: Option<String>,
    ) -> Result<IngestReceipt, LicenseLogError> {
        let draft = payload.into_draft(ip_address)?;
        let fingerprint = key_fingerprint(&draft.license_key);
        let record = self.store.append(draft)?;

        info!(
            id = record.id,
            license = %fingerprint,
            result = %record.result,
            "validation logged"
        );

        Ok(IngestReceipt {
            id: record.id,
            timestamp: record.timestamp,
        })
    }

    /// Filtered, paginated search.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchPage, LicenseLogError> {
        search(self.store.as_ref(), query)
    }

    /// Statistics for one license. `NotFound` when it has no records.
    pub fn license_stats(&self, license_key: &str) -> Result<LicenseStats, LicenseLogError> {
        aggregator::per_license(self.store.as_ref(), license_key)
    }

    /// Statistics over records matching `filter`.
    pub fn summary(&self, filter: &RecordFilter) -> Result<SummaryStats, LicenseLogError> {
        aggregator::summary(self.store.as_ref(), filter)
    }

    /// Trailing-window activity for one license.
    pub fn activity(
        &self,
        license_key: &str,
        days: u32,
        granularity: Granularity,
    ) -> Result<ActivityReport, LicenseLogError> {
        aggregator::activity(
            self.store.as_ref(),
            self.clock.as_ref(),
            license_key,
            days,
            granularity,
        )
    }

    /// Ping the store.
    pub fn health(&self) -> HealthReport {
        let (status, reason) = match self.store.ping() {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                warn!(error = %e, "store health check failed");
                (HealthStatus::Degraded, Some(e.to_string()))
            }
        };
        HealthReport {
            status,
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            reason,
            timestamp: self.clock.now_utc(),
        }
    }

    /// Row counts and the newest records, for operators.
    pub fn db_status(&self) -> Result<DbStatus, LicenseLogError> {
        let snapshot = self.store.aggregate(&RecordFilter::default())?;
        let recent_logs = self.store.query(
            &RecordFilter::default(),
            &crate::query::page::Pagination::first(5)?,
        )?;
        Ok(DbStatus {
            database_path: self.config.db_path.display().to_string(),
            log_count: snapshot.total,
            license_count: snapshot.unique_licenses,
            recent_logs,
            timestamp: self.clock.now_utc(),
        })
    }

    /// Delete records older than `age`. Returns the number removed.
    pub fn purge_older_than(&self, age: chrono::Duration) -> Result<usize, LicenseLogError> {
        if age <= chrono::Duration::zero() {
            return Err(LicenseLogError::validation("retention age must be positive"));
        }
        self.store.purge_before(self.clock.now_utc() - age)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }
}
