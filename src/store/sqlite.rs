//! SQLite-backed record store.
//!
//! One writer connection behind a mutex serializes appends. File-backed
//! stores run in WAL mode and serve reads from an r2d2 pool of read-only
//! connections; in-memory stores route reads through the writer connection.

use super::schema::{RECORD_COLUMNS, RECORD_SCHEMA, SCHEMA_VERSION};
use super::{MatchCount, RecordStore};
use crate::clock::Clock;
use crate::query::filter::RecordFilter;
use crate::query::page::{PageStart, Pagination, MAX_LIMIT};
use crate::record::model::{ClientMetadata, RecordDraft, ValidationOutcome, ValidationRecord};
use crate::stats::snapshot::{ActivityBucket, Granularity, StatsSnapshot};
use crate::LicenseLogError;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Path SQLite treats as a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// SQLite record store.
pub struct SqliteRecordStore {
    writer: Mutex<Connection>,
    readers: Option<Pool<SqliteConnectionManager>>,
    clock: Arc<dyn Clock>,
}

impl SqliteRecordStore {
    /// Open (creating if needed) a file-backed store.
    ///
    /// The parent directory is created when missing. `read_connections`
    /// bounds the reader pool; zero routes reads through the writer.
    /// [`IN_MEMORY_PATH`] opens the same store as [`SqliteRecordStore::memory`],
    /// since every connection to it would see a different database.
    pub fn open(
        path: &Path,
        read_connections: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LicenseLogError> {
        if path.as_os_str() == IN_MEMORY_PATH {
            return Self::memory(clock);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LicenseLogError::Storage(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Self::init_connection(&conn)?;
        info!(path = %path.display(), journal_mode = %mode, "record store opened");

        let size = u32::try_from(read_connections).unwrap_or(u32::MAX);
        let readers = (size > 0)
            .then(|| Self::reader_pool(path, size))
            .transpose()?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers,
            clock,
        })
    }

    /// Create an in-memory store (for testing).
    pub fn memory(clock: Arc<dyn Clock>) -> Result<Self, LicenseLogError> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            writer: Mutex::new(conn),
            readers: None,
            clock,
        })
    }

    fn reader_pool(
        path: &Path,
        size: u32,
    ) -> Result<Pool<SqliteConnectionManager>, LicenseLogError> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder()
            .max_size(size)
            .connection_timeout(BUSY_TIMEOUT)
            .build(manager)?;
        Ok(pool)
    }

    fn init_connection(conn: &Connection) -> Result<(), LicenseLogError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(LicenseLogError::Storage(format!(
                "database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }
        conn.execute_batch(RECORD_SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>, LicenseLogError> {
        self.writer
            .lock()
            .map_err(|_| LicenseLogError::Storage("writer connection lock poisoned".to_string()))
    }

    fn with_reader<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, LicenseLogError>,
    ) -> Result<T, LicenseLogError> {
        match &self.readers {
            Some(pool) => {
                let conn = pool.get()?;
                f(&conn)
            }
            None => {
                let conn = self.lock_writer()?;
                f(&conn)
            }
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn append(&self, draft: RecordDraft) -> Result<ValidationRecord, LicenseLogError> {
        let metadata = serde_json::to_string(&draft.client_metadata).map_err(|e| {
            LicenseLogError::Storage(format!("Failed to serialize client_metadata: {}", e))
        })?;

        let mut conn = self.lock_writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Clamp to the newest stored timestamp so time never runs backwards
        // relative to id order.
        let last_us: Option<i64> = tx
            .query_row(
                "SELECT timestamp_us FROM validation_records ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let now_us = self.clock.now_utc().timestamp_micros();
        let timestamp_us = last_us.map_or(now_us, |last| last.max(now_us));

        tx.execute(
            "INSERT INTO validation_records
                (license_key, device_id, user_id, result, ip_address, client_metadata, timestamp_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                draft.license_key,
                draft.device_id,
                draft.user_id,
                draft.result.as_str(),
                draft.ip_address,
                metadata,
                timestamp_us,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, "validation record appended");
        Ok(ValidationRecord::from_draft(
            draft,
            id,
            micros_to_datetime(timestamp_us)?,
        ))
    }

    fn query(
        &self,
        filter: &RecordFilter,
        page: &Pagination,
    ) -> Result<Vec<ValidationRecord>, LicenseLogError> {
        let (after, offset) = match page.start {
            PageStart::After(id) => (Some(id), 0),
            PageStart::Offset(offset) => (None, offset),
        };
        let (where_sql, mut values) = where_clause(filter, after);
        // One row of headroom for next-page probing.
        let limit = page.limit.min(MAX_LIMIT + 1);
        values.push(Value::Integer(i64::from(limit)));
        values.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let sql = format!(
            "SELECT {} FROM validation_records{} ORDER BY timestamp_us DESC, id DESC LIMIT ? OFFSET ?",
            RECORD_COLUMNS, where_sql
        );

        self.with_reader(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), RecordRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(RecordRow::into_record).collect()
        })
    }

    fn count(&self, filter: &RecordFilter, cap: u64) -> Result<MatchCount, LicenseLogError> {
        let (where_sql, mut values) = where_clause(filter, None);
        values.push(Value::Integer(
            i64::try_from(cap.saturating_add(1)).unwrap_or(i64::MAX),
        ));
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM validation_records{} LIMIT ?)",
            where_sql
        );

        let counted: i64 = self.with_reader(|conn| {
            Ok(conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?)
        })?;
        let counted = counted.max(0) as u64;
        Ok(MatchCount {
            count: counted.min(cap),
            capped: counted > cap,
        })
    }

    fn aggregate(&self, filter: &RecordFilter) -> Result<StatsSnapshot, LicenseLogError> {
        let (where_sql, values) = where_clause(filter, None);
        let sql = format!(
            "SELECT COUNT(*),
                    COALESCE(SUM(result = 'success'), 0),
                    COALESCE(SUM(result = 'failure'), 0),
                    COALESCE(SUM(result = 'expired'), 0),
                    COALESCE(SUM(result = 'revoked'), 0),
                    COALESCE(SUM(result = 'unknown'), 0),
                    COUNT(DISTINCT device_id),
                    COUNT(DISTINCT license_key),
                    COUNT(DISTINCT ip_address),
                    MIN(timestamp_us),
                    MAX(timestamp_us)
             FROM validation_records{}",
            where_sql
        );

        let (counts, first_us, last_us) = self.with_reader(|conn| {
            Ok(conn.query_row(&sql, params_from_iter(values.iter()), |row| {
                let mut counts = [0i64; 9];
                for (i, slot) in counts.iter_mut().enumerate() {
                    *slot = row.get(i)?;
                }
                Ok((
                    counts,
                    row.get::<_, Option<i64>>(9)?,
                    row.get::<_, Option<i64>>(10)?,
                ))
            })?)
        })?;

        let [total, success, failure, expired, revoked, unknown, devices, licenses, ips] =
            counts.map(|c| c.max(0) as u64);

        Ok(StatsSnapshot {
            total,
            success,
            failure,
            expired,
            revoked,
            unknown,
            success_rate: 0.0,
            unique_devices: devices,
            unique_licenses: licenses,
            unique_ips: ips,
            first_seen: first_us.map(micros_to_datetime).transpose()?,
            last_seen: last_us.map(micros_to_datetime).transpose()?,
        }
        .with_rate())
    }

    fn buckets(
        &self,
        filter: &RecordFilter,
        granularity: Granularity,
    ) -> Result<Vec<ActivityBucket>, LicenseLogError> {
        let (where_sql, values) = where_clause(filter, None);
        let sql = format!(
            "SELECT strftime('{}', timestamp_us / 1000000, 'unixepoch') AS period,
                    COUNT(*),
                    COALESCE(SUM(result = 'success'), 0),
                    COALESCE(SUM(result IN ('failure', 'expired', 'revoked')), 0)
             FROM validation_records{}
             GROUP BY period
             ORDER BY period ASC",
            granularity.sqlite_format(),
            where_sql
        );

        self.with_reader(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let buckets = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok(ActivityBucket {
                        period: row.get(0)?,
                        total: row.get::<_, i64>(1)?.max(0) as u64,
                        success: row.get::<_, i64>(2)?.max(0) as u64,
                        failed: row.get::<_, i64>(3)?.max(0) as u64,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(buckets)
        })
    }

    fn record_count(&self) -> Result<u64, LicenseLogError> {
        let count: i64 = self.with_reader(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM validation_records", [], |row| {
                row.get(0)
            })?)
        })?;
        Ok(count.max(0) as u64)
    }

    fn ping(&self) -> Result<(), LicenseLogError> {
        self.with_reader(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, LicenseLogError> {
        let conn = self.lock_writer()?;
        let removed = conn.execute(
            "DELETE FROM validation_records WHERE timestamp_us < ?1",
            params![cutoff.timestamp_micros()],
        )?;
        info!(removed, cutoff = %cutoff.to_rfc3339(), "purged validation records");
        Ok(removed)
    }
}

/// Build ` WHERE ...` and its positional values. Empty when unfiltered.
fn where_clause(filter: &RecordFilter, after_id: Option<i64>) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(key) = &filter.license_key {
        clauses.push("license_key = ?");
        values.push(Value::Text(key.clone()));
    }
    if let Some(device) = &filter.device_id {
        clauses.push("device_id = ?");
        values.push(Value::Text(device.clone()));
    }
    if let Some(user) = &filter.user_id {
        clauses.push("user_id = ?");
        values.push(Value::Text(user.clone()));
    }
    if let Some(result) = filter.result {
        clauses.push("result = ?");
        values.push(Value::Text(result.as_str().to_string()));
    }
    if let Some(from) = filter.from {
        clauses.push("timestamp_us >= ?");
        values.push(Value::Integer(from.timestamp_micros()));
    }
    if let Some(to) = filter.to {
        clauses.push("timestamp_us <= ?");
        values.push(Value::Integer(to.timestamp_micros()));
    }
    if let Some(id) = after_id {
        clauses.push("id < ?");
        values.push(Value::Integer(id));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn micros_to_datetime(us: i64) -> Result<DateTime<Utc>, LicenseLogError> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| LicenseLogError::Storage(format!("timestamp out of range: {}", us)))
}

/// Raw row as stored, before decoding.
struct RecordRow {
    id: i64,
    license_key: String,
    device_id: Option<String>,
    user_id: Option<String>,
    result: String,
    ip_address: Option<String>,
    client_metadata: String,
    timestamp_us: i64,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            license_key: row.get(1)?,
            device_id: row.get(2)?,
            user_id: row.get(3)?,
            result: row.get(4)?,
            ip_address: row.get(5)?,
            client_metadata: row.get(6)?,
            timestamp_us: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<ValidationRecord, LicenseLogError> {
        let result: ValidationOutcome = self.result.parse().map_err(|_| {
            LicenseLogError::Storage(format!(
                "record {} has unrecognized result {:?}",
                self.id, self.result
            ))
        })?;
        let client_metadata: ClientMetadata = serde_json::from_str(&self.client_metadata)
            .map_err(|e| {
                LicenseLogError::Storage(format!(
                    "record {} has corrupt client_metadata: {}",
                    self.id, e
                ))
            })?;

        Ok(ValidationRecord {
            id: self.id,
            license_key: self.license_key,
            device_id: self.device_id,
            user_id: self.user_id,
            result,
            ip_address: self.ip_address,
            client_metadata,
            timestamp: micros_to_datetime(self.timestamp_us)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use chrono::Duration;
    use tempfile::TempDir;

    fn clock() -> Arc<MockClock> {
        Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"))
    }

    fn draft(key: &str, device: Option<&str>, result: ValidationOutcome) -> RecordDraft {
        RecordDraft {
            license_key: key.to_string(),
            device_id: device.map(String::from),
            user_id: None,
            result,
            ip_address: Some("127.0.0.1".to_string()),
            client_metadata: ClientMetadata::new(),
        }
    }

    fn all() -> Pagination {
        Pagination::first(MAX_LIMIT).unwrap()
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let store = SqliteRecordStore::memory(clock()).unwrap();
        let mut last = 0;
        for _ in 0..5 {
            let record = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
            assert!(record.id > last);
            last = record.id;
        }
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let store = SqliteRecordStore::memory(clock()).unwrap();
        let mut d = draft("ABC-123", Some("dev-1"), ValidationOutcome::Revoked);
        d.user_id = Some("user-9".to_string());
        d.client_metadata.insert("os".to_string(), "linux".to_string());
        let stored = store.append(d).unwrap();

        let filter = RecordFilter {
            license_key: Some("ABC-123".to_string()),
            from: Some(stored.timestamp),
            to: Some(stored.timestamp),
            ..RecordFilter::default()
        };
        let found = store.query(&filter, &all()).unwrap();
        assert_eq!(found, vec![stored]);
    }

    #[test]
    fn test_timestamp_clamped_when_clock_steps_back() {
        let clock = clock();
        let store = SqliteRecordStore::memory(clock.clone()).unwrap();
        let first = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        clock.advance(Duration::minutes(-10));
        let second = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();

        assert!(second.id > first.id);
        assert_eq!(second.timestamp, first.timestamp);
    }

    #[test]
    fn test_query_orders_newest_first_and_filters() {
        let clock = clock();
        let store = SqliteRecordStore::memory(clock.clone()).unwrap();
        for (key, result) in [
            ("A", ValidationOutcome::Success),
            ("B", ValidationOutcome::Failure),
            ("A", ValidationOutcome::Failure),
        ] {
            store.append(draft(key, None, result)).unwrap();
            clock.advance(Duration::seconds(1));
        }

        let a_only = store.query(&RecordFilter::for_license("A"), &all()).unwrap();
        assert_eq!(a_only.len(), 2);
        assert!(a_only[0].timestamp > a_only[1].timestamp);

        let failures = RecordFilter {
            result: Some(ValidationOutcome::Failure),
            ..RecordFilter::default()
        };
        assert_eq!(store.query(&failures, &all()).unwrap().len(), 2);
    }

    #[test]
    fn test_query_time_range() {
        let clock = clock();
        let store = SqliteRecordStore::memory(clock.clone()).unwrap();
        let early = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        clock.advance(Duration::hours(2));
        let late = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();

        let filter = RecordFilter {
            from: Some(early.timestamp + Duration::hours(1)),
            ..RecordFilter::default()
        };
        let found = store.query(&filter, &all()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, late.id);
    }

    #[test]
    fn test_query_device_filter() {
        let store = SqliteRecordStore::memory(clock()).unwrap();
        store.append(draft("K", Some("d1"), ValidationOutcome::Success)).unwrap();
        store.append(draft("K", Some("d2"), ValidationOutcome::Success)).unwrap();
        store.append(draft("K", None, ValidationOutcome::Success)).unwrap();

        let filter = RecordFilter {
            device_id: Some("d2".to_string()),
            ..RecordFilter::default()
        };
        let found = store.query(&filter, &all()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].device_id.as_deref(), Some("d2"));
    }

    #[test]
    fn test_limit_respected() {
        let store = SqliteRecordStore::memory(clock()).unwrap();
        for _ in 0..10 {
            store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        }
        let page = Pagination::first(3).unwrap();
        assert_eq!(store.query(&RecordFilter::default(), &page).unwrap().len(), 3);
    }

    #[test]
    fn test_count_capped() {
        let store = SqliteRecordStore::memory(clock()).unwrap();
        for _ in 0..5 {
            store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        }
        let exact = store.count(&RecordFilter::default(), 10).unwrap();
        assert_eq!(exact, MatchCount { count: 5, capped: false });

        let capped = store.count(&RecordFilter::default(), 3).unwrap();
        assert_eq!(capped, MatchCount { count: 3, capped: true });

        let at_cap = store.count(&RecordFilter::default(), 5).unwrap();
        assert_eq!(at_cap, MatchCount { count: 5, capped: false });
    }

    #[test]
    fn test_aggregate_counts() {
        let clock = clock();
        let store = SqliteRecordStore::memory(clock.clone()).unwrap();
        store.append(draft("A", Some("d1"), ValidationOutcome::Success)).unwrap();
        clock.advance(Duration::seconds(30));
        store.append(draft("A", Some("d1"), ValidationOutcome::Failure)).unwrap();
        store.append(draft("A", Some("d2"), ValidationOutcome::Expired)).unwrap();
        store.append(draft("B", None, ValidationOutcome::Unknown)).unwrap();

        let all = store.aggregate(&RecordFilter::default()).unwrap();
        assert_eq!(all.total, 4);
        assert_eq!(all.success, 1);
        assert_eq!(all.failure, 1);
        assert_eq!(all.expired, 1);
        assert_eq!(all.unknown, 1);
        assert_eq!(all.unique_devices, 2);
        assert_eq!(all.unique_licenses, 2);
        assert_eq!(all.unique_ips, 1);
        assert_eq!(all.success_rate, 0.25);
        assert_eq!(
            (all.last_seen.unwrap() - all.first_seen.unwrap()).num_seconds(),
            30
        );

        let a = store.aggregate(&RecordFilter::for_license("A")).unwrap();
        assert_eq!(a.total, 3);
    }

    #[test]
    fn test_aggregate_empty() {
        let store = SqliteRecordStore::memory(clock()).unwrap();
        let snap = store.aggregate(&RecordFilter::default()).unwrap();
        assert_eq!(snap, StatsSnapshot::default());
    }

    #[test]
    fn test_buckets_by_day() {
        let clock = clock();
        let store = SqliteRecordStore::memory(clock.clone()).unwrap();
        store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        store.append(draft("K", None, ValidationOutcome::Revoked)).unwrap();
        clock.advance(Duration::days(2));
        store.append(draft("K", None, ValidationOutcome::Unknown)).unwrap();

        let buckets = store.buckets(&RecordFilter::default(), Granularity::Day).unwrap();
        assert_eq!(
            buckets,
            vec![
                ActivityBucket {
                    period: "2025-01-15".to_string(),
                    total: 2,
                    success: 1,
                    failed: 1,
                },
                ActivityBucket {
                    period: "2025-01-17".to_string(),
                    total: 1,
                    success: 0,
                    failed: 0,
                },
            ]
        );
    }

    #[test]
    fn test_bucket_labels_match_rust_formatting() {
        let clock = clock();
        let store = SqliteRecordStore::memory(clock.clone()).unwrap();
        let record = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        for granularity in [Granularity::Hour, Granularity::Day, Granularity::Month] {
            let buckets = store.buckets(&RecordFilter::default(), granularity).unwrap();
            assert_eq!(buckets[0].period, granularity.period_of(&record.timestamp));
        }
    }

    #[test]
    fn test_purge_before_keeps_ids_unique() {
        let clock = clock();
        let store = SqliteRecordStore::memory(clock.clone()).unwrap();
        let old = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        clock.advance(Duration::days(40));
        store.append(draft("K", None, ValidationOutcome::Success)).unwrap();

        let removed = store
            .purge_before(old.timestamp + Duration::days(30))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.record_count().unwrap(), 1);

        let next = store.append(draft("K", None, ValidationOutcome::Success)).unwrap();
        assert!(next.id > old.id + 1);
    }

    #[test]
    fn test_ping() {
        let store = SqliteRecordStore::memory(clock()).unwrap();
        assert!(store.ping().is_ok());
    }

    #[test]
    fn test_file_store_persists_and_reads_through_pool() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("logs.db");

        let id = {
            let store = SqliteRecordStore::open(&path, 2, clock()).unwrap();
            let record = store.append(draft("K", Some("d"), ValidationOutcome::Success)).unwrap();
            assert_eq!(store.record_count().unwrap(), 1);
            record.id
        };

        let reopened = SqliteRecordStore::open(&path, 2, clock()).unwrap();
        let found = reopened.query(&RecordFilter::for_license("K"), &all()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[test]
    fn test_in_memory_path_shares_one_database() {
        let store =
            SqliteRecordStore::open(Path::new(IN_MEMORY_PATH), 4, clock()).unwrap();
        let record = store.append(draft("K", Some("d"), ValidationOutcome::Success)).unwrap();

        let found = store.query(&RecordFilter::for_license("K"), &all()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, record.id);
        assert_eq!(store.aggregate(&RecordFilter::default()).unwrap().total, 1);
    }

    #[test]
    fn test_concurrent_appends_and_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.db");
        let store = Arc::new(SqliteRecordStore::open(&path, 4, Arc::new(crate::SystemClock)).unwrap());

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .append(draft(&format!("K{}", w), None, ValidationOutcome::Success))
                            .unwrap();
                    }
                })
            })
            .collect();
        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let snap = store.aggregate(&RecordFilter::default()).unwrap();
                    assert_eq!(snap.total, snap.success);
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(store.record_count().unwrap(), 100);
        let records = store.query(&RecordFilter::default(), &all()).unwrap();
        for pair in records.windows(2) {
            assert!(pair[0].id > pair[1].id);
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn test_newer_schema_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1).unwrap();
        }
        let result = SqliteRecordStore::open(&path, 0, clock());
        assert!(matches!(result, Err(LicenseLogError::Storage(_))));
    }
}
