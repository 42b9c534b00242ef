//! SQLite schema for the record store.

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Table and index definitions. Idempotent.
///
/// `AUTOINCREMENT` keeps ids from being reused after a purge.
/// Timestamps are microseconds since the Unix epoch, UTC.
pub const RECORD_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS validation_records (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    license_key      TEXT    NOT NULL CHECK (length(license_key) > 0),
    device_id        TEXT,
    user_id          TEXT,
    result           TEXT    NOT NULL
                     CHECK (result IN ('success', 'failure', 'expired', 'revoked', 'unknown')),
    ip_address       TEXT,
    client_metadata  TEXT    NOT NULL DEFAULT '{}',
    timestamp_us     INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_license_ts
    ON validation_records (license_key, timestamp_us);

CREATE INDEX IF NOT EXISTS idx_records_ts
    ON validation_records (timestamp_us);

CREATE INDEX IF NOT EXISTS idx_records_device_ts
    ON validation_records (device_id, timestamp_us);
"#;

/// Columns selected when materializing a record, in `RecordRow` order.
pub(crate) const RECORD_COLUMNS: &str =
    "id, license_key, device_id, user_id, result, ip_address, client_metadata, timestamp_us";
