//! # licenselog
//!
//! **License validation activity logging over HTTP.**
//!
//! licenselog records every license validation attempt reported by client
//! applications into a single SQLite database, and serves search and
//! statistics over those records.
//!
//! ## Features
//!
//! - **Append-only log**: each attempt becomes one immutable record with a
//!   server-assigned id and timestamp
//! - **Filtered search**: by license, device, user, outcome and time range,
//!   with offset or cursor pagination
//! - **Statistics**: per-license, store-wide and trailing-window activity
//! - **Shared-secret auth**: every `/api` route requires `X-API-Key`
//!
//! ## Quickstart
//!
//! ```no_run
//! use licenselog::{LicenseLogError, LoggerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LicenseLogError> {
//!     let config = LoggerConfig::new("change-me", "/var/lib/licenselog/logs.db");
//!     licenselog::server::serve(config).await
//! }
//! ```
//!
//! ## Embedding
//!
//! The [`LogManager`] exposes the same operations without HTTP:
//!
//! ```no_run
//! use licenselog::{LogManager, LoggerConfig};
//! use licenselog::ingest::payload::parse_payload;
//!
//! fn main() -> Result<(), licenselog::LicenseLogError> {
//!     let manager = LogManager::new(LoggerConfig::new("secret", "logs.db"))?;
//!     let payload = parse_payload(br#"{"license_key":"ABC-123","result":"success"}"#)?;
//!     manager.ingest(payload, None)?;
//!
//!     let stats = manager.license_stats("ABC-123")?;
//!     assert_eq!(stats.stats.total, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! - `API_KEY` - shared secret, required
//! - `LOG_DB_PATH` - database file
//! - `HOST` / `PORT` - bind address
//! - `DEBUG` - enables `/api/debug/db-status`
//!
//! See [`LoggerConfig`] for full documentation.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Data model
pub mod record;

// Ingestion layer
pub mod ingest;

// Storage layer
pub mod store;

// Query and statistics layers
pub mod query;
pub mod stats;

// Policy layer
pub mod policy;

// Manager (main public API)
pub mod manager;

// HTTP gateway
pub mod server;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::LoggerConfig;
pub use errors::LicenseLogError;
pub use manager::{IngestReceipt, LogManager};
pub use record::model::{ValidationOutcome, ValidationRecord};
pub use store::{RecordStore, SqliteRecordStore};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
