//! Ingestion of validation attempts.

pub mod payload;
