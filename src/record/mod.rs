//! Validation record data model.

pub mod model;

use sha2::{Digest, Sha256};

/// Short hex fingerprint of a license key, safe to write to logs.
pub fn key_fingerprint(license_key: &str) -> String {
    let hash = Sha256::digest(license_key.as_bytes());
    hex::encode(&hash[..6])
}
