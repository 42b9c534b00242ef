//! Validation record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Client-supplied key/value metadata (IP, app version, OS, ...).
pub type ClientMetadata = BTreeMap<String, String>;

/// Outcome of a license validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    /// License accepted.
    Success,
    /// License rejected for an unspecified reason.
    Failure,
    /// License past its expiry.
    Expired,
    /// License revoked by the issuer.
    Revoked,
    /// Outcome not reported.
    Unknown,
}

impl ValidationOutcome {
    /// All outcomes, in the order used by statistics.
    pub const ALL: [ValidationOutcome; 5] = [
        Self::Success,
        Self::Failure,
        Self::Expired,
        Self::Revoked,
        Self::Unknown,
    ];

    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a recognized outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOutcome(pub String);

impl FromStr for ValidationOutcome {
    type Err = UnknownOutcome;

    /// Case-insensitive. Also accepts the `valid`/`invalid` status words
    /// older clients send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "valid" => Ok(Self::Success),
            "failure" | "invalid" => Ok(Self::Failure),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            "unknown" => Ok(Self::Unknown),
            _ => Err(UnknownOutcome(s.to_string())),
        }
    }
}

/// A validated record waiting for the store to assign `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    /// Trimmed, non-empty license key.
    pub license_key: String,
    /// Device identifier, absent when blank.
    pub device_id: Option<String>,
    /// User identifier, absent when blank.
    pub user_id: Option<String>,
    /// Validation outcome.
    pub result: ValidationOutcome,
    /// Peer address observed by the server.
    pub ip_address: Option<String>,
    /// Normalized client metadata.
    pub client_metadata: ClientMetadata,
}

/// One logged license validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Store-assigned identifier, strictly increasing.
    pub id: i64,

    /// Opaque license identifier. Never empty.
    pub license_key: String,

    /// Device that attempted validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// User associated with the attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Validation outcome.
    pub result: ValidationOutcome,

    /// Peer address seen by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Client-supplied metadata.
    #[serde(default)]
    pub client_metadata: ClientMetadata,

    /// Server-assigned creation time.
    pub timestamp: DateTime<Utc>,
}

impl ValidationRecord {
    /// Materialize a stored record from its draft.
    pub fn from_draft(draft: RecordDraft, id: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            license_key: draft.license_key,
            device_id: draft.device_id,
            user_id: draft.user_id,
            result: draft.result,
            ip_address: draft.ip_address,
            client_metadata: draft.client_metadata,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parse_canonical() {
        for outcome in ValidationOutcome::ALL {
            assert_eq!(outcome.as_str().parse::<ValidationOutcome>(), Ok(outcome));
        }
    }

    #[test]
    fn test_outcome_parse_case_and_aliases() {
        assert_eq!("SUCCESS".parse::<ValidationOutcome>(), Ok(ValidationOutcome::Success));
        assert_eq!("valid".parse::<ValidationOutcome>(), Ok(ValidationOutcome::Success));
        assert_eq!(" Invalid ".parse::<ValidationOutcome>(), Ok(ValidationOutcome::Failure));
    }

    #[test]
    fn test_outcome_parse_bogus() {
        assert_eq!(
            "bogus".parse::<ValidationOutcome>(),
            Err(UnknownOutcome("bogus".to_string()))
        );
    }

    #[test]
    fn test_record_serializes_without_empty_optionals() {
        let draft = RecordDraft {
            license_key: "ABC-123".to_string(),
            device_id: None,
            user_id: None,
            result: ValidationOutcome::Expired,
            ip_address: None,
            client_metadata: ClientMetadata::new(),
        };
        let ts = DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = ValidationRecord::from_draft(draft, 7, ts);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["result"], "expired");
        assert!(json.get("device_id").is_none());
        assert_eq!(json["timestamp"], "2025-01-15T12:00:00Z");
    }
}
