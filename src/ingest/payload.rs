//! Schema-checked parse of incoming validation payloads.
//!
//! The raw JSON body is decoded into [`ValidationPayload`] and then
//! normalized into a [`RecordDraft`]. Nothing reaches the store unless
//! every check here passes.

use crate::record::model::{ClientMetadata, RecordDraft, ValidationOutcome};
use crate::LicenseLogError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Maximum length of `license_key`, `device_id` and `user_id` in bytes.
pub const MAX_IDENTIFIER_BYTES: usize = 256;

/// Maximum number of `client_metadata` entries.
pub const MAX_METADATA_ENTRIES: usize = 32;

/// Maximum metadata key length in bytes.
pub const MAX_METADATA_KEY_BYTES: usize = 64;

/// Maximum metadata value length in bytes.
pub const MAX_METADATA_VALUE_BYTES: usize = 512;

/// Raw ingestion payload as sent by clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationPayload {
    /// License identifier. Required.
    #[serde(default)]
    pub license_key: Option<String>,

    /// Device identifier.
    #[serde(default)]
    pub device_id: Option<String>,

    /// User identifier.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Outcome string. `status` is accepted for older clients.
    #[serde(default, alias = "status")]
    pub result: Option<String>,

    /// Free-form client metadata. `device_info` is accepted for older clients.
    #[serde(default, alias = "device_info")]
    pub client_metadata: Option<Map<String, Value>>,
}

/// Decode a JSON body into a payload.
pub fn parse_payload(body: &[u8]) -> Result<ValidationPayload, LicenseLogError> {
    serde_json::from_slice(body)
        .map_err(|e| LicenseLogError::validation(format!("Malformed JSON payload: {}", e)))
}

impl ValidationPayload {
    /// Validate and normalize into a draft record.
    ///
    /// `ip_address` is the peer address observed by the server; clients
    /// cannot set it.
    pub fn into_draft(self, ip_address: Option<String>) -> Result<RecordDraft, LicenseLogError> {
        let license_key = self
            .license_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LicenseLogError::validation("license_key is required"))?;
        check_len("license_key", &license_key, MAX_IDENTIFIER_BYTES)?;

        let device_id = optional_identifier("device_id", self.device_id)?;
        let user_id = optional_identifier("user_id", self.user_id)?;

        let result = match self.result {
            None => ValidationOutcome::Unknown,
            Some(raw) => raw.parse().map_err(|_| {
                LicenseLogError::validation(format!(
                    "result must be one of success, failure, expired, revoked, unknown (got {:?})",
                    raw
                ))
            })?,
        };

        let client_metadata = normalize_metadata(self.client_metadata.unwrap_or_default())?;

        Ok(RecordDraft {
            license_key,
            device_id,
            user_id,
            result,
            ip_address,
            client_metadata,
        })
    }
}

fn optional_identifier(
    field: &str,
    value: Option<String>,
) -> Result<Option<String>, LicenseLogError> {
    let Some(value) = value.map(|v| v.trim().to_string()) else {
        return Ok(None);
    };
    if value.is_empty() {
        return Ok(None);
    }
    check_len(field, &value, MAX_IDENTIFIER_BYTES)?;
    Ok(Some(value))
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), LicenseLogError> {
    if value.len() > max {
        return Err(LicenseLogError::validation(format!(
            "{} exceeds {} bytes",
            field, max
        )));
    }
    Ok(())
}

/// Flatten metadata to string values and enforce size caps.
///
/// Numbers and booleans are stringified; nulls, arrays and objects are rejected.
fn normalize_metadata(raw: Map<String, Value>) -> Result<ClientMetadata, LicenseLogError> {
    if raw.len() > MAX_METADATA_ENTRIES {
        return Err(LicenseLogError::validation(format!(
            "client_metadata has {} entries, maximum is {}",
            raw.len(),
            MAX_METADATA_ENTRIES
        )));
    }

    let mut out = ClientMetadata::new();
    for (key, value) in raw {
        if key.trim().is_empty() {
            return Err(LicenseLogError::validation(
                "client_metadata keys cannot be empty",
            ));
        }
        check_len("client_metadata key", &key, MAX_METADATA_KEY_BYTES)?;

        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(LicenseLogError::validation(format!(
                    "client_metadata[{}] must be a string, number or boolean, got {}",
                    key,
                    json_kind(&other)
                )))
            }
        };
        check_len(&format!("client_metadata[{}]", key), &value, MAX_METADATA_VALUE_BYTES)?;
        out.insert(key, value);
    }
    Ok(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
