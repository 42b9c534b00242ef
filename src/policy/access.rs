//! Shared-secret API key enforcement.
//!
//! Callers present the key in the `X-API-Key` header. Keys are compared
//! as SHA-256 digests so the comparison time does not depend on how many
//! leading bytes match.

use crate::LicenseLogError;
use sha2::{Digest, Sha256};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Configured secret, kept only as its digest.
#[derive(Clone)]
pub struct ApiKeyPolicy {
    expected: [u8; 32],
}

impl std::fmt::Debug for ApiKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyPolicy").finish_non_exhaustive()
    }
}

impl ApiKeyPolicy {
    /// Build a policy for `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            expected: digest(secret),
        }
    }

    /// Check a presented key.
    ///
    /// # Returns
    /// * `Ok(())` - Key present and matching
    /// * `Err(Unauthorized)` - Key absent, empty or different
    pub fn check(&self, presented: Option<&str>) -> Result<(), LicenseLogError> {
        let Some(presented) = presented.filter(|k| !k.is_empty()) else {
            return Err(LicenseLogError::Unauthorized);
        };

        let actual = digest(presented);
        let diff = actual
            .iter()
            .zip(self.expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        if diff != 0 {
            return Err(LicenseLogError::Unauthorized);
        }
        Ok(())
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
