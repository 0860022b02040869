//! Shared-passkey gate.
//!
//! The passkey is a shared secret checked by SHA-256 digest comparison. It keeps
//! casual visitors out; it is not an authentication boundary.

use crate::error::{LumenError, Result};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the shipped passkey.
pub const REFERENCE_PASSKEY_DIGEST: &str =
    "2a32f4fe7baa4f2b7179ab0e03037f7a7eec963f43778976e49500d6d68711d3";

/// Computes the lowercase hex SHA-256 digest of `text`.
pub fn passkey_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validates submitted credentials against a reference digest.
#[derive(Debug, Clone)]
pub struct CredentialGate {
    reference_digest: String,
    passkey_required: bool,
}

impl Default for CredentialGate {
    fn default() -> Self {
        Self::new(REFERENCE_PASSKEY_DIGEST)
    }
}

impl CredentialGate {
    pub fn new(reference_digest: impl Into<String>) -> Self {
        Self {
            reference_digest: reference_digest.into(),
            passkey_required: true,
        }
    }

    /// A gate that only requires an API key.
    pub fn without_passkey() -> Self {
        Self {
            reference_digest: REFERENCE_PASSKEY_DIGEST.to_string(),
            passkey_required: false,
        }
    }

    pub fn passkey_required(&self) -> bool {
        self.passkey_required
    }

    /// Checks the submitted pair and returns the trimmed API key on success.
    ///
    /// Both inputs are trimmed first; an empty field is `MissingInput`.
    pub fn check(&self, api_key: &str, passkey: &str) -> Result<String> {
        let api_key = api_key.trim();
        let passkey = passkey.trim();

        if api_key.is_empty() || (self.passkey_required && passkey.is_empty()) {
            return Err(LumenError::MissingInput);
        }

        if self.passkey_required {
            let matches = passkey_digest(passkey) == self.reference_digest;
            tracing::debug!(matches, "passkey digest compared");
            if !matches {
                return Err(LumenError::InvalidPasskey);
            }
        }

        Ok(api_key.to_string())
    }
}
