//! Credential verification for the login route.
//!
//! The user store itself lives behind [`CredentialVerifier`]; the bundled
//! [`StaticCredentials`] serves users declared in the configuration file.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::UserConfig;
use crate::security::lockout::normalize_email;

/// Checks an email/password pair.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, email: &str, password: &str) -> bool;
}

/// Users with SHA-256 password digests, loaded from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    users: HashMap<String, [u8; 32]>,
}

/// Hex-encoded SHA-256 digest of a password, as stored in configuration.
pub fn password_digest_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn parse_digest(hex_digest: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(hex_digest.trim()).ok()?;
    bytes.try_into().ok()
}

impl StaticCredentials {
    /// Build from configured users. Entries with malformed digests are
    /// skipped (configuration validation reports them).
    pub fn from_config(users: &[UserConfig]) -> Self {
        let mut map = HashMap::with_capacity(users.len());
        for user in users {
            match parse_digest(&user.password_sha256) {
                Some(digest) => {
                    map.insert(normalize_email(&user.email), digest);
                }
                None => {
                    tracing::warn!(
                        user = %crate::sanitize::sanitize_log_line(&user.email),
                        "Skipping user with malformed password digest"
                    );
                }
            }
        }
        Self { users: map }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, email: &str, password: &str) -> bool {
        let supplied: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        match self.users.get(&normalize_email(email)) {
            Some(stored) => stored.as_slice().ct_eq(supplied.as_slice()).into(),
            None => {
                // Same amount of work for unknown users.
                let _ = [0u8; 32].as_slice().ct_eq(supplied.as_slice());
                false
            }
        }
    }
}
