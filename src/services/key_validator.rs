//! API key validation for the key-auth routes.
//!
//! Keys are held as SHA-256 digests rather than plaintext, and a presented
//! key is hashed the same way before being compared.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Decides whether a presented API key is acceptable.
pub trait KeyValidator: Send + Sync {
    fn validate(&self, key: &str) -> bool;
}

/// Validator backed by a fixed set of keys.
pub struct StaticKeyValidator {
    /// Hex-encoded SHA-256 digests of the accepted keys
    key_hashes: Vec<String>,
}

impl StaticKeyValidator {
    /// Build from plaintext keys; empty entries are ignored.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key_hashes = keys
            .into_iter()
            .map(|key| key.as_ref().trim().to_string())
            .filter(|key| !key.is_empty())
            .map(|key| hash_key(&key))
            .collect();

        Self { key_hashes }
    }

    pub fn len(&self) -> usize {
        self.key_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_hashes.is_empty()
    }
}

impl KeyValidator for StaticKeyValidator {
    fn validate(&self, key: &str) -> bool {
        let presented = hash_key(key);

        // Check every entry so timing does not reveal which one matched
        self.key_hashes.iter().fold(false, |found, stored| {
            let matches: bool = stored.as_bytes().ct_eq(presented.as_bytes()).into();
            found | matches
        })
    }
}

/// Hash an API key using SHA-256, hex encoded.
fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());

    hex::encode(hasher.finalize())
}
