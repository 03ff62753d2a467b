use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

use super::SigningKeyConfig;

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Signing key id must not be empty")]
    EmptyKeyId,
    #[error("Duplicate signing key id: {0}")]
    DuplicateKeyId(String),
    #[error("Secret for key {0} is not valid base64")]
    InvalidSecretEncoding(String),
    #[error("Secret for key {0} is empty")]
    EmptySecret(String),
}

/// Shared secret for one caller. Immutable once loaded.
#[derive(Clone)]
pub struct KeyRecord {
    pub key_id: String,
    pub secret: Vec<u8>,
}

impl KeyRecord {
    pub fn new(key_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }
}

// Never print key material, even at trace level.
impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Read-only mapping from caller identifier to its secret.
///
/// Built once at startup and shared behind an `Arc`; there is no runtime
/// insert or delete, so concurrent readers need no locking.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: HashMap<String, KeyRecord>,
}

impl KeyStore {
    pub fn new(records: impl IntoIterator<Item = KeyRecord>) -> Result<Self, KeyStoreError> {
        let mut keys = HashMap::new();

        for record in records {
            if record.key_id.is_empty() {
                return Err(KeyStoreError::EmptyKeyId);
            }
            if record.secret.is_empty() {
                return Err(KeyStoreError::EmptySecret(record.key_id));
            }
            if keys.contains_key(&record.key_id) {
                return Err(KeyStoreError::DuplicateKeyId(record.key_id));
            }
            keys.insert(record.key_id.clone(), record);
        }

        Ok(Self { keys })
    }

    /// Decodes the base64 secrets from configuration.
    pub fn from_config(configs: &[SigningKeyConfig]) -> Result<Self, KeyStoreError> {
        let records = configs
            .iter()
            .map(|config| {
                let secret = general_purpose::STANDARD
                    .decode(&config.secret)
                    .map_err(|_| KeyStoreError::InvalidSecretEncoding(config.key_id.clone()))?;
                Ok(KeyRecord::new(config.key_id.clone(), secret))
            })
            .collect::<Result<Vec<_>, KeyStoreError>>()?;

        Self::new(records)
    }

    /// Unknown ids are a normal outcome, not a fault.
    pub fn lookup(&self, key_id: &str) -> Option<&KeyRecord> {
        self.keys.get(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        let store = KeyStore::new([KeyRecord::new("abc", b"secret".to_vec())]).unwrap();

        assert_eq!(store.lookup("abc").unwrap().secret, b"secret");
        assert!(store.lookup("ABC").is_none());
        assert!(store.lookup("missing").is_none());
    }

    #[test]
    fn test_duplicate_key_id_rejected() {
        let result = KeyStore::new([
            KeyRecord::new("abc", b"one".to_vec()),
            KeyRecord::new("abc", b"two".to_vec()),
        ]);
        assert!(matches!(result, Err(KeyStoreError::DuplicateKeyId(id)) if id == "abc"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = KeyStore::new([KeyRecord::new("abc", Vec::new())]);
        assert!(matches!(result, Err(KeyStoreError::EmptySecret(_))));
    }

    #[test]
    fn test_from_config_decodes_base64() {
        let configs = vec![SigningKeyConfig {
            key_id: "abc".to_string(),
            secret: general_purpose::STANDARD.encode(b"shared-secret"),
        }];

        let store = KeyStore::from_config(&configs).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("abc").unwrap().secret, b"shared-secret");
    }

    #[test]
    fn test_from_config_rejects_bad_base64() {
        let configs = vec![SigningKeyConfig {
            key_id: "abc".to_string(),
            secret: "not base64!!".to_string(),
        }];

        assert!(matches!(
            KeyStore::from_config(&configs),
            Err(KeyStoreError::InvalidSecretEncoding(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let record = KeyRecord::new("abc", b"top-secret".to_vec());
        let printed = format!("{:?}", record);
        assert!(printed.contains("abc"));
        assert!(!printed.contains("top-secret"));
    }
}
