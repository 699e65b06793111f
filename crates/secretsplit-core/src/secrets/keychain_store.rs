//! System keychain secret store
//!
//! Uses the OS keychain for durable secret storage:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};
use crate::coordinate::SecretCoordinate;
use crate::logging::file_logger as log;

/// Secret store backed by the system keychain
///
/// Each coordinate becomes one keychain entry whose account name is the full
/// coordinate (`<name>_v<version>`), namespaced by the service name. Using
/// distinct service names gives independent persistent and ephemeral stores.
///
/// # Example
///
/// ```no_run
/// use secretsplit_core::coordinate::SecretCoordinate;
/// use secretsplit_core::secrets::{KeychainSecretStore, SecretStore};
///
/// let store = KeychainSecretStore::new();
/// let coordinate = SecretCoordinate::new("source_1_secret_ab", 1);
/// store.write(&coordinate, "hunter2").unwrap();
/// assert!(store.read(&coordinate).is_some());
/// ```
pub struct KeychainSecretStore {
    service_name: String,
}

impl KeychainSecretStore {
    /// Create a new keychain store with the default service name "secretsplit"
    pub fn new() -> Self {
        Self::with_service("secretsplit")
    }

    /// Create a new keychain store with a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
        }
    }

    /// Service name used to namespace entries
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, coordinate: &SecretCoordinate) -> SecretStoreResult<Entry> {
        Entry::new(&self.service_name, &coordinate.full_coordinate())
            .map_err(|e| SecretStoreError::Other(format!("Failed to create keychain entry: {}", e)))
    }
}

impl Default for KeychainSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &str {
        "keychain"
    }

    fn is_available(&self) -> bool {
        // Fails on headless servers without a keychain daemon
        match Entry::new(&self.service_name, "__secretsplit_availability_check__") {
            Ok(_) => true,
            Err(e) => {
                log::warn("KeychainSecretStore", &format!("keychain unavailable: {:?}", e));
                false
            }
        }
    }

    fn read(&self, coordinate: &SecretCoordinate) -> Option<String> {
        let entry = match self.entry(coordinate) {
            Ok(entry) => entry,
            Err(e) => {
                log::error("KeychainSecretStore", &format!("read({}) entry creation failed: {}", coordinate, e));
                return None;
            }
        };

        match entry.get_password() {
            Ok(password) => Some(password),
            Err(keyring::Error::NoEntry) => {
                log::debug("KeychainSecretStore", &format!("read({}) no entry", coordinate));
                None
            }
            Err(e) => {
                log::warn("KeychainSecretStore", &format!("read({}) error: {:?}", coordinate, e));
                None
            }
        }
    }

    fn write(&self, coordinate: &SecretCoordinate, plaintext: &str) -> SecretStoreResult<()> {
        log::info("KeychainSecretStore", &format!("write({}) service='{}'", coordinate, self.service_name));

        let entry = self.entry(coordinate)?;
        entry.set_password(plaintext).map_err(|e| {
            log::error("KeychainSecretStore", &format!("set_password failed: {:?}", e));
            SecretStoreError::Other(format!("Failed to store in keychain: {}", e))
        })?;

        // Read back through a fresh entry
        let verify_entry = self.entry(coordinate)?;
        match verify_entry.get_password() {
            Ok(retrieved) if retrieved == plaintext => Ok(()),
            Ok(other) => {
                log::error(
                    "KeychainSecretStore",
                    &format!("verification failed: expected len={}, got len={}", plaintext.len(), other.len()),
                );
                Err(SecretStoreError::Other("Keychain write verification failed: value mismatch".to_string()))
            }
            Err(e) => Err(SecretStoreError::Other(format!(
                "Keychain write verification failed: could not read back: {}",
                e
            ))),
        }
    }
}
