//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};
use crate::coordinate::SecretCoordinate;

/// Secret store backed by a map in process memory
///
/// Used for tests and as the default ephemeral store. Contents are lost when
/// the store is dropped. Writing a coordinate again with the same value is a
/// no-op; writing it with a different value fails with
/// [`SecretStoreError::Conflict`].
///
/// ```
/// use secretsplit_core::coordinate::SecretCoordinate;
/// use secretsplit_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::new();
/// let coordinate = SecretCoordinate::new("destination_1_secret_ff", 1);
/// store.write(&coordinate, "sk-test").unwrap();
/// assert_eq!(store.read(&coordinate).as_deref(), Some("sk-test"));
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<SecretCoordinate, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from existing entries
    pub fn with_secrets(initial: impl IntoIterator<Item = (SecretCoordinate, String)>) -> Self {
        Self {
            secrets: RwLock::new(initial.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }

    /// Every entry, sorted by coordinate
    pub fn entries(&self) -> Vec<(SecretCoordinate, String)> {
        let mut entries: Vec<_> = self
            .secrets
            .read()
            .iter()
            .map(|(coordinate, value)| (coordinate.clone(), value.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Stored versions of one secret name, ascending
    pub fn versions(&self, name: &str) -> Vec<u64> {
        let mut versions: Vec<u64> = self
            .secrets
            .read()
            .keys()
            .filter(|coordinate| coordinate.name() == name)
            .map(SecretCoordinate::version)
            .collect();
        versions.sort_unstable();
        versions
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, coordinate: &SecretCoordinate) -> Option<String> {
        self.secrets.read().get(coordinate).cloned()
    }

    fn write(&self, coordinate: &SecretCoordinate, plaintext: &str) -> SecretStoreResult<()> {
        let mut secrets = self.secrets.write();
        match secrets.get(coordinate) {
            Some(existing) if existing != plaintext => Err(SecretStoreError::Conflict(coordinate.full_coordinate())),
            Some(_) => Ok(()),
            None => {
                secrets.insert(coordinate.clone(), plaintext.to_string());
                Ok(())
            }
        }
    }
}
