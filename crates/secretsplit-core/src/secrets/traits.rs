//! Core traits and types for secret storage

use thiserror::Error;

use crate::coordinate::SecretCoordinate;

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Store not available: {0}")]
    NotAvailable(String),

    #[error("Coordinate {0} already holds a different value")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Trait for secret storage implementations
///
/// A secret store maps a [`SecretCoordinate`] to a plaintext value. Entries are
/// append-only from the point of view of this crate: a coordinate is written
/// once and a changed value always gets a new coordinate.
///
/// Implementations:
/// - In-memory for testing (`MemorySecretStore`)
/// - System keychain (`KeychainSecretStore`)
/// - Custom implementations (database, Vault, cloud secret managers, etc.)
///
/// # Example
///
/// ```
/// use secretsplit_core::coordinate::SecretCoordinate;
/// use secretsplit_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::new();
/// let coordinate = SecretCoordinate::new("source_1_secret_ab", 1);
/// store.write(&coordinate, "hunter2").unwrap();
/// assert_eq!(store.read(&coordinate), Some("hunter2".to_string()));
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Check if this store is available
    ///
    /// For example, a keychain store might not be available on a headless server.
    fn is_available(&self) -> bool {
        true
    }

    /// Read the plaintext stored at a coordinate
    fn read(&self, coordinate: &SecretCoordinate) -> Option<String>;

    /// Write the plaintext for a coordinate
    ///
    /// Returns an error if the value could not be durably stored. Callers rely
    /// on `Ok(())` meaning a later `read` of the same coordinate succeeds.
    fn write(&self, coordinate: &SecretCoordinate, plaintext: &str) -> SecretStoreResult<()>;

    /// Check if a coordinate has a stored value
    fn has(&self, coordinate: &SecretCoordinate) -> bool {
        self.read(coordinate).is_some()
    }
}
