//! Secret storage abstractions and implementations
//!
//! This module provides a pluggable, coordinate-addressed secret storage system with:
//! - `SecretStore` trait for implementing custom stores
//! - Built-in implementations: `MemorySecretStore`, `KeychainSecretStore`
//! - A registry for discovering and creating stores by name

mod traits;
mod memory_store;
mod keychain_store;
mod registry;

pub use traits::{SecretStore, SecretStoreError, SecretStoreResult};
pub use memory_store::MemorySecretStore;
pub use keychain_store::KeychainSecretStore;
pub use registry::{
    register_secret_store, create_secret_store, list_secret_stores, has_secret_store,
    unregister_secret_store, StoreDefinition, StoreFactory,
};
