//! Named secret store backends
//!
//! Settings refer to stores by name (`"memory"`, `"keychain"`); the registry
//! turns a name plus a namespace into a store instance. Hosts can register
//! their own backends (a vault client, a database table) under new names.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::keychain_store::KeychainSecretStore;
use super::memory_store::MemorySecretStore;
use super::traits::SecretStore;

/// Builds a store instance for a namespace
///
/// Backends shared across instances (the system keychain) use the namespace
/// to keep the persistent and ephemeral stores apart.
pub type StoreFactory = Box<dyn Fn(&str) -> Arc<dyn SecretStore> + Send + Sync>;

/// A registered backend
pub struct StoreDefinition {
    pub name: String,
    pub description: String,
    pub factory: StoreFactory,
}

impl StoreDefinition {
    pub fn new(name: &str, description: &str, factory: StoreFactory) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            factory,
        }
    }

    /// Instantiate the backend for `namespace`
    pub fn create(&self, namespace: &str) -> Arc<dyn SecretStore> {
        (self.factory)(namespace)
    }
}

impl std::fmt::Debug for StoreDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn builtin_stores() -> Vec<StoreDefinition> {
    vec![
        StoreDefinition::new(
            "memory",
            "Process memory; contents vanish on exit",
            Box::new(|_| Arc::new(MemorySecretStore::new())),
        ),
        StoreDefinition::new(
            "keychain",
            "OS credential store, one service per namespace",
            Box::new(|namespace| Arc::new(KeychainSecretStore::with_service(namespace))),
        ),
    ]
}

static REGISTRY: Lazy<RwLock<HashMap<String, StoreDefinition>>> = Lazy::new(|| {
    let stores = builtin_stores()
        .into_iter()
        .map(|def| (def.name.clone(), def))
        .collect();
    RwLock::new(stores)
});

/// Register (or replace) a backend under `name`
///
/// ```
/// use std::sync::Arc;
/// use secretsplit_core::secrets::{register_secret_store, MemorySecretStore};
///
/// register_secret_store("scratch", "Throwaway store", Box::new(|_| Arc::new(MemorySecretStore::new())));
/// ```
pub fn register_secret_store(name: &str, description: &str, factory: StoreFactory) {
    REGISTRY
        .write()
        .insert(name.to_string(), StoreDefinition::new(name, description, factory));
}

/// Instantiate the backend registered as `name`, or `None` if unknown
///
/// ```
/// use secretsplit_core::secrets::create_secret_store;
///
/// let store = create_secret_store("memory", "secretsplit").unwrap();
/// assert_eq!(store.name(), "memory");
/// ```
pub fn create_secret_store(name: &str, namespace: &str) -> Option<Arc<dyn SecretStore>> {
    REGISTRY.read().get(name).map(|def| def.create(namespace))
}

/// `(name, description)` of every backend, sorted by name
pub fn list_secret_stores() -> Vec<(String, String)> {
    let mut stores: Vec<_> = REGISTRY
        .read()
        .values()
        .map(|def| (def.name.clone(), def.description.clone()))
        .collect();
    stores.sort();
    stores
}

pub fn has_secret_store(name: &str) -> bool {
    REGISTRY.read().contains_key(name)
}

/// Remove a backend; returns whether it was registered
pub fn unregister_secret_store(name: &str) -> bool {
    REGISTRY.write().remove(name).is_some()
}
