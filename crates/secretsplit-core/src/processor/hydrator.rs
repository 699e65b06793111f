//! Resolving pointer nodes back into plaintext

use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::{SecretsError, SecretsResult};
use super::pointer;
use crate::secrets::SecretStore;

/// Replaces every pointer node in a document with its stored plaintext
///
/// Hydration only reads from the store. It either resolves every pointer or
/// fails; a partially hydrated document is never returned.
pub struct SecretsHydrator {
    store: Arc<dyn SecretStore>,
}

impl SecretsHydrator {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Hydrate a pointer-only document into its raw form
    pub fn hydrate(&self, document: &Value) -> SecretsResult<Value> {
        if pointer::is_pointer(document) {
            return self.resolve(document).map(Value::String);
        }

        match document {
            Value::Object(map) => {
                let mut hydrated = Map::new();
                for (key, child) in map {
                    hydrated.insert(key.clone(), self.hydrate(child)?);
                }
                Ok(Value::Object(hydrated))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.hydrate(item))
                .collect::<SecretsResult<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }

    /// Plaintext behind a single pointer node
    ///
    /// Returns `Ok(None)` when `node` is not a pointer node.
    pub fn hydrate_pointer(&self, node: &Value) -> SecretsResult<Option<String>> {
        if pointer::is_pointer(node) {
            self.resolve(node).map(Some)
        } else {
            Ok(None)
        }
    }

    fn resolve(&self, node: &Value) -> SecretsResult<String> {
        let coordinate = match pointer::pointer_coordinate(node) {
            Some(parsed) => parsed?,
            None => return Err(SecretsError::unresolved(node.to_string())),
        };
        self.store
            .read(&coordinate)
            .ok_or_else(|| SecretsError::unresolved(coordinate.full_coordinate()))
    }
}
