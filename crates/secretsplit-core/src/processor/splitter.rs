//! Splitting secrets out of raw documents
//!
//! The splitter walks a raw document alongside its schema. Every secret leaf
//! is written to the secret store (unless its previous coordinate already
//! holds the same value) and replaced by a pointer node. Everything else is
//! copied through untouched, including fields the schema does not describe.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::error::{SecretsError, SecretsResult};
use super::pointer;
use crate::coordinate::{assign, SecretCoordinate};
use crate::logging::file_logger as log;
use crate::schema::{ConnectorSchema, SchemaView, SecretPath};
use crate::secrets::SecretStore;
use crate::types::EntityIdentity;

/// A pointer-only document plus the coordinates written to produce it
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub document: Value,
    /// Coordinates newly written during this split, in traversal order
    pub written: Vec<SecretCoordinate>,
}

impl SplitOutcome {
    fn unchanged(document: Value) -> Self {
        Self {
            document,
            written: Vec::new(),
        }
    }
}

/// Replaces secret leaves with pointer nodes, writing plaintext to a store
pub struct SecretsSplitter {
    store: Arc<dyn SecretStore>,
}

impl SecretsSplitter {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Split every secret leaf of `raw` that `schema` designates
    ///
    /// `previous` is the entity's currently persisted pointer-only document,
    /// if any. Its pointers at the same paths decide whether a leaf keeps its
    /// coordinate or gets the next version.
    ///
    /// On a store failure the error is returned and no document is produced.
    /// Coordinates written before the failure stay in the store as orphans.
    pub fn split(
        &self,
        raw: &Value,
        schema: &ConnectorSchema,
        identity: &EntityIdentity,
        previous: Option<&Value>,
    ) -> SecretsResult<SplitOutcome> {
        let outcome = self.split_node(raw, schema.view(), previous, identity, &SecretPath::root())?;
        log::debug(
            "SecretsSplitter",
            &format!("split {}: {} secret(s) written", identity, outcome.written.len()),
        );
        Ok(outcome)
    }

    /// Treat the whole of `document` as one secret
    ///
    /// The payload is the compact JSON serialization of the document (object
    /// keys sorted), diffed against the value behind `previous` when that is
    /// a pointer node. The result document is a single pointer node. A
    /// document that already is a pointer node is kept only if it is the
    /// entity's own current pointer.
    pub fn split_document(
        &self,
        document: &Value,
        identity: &EntityIdentity,
        previous: Option<&Value>,
    ) -> SecretsResult<SplitOutcome> {
        let root = SecretPath::root();
        if let Some(coordinate) = pointer::pointer_coordinate(document) {
            return self.keep_pointer(document, coordinate?, previous, identity, &root);
        }
        let payload = serde_json::to_string(document)?;
        self.store_plaintext(&payload, identity, &root, previous)
    }

    fn split_node(
        &self,
        node: &Value,
        view: SchemaView<'_>,
        previous: Option<&Value>,
        identity: &EntityIdentity,
        path: &SecretPath,
    ) -> SecretsResult<SplitOutcome> {
        if view.is_empty() {
            return Ok(SplitOutcome::unchanged(node.clone()));
        }
        if view.is_secret() {
            return self.split_secret_leaf(node, previous, identity, path);
        }

        match node {
            Value::Object(map) => {
                let mut document = Map::new();
                let mut written = Vec::new();
                for (key, child) in map {
                    let previous_child = previous.and_then(|p| p.get(key.as_str()));
                    let outcome = self.split_node(
                        child,
                        view.property(key),
                        previous_child,
                        identity,
                        &path.key(key.as_str()),
                    )?;
                    written.extend(outcome.written);
                    document.insert(key.clone(), outcome.document);
                }
                Ok(SplitOutcome {
                    document: Value::Object(document),
                    written,
                })
            }
            Value::Array(items) => {
                let mut document = Vec::with_capacity(items.len());
                let mut written = Vec::new();
                for (index, child) in items.iter().enumerate() {
                    let previous_child = previous.and_then(|p| p.get(index));
                    let outcome =
                        self.split_node(child, view.item(index), previous_child, identity, &path.index(index))?;
                    written.extend(outcome.written);
                    document.push(outcome.document);
                }
                Ok(SplitOutcome {
                    document: Value::Array(document),
                    written,
                })
            }
            scalar => Ok(SplitOutcome::unchanged(scalar.clone())),
        }
    }

    fn split_secret_leaf(
        &self,
        node: &Value,
        previous: Option<&Value>,
        identity: &EntityIdentity,
        path: &SecretPath,
    ) -> SecretsResult<SplitOutcome> {
        let plaintext = match node {
            // Optional secret left unset
            Value::Null => return Ok(SplitOutcome::unchanged(Value::Null)),
            Value::String(value) => value.clone(),
            other => match pointer::pointer_coordinate(other) {
                // Already split, e.g. a client sent back the stored pointer
                Some(coordinate) => return self.keep_pointer(other, coordinate?, previous, identity, path),
                None => other.to_string(),
            },
        };
        self.store_plaintext(&plaintext, identity, path, previous)
    }

    /// Pass an existing pointer node through
    ///
    /// Only the pointer the entity already holds at `path` is accepted, and
    /// it must still resolve.
    fn keep_pointer(
        &self,
        node: &Value,
        coordinate: SecretCoordinate,
        previous: Option<&Value>,
        identity: &EntityIdentity,
        path: &SecretPath,
    ) -> SecretsResult<SplitOutcome> {
        let previous_coordinate = previous.and_then(pointer::pointer_coordinate).transpose()?;
        if previous_coordinate.as_ref() != Some(&coordinate) {
            return Err(SecretsError::ForeignPointer {
                entity: identity.to_string(),
                path: path.to_string(),
                coordinate: coordinate.full_coordinate(),
            });
        }
        if !self.store.has(&coordinate) {
            return Err(SecretsError::unresolved(coordinate.full_coordinate()));
        }
        Ok(SplitOutcome::unchanged(node.clone()))
    }

    fn store_plaintext(
        &self,
        plaintext: &str,
        identity: &EntityIdentity,
        path: &SecretPath,
        previous: Option<&Value>,
    ) -> SecretsResult<SplitOutcome> {
        let previous_coordinate = previous.and_then(pointer::pointer_coordinate).transpose()?;
        let assignment = assign(identity, path, plaintext, previous_coordinate.as_ref(), |coordinate| {
            self.store.read(coordinate)
        });

        let mut written = Vec::new();
        if assignment.requires_write() {
            let coordinate = assignment.coordinate();
            self.store
                .write(coordinate, plaintext)
                .map_err(|source| SecretsError::StoreWrite {
                    coordinate: coordinate.full_coordinate(),
                    source,
                })?;
            log::debug(
                "SecretsSplitter",
                &format!("wrote {} for {} at {}", coordinate, identity, path),
            );
            written.push(coordinate.clone());
        }

        Ok(SplitOutcome {
            document: pointer::pointer_node(assignment.coordinate()),
            written,
        })
    }
}
