//! Errors raised while splitting, hydrating and persisting configurations

use thiserror::Error;
use uuid::Uuid;

use crate::coordinate::CoordinateError;
use crate::metadata::MetadataError;
use crate::secrets::SecretStoreError;
use crate::types::EntityKind;

/// Errors that can occur while moving secrets in or out of documents
#[derive(Error, Debug)]
pub enum SecretsError {
    /// A pointer references a coordinate with no stored plaintext
    #[error("Unresolved secret: nothing stored at coordinate {coordinate}")]
    UnresolvedSecret { coordinate: String },

    /// A pointer holds a string that is not a valid coordinate
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),

    /// The secret store rejected a write; nothing referencing it was persisted
    #[error("Failed to write secret {coordinate}: {source}")]
    StoreWrite {
        coordinate: String,
        #[source]
        source: SecretStoreError,
    },

    /// A raw document carries a pointer that is not the entity's own pointer
    /// at that path
    #[error("Pointer {coordinate} at {path} does not belong to {entity}")]
    ForeignPointer {
        entity: String,
        path: String,
        coordinate: String,
    },

    /// The same entity appears more than once in a bulk batch
    #[error("{entity} appears more than once in the batch")]
    DuplicateEntity { entity: String },

    /// A secret leaf still held plaintext where only pointers are allowed
    #[error("Plaintext value at secret path {path} of {entity}")]
    PlaintextSecret { entity: String, path: String },

    /// No connector spec could be found to split a connection with
    #[error("No connector spec for {kind} {id}: definition {definition_id} not found")]
    MissingSchema {
        kind: EntityKind,
        id: Uuid,
        definition_id: Uuid,
    },

    #[error("Metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SecretsError {
    pub fn unresolved(coordinate: impl Into<String>) -> Self {
        Self::UnresolvedSecret {
            coordinate: coordinate.into(),
        }
    }

    /// Whether this error means the requested entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretsError::Metadata(MetadataError::NotFound { .. }))
    }
}

pub type SecretsResult<T> = Result<T, SecretsError>;
