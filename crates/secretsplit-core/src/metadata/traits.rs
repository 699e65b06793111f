//! Metadata store trait

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{ConfigBatch, ConfigRecord, EntityIdentity, EntityKind};

/// Store of pointer-only entity records
///
/// Only pointer-only documents may be written here; the secrets repository
/// writer is the component that guarantees it.
///
/// Implementations:
/// - `MemoryMetadataStore`: In-memory for testing
/// - `FileMetadataStore`: YAML file
/// - Database-backed stores in a hosting application
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch the record of an entity
    ///
    /// Returns `MetadataError::NotFound` if the entity has never been written.
    async fn get_record(&self, identity: &EntityIdentity) -> MetadataResult<ConfigRecord>;

    /// All records of one kind
    async fn list_records(&self, kind: EntityKind) -> MetadataResult<Vec<ConfigRecord>>;

    /// Insert or replace the record of an entity
    async fn write_record(&self, record: ConfigRecord) -> MetadataResult<()>;

    /// Replace the entire contents of the store with `batch`
    ///
    /// With `dry_run` the batch is validated but nothing is changed.
    async fn replace_all(&self, batch: ConfigBatch, dry_run: bool) -> MetadataResult<()>;
}

/// Errors that can occur during metadata store operations
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Metadata store error: {0}")]
    Other(String),
}

impl MetadataError {
    pub fn not_found(identity: &EntityIdentity) -> Self {
        Self::NotFound {
            kind: identity.kind,
            id: identity.id,
        }
    }
}

pub type MetadataResult<T> = Result<T, MetadataError>;
