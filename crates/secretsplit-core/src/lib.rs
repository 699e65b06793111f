//! Secretsplit Core
//!
//! Keeps secrets out of stored configuration documents. A connector's JSON
//! schema marks which fields are secret (`"airbyte_secret": true`); on write
//! those values move into a secret store under versioned coordinates and the
//! document keeps only pointer nodes (`{"_secret": "<name>_v<version>"}`). On
//! read the pointers are resolved back into plaintext.
//!
//! ## Writing and reading
//!
//! ```rust,ignore
//! use secretsplit_core::repository::{SecretsRepositoryReader, SecretsRepositoryWriter};
//!
//! let writer = SecretsRepositoryWriter::new(metadata.clone(), persistent.clone(), ephemeral.clone());
//! let stored = writer.write_source_connection(source, &spec).await?;   // pointer-only
//!
//! let reader = SecretsRepositoryReader::new(metadata, persistent, ephemeral);
//! let raw = reader.get_source_connection_with_secrets(stored.source_id).await?;
//! ```
//!
//! Unchanged secrets keep their coordinate; changed ones get the next
//! version, so earlier versions stay readable.

pub mod types;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod coordinate;
pub mod schema;
pub mod processor;
pub mod metadata;
pub mod repository;

// Re-export commonly used types
pub use types::{
    ConfigBatch, ConfigRecord, ConnectorDefinition, ConnectorSpecification,
    DestinationConnection, EntityIdentity, EntityKind, SourceConnection, StagingConfiguration,
};

pub use secrets::{
    SecretStore, SecretStoreError, SecretStoreResult,
    MemorySecretStore, KeychainSecretStore,
    register_secret_store, create_secret_store, list_secret_stores,
};

pub use logging::{Logger, SharedLogger, NoOpLogger, ConsoleLogger};

pub use config::{BulkSecretsMode, SecretsSettings, SettingsError};

pub use coordinate::{Assignment, CoordinateError, SecretCoordinate};

pub use schema::{ConnectorSchema, SecretPath};

pub use processor::{SecretsError, SecretsResult, SecretsSplitter, SecretsHydrator, SplitOutcome};

pub use metadata::{MetadataStore, MetadataError, MetadataResult, MemoryMetadataStore, FileMetadataStore};

pub use repository::{SecretsRepositoryReader, SecretsRepositoryWriter};
