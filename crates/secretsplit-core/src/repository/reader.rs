//! Reading configurations back with their secrets

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::metadata::{MetadataError, MetadataStore};
use crate::processor::{SecretsHydrator, SecretsResult};
use crate::secrets::SecretStore;
use crate::types::{DestinationConnection, EntityIdentity, EntityKind, SourceConnection, StagingConfiguration};

/// Loads pointer-only records and hydrates them into raw form
///
/// Hydrated values are returned to the caller only; nothing is written back.
pub struct SecretsRepositoryReader {
    metadata: Arc<dyn MetadataStore>,
    persistent: SecretsHydrator,
    ephemeral: SecretsHydrator,
}

impl SecretsRepositoryReader {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        persistent: Arc<dyn SecretStore>,
        ephemeral: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            metadata,
            persistent: SecretsHydrator::new(persistent),
            ephemeral: SecretsHydrator::new(ephemeral),
        }
    }

    /// Fetch a source connection with its secrets resolved
    pub async fn get_source_connection_with_secrets(&self, source_id: Uuid) -> SecretsResult<SourceConnection> {
        let identity = EntityIdentity::new(EntityKind::SourceConnection, source_id);
        let source = self
            .metadata
            .get_record(&identity)
            .await?
            .into_source_connection()
            .ok_or_else(|| MetadataError::not_found(&identity))?;
        self.hydrate_source(source)
    }

    /// Every stored source connection, hydrated
    pub async fn list_source_connections_with_secrets(&self) -> SecretsResult<Vec<SourceConnection>> {
        self.metadata
            .list_records(EntityKind::SourceConnection)
            .await?
            .into_iter()
            .filter_map(|record| record.into_source_connection())
            .map(|source| self.hydrate_source(source))
            .collect()
    }

    /// Fetch a destination connection with its secrets resolved
    pub async fn get_destination_connection_with_secrets(
        &self,
        destination_id: Uuid,
    ) -> SecretsResult<DestinationConnection> {
        let identity = EntityIdentity::new(EntityKind::DestinationConnection, destination_id);
        let destination = self
            .metadata
            .get_record(&identity)
            .await?
            .into_destination_connection()
            .ok_or_else(|| MetadataError::not_found(&identity))?;
        self.hydrate_destination(destination)
    }

    /// Every stored destination connection, hydrated
    pub async fn list_destination_connections_with_secrets(&self) -> SecretsResult<Vec<DestinationConnection>> {
        self.metadata
            .list_records(EntityKind::DestinationConnection)
            .await?
            .into_iter()
            .filter_map(|record| record.into_destination_connection())
            .map(|destination| self.hydrate_destination(destination))
            .collect()
    }

    /// Fetch a staging configuration with its payload parsed back into a document
    ///
    /// A configuration that was stored before it was ever split (not a
    /// pointer node) is hydrated field by field instead.
    pub async fn get_staging_configuration_with_secrets(
        &self,
        destination_definition_id: Uuid,
    ) -> SecretsResult<StagingConfiguration> {
        let identity = EntityIdentity::new(EntityKind::StagingConfiguration, destination_definition_id);
        let staging = self
            .metadata
            .get_record(&identity)
            .await?
            .into_staging_configuration()
            .ok_or_else(|| MetadataError::not_found(&identity))?;

        let configuration = match self.persistent.hydrate_pointer(&staging.configuration)? {
            Some(payload) => serde_json::from_str(&payload)?,
            None => self.persistent.hydrate(&staging.configuration)?,
        };
        Ok(staging.with_configuration(configuration))
    }

    /// Hydrate a document split into the persistent store
    pub fn hydrate(&self, document: &Value) -> SecretsResult<Value> {
        self.persistent.hydrate(document)
    }

    /// Hydrate a document produced by an ephemeral split
    pub fn hydrate_ephemeral(&self, document: &Value) -> SecretsResult<Value> {
        self.ephemeral.hydrate(document)
    }

    fn hydrate_source(&self, source: SourceConnection) -> SecretsResult<SourceConnection> {
        let configuration = self.persistent.hydrate(&source.configuration)?;
        Ok(source.with_configuration(configuration))
    }

    fn hydrate_destination(&self, destination: DestinationConnection) -> SecretsResult<DestinationConnection> {
        let configuration = self.persistent.hydrate(&destination.configuration)?;
        Ok(destination.with_configuration(configuration))
    }
}
