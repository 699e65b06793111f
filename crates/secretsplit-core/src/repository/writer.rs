//! Persisting configurations with their secrets split out
//!
//! Every write follows the same sequence:
//! 1. fetch the entity's previous pointer-only document (none on first create)
//! 2. split the incoming raw document against it, writing new secrets
//! 3. write the pointer-only record to the metadata store
//!
//! A secret write failure aborts before step 3. A metadata failure after
//! step 2 leaves the new secrets orphaned; they are logged and the error is
//! returned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::locks::{EntityGuard, EntityLocks};
use crate::config::{BulkSecretsMode, SecretsSettings, SettingsResult};
use crate::coordinate::SecretCoordinate;
use crate::logging::{NoOpLogger, SharedLogger};
use crate::metadata::{MetadataError, MetadataStore};
use crate::processor::{pointer, SecretsError, SecretsResult, SecretsSplitter, SplitOutcome};
use crate::schema::SecretPath;
use crate::secrets::SecretStore;
use crate::types::{
    ConfigBatch, ConfigRecord, ConnectorSpecification, DestinationConnection, EntityIdentity, EntityKind,
    SourceConnection, StagingConfiguration,
};
use crate::{log_debug, log_info, log_warn};

/// Writes configurations so that only pointer-only documents reach the
/// metadata store
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use serde_json::json;
/// use uuid::Uuid;
/// use secretsplit_core::metadata::MemoryMetadataStore;
/// use secretsplit_core::repository::SecretsRepositoryWriter;
/// use secretsplit_core::secrets::MemorySecretStore;
/// use secretsplit_core::types::{ConnectorSpecification, SourceConnection};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let writer = SecretsRepositoryWriter::new(
///     Arc::new(MemoryMetadataStore::new()),
///     Arc::new(MemorySecretStore::new()),
///     Arc::new(MemorySecretStore::new()),
/// );
/// let spec = ConnectorSpecification::new(json!({
///     "properties": { "password": { "type": "string", "airbyte_secret": true } }
/// }));
/// let source = SourceConnection::new(Uuid::new_v4(), Uuid::new_v4(), json!({ "password": "abc" }));
/// let stored = writer.write_source_connection(source, &spec).await?;
/// assert!(stored.configuration["password"].get("_secret").is_some());
/// # Ok(())
/// # }
/// ```
pub struct SecretsRepositoryWriter {
    metadata: Arc<dyn MetadataStore>,
    persistent: SecretsSplitter,
    ephemeral: SecretsSplitter,
    bulk_mode: BulkSecretsMode,
    locks: Option<EntityLocks>,
    logger: SharedLogger,
}

impl SecretsRepositoryWriter {
    /// Create a writer over a metadata store and the two secret stores
    ///
    /// Defaults: `BulkSecretsMode::Split`, per-entity write serialization on,
    /// silent logger.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        persistent: Arc<dyn SecretStore>,
        ephemeral: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            metadata,
            persistent: SecretsSplitter::new(persistent),
            ephemeral: SecretsSplitter::new(ephemeral),
            bulk_mode: BulkSecretsMode::default(),
            locks: Some(EntityLocks::new()),
            logger: NoOpLogger::shared(),
        }
    }

    /// Create a writer with stores and flags taken from settings
    pub fn from_settings(metadata: Arc<dyn MetadataStore>, settings: &SecretsSettings) -> SettingsResult<Self> {
        let stores = settings.build_stores()?;
        Ok(Self::new(metadata, stores.persistent, stores.ephemeral)
            .with_bulk_mode(settings.bulk_mode)
            .with_entity_serialization(settings.serialize_entity_writes))
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_bulk_mode(mut self, mode: BulkSecretsMode) -> Self {
        self.bulk_mode = mode;
        self
    }

    /// Turn per-entity write serialization on or off
    pub fn with_entity_serialization(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(EntityLocks::new);
        self
    }

    pub fn bulk_mode(&self) -> BulkSecretsMode {
        self.bulk_mode
    }

    /// Split and persist a source connection
    ///
    /// Returns the pointer-only connection that was written.
    pub async fn write_source_connection(
        &self,
        source: SourceConnection,
        spec: &ConnectorSpecification,
    ) -> SecretsResult<SourceConnection> {
        let identity = source.identity();
        let _guard = self.lock(&identity).await;

        let outcome = self.split_for_write(&identity, &source.configuration, Some(spec)).await?;
        let source = source.with_configuration(outcome.document);
        self.persist(source.clone().into(), &outcome.written).await?;
        Ok(source)
    }

    /// Split and persist a destination connection
    ///
    /// Returns the pointer-only connection that was written.
    pub async fn write_destination_connection(
        &self,
        destination: DestinationConnection,
        spec: &ConnectorSpecification,
    ) -> SecretsResult<DestinationConnection> {
        let identity = destination.identity();
        let _guard = self.lock(&identity).await;

        let outcome = self
            .split_for_write(&identity, &destination.configuration, Some(spec))
            .await?;
        let destination = destination.with_configuration(outcome.document);
        self.persist(destination.clone().into(), &outcome.written).await?;
        Ok(destination)
    }

    /// Split a document that will never be persisted
    ///
    /// Secrets go to the ephemeral store under a fresh identity, so repeated
    /// calls never share coordinates. Nothing is written to the metadata
    /// store.
    pub fn split_ephemeral(&self, document: &Value, spec: &ConnectorSpecification) -> SecretsResult<Value> {
        let identity = EntityIdentity::ephemeral();
        let outcome = self.ephemeral.split(document, &spec.schema(), &identity, None)?;
        log_debug!(
            self.logger,
            "ephemeral split {}: {} secret(s)",
            identity,
            outcome.written.len()
        );
        Ok(outcome.document)
    }

    /// Persist a staging configuration as a single secret
    ///
    /// The serialized document is compared with the previously stored
    /// payload: identical content keeps the coordinate, anything else gets
    /// the next version. The persisted configuration is one pointer node.
    pub async fn write_staging_configuration(
        &self,
        staging: StagingConfiguration,
    ) -> SecretsResult<StagingConfiguration> {
        let identity = staging.identity();
        let _guard = self.lock(&identity).await;

        let outcome = self.split_for_write(&identity, &staging.configuration, None).await?;
        let staging = staging.with_configuration(outcome.document);
        self.persist(staging.clone().into(), &outcome.written).await?;
        Ok(staging)
    }

    /// Replace every stored record with `batch`
    ///
    /// Connections are split with the connector spec of their definition,
    /// which must be part of the same batch. Staging configurations are
    /// split as whole documents. Definitions pass through unchanged. How
    /// secrets are handled depends on the configured [`BulkSecretsMode`].
    /// An entity with a configuration may appear only once.
    /// `dry_run` is handed to the metadata store.
    pub async fn replace_all_configs(&self, batch: ConfigBatch, dry_run: bool) -> SecretsResult<()> {
        if self.bulk_mode == BulkSecretsMode::Passthrough {
            log_info!(self.logger, "bulk replace: passthrough, {} kind(s)", batch.len());
            return self.replace_batch(batch, dry_run, &[]).await;
        }

        // Duplicates would split against the same previous document and
        // mint the same coordinates for different values
        let mut seen = HashSet::new();
        for record in batch.values().flatten().filter(|record| record.configuration().is_some()) {
            let identity = record.identity();
            if !seen.insert(identity) {
                return Err(SecretsError::DuplicateEntity {
                    entity: identity.to_string(),
                });
            }
        }

        let specs = BatchSpecs::collect(&batch);
        // Resolve every schema up front so a missing one aborts before any write
        for record in batch.values().flatten() {
            specs.for_record(record)?;
        }

        let _guards = self.lock_batch(&batch).await;

        let mut prepared = ConfigBatch::new();
        let mut written = Vec::new();
        for (kind, records) in batch {
            let mut out = Vec::with_capacity(records.len());
            for record in records {
                let record = match self.bulk_mode {
                    BulkSecretsMode::RequirePointers => self.require_pointers(record, &specs)?,
                    _ => {
                        let outcome = match self.split_bulk_record(&record, &specs).await {
                            Ok(outcome) => outcome,
                            Err(err) => {
                                self.report_orphans(&written, &err);
                                return Err(err);
                            }
                        };
                        match outcome {
                            Some(outcome) => {
                                written.extend(outcome.written);
                                record.with_configuration(outcome.document)
                            }
                            None => record,
                        }
                    }
                };
                out.push(record);
            }
            prepared.insert(kind, out);
        }

        log_info!(
            self.logger,
            "bulk replace: {} secret(s) written, dry_run={}",
            written.len(),
            dry_run
        );
        self.replace_batch(prepared, dry_run, &written).await
    }

    /// Split `configuration` against the entity's stored document
    ///
    /// With a spec the document is split field by field; without one the
    /// whole document is a single secret.
    async fn split_for_write(
        &self,
        identity: &EntityIdentity,
        configuration: &Value,
        spec: Option<&ConnectorSpecification>,
    ) -> SecretsResult<SplitOutcome> {
        let previous = self.previous_configuration(identity).await?;
        let outcome = match spec {
            Some(spec) => self
                .persistent
                .split(configuration, &spec.schema(), identity, previous.as_ref())?,
            None => self
                .persistent
                .split_document(configuration, identity, previous.as_ref())?,
        };
        log_debug!(self.logger, "split {} ({} new secret(s))", identity, outcome.written.len());
        Ok(outcome)
    }

    /// Split one record of a bulk batch; `None` for records without secrets
    async fn split_bulk_record(&self, record: &ConfigRecord, specs: &BatchSpecs) -> SecretsResult<Option<SplitOutcome>> {
        match record.configuration() {
            Some(configuration) => {
                let spec = specs.for_record(record)?;
                self.split_for_write(&record.identity(), configuration, spec)
                    .await
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn require_pointers(&self, record: ConfigRecord, specs: &BatchSpecs) -> SecretsResult<ConfigRecord> {
        let identity = record.identity();
        let configuration = match record.configuration() {
            Some(configuration) => configuration,
            None => return Ok(record),
        };

        let plaintext = match specs.for_record(&record)? {
            Some(spec) => spec.schema().plaintext_paths(configuration).into_iter().next(),
            None if pointer::is_pointer(configuration) => None,
            None => Some(SecretPath::root()),
        };
        if let Some(path) = plaintext {
            return Err(SecretsError::PlaintextSecret {
                entity: identity.to_string(),
                path: path.to_string(),
            });
        }
        Ok(record)
    }

    async fn lock(&self, identity: &EntityIdentity) -> Option<EntityGuard> {
        match &self.locks {
            Some(locks) => Some(locks.lock(identity).await),
            None => None,
        }
    }

    async fn lock_batch(&self, batch: &ConfigBatch) -> Vec<EntityGuard> {
        match &self.locks {
            Some(locks) => {
                let identities = batch
                    .values()
                    .flatten()
                    .filter(|record| record.configuration().is_some())
                    .map(ConfigRecord::identity);
                locks.lock_all(identities).await
            }
            None => Vec::new(),
        }
    }

    /// The entity's stored pointer-only document, `None` if never written
    async fn previous_configuration(&self, identity: &EntityIdentity) -> SecretsResult<Option<Value>> {
        match self.metadata.get_record(identity).await {
            Ok(record) => Ok(record.configuration().cloned()),
            Err(MetadataError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, record: ConfigRecord, written: &[SecretCoordinate]) -> SecretsResult<()> {
        let identity = record.identity();
        if let Err(err) = self.metadata.write_record(record).await {
            let err = SecretsError::from(err);
            self.report_orphans(written, &err);
            return Err(err);
        }
        log_debug!(self.logger, "persisted {}", identity);
        Ok(())
    }

    async fn replace_batch(&self, batch: ConfigBatch, dry_run: bool, written: &[SecretCoordinate]) -> SecretsResult<()> {
        if let Err(err) = self.metadata.replace_all(batch, dry_run).await {
            let err = SecretsError::from(err);
            self.report_orphans(written, &err);
            return Err(err);
        }
        Ok(())
    }

    fn report_orphans(&self, written: &[SecretCoordinate], err: &SecretsError) {
        for coordinate in written {
            log_warn!(self.logger, "orphaned secret {} ({})", coordinate, err);
        }
    }
}

/// Connector specs of the definitions contained in a bulk batch
struct BatchSpecs {
    sources: HashMap<Uuid, ConnectorSpecification>,
    destinations: HashMap<Uuid, ConnectorSpecification>,
}

impl BatchSpecs {
    fn collect(batch: &ConfigBatch) -> Self {
        let mut sources = HashMap::new();
        let mut destinations = HashMap::new();
        for record in batch.values().flatten() {
            match record {
                ConfigRecord::SourceDefinition(def) => {
                    sources.insert(def.definition_id, def.spec.clone());
                }
                ConfigRecord::DestinationDefinition(def) => {
                    destinations.insert(def.definition_id, def.spec.clone());
                }
                _ => {}
            }
        }
        Self { sources, destinations }
    }

    /// Spec a record is split with
    ///
    /// `Ok(None)` for records that are not split field-by-field (staging
    /// configurations and definitions).
    fn for_record(&self, record: &ConfigRecord) -> SecretsResult<Option<&ConnectorSpecification>> {
        let (specs, kind, id, definition_id) = match record {
            ConfigRecord::SourceConnection(source) => (
                &self.sources,
                EntityKind::SourceConnection,
                source.source_id,
                source.source_definition_id,
            ),
            ConfigRecord::DestinationConnection(destination) => (
                &self.destinations,
                EntityKind::DestinationConnection,
                destination.destination_id,
                destination.destination_definition_id,
            ),
            _ => return Ok(None),
        };
        specs
            .get(&definition_id)
            .map(Some)
            .ok_or(SecretsError::MissingSchema { kind, id, definition_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::coordinate::derive_name;
    use crate::logging::{LogLevel, MemoryLogger};
    use crate::metadata::{MemoryMetadataStore, MetadataResult};
    use crate::processor::SecretsHydrator;
    use crate::secrets::{MemorySecretStore, SecretStoreError, SecretStoreResult};
    use crate::types::ConnectorDefinition;

    /// Secret store that rejects every write
    struct FailingSecretStore;

    impl SecretStore for FailingSecretStore {
        fn name(&self) -> &str {
            "failing"
        }

        fn read(&self, _coordinate: &SecretCoordinate) -> Option<String> {
            None
        }

        fn write(&self, _coordinate: &SecretCoordinate, _value: &str) -> SecretStoreResult<()> {
            Err(SecretStoreError::NotAvailable("store is down".to_string()))
        }
    }

    /// Metadata store that reads fine but fails every write
    #[derive(Default)]
    struct FailingMetadataStore {
        inner: MemoryMetadataStore,
    }

    #[async_trait]
    impl MetadataStore for FailingMetadataStore {
        async fn get_record(&self, identity: &EntityIdentity) -> MetadataResult<ConfigRecord> {
            self.inner.get_record(identity).await
        }

        async fn list_records(&self, kind: EntityKind) -> MetadataResult<Vec<ConfigRecord>> {
            self.inner.list_records(kind).await
        }

        async fn write_record(&self, _record: ConfigRecord) -> MetadataResult<()> {
            Err(MetadataError::Other("database unavailable".to_string()))
        }

        async fn replace_all(&self, _batch: ConfigBatch, _dry_run: bool) -> MetadataResult<()> {
            Err(MetadataError::Other("database unavailable".to_string()))
        }
    }

    fn password_spec() -> ConnectorSpecification {
        ConnectorSpecification::new(json!({
            "type": "object",
            "properties": {
                "username": { "type": "string" },
                "password": { "type": "string", "airbyte_secret": true }
            }
        }))
    }

    struct Fixture {
        metadata: Arc<MemoryMetadataStore>,
        persistent: Arc<MemorySecretStore>,
        ephemeral: Arc<MemorySecretStore>,
        writer: SecretsRepositoryWriter,
    }

    fn fixture() -> Fixture {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let persistent = Arc::new(MemorySecretStore::new());
        let ephemeral = Arc::new(MemorySecretStore::new());
        let writer = SecretsRepositoryWriter::new(metadata.clone(), persistent.clone(), ephemeral.clone());
        Fixture {
            metadata,
            persistent,
            ephemeral,
            writer,
        }
    }

    fn pointer_of(value: &Value) -> SecretCoordinate {
        pointer::pointer_coordinate(value).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_source_versions_across_updates() {
        let fx = fixture();
        let source_id = Uuid::new_v4();
        let source = SourceConnection::new(source_id, Uuid::new_v4(), json!({ "username": "airbyte", "password": "abc" }));

        let first = fx.writer.write_source_connection(source.clone(), &password_spec()).await.unwrap();
        let v1 = pointer_of(&first.configuration["password"]);
        assert_eq!(v1.version(), 1);
        assert_eq!(
            v1.name(),
            derive_name(&source.identity(), &SecretPath::root().key("password"))
        );
        assert_eq!(first.configuration["username"], "airbyte");

        // Identical content reuses v1 without a write
        let again = fx.writer.write_source_connection(source.clone(), &password_spec()).await.unwrap();
        assert_eq!(again.configuration, first.configuration);
        assert_eq!(fx.persistent.len(), 1);

        let changed = source.with_configuration(json!({ "username": "airbyte", "password": "xyz" }));
        let second = fx.writer.write_source_connection(changed, &password_spec()).await.unwrap();
        let v2 = pointer_of(&second.configuration["password"]);
        assert_eq!(v2, v1.next_version());
        assert_eq!(fx.persistent.read(&v1), Some("abc".to_string()));
        assert_eq!(fx.persistent.read(&v2), Some("xyz".to_string()));

        let stored = fx
            .metadata
            .get_record(&EntityIdentity::new(EntityKind::SourceConnection, source_id))
            .await
            .unwrap();
        assert_eq!(stored.configuration(), Some(&second.configuration));
    }

    #[tokio::test]
    async fn test_destination_write_is_pointer_only() {
        let fx = fixture();
        let destination = DestinationConnection::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            json!({ "username": "loader", "password": "hunter2" }),
        );

        let stored = fx
            .writer
            .write_destination_connection(destination.clone(), &password_spec())
            .await
            .unwrap();

        let text = serde_json::to_string(&stored).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(pointer_of(&stored.configuration["password"])
            .name()
            .starts_with("destination_"));

        let record = fx.metadata.get_record(&destination.identity()).await.unwrap();
        assert!(!serde_json::to_string(&record).unwrap().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_secret_failure_leaves_metadata_untouched() {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let writer = SecretsRepositoryWriter::new(
            metadata.clone(),
            Arc::new(FailingSecretStore),
            Arc::new(MemorySecretStore::new()),
        );
        let source = SourceConnection::new(Uuid::new_v4(), Uuid::new_v4(), json!({ "password": "abc" }));

        let err = writer.write_source_connection(source, &password_spec()).await.unwrap_err();
        assert!(matches!(err, SecretsError::StoreWrite { .. }));
        assert!(metadata.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure_logs_orphans() {
        let persistent = Arc::new(MemorySecretStore::new());
        let logger = Arc::new(MemoryLogger::new());
        let writer = SecretsRepositoryWriter::new(
            Arc::new(FailingMetadataStore::default()),
            persistent.clone(),
            Arc::new(MemorySecretStore::new()),
        )
        .with_logger(logger.clone());

        let source = SourceConnection::new(Uuid::new_v4(), Uuid::new_v4(), json!({ "password": "abc" }));
        let err = writer.write_source_connection(source, &password_spec()).await.unwrap_err();
        assert!(matches!(err, SecretsError::Metadata(MetadataError::Other(_))));

        // The secret was written and stays behind as an orphan
        let entries = persistent.entries();
        assert_eq!(entries.len(), 1);
        let warnings = logger.messages(LogLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains(&entries[0].0.full_coordinate()));
        assert!(!warnings[0].contains("abc"));
    }

    #[tokio::test]
    async fn test_split_ephemeral_uses_ephemeral_store() {
        let fx = fixture();
        let document = json!({ "username": "airbyte", "password": "abc" });

        let first = fx.writer.split_ephemeral(&document, &password_spec()).unwrap();
        let second = fx.writer.split_ephemeral(&document, &password_spec()).unwrap();

        assert!(fx.persistent.is_empty());
        assert!(fx.metadata.is_empty());
        assert_eq!(fx.ephemeral.len(), 2);
        assert_ne!(first["password"], second["password"]);
        assert!(pointer_of(&first["password"]).name().starts_with("ephemeral_"));

        let hydrated = SecretsHydrator::new(fx.ephemeral.clone()).hydrate(&first).unwrap();
        assert_eq!(hydrated, document);
    }

    #[tokio::test]
    async fn test_staging_same_payload_reuses_coordinate() {
        let fx = fixture();
        let staging = StagingConfiguration::new(Uuid::new_v4(), json!({ "bucket": "b", "key": "k1" }));

        let first = fx.writer.write_staging_configuration(staging.clone()).await.unwrap();
        let coordinate = pointer_of(&first.configuration);
        assert_eq!(coordinate.version(), 1);
        assert!(coordinate.name().starts_with("destination_definition_"));

        let second = fx.writer.write_staging_configuration(staging).await.unwrap();
        assert_eq!(second.configuration, first.configuration);
        assert_eq!(fx.persistent.len(), 1);
    }

    #[tokio::test]
    async fn test_staging_different_payload_writes_next_version() {
        let fx = fixture();
        let definition_id = Uuid::new_v4();

        let first = fx
            .writer
            .write_staging_configuration(StagingConfiguration::new(definition_id, json!({ "key": "k1" })))
            .await
            .unwrap();
        let second = fx
            .writer
            .write_staging_configuration(StagingConfiguration::new(definition_id, json!({ "key": "k2" })))
            .await
            .unwrap();

        let v1 = pointer_of(&first.configuration);
        let v2 = pointer_of(&second.configuration);
        assert_eq!(v2, v1.next_version());
        assert_eq!(fx.persistent.read(&v1), Some(r#"{"key":"k1"}"#.to_string()));
        assert_eq!(fx.persistent.read(&v2), Some(r#"{"key":"k2"}"#.to_string()));
    }

    fn bulk_batch(source_password: Value) -> (ConfigBatch, SourceConnection, ConnectorDefinition) {
        let definition = ConnectorDefinition::new(Uuid::new_v4(), "postgres", password_spec());
        let source = SourceConnection::new(
            Uuid::new_v4(),
            definition.definition_id,
            json!({ "username": "airbyte", "password": source_password }),
        );
        let mut batch = ConfigBatch::new();
        batch.insert(
            EntityKind::SourceDefinition,
            vec![ConfigRecord::SourceDefinition(definition.clone())],
        );
        batch.insert(EntityKind::SourceConnection, vec![source.clone().into()]);
        (batch, source, definition)
    }

    #[tokio::test]
    async fn test_replace_all_splits_connections() {
        let fx = fixture();
        let (batch, source, definition) = bulk_batch(json!("abc"));

        fx.writer.replace_all_configs(batch, false).await.unwrap();

        let stored_def = fx
            .metadata
            .get_record(&EntityIdentity::new(EntityKind::SourceDefinition, definition.definition_id))
            .await
            .unwrap();
        assert_eq!(stored_def.into_definition(), Some(definition));

        let stored = fx.metadata.get_record(&source.identity()).await.unwrap();
        let configuration = stored.configuration().unwrap();
        assert_eq!(configuration["username"], "airbyte");
        let coordinate = pointer_of(&configuration["password"]);
        assert_eq!(fx.persistent.read(&coordinate), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_replace_all_continues_existing_versions() {
        let fx = fixture();
        let (batch, source, _) = bulk_batch(json!("abc"));
        fx.writer.replace_all_configs(batch, false).await.unwrap();
        let v1 = pointer_of(&fx.metadata.get_record(&source.identity()).await.unwrap().configuration().unwrap()["password"]);

        let mut batch = ConfigBatch::new();
        let definition = ConnectorDefinition::new(source.source_definition_id, "postgres", password_spec());
        batch.insert(EntityKind::SourceDefinition, vec![ConfigRecord::SourceDefinition(definition)]);
        batch.insert(
            EntityKind::SourceConnection,
            vec![source.clone().with_configuration(json!({ "password": "xyz" })).into()],
        );
        fx.writer.replace_all_configs(batch, false).await.unwrap();

        let v2 = pointer_of(&fx.metadata.get_record(&source.identity()).await.unwrap().configuration().unwrap()["password"]);
        assert_eq!(v2, v1.next_version());
        assert_eq!(fx.persistent.read(&v1), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_replace_all_missing_definition() {
        let fx = fixture();
        let source = SourceConnection::new(Uuid::new_v4(), Uuid::new_v4(), json!({ "password": "abc" }));
        let mut batch = ConfigBatch::new();
        batch.insert(EntityKind::SourceConnection, vec![source.clone().into()]);

        let err = fx.writer.replace_all_configs(batch, false).await.unwrap_err();
        assert!(matches!(
            err,
            SecretsError::MissingSchema { kind: EntityKind::SourceConnection, id, .. } if id == source.source_id
        ));
        assert!(fx.persistent.is_empty());
        assert!(fx.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_dry_run_is_forwarded() {
        let fx = fixture();
        let (batch, _, _) = bulk_batch(json!("abc"));
        fx.writer.replace_all_configs(batch, true).await.unwrap();
        assert!(fx.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_require_pointers() {
        let fx = fixture();
        let writer = SecretsRepositoryWriter::new(fx.metadata.clone(), fx.persistent.clone(), fx.ephemeral.clone())
            .with_bulk_mode(BulkSecretsMode::RequirePointers);

        let (plaintext, _, _) = bulk_batch(json!("abc"));
        let err = writer.replace_all_configs(plaintext, false).await.unwrap_err();
        assert!(matches!(err, SecretsError::PlaintextSecret { ref path, .. } if path == "$.password"));
        assert!(fx.metadata.is_empty());

        let (pointers, source, _) = bulk_batch(json!({ "_secret": "source_x_secret_00_v3" }));
        writer.replace_all_configs(pointers, false).await.unwrap();
        assert!(fx.persistent.is_empty());
        let stored = fx.metadata.get_record(&source.identity()).await.unwrap();
        assert_eq!(stored.configuration().unwrap()["password"]["_secret"], "source_x_secret_00_v3");
    }

    #[tokio::test]
    async fn test_replace_all_passthrough() {
        let fx = fixture();
        let writer = SecretsRepositoryWriter::new(fx.metadata.clone(), fx.persistent.clone(), fx.ephemeral.clone())
            .with_bulk_mode(BulkSecretsMode::Passthrough);

        // No definition needed and nothing is split
        let source = SourceConnection::new(Uuid::new_v4(), Uuid::new_v4(), json!({ "password": { "_secret": "s_v1" } }));
        let mut batch = ConfigBatch::new();
        batch.insert(EntityKind::SourceConnection, vec![source.clone().into()]);
        writer.replace_all_configs(batch, false).await.unwrap();

        assert!(fx.persistent.is_empty());
        let stored = fx.metadata.get_record(&source.identity()).await.unwrap();
        assert_eq!(stored.into_source_connection(), Some(source));
    }

    #[tokio::test]
    async fn test_replace_all_rejects_duplicate_entities() {
        let fx = fixture();
        let (mut batch, source, _) = bulk_batch(json!("first"));
        batch
            .get_mut(&EntityKind::SourceConnection)
            .unwrap()
            .push(source.clone().with_configuration(json!({ "password": "second" })).into());

        let err = fx.writer.replace_all_configs(batch, false).await.unwrap_err();
        assert!(matches!(err, SecretsError::DuplicateEntity { ref entity } if *entity == source.identity().to_string()));
        assert!(fx.persistent.is_empty());
        assert!(fx.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_pointer_is_not_persisted() {
        let fx = fixture();
        let owner = fx
            .writer
            .write_source_connection(
                SourceConnection::new(Uuid::new_v4(), Uuid::new_v4(), json!({ "password": "A-secret" })),
                &password_spec(),
            )
            .await
            .unwrap();

        let intruder = SourceConnection::new(Uuid::new_v4(), owner.source_definition_id, owner.configuration.clone());
        let err = fx
            .writer
            .write_source_connection(intruder.clone(), &password_spec())
            .await
            .unwrap_err();
        assert!(matches!(err, SecretsError::ForeignPointer { .. }));
        assert!(fx.metadata.get_record(&intruder.identity()).await.is_err());

        // The owner may send its own pointer back
        let echoed = fx
            .writer
            .write_source_connection(owner.clone(), &password_spec())
            .await
            .unwrap();
        assert_eq!(echoed.configuration, owner.configuration);
        assert_eq!(fx.persistent.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_all_metadata_failure_logs_orphans() {
        let persistent = Arc::new(MemorySecretStore::new());
        let logger = Arc::new(MemoryLogger::new());
        let writer = SecretsRepositoryWriter::new(
            Arc::new(FailingMetadataStore::default()),
            persistent.clone(),
            Arc::new(MemorySecretStore::new()),
        )
        .with_logger(logger.clone());

        let (batch, _, _) = bulk_batch(json!("abc"));
        assert!(writer.replace_all_configs(batch, false).await.is_err());
        assert_eq!(persistent.len(), 1);
        assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_entity_never_collide() {
        let fx = fixture();
        let writer = Arc::new(fx.writer);
        let source_id = Uuid::new_v4();
        let definition_id = Uuid::new_v4();

        let mut tasks = Vec::new();
        for n in 0..8 {
            let writer = writer.clone();
            tasks.push(tokio::spawn(async move {
                let source =
                    SourceConnection::new(source_id, definition_id, json!({ "password": format!("pw-{}", n) }));
                writer.write_source_connection(source, &password_spec()).await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Every distinct value got its own version
        let versions: Vec<u64> = fx.persistent.entries().iter().map(|(c, _)| c.version()).collect();
        assert_eq!(versions, (1..=8).collect::<Vec<_>>());

        let stored = fx
            .metadata
            .get_record(&EntityIdentity::new(EntityKind::SourceConnection, source_id))
            .await
            .unwrap();
        assert_eq!(pointer_of(&stored.configuration().unwrap()["password"]).version(), 8);
    }

    #[tokio::test]
    async fn test_from_settings() {
        let settings = SecretsSettings {
            persistent_store: "memory".to_string(),
            bulk_mode: BulkSecretsMode::RequirePointers,
            serialize_entity_writes: false,
            ..SecretsSettings::default()
        };
        let writer = SecretsRepositoryWriter::from_settings(Arc::new(MemoryMetadataStore::new()), &settings).unwrap();
        assert_eq!(writer.bulk_mode(), BulkSecretsMode::RequirePointers);
        assert!(writer.locks.is_none());
    }
}
