//! Heterogeneous config records for the metadata store and bulk replace

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::connection::{
    ConnectorDefinition, DestinationConnection, SourceConnection, StagingConfiguration,
};
use super::entity::{EntityIdentity, EntityKind};

/// Any entity the metadata store persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigRecord {
    SourceDefinition(ConnectorDefinition),
    DestinationDefinition(ConnectorDefinition),
    SourceConnection(SourceConnection),
    DestinationConnection(DestinationConnection),
    StagingConfiguration(StagingConfiguration),
}

/// Batch of records grouped by kind, as accepted by bulk replace
pub type ConfigBatch = BTreeMap<EntityKind, Vec<ConfigRecord>>;

impl ConfigRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            ConfigRecord::SourceDefinition(_) => EntityKind::SourceDefinition,
            ConfigRecord::DestinationDefinition(_) => EntityKind::DestinationDefinition,
            ConfigRecord::SourceConnection(_) => EntityKind::SourceConnection,
            ConfigRecord::DestinationConnection(_) => EntityKind::DestinationConnection,
            ConfigRecord::StagingConfiguration(_) => EntityKind::StagingConfiguration,
        }
    }

    pub fn identity(&self) -> EntityIdentity {
        match self {
            ConfigRecord::SourceDefinition(def) | ConfigRecord::DestinationDefinition(def) => {
                EntityIdentity::new(self.kind(), def.definition_id)
            }
            ConfigRecord::SourceConnection(source) => source.identity(),
            ConfigRecord::DestinationConnection(destination) => destination.identity(),
            ConfigRecord::StagingConfiguration(staging) => staging.identity(),
        }
    }

    /// The configuration document, for kinds that own one
    pub fn configuration(&self) -> Option<&Value> {
        match self {
            ConfigRecord::SourceDefinition(_) | ConfigRecord::DestinationDefinition(_) => None,
            ConfigRecord::SourceConnection(source) => Some(&source.configuration),
            ConfigRecord::DestinationConnection(destination) => Some(&destination.configuration),
            ConfigRecord::StagingConfiguration(staging) => Some(&staging.configuration),
        }
    }

    /// Replace the configuration document; definitions are returned unchanged
    pub fn with_configuration(self, configuration: Value) -> Self {
        match self {
            ConfigRecord::SourceConnection(source) => {
                ConfigRecord::SourceConnection(source.with_configuration(configuration))
            }
            ConfigRecord::DestinationConnection(destination) => {
                ConfigRecord::DestinationConnection(destination.with_configuration(configuration))
            }
            ConfigRecord::StagingConfiguration(staging) => {
                ConfigRecord::StagingConfiguration(staging.with_configuration(configuration))
            }
            definition => definition,
        }
    }

    pub fn into_source_connection(self) -> Option<SourceConnection> {
        match self {
            ConfigRecord::SourceConnection(source) => Some(source),
            _ => None,
        }
    }

    pub fn into_destination_connection(self) -> Option<DestinationConnection> {
        match self {
            ConfigRecord::DestinationConnection(destination) => Some(destination),
            _ => None,
        }
    }

    pub fn into_staging_configuration(self) -> Option<StagingConfiguration> {
        match self {
            ConfigRecord::StagingConfiguration(staging) => Some(staging),
            _ => None,
        }
    }

    pub fn into_definition(self) -> Option<ConnectorDefinition> {
        match self {
            ConfigRecord::SourceDefinition(def) | ConfigRecord::DestinationDefinition(def) => Some(def),
            _ => None,
        }
    }
}

impl From<SourceConnection> for ConfigRecord {
    fn from(source: SourceConnection) -> Self {
        ConfigRecord::SourceConnection(source)
    }
}

impl From<DestinationConnection> for ConfigRecord {
    fn from(destination: DestinationConnection) -> Self {
        ConfigRecord::DestinationConnection(destination)
    }
}

impl From<StagingConfiguration> for ConfigRecord {
    fn from(staging: StagingConfiguration) -> Self {
        ConfigRecord::StagingConfiguration(staging)
    }
}
