//! Connector definitions, connections and staging configurations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::entity::{EntityIdentity, EntityKind};
use crate::schema::ConnectorSchema;

/// Connector specification published by a connector definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSpecification {
    /// JSON schema describing a connection's configuration
    pub connection_specification: Value,
}

impl ConnectorSpecification {
    pub fn new(connection_specification: Value) -> Self {
        Self { connection_specification }
    }

    /// Schema view used to locate secret leaves
    pub fn schema(&self) -> ConnectorSchema {
        ConnectorSchema::new(self.connection_specification.clone())
    }
}

/// A source or destination connector definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDefinition {
    pub definition_id: Uuid,
    pub name: String,
    pub spec: ConnectorSpecification,
}

impl ConnectorDefinition {
    pub fn new(definition_id: Uuid, name: impl Into<String>, spec: ConnectorSpecification) -> Self {
        Self {
            definition_id,
            name: name.into(),
            spec,
        }
    }
}

/// A configured source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConnection {
    pub source_id: Uuid,
    pub source_definition_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    pub configuration: Value,
    #[serde(default)]
    pub tombstone: bool,
}

impl SourceConnection {
    pub fn new(source_id: Uuid, source_definition_id: Uuid, configuration: Value) -> Self {
        Self {
            source_id,
            source_definition_id,
            workspace_id: None,
            name: String::new(),
            configuration,
            tombstone: false,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the owning workspace
    pub fn with_workspace(mut self, workspace_id: Uuid) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    /// Replace the configuration document
    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn identity(&self) -> EntityIdentity {
        EntityIdentity::new(EntityKind::SourceConnection, self.source_id)
    }
}

/// A configured destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConnection {
    pub destination_id: Uuid,
    pub destination_definition_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    pub configuration: Value,
    #[serde(default)]
    pub tombstone: bool,
}

impl DestinationConnection {
    pub fn new(destination_id: Uuid, destination_definition_id: Uuid, configuration: Value) -> Self {
        Self {
            destination_id,
            destination_definition_id,
            workspace_id: None,
            name: String::new(),
            configuration,
            tombstone: false,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the owning workspace
    pub fn with_workspace(mut self, workspace_id: Uuid) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    /// Replace the configuration document
    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn identity(&self) -> EntityIdentity {
        EntityIdentity::new(EntityKind::DestinationConnection, self.destination_id)
    }
}

/// Staging configuration of a destination definition
///
/// The whole configuration document is treated as one secret payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfiguration {
    pub destination_definition_id: Uuid,
    pub configuration: Value,
}

impl StagingConfiguration {
    pub fn new(destination_definition_id: Uuid, configuration: Value) -> Self {
        Self {
            destination_definition_id,
            configuration,
        }
    }

    /// Replace the configuration document
    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn identity(&self) -> EntityIdentity {
        EntityIdentity::new(EntityKind::StagingConfiguration, self.destination_definition_id)
    }
}
