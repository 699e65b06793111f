//! Entity kinds and identities

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of configuration entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Source connector definition (carries the connector spec)
    SourceDefinition,
    /// Destination connector definition (carries the connector spec)
    DestinationDefinition,
    /// Configured source connection
    SourceConnection,
    /// Configured destination connection
    DestinationConnection,
    /// Staging configuration of a destination definition; the whole document is secret
    StagingConfiguration,
    /// Unsaved configuration evaluated once (connection checks, drafts)
    EphemeralConfig,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::SourceDefinition => "source_definition",
            EntityKind::DestinationDefinition => "destination_definition",
            EntityKind::SourceConnection => "source_connection",
            EntityKind::DestinationConnection => "destination_connection",
            EntityKind::StagingConfiguration => "staging_configuration",
            EntityKind::EphemeralConfig => "ephemeral_config",
        }
    }

    /// Prefix used when deriving secret coordinate names
    ///
    /// Staging configurations are keyed by their destination definition, so
    /// their coordinates are named after it.
    pub fn coordinate_prefix(&self) -> &'static str {
        match self {
            EntityKind::SourceDefinition => "source_definition",
            EntityKind::DestinationDefinition => "destination_definition",
            EntityKind::SourceConnection => "source",
            EntityKind::DestinationConnection => "destination",
            EntityKind::StagingConfiguration => "destination_definition",
            EntityKind::EphemeralConfig => "ephemeral",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of an entity: its kind plus its id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityIdentity {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    /// Fresh identity for a one-off ephemeral evaluation
    pub fn ephemeral() -> Self {
        Self::new(EntityKind::EphemeralConfig, Uuid::new_v4())
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
