//! Core entity types
//!
//! This module contains the configuration entities whose documents carry secrets.

mod entity;
mod connection;
mod record;

pub use entity::{EntityKind, EntityIdentity};
pub use connection::{
    ConnectorSpecification, ConnectorDefinition, SourceConnection, DestinationConnection,
    StagingConfiguration,
};
pub use record::{ConfigRecord, ConfigBatch};
