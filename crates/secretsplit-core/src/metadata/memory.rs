//! In-memory metadata store

use std::collections::HashMap;
use parking_lot::RwLock;

use async_trait::async_trait;

use super::traits::{MetadataError, MetadataResult, MetadataStore};
use crate::types::{ConfigBatch, ConfigRecord, EntityIdentity, EntityKind};

/// In-memory metadata store for testing
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<HashMap<EntityIdentity, ConfigRecord>>,
}

impl MemoryMetadataStore {
    /// Create a new empty memory metadata store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store with initial records
    pub fn with_records(records: Vec<ConfigRecord>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.records.write();
            for record in records {
                guard.insert(record.identity(), record);
            }
        }
        store
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_record(&self, identity: &EntityIdentity) -> MetadataResult<ConfigRecord> {
        let guard = self.records.read();
        guard
            .get(identity)
            .cloned()
            .ok_or_else(|| MetadataError::not_found(identity))
    }

    async fn list_records(&self, kind: EntityKind) -> MetadataResult<Vec<ConfigRecord>> {
        let guard = self.records.read();
        let mut records: Vec<_> = guard.values().filter(|r| r.kind() == kind).cloned().collect();
        records.sort_by_key(|r| r.identity());
        Ok(records)
    }

    async fn write_record(&self, record: ConfigRecord) -> MetadataResult<()> {
        let mut guard = self.records.write();
        guard.insert(record.identity(), record);
        Ok(())
    }

    async fn replace_all(&self, batch: ConfigBatch, dry_run: bool) -> MetadataResult<()> {
        if dry_run {
            return Ok(());
        }
        let mut guard = self.records.write();
        guard.clear();
        for record in batch.into_values().flatten() {
            guard.insert(record.identity(), record);
        }
        Ok(())
    }
}
