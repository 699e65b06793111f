//! File-based metadata store (YAML)
//!
//! Persists pointer-only records to a single YAML file, by default
//! `~/.local/share/secretsplit/metadata.yaml`.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::traits::{MetadataError, MetadataResult, MetadataStore};
use crate::types::{ConfigBatch, ConfigRecord, EntityIdentity, EntityKind};

/// Metadata file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataFile {
    /// Stored records, kept sorted by identity
    #[serde(default)]
    pub records: Vec<ConfigRecord>,
}

impl MetadataFile {
    fn position(&self, identity: &EntityIdentity) -> Option<usize> {
        self.records.iter().position(|r| &r.identity() == identity)
    }

    fn upsert(&mut self, record: ConfigRecord) {
        match self.position(&record.identity()) {
            Some(pos) => self.records[pos] = record,
            None => self.records.push(record),
        }
        self.records.sort_by_key(|r| r.identity());
    }
}

/// File-based metadata store
///
/// # Example
///
/// ```no_run
/// use secretsplit_core::metadata::FileMetadataStore;
///
/// let store = FileMetadataStore::user();
/// let scratch = FileMetadataStore::new("/tmp/secretsplit/metadata.yaml");
/// ```
pub struct FileMetadataStore {
    path: PathBuf,
    cache: RwLock<Option<MetadataFile>>,
}

impl FileMetadataStore {
    /// Create a store backed by a specific file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Create a store in the user's data directory
    pub fn user() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".local").join("share"));
        Self::new(data_dir.join("secretsplit").join("metadata.yaml"))
    }

    /// Get the metadata file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the metadata file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> MetadataResult<MetadataFile> {
        if !self.path.exists() {
            return Ok(MetadataFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| MetadataError::Other(format!("Failed to parse YAML: {}", e)))
    }

    fn render(file: &MetadataFile) -> MetadataResult<String> {
        serde_yaml::to_string(file)
            .map_err(|e| MetadataError::Other(format!("Failed to serialize YAML: {}", e)))
    }

    fn write_file(&self, file: &MetadataFile) -> MetadataResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, Self::render(file)?)?;
        Ok(())
    }

    fn get_file(&self) -> MetadataResult<MetadataFile> {
        if let Some(file) = self.cache.read().as_ref() {
            return Ok(file.clone());
        }

        let file = self.load()?;
        *self.cache.write() = Some(file.clone());
        Ok(file)
    }

    /// Apply a change and persist it, holding the cache lock throughout so
    /// concurrent writers cannot drop each other's records
    fn update(&self, apply: impl FnOnce(&mut MetadataFile)) -> MetadataResult<()> {
        let mut cache = self.cache.write();
        let mut file = match cache.as_ref() {
            Some(file) => file.clone(),
            None => self.load()?,
        };
        apply(&mut file);
        self.write_file(&file)?;
        *cache = Some(file);
        Ok(())
    }

    /// Reload from disk (invalidate cache)
    pub fn reload(&self) -> MetadataResult<MetadataFile> {
        let file = self.load()?;
        *self.cache.write() = Some(file.clone());
        Ok(file)
    }

    /// Copy the current file next to itself before a destructive rewrite
    pub fn backup(&self) -> MetadataResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMetadataStore")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl MetadataStore for FileMetadataStore {
    async fn get_record(&self, identity: &EntityIdentity) -> MetadataResult<ConfigRecord> {
        let file = self.get_file()?;
        file.records
            .into_iter()
            .find(|r| &r.identity() == identity)
            .ok_or_else(|| MetadataError::not_found(identity))
    }

    async fn list_records(&self, kind: EntityKind) -> MetadataResult<Vec<ConfigRecord>> {
        let file = self.get_file()?;
        Ok(file.records.into_iter().filter(|r| r.kind() == kind).collect())
    }

    async fn write_record(&self, record: ConfigRecord) -> MetadataResult<()> {
        self.update(|file| file.upsert(record))
    }

    async fn replace_all(&self, batch: ConfigBatch, dry_run: bool) -> MetadataResult<()> {
        let mut file = MetadataFile::default();
        for record in batch.into_values().flatten() {
            file.upsert(record);
        }

        if dry_run {
            Self::render(&file)?;
            return Ok(());
        }

        self.backup()?;
        self.update(|current| *current = file)
    }
}
