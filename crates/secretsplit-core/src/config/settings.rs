//! Settings file (YAML)
//!
//! User-level settings live in `~/.config/secretsplit/settings.yaml`. Every
//! field has a default, so a missing file or a partial file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logging::file_logger as log;
use crate::secrets::{create_secret_store, SecretStore};

/// How bulk replace treats secret leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkSecretsMode {
    /// Split secrets into the persistent store (normal operation)
    #[default]
    Split,
    /// Write nothing to the secret store; every secret leaf must already be a
    /// pointer node (or null), otherwise the batch is rejected
    RequirePointers,
    /// Skip secret handling entirely and hand the batch to the metadata store
    Passthrough,
}

/// Errors loading or applying settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown secret store '{0}'")]
    UnknownStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Yaml(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Settings for the secrets subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsSettings {
    /// Registry name of the store for durable entities
    pub persistent_store: String,
    /// Registry name of the store for ephemeral evaluations
    pub ephemeral_store: String,
    /// Namespace handed to store factories; the ephemeral store gets
    /// `<namespace>-ephemeral`
    pub namespace: String,
    pub bulk_mode: BulkSecretsMode,
    /// Hold a per-entity lock across read-previous / split / write
    pub serialize_entity_writes: bool,
}

impl Default for SecretsSettings {
    fn default() -> Self {
        Self {
            persistent_store: "keychain".to_string(),
            ephemeral_store: "memory".to_string(),
            namespace: "secretsplit".to_string(),
            bulk_mode: BulkSecretsMode::Split,
            serialize_entity_writes: true,
        }
    }
}

/// The two independent secret store instances a running system uses
#[derive(Clone)]
pub struct SecretStores {
    pub persistent: Arc<dyn SecretStore>,
    pub ephemeral: Arc<dyn SecretStore>,
}

impl std::fmt::Debug for SecretStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStores")
            .field("persistent", &self.persistent.name())
            .field("ephemeral", &self.ephemeral.name())
            .finish()
    }
}

impl SecretsSettings {
    /// Default settings path (`~/.config/secretsplit/settings.yaml`)
    pub fn user_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("secretsplit").join("settings.yaml")
    }

    /// Load settings from a file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug("SecretsSettings", &format!("{} not found, using defaults", path.display()));
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the user-level settings file
    pub fn load_user() -> SettingsResult<Self> {
        Self::load(Self::user_path())
    }

    pub fn from_yaml(content: &str) -> SettingsResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| SettingsError::Yaml(format!("Failed to parse YAML: {}", e)))
    }

    /// Write settings to a file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)
            .map_err(|e| SettingsError::Yaml(format!("Failed to serialize YAML: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build the persistent and ephemeral stores through the store registry
    pub fn build_stores(&self) -> SettingsResult<SecretStores> {
        let persistent = create_secret_store(&self.persistent_store, &self.namespace)
            .ok_or_else(|| SettingsError::UnknownStore(self.persistent_store.clone()))?;
        let ephemeral_namespace = format!("{}-ephemeral", self.namespace);
        let ephemeral = create_secret_store(&self.ephemeral_store, &ephemeral_namespace)
            .ok_or_else(|| SettingsError::UnknownStore(self.ephemeral_store.clone()))?;

        for store in [&persistent, &ephemeral] {
            if !store.is_available() {
                log::warn("SecretsSettings", &format!("secret store '{}' reports unavailable", store.name()));
            }
        }

        log::info(
            "SecretsSettings",
            &format!("stores: persistent='{}' ephemeral='{}'", persistent.name(), ephemeral.name()),
        );
        Ok(SecretStores { persistent, ephemeral })
    }
}
