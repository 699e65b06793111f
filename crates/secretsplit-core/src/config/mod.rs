//! Configuration of the secrets subsystem
//!
//! - `SecretsSettings`: YAML settings file (store selection, bulk mode, write serialization)

mod settings;

pub use settings::{BulkSecretsMode, SecretStores, SecretsSettings, SettingsError, SettingsResult};
