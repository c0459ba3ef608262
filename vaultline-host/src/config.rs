//! Host configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vaultline_crypto::KdfParams;
use vaultline_store::BackendDefaults;
use vaultline_types::BackendKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the host service. Every field has a default, so a
/// config file only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Root directory for the catalog and local storage files.
    pub data_dir: PathBuf,

    /// Catalog database file name, relative to `data_dir`.
    pub catalog_file: String,

    /// Tracing filter used when `RUST_LOG` is not set.
    pub log_filter: String,

    /// Argon2id work factors for new accounts and groups. Existing records
    /// keep the parameters they were created with.
    pub kdf: KdfParams,

    /// Backend for storages created without explicit parameters.
    pub default_backend: BackendKind,

    /// Frames buffered per direction on the IPC channel.
    pub channel_buffer: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("vaultline-data"),
            catalog_file: "catalog.sqlite".to_string(),
            log_filter: "info".to_string(),
            kdf: KdfParams::default(),
            default_backend: BackendKind::LocalSqlite,
            channel_buffer: 32,
        }
    }
}

impl HostConfig {
    /// Reads a JSON config file and validates it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_file.trim().is_empty() {
            return Err(ConfigError::Invalid("catalog_file must not be empty".into()));
        }
        if Path::new(&self.catalog_file).components().count() != 1 {
            return Err(ConfigError::Invalid(
                "catalog_file must be a bare file name".into(),
            ));
        }
        if self.channel_buffer == 0 {
            return Err(ConfigError::Invalid("channel_buffer must be positive".into()));
        }
        if self.kdf.memory_kib == 0 || self.kdf.iterations == 0 || self.kdf.parallelism == 0 {
            return Err(ConfigError::Invalid("kdf parameters must be positive".into()));
        }
        Ok(())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    /// Directory holding local SQLite storage files.
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storages")
    }

    pub fn backend_defaults(&self) -> BackendDefaults {
        BackendDefaults {
            kind: self.default_backend,
            directory: self.storage_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = HostConfig::default();
        config.validate().unwrap();
        assert_eq!(config.kdf, KdfParams::default());
        assert_eq!(
            config.catalog_path(),
            PathBuf::from("vaultline-data").join("catalog.sqlite")
        );
    }

    #[test]
    fn rejects_nested_catalog_file() {
        let config = HostConfig {
            catalog_file: "../escape.sqlite".into(),
            ..HostConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_buffer() {
        let config = HostConfig {
            channel_buffer: 0,
            ..HostConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
