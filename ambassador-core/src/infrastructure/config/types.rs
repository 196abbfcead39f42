use crate::domain::transition::FeeParams;
use crate::domain::ProtocolParams;
use crate::foundation::DEFAULT_SESSION_TTL_SECS;
use figment::value::{Dict, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub fees: FeeParams,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Profile overrides (e.g. `profiles.admin-1.*`) - used by the loader.
    #[serde(default, skip_serializing)]
    pub profiles: Option<Map<String, Dict>>,
}

impl AppConfig {
    pub fn protocol_params(&self) -> ProtocolParams {
        ProtocolParams::derive(&self.protocol.instance)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Deployment tag; every policy id and script address derives from it.
    #[serde(default = "default_instance")]
    pub instance: String,
}

fn default_instance() -> String {
    "devnet".to_string()
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { instance: default_instance() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SigningConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self { session_ttl_secs: default_session_ttl_secs() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_sync_attempts")]
    pub max_sync_attempts: u32,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_sync_attempts() -> u32 {
    20
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { poll_interval_ms: default_poll_interval_ms(), max_sync_attempts: default_max_sync_attempts() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: String,
    /// Directory for persisted signing sessions. Empty keeps sessions in memory.
    #[serde(default)]
    pub sessions_dir: String,
}

impl StorageConfig {
    pub fn sessions_path(&self) -> Option<PathBuf> {
        let trimmed = self.sessions_dir.trim();
        if trimmed.is_empty() {
            return None;
        }
        let path = Path::new(trimmed);
        if path.is_absolute() || self.data_dir.trim().is_empty() {
            Some(path.to_path_buf())
        } else {
            Some(Path::new(self.data_dir.trim()).join(path))
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_dir: Option<String>,
    /// e.g. `"info,ambassador_core=debug,root=warn"`.
    #[serde(default = "default_log_filters")]
    pub filters: String,
}

fn default_log_filters() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_dir: None, filters: default_log_filters() }
    }
}
