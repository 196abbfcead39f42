mod loader;
mod types;
pub mod validation;

pub use loader::{
    figment_base, load_config, load_config_from_figment, load_config_from_file, load_config_from_file_with_profile,
    load_config_with_profile, CONFIG_FILE_NAME,
};
pub use types::*;

use crate::foundation::{AmbassadorError, TEST_NOW_NANOS_ENV_VAR};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "AMBASSADOR_CONFIG_PATH";
pub const DATA_DIR_ENV: &str = "AMBASSADOR_DATA_DIR";
pub const TEST_NOW_NANOS_ENV: &str = TEST_NOW_NANOS_ENV_VAR;

pub fn load_app_config() -> Result<AppConfig, AmbassadorError> {
    let data_dir = resolve_data_dir()?;
    let config_path = resolve_config_path(&data_dir);
    load_app_config_from_path(&config_path, &data_dir)
}

pub fn load_app_config_from_path(path: &Path, data_dir: &Path) -> Result<AppConfig, AmbassadorError> {
    let config = load_config_from_file(path, data_dir)?;
    config.validate().map_err(|errors| AmbassadorError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    Ok(config)
}

pub fn load_app_config_from_profile_path(path: &Path, data_dir: &Path, profile: &str) -> Result<AppConfig, AmbassadorError> {
    let config = load_config_from_file_with_profile(path, data_dir, profile)?;
    config.validate().map_err(|errors| AmbassadorError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    Ok(config)
}

pub fn resolve_config_path(data_dir: &Path) -> PathBuf {
    non_empty_env(CONFIG_PATH_ENV).map(PathBuf::from).unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME))
}

pub fn resolve_data_dir() -> Result<PathBuf, AmbassadorError> {
    if let Some(dir) = non_empty_env(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let cwd = std::env::current_dir().map_err(|err| crate::storage_err!("env::current_dir", err))?;
    Ok(cwd.join(".ambassador"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
