//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Profile overrides from `[profiles.<name>]`
//! 4. Environment variables (AMBASSADOR_* prefix)

use crate::foundation::{AmbassadorError, DEFAULT_SESSION_TTL_SECS};
use crate::infrastructure::config::types::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::Dict;
use figment::{Figment, Profile};
use log::{debug, info};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "ambassador.toml";

/// Environment variable prefix for config overrides.
///
/// Example: `AMBASSADOR_FEES__BASE_FEE` -> `fees.base_fee`
const ENV_PREFIX: &str = "AMBASSADOR_";

/// Process-level variables sharing the prefix that are not config keys.
const ENV_RESERVED: &[&str] = &["config_path", "data_dir", "test_now_nanos"];

/// Load configuration from the default file in `data_dir`.
pub fn load_config(data_dir: &Path) -> Result<AppConfig, AmbassadorError> {
    load_config_from_file(&data_dir.join(CONFIG_FILE_NAME), data_dir)
}

/// Load configuration from the default file in `data_dir` with a profile.
pub fn load_config_with_profile(data_dir: &Path, profile: &str) -> Result<AppConfig, AmbassadorError> {
    load_config_from_file_with_profile(&data_dir.join(CONFIG_FILE_NAME), data_dir, profile)
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path, data_dir: &Path) -> Result<AppConfig, AmbassadorError> {
    info!("loading configuration path={} data_dir={}", path.display(), data_dir.display());
    let figment = figment_base(path).merge(env_provider());
    load_config_from_figment(figment, data_dir)
}

/// Load configuration from a specific file path with profile overrides.
pub fn load_config_from_file_with_profile(path: &Path, data_dir: &Path, profile: &str) -> Result<AppConfig, AmbassadorError> {
    info!("loading configuration path={} data_dir={} profile={}", path.display(), data_dir.display(), profile);

    // Extract once to access `profiles.<name>` overrides from the file.
    let base: AppConfig = figment_base(path).extract()?;
    let overrides = profile_overrides(&base, profile)?;

    let figment = figment_base(path).merge(Serialized::from(overrides, Profile::Default)).merge(env_provider());
    load_config_from_figment(figment, data_dir)
}

/// Extracts and post-processes an already assembled figment.
///
/// Callers may merge extra providers (e.g. `Serialized::default("fees.base_fee", 7)`)
/// on top of [`figment_base`] before handing it in.
pub fn load_config_from_figment(figment: Figment, data_dir: &Path) -> Result<AppConfig, AmbassadorError> {
    let mut config: AppConfig = figment.extract()?;
    postprocess(&mut config, data_dir);
    debug!(
        "configuration loaded instance={} session_ttl_secs={} sessions_dir={}",
        config.protocol.instance,
        config.signing.session_ttl_secs,
        if config.storage.sessions_dir.is_empty() { "<memory>" } else { config.storage.sessions_dir.as_str() }
    );
    Ok(config)
}

pub fn figment_base(path: &Path) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
    }
    figment
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).ignore(ENV_RESERVED).split("__")
}

fn profile_overrides(config: &AppConfig, profile: &str) -> Result<Dict, AmbassadorError> {
    let profiles =
        config.profiles.as_ref().ok_or_else(|| AmbassadorError::ConfigError("no profiles section in config".to_string()))?;
    profiles
        .get(profile)
        .cloned()
        .ok_or_else(|| AmbassadorError::ConfigError(format!("profile '{profile}' not found in config")))
}

fn postprocess(config: &mut AppConfig, data_dir: &Path) {
    if config.storage.data_dir.trim().is_empty() {
        config.storage.data_dir = data_dir.to_string_lossy().to_string();
    }
    if config.signing.session_ttl_secs == 0 {
        config.signing.session_ttl_secs = DEFAULT_SESSION_TTL_SECS;
    }
    if config.logging.filters.trim().is_empty() {
        config.logging.filters = "info".to_string();
    }
}
