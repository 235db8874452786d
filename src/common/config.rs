//! Configuration schema, defaults, and layered loading.
//!
//! Precedence: defaults < config file < environment < CLI

use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;
const DEFAULT_MAX_UPLOADS_PER_MINUTE: u32 = 10;

pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "skylink")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("skylink.toml"))
}

fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join("skylink-uploads")
}

/// Fully resolved application configuration after all layers merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Control-plane listen port.
    pub port: u16,
    /// Staging directory for offered files.
    pub upload_dir: PathBuf,
    /// Hard ceiling for an uploaded file, in bytes.
    pub max_file_size: u64,
    /// Upload admissions per source address per minute.
    pub max_uploads_per_minute: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: default_upload_dir(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_uploads_per_minute: DEFAULT_MAX_UPLOADS_PER_MINUTE,
        }
    }
}

impl AppConfig {
    /// Ceiling formatted the way responses report it.
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / (1024 * 1024)
    }

    /// Rejects unusable limit values.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_file_size > 0,
            "Invalid config: max_file_size must be > 0"
        );
        ensure!(
            self.max_uploads_per_minute >= 1,
            "Invalid config: max_uploads_per_minute must be >= 1"
        );
        Ok(())
    }
}

/// Loads config from defaults/file/env.
///
/// A bare `PORT` variable is honored on top of the `SKYLINK_` prefix so
/// hosted deployments that inject only a port keep working.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path();

    let config: AppConfig = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("SKYLINK_"))
        .merge(Env::raw().only(&["port"]))
        .extract()
        .context("Failed to load configuration")?;

    config.validate()?;

    Ok(config)
}
