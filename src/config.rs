// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSettings {
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub local: EnvironmentSettings,
    pub production: EnvironmentSettings,
}

/// Runtime settings resolved from config.yaml plus environment overrides.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub generation_url: String,
    pub request_timeout_seconds: u64,
}

impl AppConfig {
    /// Load configuration for the current environment. `APP_ENV=production`
    /// selects the production section, anything else falls back to local.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;

        let settings = match env::var("APP_ENV").as_deref() {
            Ok("production") => file.production,
            _ => file.local,
        };

        Ok(Self {
            database_path: PathBuf::from(settings.database_path),
            generation_url: env::var("GENERATION_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5555".to_string()),
            request_timeout_seconds: 30,
        })
    }
}
