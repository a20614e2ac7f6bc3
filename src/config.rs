use crate::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level service configuration.
///
/// Loaded once at startup from an optional `kindred.toml`, then environment
/// overrides are applied. Components receive values by injection; nothing
/// downstream reads the process environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Presence of `url` selects persistent ("postgres") mode; absence selects
/// the transient "in-memory" mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Presence of an API key enables the external generation path.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Overridable for tests against a local mock server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    "gemini-1.5-flash".into()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

impl Config {
    /// Load from the explicit path, or the platform config dir, falling back
    /// to defaults when no file exists. Environment overrides apply last.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let raw = fs::read_to_string(p)?;
                toml::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))?
            }
            _ => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "kindred").map(|dirs| dirs.config_dir().join("kindred.toml"))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Env-override logic with an injected lookup, so tests never mutate
    /// process-level state.
    pub fn apply_overrides_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(key) = get("GEMINI_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.generation.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL").filter(|v| !v.trim().is_empty()) {
            self.generation.model = model;
        }
        if let Some(host) = get("KINDRED_HOST").filter(|v| !v.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = get("KINDRED_PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
    }
}
