use crate::constants::{self, env};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Process-wide configuration, built once in `main` and passed by reference.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub upstox: UpstoxConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstoxConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_access_token")]
    pub access_token: Option<String>,
    /// Request timeout. Unset means the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for UpstoxConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_token: default_access_token(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// Defaults
fn default_api_url() -> String {
    std::env::var(env::API_URL).unwrap_or_else(|_| constants::DEFAULT_API_URL.into())
}
fn default_access_token() -> Option<String> {
    std::env::var(env::ACCESS_TOKEN)
        .ok()
        .filter(|t| !t.trim().is_empty())
}
fn default_host() -> String {
    constants::DEFAULT_HOST.into()
}
fn default_port() -> u16 {
    std::env::var(env::PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(constants::DEFAULT_PORT)
}

impl Config {
    /// Configuration from environment variables only.
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// Access token, if one is configured and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.upstox
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.upstox.timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.upstox.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!(
                "upstox.api_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.upstox.timeout_secs == Some(0) {
            return Err(Error::config("upstox.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}
