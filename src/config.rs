//! Configuration loading from a TOML file with per-section defaults.
//!
//! The config file lives at `$XDG_CONFIG_HOME/aimemo/config.toml` (or
//! `~/.aimemo/config.toml`); a missing file yields the defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AimemoConfig {
    pub search: SearchConfig,
    pub server: ServerConfig,
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default result limit for CLI search and list.
    pub default_limit: i64,
    /// Hard cap applied by the tool layer and CLI.
    pub max_limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Tracing filter for stderr logging (e.g. `info`, `aimemo=debug`).
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Server name reported in the initialize handshake.
    pub server_name: String,
    /// Server version reported in the initialize handshake.
    pub server_version: String,
}

impl Default for AimemoConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            mcp: McpConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_name: "aimemo-memory".into(),
            server_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl AimemoConfig {
    /// Load config from the default location, falling back to defaults when
    /// the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(crate::locate::config_path()?)
    }

    /// Load from a specific path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents).context("failed to parse config TOML")
    }
}
