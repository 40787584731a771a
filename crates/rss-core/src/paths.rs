//! Standard paths used by the resource status tools

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the status database location
pub const DB_ENV: &str = "RSS_DB";

/// Environment variable overriding the registry configuration file
pub const CONFIG_ENV: &str = "RSS_CONFIG";

/// Standard tool paths
pub struct Paths {
    /// Data directory (~/.local/share/rss)
    pub data: PathBuf,
    /// Config directory (~/.config/rss)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("rss");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("rss");

        Self { data, config }
    }

    /// Location of the status database (`RSS_DB` wins over the data dir)
    pub fn status_db(&self) -> PathBuf {
        match env::var_os(DB_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => self.data.join("resource-status.db"),
        }
    }

    /// Location of the registry configuration (`RSS_CONFIG` wins over the config dir)
    pub fn registry_config(&self) -> PathBuf {
        match env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => self.config.join("config.yaml"),
        }
    }
}
