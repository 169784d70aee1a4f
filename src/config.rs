use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Site base URL, used for the channel link and absolute item links
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    /// XSL stylesheet referenced from the feed
    #[serde(default)]
    pub stylesheet: Option<String>,
    /// Content reload interval in minutes, 0 disables
    #[serde(default)]
    pub reload_interval: u64,
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
