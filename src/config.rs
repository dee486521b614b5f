use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::sources::netease;

/// Default output directory for downloaded audio, relative to the working
/// directory.
pub const DEFAULT_OUTPUT_DIR: &str = "PastKing";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownloadConfig {
    pub output_dir: Option<PathBuf>,
    pub endpoint: Option<String>,
}

impl DownloadConfig {
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn resolve_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| netease::DEFAULT_ENDPOINT.to_string())
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("pastking")
        .join("config.toml")
}

pub fn load_config() -> Config {
    let path = config_path();
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str(&content).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let cfg = DownloadConfig::default();
        assert_eq!(cfg.resolve_output_dir(), PathBuf::from("PastKing"));
        assert_eq!(cfg.resolve_endpoint(), netease::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_explicit_values_win() {
        let cfg = DownloadConfig {
            output_dir: Some(PathBuf::from("/tmp/music")),
            endpoint: Some("http://localhost:9000/".to_string()),
        };
        assert_eq!(cfg.resolve_output_dir(), PathBuf::from("/tmp/music"));
        assert_eq!(cfg.resolve_endpoint(), "http://localhost:9000/");
    }

    #[test]
    fn test_malformed_toml_falls_back_to_default() {
        let cfg: Config = toml::from_str("[download]\noutput_dir = \"music\"\n").unwrap();
        assert_eq!(cfg.download.resolve_output_dir(), PathBuf::from("music"));

        // Unknown or broken content never aborts startup.
        let broken: Result<Config, _> = toml::from_str("not toml at all [");
        assert!(broken.is_err());
    }
}
