//! Configuration loader - YAML settings + .env secrets

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Server settings loaded from config.yaml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Secrets loaded from .env
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// PORT override; beats the config file, loses to --port
    pub port: Option<u16>,
}

impl Secrets {
    /// Load secrets from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Secrets {
            port: std::env::var("PORT").ok().and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_partial_yaml_keeps_field_defaults() {
        let config: Config = serde_yaml::from_str("port: 3000").unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_full_yaml() {
        let config: Config = serde_yaml::from_str("host: 127.0.0.1\nport: 9999").unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9999);
    }
}
