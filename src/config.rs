use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_PORT: u16 = 42069;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

/// Where the demo handler finds its content.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub video_path: PathBuf,
    pub httpbin_base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            video_path: PathBuf::from("assets/vim.mp4"),
            httpbin_base: "http://httpbin.org".to_string(),
        }
    }
}

impl Config {
    /// Loads the YAML file named by `FLUX_CONFIG`, or defaults when unset.
    /// `FLUX_PORT` overrides the port either way.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("FLUX_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {}", path))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("invalid config file {}", path))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(port) = std::env::var("FLUX_PORT") {
            cfg.server.port = port
                .parse()
                .with_context(|| format!("invalid FLUX_PORT {:?}", port))?;
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
