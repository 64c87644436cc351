use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "watchpost.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("server.listen_addr {0:?} is not a valid socket address")]
    ListenAddr(String),
}

/// Top-level agent configuration, loaded from `watchpost.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub server: ServerConfig,
    /// Raw YAML blocks keyed by integration name; each is handed to the
    /// integration registry unparsed.
    pub integrations: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Value for the `instance` label when an integration does not set one.
    pub instance: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".to_string(),
            instance: "localhost".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::ListenAddr(self.server.listen_addr.clone()));
        }
        if self.integrations.is_empty() {
            tracing::warn!("No integrations configured");
        }
        Ok(())
    }

    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty file is a valid, empty config.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from `path` if it exists, then apply env var overrides.
    ///
    /// A missing file at the default location yields defaults; a missing file
    /// the caller asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg = Self::from_yaml(&content, &path)?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                cfg
            },
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            },
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `WATCHPOST_LISTEN_ADDR` and `WATCHPOST_INSTANCE`, read through
    /// `lookup`. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("WATCHPOST_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.server.listen_addr = addr;
        }
        if let Some(instance) = lookup("WATCHPOST_INSTANCE")
            && !instance.is_empty()
        {
            self.server.instance = instance;
        }
    }
}
