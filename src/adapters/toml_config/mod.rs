// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::config::AppConfig;
use crate::domain::errors::*;
use crate::ports::*;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "vidbatch.toml";

/// TOML configuration adapter
pub struct TomlConfigAdapter {
    /// Explicit config file; a missing explicit file is an error
    explicit_path: Option<PathBuf>,
    /// Read environment overrides
    use_env: bool,
}

impl TomlConfigAdapter {
    /// Create new TOML config adapter
    pub fn new(explicit_path: Option<PathBuf>) -> Result<Self, DomainError> {
        Ok(Self {
            explicit_path,
            use_env: true,
        })
    }

    /// Ignore `VIDBATCH_*` environment variables
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Deserialize config from TOML string
    pub fn parse(toml_content: &str) -> Result<AppConfig, DomainError> {
        toml::from_str(toml_content)
            .map_err(|e| DomainError::ConfigFail(format!("Failed to parse TOML config: {}", e)))
    }

    fn resolved_path(&self) -> PathBuf {
        self.explicit_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    async fn read_file(&self, path: &Path) -> Result<Option<String>, DomainError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.explicit_path.is_none() => {
                Ok(None)
            }
            Err(e) => Err(DomainError::ConfigFail(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl ConfigPort for TomlConfigAdapter {
    async fn load_config(&self) -> Result<AppConfig, DomainError> {
        let path = self.resolved_path();

        let mut config = match self.read_file(&path).await? {
            Some(content) => {
                info!("Loading configuration from: {}", path.display());
                Self::parse(&content)?
            }
            None => {
                debug!("No config file at {}, using defaults", path.display());
                AppConfig::default()
            }
        };

        if self.use_env {
            let env_overrides = config.apply_env(|key| std::env::var(key).ok())?;
            if env_overrides > 0 {
                info!("Applied {} environment variable overrides", env_overrides);
            }
        }

        config.validate()?;
        Ok(config)
    }

    async fn get_config_file_path(&self) -> Result<String, DomainError> {
        Ok(self.resolved_path().to_string_lossy().to_string())
    }
}
