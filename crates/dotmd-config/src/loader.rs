use crate::models::AppConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration parsing error: {0}")]
    Parse(String),

    #[error("environment variable error: {0}")]
    Env(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Loads `AppConfig` with precedence defaults < `dotmd.toml` < `DOTMD_*` env
/// vars.
pub struct ConfigResolver {
    file_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            file_path: Self::default_file_location(),
        }
    }

    pub fn with_file(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(file_path.into()),
        }
    }

    pub fn env_only() -> Self {
        Self { file_path: None }
    }

    fn default_file_location() -> Option<PathBuf> {
        for candidate in ["dotmd.toml", "./dotmd.toml"] {
            let path = Path::new(candidate);
            if path.exists() {
                return Some(path.to_path_buf());
            }
        }
        None
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(path) = &self.file_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("DOTMD_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    ConfigResolver::new().load()
}
