use crate::loader::ConfigError;
use crate::models::{AppConfig, SearchConfig};

/// Validates a fully-resolved configuration once at startup. A `ConfigError`
/// here is fatal (see error kind `ConfigError` in the error-handling design).
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.models.embedding_model_name.is_empty() {
        return Err(ConfigError::Validation(
            "embedding model name cannot be empty".into(),
        ));
    }
    if config.models.embedding_dimension == 0 {
        return Err(ConfigError::Validation(
            "embedding dimension must be greater than 0".into(),
        ));
    }
    if config.extract.entity_types.is_empty() {
        return Err(ConfigError::Validation(
            "at least one entity type must be configured".into(),
        ));
    }
    validate_search(&config.search)?;
    if config.ingestion.worker_pool_size == 0 {
        return Err(ConfigError::Validation(
            "worker pool size must be greater than 0".into(),
        ));
    }
    let valid_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_levels.contains(&config.log.level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "invalid log level '{}', must be one of: {}",
            config.log.level,
            valid_levels.join(", ")
        )));
    }
    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.default_top_k == 0 {
        return Err(ConfigError::Validation(
            "default_top_k must be greater than 0".into(),
        ));
    }
    if search.bm25.k1 <= 0.0 {
        return Err(ConfigError::Validation("bm25.k1 must be positive".into()));
    }
    if !(0.0..=1.0).contains(&search.bm25.b) {
        return Err(ConfigError::Validation(
            "bm25.b must be between 0.0 and 1.0".into(),
        ));
    }
    if search.graph_hops == 0 {
        return Err(ConfigError::Validation(
            "graph_hops must be greater than 0".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.search.default_top_k = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_bad_bm25_b() {
        let mut config = AppConfig::default();
        config.search.bm25.b = 1.5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("bm25.b"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = AppConfig::default();
        config.log.level = "verbose".into();
        assert!(validate_config(&config).is_err());
    }
}
