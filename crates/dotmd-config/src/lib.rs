pub mod frozen;
pub mod loader;
pub mod models;
pub mod validation;

pub use frozen::FrozenConfig;
pub use loader::{load_config, ConfigError, ConfigResolver};
pub use models::{
    AppConfig, Bm25Params, ExtractConfig, ExtractDepth, GraphWeights, IngestionConfig, LogConfig,
    ModelIdentity, ModelsConfig, SearchConfig,
};
pub use validation::validate_config;
