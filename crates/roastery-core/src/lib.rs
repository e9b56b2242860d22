pub mod app_config;
pub mod config;
pub mod records;
pub mod sources;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use records::Record;
pub use sources::{
    load_sources, parse_sources, DetailRules, FieldAttempt, ListingRules, LogicalField,
    PaginationPolicy, SourceConfig, SourcesFile, StopCondition, Transport,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[source] serde_yaml::Error),

    #[error("invalid source configuration: {0}")]
    Validation(String),
}
