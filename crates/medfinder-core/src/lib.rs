pub mod app_config;
pub mod catalog;
mod config;
pub mod geo;
pub mod search;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{axis} {value} is out of range")]
    CoordinateOutOfRange { axis: &'static str, value: f64 },
    #[error("latitude and longitude must be provided together")]
    PartialPoint,
    #[error("unknown sort mode '{0}'; expected 'price_asc' or 'price_desc'")]
    UnknownSortMode(String),
    #[error("unknown medicine form '{0}'; expected 'tablet', 'syrup', or 'injection'")]
    UnknownForm(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read seed file {path}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file")]
    SeedFileParse(#[from] serde_yaml::Error),
    #[error("invalid seed data: {0}")]
    Validation(String),
}
