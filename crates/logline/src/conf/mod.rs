//! Conf module: configuration model and loading.

pub mod model;
pub mod load;

use thiserror::Error;

use crate::filter::FilterError;
use crate::format::FormatError;

pub use model::{BotsConfig, Config, FilterConfig, QueryConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}
