//! Load: config loading from file and environment variables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::Config;
use super::ConfigError;
use crate::filter::BotFilter;
use crate::format::resolve_format;
use crate::output::OutputFormat;

pub const CONFIG_FILE_ENV: &str = "LOGLINE_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "logline.toml";

impl Config {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults and environment variables", config_path);
            Self::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut file = File::open(path.as_ref())?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Ok(toml::from_str(&contents)?)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `LOGLINE_*` overrides looked up through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(format) = var("LOGLINE_LOG_FORMAT") {
            self.log_format = format;
        }
        if let Some(parse_time) = var("LOGLINE_PARSE_TIME") {
            self.parse_time = parse_bool(&parse_time)
                .ok_or_else(|| ConfigError::Invalid(format!("LOGLINE_PARSE_TIME: not a boolean: {}", parse_time)))?;
        }
        if let Some(output) = var("LOGLINE_OUTPUT") {
            self.output = OutputFormat::from_name(&output)
                .ok_or_else(|| ConfigError::Invalid(format!("LOGLINE_OUTPUT: unknown output format: {}", output)))?;
        }
        Ok(())
    }

    /// Compile everything that can fail so bad settings surface at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_format.trim().is_empty() {
            return Err(ConfigError::Invalid("log_format must not be empty".to_string()));
        }
        resolve_format(&self.log_format)?;
        self.filter.validate().map_err(ConfigError::Invalid)?;
        if self.filter.exclude_bots {
            BotFilter::new(&self.bots)?;
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
