//! Model: Config and related structs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::filter::{QueryMode, QueryType};
use crate::output::OutputFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preset name (`common`, `combined`, ...) or a LogFormat string
    pub log_format: String,
    pub parse_time: bool,
    pub output: OutputFormat,
    pub bots: BotsConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotsConfig {
    pub inherit_default_bots: bool,
    /// Literal names, matched case-insensitively
    pub bots: Vec<String>,
    /// Regular expressions, matched as written
    pub bots_re: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub exclude_bots: bool,
    /// Directory holding the `<output_log_name>.log` files
    pub output_dir: PathBuf,
    /// Query blocks; a record is kept when any block matches, or always when there are none
    pub blocks: Vec<QueryConfig>,
}

/// One `[[filter.blocks]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Referer host the referer predicates require; any host when unset
    pub host_name: Option<String>,
    pub resources: Vec<String>,
    pub queries: Vec<QueryMode>,
    pub query_type: QueryType,
    /// Matching source lines go to this named log instead of the projection on stdout
    pub output_log_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_format: "combined".to_string(),
            parse_time: false,
            output: OutputFormat::Json,
            bots: BotsConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            inherit_default_bots: true,
            bots: Vec::new(),
            bots_re: Vec::new(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_bots: false,
            output_dir: PathBuf::from("."),
            blocks: Vec::new(),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (i, block) in self.blocks.iter().enumerate() {
            block.validate().map_err(|e| format!("filter.blocks[{}]: {}", i, e))?;
        }
        Ok(())
    }

    pub fn has_named_outputs(&self) -> bool {
        self.blocks.iter().any(|b| b.output_log_name.is_some())
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.queries.is_empty() {
            return Err("queries must not be empty".to_string());
        }
        if self.resources.is_empty() {
            if let Some(mode) = self.queries.iter().find(|q| q.uses_resources()) {
                return Err(format!("resources must not be empty for {:?}", mode));
            }
        }
        if let Some(name) = &self.output_log_name {
            if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(format!("output_log_name is not a plain file name: {:?}", name));
            }
        }
        Ok(())
    }
}
