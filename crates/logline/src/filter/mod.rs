//! Filter: record selection by crawler user-agents and query blocks.
//!
//! A [`Filter`] decides where a record goes: nowhere, to the default
//! projection, or to the named logs of the blocks it matched.

pub mod bots;
pub mod query;

use thiserror::Error;

use crate::conf::{BotsConfig, FilterConfig, QueryConfig};
use crate::record::Record;

pub use bots::{BotFilter, DEFAULT_BOTS};
pub use query::{Query, QueryMode, QueryType};

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),
}

/// Where an accepted record is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination<'a> {
    /// The configured projection on stdout
    Default,
    /// The raw source line, appended to a named log
    Named(&'a str),
}

/// Predicates over one [`Query`], combined by a [`QueryType`].
#[derive(Debug, Clone)]
pub struct QueryBlock {
    query: Query,
    queries: Vec<QueryMode>,
    query_type: QueryType,
    output_log_name: Option<String>,
}

impl QueryBlock {
    pub fn new(query: Query, queries: Vec<QueryMode>, query_type: QueryType, output_log_name: Option<String>) -> Self {
        Self {
            query,
            queries,
            query_type,
            output_log_name,
        }
    }

    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new(
            Query::new(config.host_name.clone(), config.resources.clone()),
            config.queries.clone(),
            config.query_type,
            config.output_log_name.clone(),
        )
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.query.matches_with(&self.queries, self.query_type, record)
    }

    pub fn destination(&self) -> Destination<'_> {
        match &self.output_log_name {
            Some(name) => Destination::Named(name),
            None => Destination::Default,
        }
    }
}

/// Query blocks plus optional bot exclusion.
#[derive(Debug)]
pub struct Filter {
    blocks: Vec<QueryBlock>,
    bots: Option<BotFilter>,
}

impl Filter {
    pub fn new(blocks: Vec<QueryBlock>, bots: Option<BotFilter>) -> Self {
        Self { blocks, bots }
    }

    /// Accepts every record.
    pub fn pass_all() -> Self {
        Self::new(Vec::new(), None)
    }

    pub fn from_config(filter: &FilterConfig, bots: &BotsConfig) -> Result<Self, FilterError> {
        let bot_filter = if filter.exclude_bots {
            Some(BotFilter::new(bots)?)
        } else {
            None
        };
        let blocks = filter.blocks.iter().map(QueryBlock::from_config).collect();
        Ok(Self::new(blocks, bot_filter))
    }

    /// Destinations of `record`, each at most once, in block order.
    /// Empty when the record is rejected.
    pub fn route(&self, record: &Record) -> Vec<Destination<'_>> {
        if let Some(bots) = &self.bots {
            if bots.is_bot(record) {
                return Vec::new();
            }
        }
        if self.blocks.is_empty() {
            return vec![Destination::Default];
        }

        let mut destinations = Vec::new();
        for block in self.blocks.iter().filter(|b| b.matches(record)) {
            let destination = block.destination();
            if !destinations.contains(&destination) {
                destinations.push(destination);
            }
        }
        destinations
    }

    pub fn accepts(&self, record: &Record) -> bool {
        !self.route(record).is_empty()
    }

    pub fn blocks(&self) -> &[QueryBlock] {
        &self.blocks
    }

    pub fn bot_filter(&self) -> Option<&BotFilter> {
        self.bots.as_ref()
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::pass_all()
    }
}
