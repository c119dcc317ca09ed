use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::{resolve_format, FormatError};
use crate::record::RecordParser;

/// Compiled-parser cache
///
/// Keyed by the preset name or LogFormat string plus the time parsing flag,
/// so every caller configured the same way shares one read-only parser.
#[derive(Debug)]
pub struct FormatCache {
    parsers: DashMap<(String, bool), Arc<RecordParser>>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self {
            parsers: DashMap::new(),
        }
    }

    /// Get the parser for `log_format`, compiling it on first use.
    pub fn get_or_compile(&self, log_format: &str, parse_time: bool) -> Result<Arc<RecordParser>, FormatError> {
        let key = (log_format.to_string(), parse_time);
        if let Some(parser) = self.parsers.get(&key) {
            return Ok(parser.value().clone());
        }

        let spec = resolve_format(log_format)?;
        let parser = Arc::new(RecordParser::new(spec).with_parse_time(parse_time));

        // A racing caller may have inserted first; keep whichever landed.
        let parser = self.parsers.entry(key).or_insert(parser).value().clone();
        debug!(log_format, parse_time, cached = self.parsers.len(), "parser ready");
        Ok(parser)
    }

    pub fn get(&self, log_format: &str, parse_time: bool) -> Option<Arc<RecordParser>> {
        self.parsers
            .get(&(log_format.to_string(), parse_time))
            .map(|p| p.value().clone())
    }

    pub fn remove(&self, log_format: &str, parse_time: bool) {
        self.parsers.remove(&(log_format.to_string(), parse_time));
    }

    pub fn clear(&self) {
        self.parsers.clear();
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl Default for FormatCache {
    fn default() -> Self {
        Self::new()
    }
}
