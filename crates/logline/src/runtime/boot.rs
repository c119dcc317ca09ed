//! Boot: logging init, config load, parser and filter construction.

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::Config;
use crate::filter::Filter;
use crate::format::FormatCache;
use crate::output::NamedLogs;
use crate::record::RecordParser;

/// Everything a run needs, built once at startup.
#[derive(Debug)]
pub struct Runtime {
    pub config: Config,
    pub parser: Arc<RecordParser>,
    pub filter: Arc<Filter>,
    pub named: Arc<NamedLogs>,
}

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; stdout carries the record projections.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate config, then build the shared parser and filter.
pub fn boot(cache: &FormatCache) -> Result<Runtime, Box<dyn std::error::Error>> {
    info!("Starting logline v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    build(config, cache)
}

/// Build a runtime from an already loaded config.
pub fn build(config: Config, cache: &FormatCache) -> Result<Runtime, Box<dyn std::error::Error>> {
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    info!(
        "Loaded configuration: log_format={}, parse_time={}, output={:?}",
        config.log_format, config.parse_time, config.output
    );

    let parser = cache.get_or_compile(&config.log_format, config.parse_time)?;
    info!("Parser ready: {} fields per line", parser.spec().len());

    let filter = Filter::from_config(&config.filter, &config.bots)?;
    info!(
        "Filter: blocks={}, exclude_bots={}",
        config.filter.blocks.len(),
        config.filter.exclude_bots
    );
    if config.filter.has_named_outputs() {
        info!("Named logs go to {}", config.filter.output_dir.display());
    }
    let named = NamedLogs::new(config.filter.output_dir.clone());

    Ok(Runtime {
        config,
        parser,
        filter: Arc::new(filter),
        named: Arc::new(named),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{FilterConfig, QueryConfig};
    use crate::filter::QueryMode;

    #[test]
    fn test_build_default_runtime() {
        let cache = FormatCache::new();
        let rt = build(Config::default(), &cache).unwrap();
        assert_eq!(rt.parser.spec().len(), 9);
        assert!(!rt.parser.parse_time());
        assert!(rt.filter.bot_filter().is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_build_reuses_cached_parser() {
        let cache = FormatCache::new();
        let a = build(Config::default(), &cache).unwrap();
        let b = build(Config::default(), &cache).unwrap();
        assert!(Arc::ptr_eq(&a.parser, &b.parser));
    }

    #[test]
    fn test_build_with_filter() {
        let config = Config {
            log_format: "common".to_string(),
            parse_time: true,
            filter: FilterConfig {
                blocks: vec![QueryConfig {
                    queries: vec![QueryMode::AccessToResources],
                    resources: vec!["/index.html".to_string()],
                    ..Default::default()
                }],
                exclude_bots: true,
                output_dir: "/var/log/logline".into(),
            },
            ..Default::default()
        };
        let rt = build(config, &FormatCache::new()).unwrap();
        assert_eq!(rt.parser.spec().len(), 7);
        assert!(rt.parser.parse_time());
        assert!(rt.filter.bot_filter().is_some());
        assert_eq!(rt.filter.blocks().len(), 1);
        assert_eq!(rt.named.dir(), std::path::Path::new("/var/log/logline"));
    }

    #[test]
    fn test_build_rejects_block_without_queries() {
        let config = Config {
            filter: FilterConfig {
                blocks: vec![QueryConfig::default()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(build(config, &FormatCache::new()).is_err());
    }

    #[test]
    fn test_build_rejects_bad_format() {
        let config = Config {
            log_format: "%h %Z".to_string(),
            ..Default::default()
        };
        assert!(build(config, &FormatCache::new()).is_err());
    }
}
