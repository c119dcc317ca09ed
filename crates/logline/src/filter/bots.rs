//! Bots: user-agent based crawler detection.
//!
//! Bot names are escaped and matched case-insensitively; raw `bots_re`
//! patterns are OR-ed in as written. Everything is compiled into one
//! matcher with the ripgrep engine.

use std::sync::atomic::{AtomicU64, Ordering};

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use tracing::debug;

use super::FilterError;
use crate::conf::BotsConfig;
use crate::record::Record;

pub const DEFAULT_BOTS: &[&str] = &[
    "Googlebot",
    "Googlebot-Mobile",
    "Mediapartners-Google",
    "Bingbot",
    "Slurp",
    "Baiduspider",
    "BaiduImagespider",
    "BaiduMobaider",
    "YetiBot",
    "Applebot",
];

#[derive(Debug, Default)]
pub struct BotStats {
    pub agents_checked: AtomicU64,
    pub bots_found: AtomicU64,
}

#[derive(Debug)]
pub struct BotFilter {
    matcher: RegexMatcher,
    stats: BotStats,
}

impl BotFilter {
    pub fn new(config: &BotsConfig) -> Result<Self, FilterError> {
        let pattern = compile_bots_pattern(config)?;
        let matcher = RegexMatcherBuilder::new()
            .multi_line(false)
            .build(&pattern)
            .map_err(|e| FilterError::InvalidRegex(e.to_string()))?;

        debug!(pattern = %pattern, "compiled bot matcher");

        Ok(Self {
            matcher,
            stats: BotStats::default(),
        })
    }

    /// Matcher for the built-in crawler list only.
    pub fn default_bots() -> Result<Self, FilterError> {
        Self::new(&BotsConfig::default())
    }

    #[inline]
    pub fn is_bot_agent(&self, user_agent: &str) -> bool {
        self.stats.agents_checked.fetch_add(1, Ordering::Relaxed);
        let found = self.matcher.is_match(user_agent.as_bytes()).unwrap_or(false);
        if found {
            self.stats.bots_found.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Records without a user-agent field are never bots.
    pub fn is_bot(&self, record: &Record) -> bool {
        record
            .user_agent()
            .map(|ua| self.is_bot_agent(ua))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.agents_checked.load(Ordering::Relaxed),
            self.stats.bots_found.load(Ordering::Relaxed),
        )
    }
}

/// Build the alternation for `config`.
pub fn compile_bots_pattern(config: &BotsConfig) -> Result<String, FilterError> {
    let mut names: Vec<&str> = Vec::new();
    if config.inherit_default_bots {
        names.extend_from_slice(DEFAULT_BOTS);
    }
    for name in &config.bots {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }

    let mut alternatives: Vec<String> = Vec::new();
    if !names.is_empty() {
        let escaped: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
        alternatives.push(format!("(?i:{})", escaped.join("|")));
    }
    for pattern in &config.bots_re {
        alternatives.push(format!("(?:{})", pattern));
    }

    if alternatives.is_empty() {
        return Err(FilterError::InvalidRegex("no bot names or patterns configured".into()));
    }
    Ok(alternatives.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordParser;

    fn config(inherit: bool, bots: &[&str], bots_re: &[&str]) -> BotsConfig {
        BotsConfig {
            inherit_default_bots: inherit,
            bots: bots.iter().map(|s| s.to_string()).collect(),
            bots_re: bots_re.iter().map(|s| s.to_string()).collect(),
        }
    }

    // ── Default list ─────────────────────────────────────────────

    #[test]
    fn test_default_bots_match() {
        let filter = BotFilter::default_bots().unwrap();
        assert!(filter.is_bot_agent("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"));
        assert!(filter.is_bot_agent("Mozilla/5.0 (compatible; Baiduspider/2.0)"));
        assert!(filter.is_bot_agent("Mozilla/5.0 (Macintosh) Applebot/0.1"));
        assert!(!filter.is_bot_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0"));
    }

    #[test]
    fn test_bot_names_are_case_insensitive() {
        let filter = BotFilter::default_bots().unwrap();
        assert!(filter.is_bot_agent("bingbot/2.0"));
        assert!(filter.is_bot_agent("GOOGLEBOT"));
    }

    // ── Custom config ────────────────────────────────────────────

    #[test]
    fn test_custom_bots_without_defaults() {
        let filter = BotFilter::new(&config(false, &["FooCrawler"], &[])).unwrap();
        assert!(filter.is_bot_agent("foocrawler/1.0"));
        assert!(!filter.is_bot_agent("Googlebot/2.1"));
    }

    #[test]
    fn test_bot_names_are_escaped() {
        let filter = BotFilter::new(&config(false, &["a.b+c"], &[])).unwrap();
        assert!(filter.is_bot_agent("x a.b+c y"));
        assert!(!filter.is_bot_agent("axbbc"));
    }

    #[test]
    fn test_bots_re_is_case_sensitive() {
        let filter = BotFilter::new(&config(false, &[], &[r"Crawler\d+"])).unwrap();
        assert!(filter.is_bot_agent("MyCrawler42"));
        assert!(!filter.is_bot_agent("mycrawler42"));
        assert!(!filter.is_bot_agent("MyCrawler"));
    }

    #[test]
    fn test_names_and_patterns_combined() {
        let filter = BotFilter::new(&config(true, &["FooCrawler"], &["^curl/"])).unwrap();
        assert!(filter.is_bot_agent("curl/8.0"));
        assert!(filter.is_bot_agent("FooCrawler"));
        assert!(filter.is_bot_agent("Slurp"));
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let result = BotFilter::new(&config(false, &[], &[]));
        assert!(matches!(result, Err(FilterError::InvalidRegex(_))));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(BotFilter::new(&config(true, &[], &["[invalid"])).is_err());
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let pattern = compile_bots_pattern(&config(true, &["Googlebot"], &[])).unwrap();
        assert_eq!(pattern.matches("Googlebot").count(), 2);
    }

    // ── Records ──────────────────────────────────────────────────

    #[test]
    fn test_is_bot_record() {
        let filter = BotFilter::default_bots().unwrap();
        let parser = RecordParser::combined();
        let bot = parser
            .parse(r#"66.249.66.1 - - [07/Feb/2016:07:39:42 +0900] "GET / HTTP/1.1" 200 10 "-" "Googlebot/2.1""#)
            .unwrap();
        let human = parser
            .parse(r#"10.0.0.1 - - [07/Feb/2016:07:39:42 +0900] "GET / HTTP/1.1" 200 10 "-" "Firefox/1.0""#)
            .unwrap();
        assert!(filter.is_bot(&bot));
        assert!(!filter.is_bot(&human));
    }

    #[test]
    fn test_record_without_user_agent_is_not_bot() {
        let filter = BotFilter::default_bots().unwrap();
        let record = RecordParser::common()
            .parse(r#"10.0.0.1 - - [07/Feb/2016:07:39:42 +0900] "GET / HTTP/1.1" 200 10"#)
            .unwrap();
        assert!(!filter.is_bot(&record));
    }

    #[test]
    fn test_stats_tracking() {
        let filter = BotFilter::default_bots().unwrap();
        filter.is_bot_agent("Googlebot");
        filter.is_bot_agent("Firefox");
        filter.is_bot_agent("Slurp");
        assert_eq!(filter.stats(), (3, 2));
    }
}
