//! Query: referer and resource predicates over records.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// A named predicate over a record.
///
/// Unknown names are rejected when the configuration is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    ReferredFromResources,
    ReferredFromUnderResources,
    AccessToResources,
    AccessToUnderResources,
    #[serde(rename = "status_code_404")]
    StatusCode404,
}

impl QueryMode {
    /// Whether the predicate looks at the query resources at all.
    pub fn uses_resources(&self) -> bool {
        !matches!(self, QueryMode::StatusCode404)
    }
}

/// How the predicates of one query block combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// At least one predicate holds
    #[default]
    Any,
    /// Every predicate holds
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    domain: Option<String>,
    /// Resources as given
    resources: Vec<String>,
    /// Resources plus the slash-trimmed form of every directory
    normalized_resources: Vec<String>,
    /// Only the slash-trimmed directory forms
    normalized_dirs: Vec<String>,
}

impl Query {
    pub fn new(domain: Option<String>, resources: Vec<String>) -> Self {
        let normalized_resources = normalize_resources(&resources);
        let normalized_dirs = normalized_resources
            .iter()
            .filter(|r| !resources.contains(*r))
            .cloned()
            .collect();

        Self {
            domain,
            resources,
            normalized_resources,
            normalized_dirs,
        }
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Referer points at one of the resources on the query domain.
    pub fn referred_from_resources(&self, record: &Record) -> bool {
        self.matches_domain(record)
            && record
                .referer_resource()
                .map(|r| self.contains_normalized(r))
                .unwrap_or(false)
    }

    /// Referer is one of the directories on the query domain, or lies
    /// under one of the resources on any host.
    pub fn referred_from_under_resources(&self, record: &Record) -> bool {
        let Some(referer) = record.referer_resource() else {
            return false;
        };
        (self.matches_domain(record) && self.normalized_dirs.iter().any(|d| d == referer))
            || self.under_resources(referer)
    }

    pub fn access_to_resources(&self, record: &Record) -> bool {
        record
            .resource()
            .map(|r| self.contains_normalized(r))
            .unwrap_or(false)
    }

    pub fn access_to_under_resources(&self, record: &Record) -> bool {
        let Some(resource) = record.resource() else {
            return false;
        };
        self.normalized_dirs.iter().any(|d| d == resource) || self.under_resources(resource)
    }

    pub fn status_code_404(&self, record: &Record) -> bool {
        record.status() == Some(404)
    }

    /// Apply the predicate selected by `mode`.
    pub fn matches(&self, mode: QueryMode, record: &Record) -> bool {
        match mode {
            QueryMode::ReferredFromResources => self.referred_from_resources(record),
            QueryMode::ReferredFromUnderResources => self.referred_from_under_resources(record),
            QueryMode::AccessToResources => self.access_to_resources(record),
            QueryMode::AccessToUnderResources => self.access_to_under_resources(record),
            QueryMode::StatusCode404 => self.status_code_404(record),
        }
    }

    /// Combine the predicates in `modes` as `query_type` says.
    pub fn matches_with(&self, modes: &[QueryMode], query_type: QueryType, record: &Record) -> bool {
        match query_type {
            QueryType::Any => modes.iter().any(|m| self.matches(*m, record)),
            QueryType::All => !modes.is_empty() && modes.iter().all(|m| self.matches(*m, record)),
        }
    }

    // Without a domain the referer host is not checked.
    fn matches_domain(&self, record: &Record) -> bool {
        match &self.domain {
            None => true,
            Some(domain) => record.referer_host() == Some(domain.as_str()),
        }
    }

    fn contains_normalized(&self, resource: &str) -> bool {
        self.normalized_resources.iter().any(|r| r == resource)
    }

    fn under_resources(&self, resource: &str) -> bool {
        self.resources.iter().any(|target| resource.starts_with(target.as_str()))
    }
}

/// Every directory resource other than `/` also matches without its trailing slash.
fn normalize_resources(resources: &[String]) -> Vec<String> {
    let mut normalized = Vec::with_capacity(resources.len() * 2);
    for resource in resources {
        if resource != "/" {
            if let Some(trimmed) = resource.strip_suffix('/') {
                normalized.push(trimmed.to_string());
            }
        }
        normalized.push(resource.clone());
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordParser;

    const USER_AGENT: &str = "Mozilla/5.0 (X11; U; Linux i686; ja-JP; rv:1.7.5) Gecko/20041108 Firefox/1.0";

    fn record(resource: &str, referer: &str) -> Record {
        record_with_status(resource, referer, 200)
    }

    fn record_with_status(resource: &str, referer: &str, status: u16) -> Record {
        let line = format!(
            r#"192.168.3.4 - quidam [07/Feb/2016:07:39:42 +0900] "GET {} HTTP/1.1" {} 432 "{}" "{}""#,
            resource, status, referer, USER_AGENT
        );
        RecordParser::combined().parse(&line).unwrap()
    }

    fn query(domain: Option<&str>, resources: &[&str]) -> Query {
        Query::new(
            domain.map(str::to_string),
            resources.iter().map(|s| s.to_string()).collect(),
        )
    }

    // ── Normalization ────────────────────────────────────────────

    #[test]
    fn test_normalize_resources() {
        let q = query(None, &["/", "/subdir/", "/index.html"]);
        assert_eq!(q.normalized_resources, vec!["/", "/subdir", "/subdir/", "/index.html"]);
        assert_eq!(q.normalized_dirs, vec!["/subdir"]);
    }

    // ── Referer predicates ───────────────────────────────────────

    #[test]
    fn test_referred_from_resources() {
        let q = query(Some("www.example.org"), &["/start.html", "/"]);
        assert!(q.referred_from_resources(&record("/a", "http://www.example.org/start.html")));
        assert!(q.referred_from_resources(&record("/a", "http://www.example.org")));
        assert!(!q.referred_from_resources(&record("/a", "http://www.example.com/start.html")));
        assert!(!q.referred_from_resources(&record("/a", "-")));
    }

    #[test]
    fn test_referred_from_resources_without_domain() {
        let q = query(None, &["/start.html"]);
        assert!(q.referred_from_resources(&record("/a", "http://www.example.com/start.html")));
        assert!(q.referred_from_resources(&record("/a", "/start.html")));
    }

    #[test]
    fn test_referred_from_under_resources() {
        let q = query(Some("www.example.org"), &["/subdir/"]);
        assert!(q.referred_from_under_resources(&record("/a", "http://www.example.org/subdir/")));
        assert!(q.referred_from_under_resources(&record("/a", "http://www.example.org/subdir")));
        assert!(q.referred_from_under_resources(&record("/a", "http://www.example.org/subdir/index.html")));
        assert!(!q.referred_from_under_resources(&record("/a", "http://www.example.org/other/")));
        assert!(!q.referred_from_under_resources(&record("/a", "http://www.example.com/subdir")));
    }

    // ── Access predicates ────────────────────────────────────────

    #[test]
    fn test_access_to_resources() {
        let q = query(None, &["/subdir/", "/index.html"]);
        assert!(q.access_to_resources(&record("/index.html", "-")));
        assert!(q.access_to_resources(&record("/subdir", "-")));
        assert!(q.access_to_resources(&record("/subdir/", "-")));
        assert!(!q.access_to_resources(&record("/subdir/a.html", "-")));
    }

    #[test]
    fn test_access_to_under_resources() {
        let q = query(None, &["/subdir/"]);
        assert!(q.access_to_under_resources(&record("/subdir", "-")));
        assert!(q.access_to_under_resources(&record("/subdir/a.html", "-")));
        assert!(!q.access_to_under_resources(&record("/subdirectory", "-")));
        assert!(!q.access_to_under_resources(&record("/index.html", "-")));
    }

    #[test]
    fn test_status_code_404() {
        let q = query(Some("www.example.org"), &["/subdir/non-existent.html"]);
        let referer = "http://www.example.org/subdir/example.html";
        assert!(!q.status_code_404(&record("/index.html", referer)));
        assert!(q.status_code_404(&record_with_status("/subdir/non-existent.html", referer, 404)));
    }

    // ── Combination ──────────────────────────────────────────────

    #[test]
    fn test_matches_dispatches_on_mode() {
        let q = query(None, &["/index.html"]);
        let r = record("/index.html", "-");
        assert!(q.matches(QueryMode::AccessToResources, &r));
        assert!(!q.matches(QueryMode::ReferredFromResources, &r));
        assert!(!q.matches(QueryMode::StatusCode404, &r));
    }

    #[test]
    fn test_any_and_all() {
        let q = query(Some("www.example.org"), &["/start.html", "/subdir/index.html"]);
        let modes = [QueryMode::AccessToResources, QueryMode::ReferredFromResources];
        let from_start = record("/index.html", "http://www.example.org/start.html");
        let to_subdir = record("/subdir/index.html", "http://www.example.org/subdir/");

        assert!(q.matches_with(&modes, QueryType::Any, &from_start));
        assert!(q.matches_with(&modes, QueryType::Any, &to_subdir));
        assert!(!q.matches_with(&modes, QueryType::All, &from_start));
        assert!(!q.matches_with(&modes, QueryType::All, &to_subdir));

        let both = record("/subdir/index.html", "http://www.example.org/start.html");
        assert!(q.matches_with(&modes, QueryType::All, &both));
    }

    #[test]
    fn test_empty_mode_list_matches_nothing() {
        let q = query(None, &["/"]);
        let r = record("/", "-");
        assert!(!q.matches_with(&[], QueryType::Any, &r));
        assert!(!q.matches_with(&[], QueryType::All, &r));
    }

    #[test]
    fn test_query_mode_serde_names() {
        let mode: QueryMode = serde_json::from_str(r#""access_to_under_resources""#).unwrap();
        assert_eq!(mode, QueryMode::AccessToUnderResources);
        let mode: QueryMode = serde_json::from_str(r#""status_code_404""#).unwrap();
        assert_eq!(mode, QueryMode::StatusCode404);
        assert!(!QueryMode::StatusCode404.uses_resources());
    }

    #[test]
    fn test_unknown_query_name_rejected() {
        let err = serde_json::from_str::<QueryMode>(r#""unknown_query""#).unwrap_err();
        assert!(err.to_string().contains("unknown_query"), "{}", err);
    }

    #[test]
    fn test_query_type_names() {
        assert_eq!(QueryType::default(), QueryType::Any);
        let all: QueryType = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(all, QueryType::All);
    }
}
