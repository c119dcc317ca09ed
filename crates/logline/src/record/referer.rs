//! Referer: decomposes a Referer header into scheme, host and resource.

use serde::{Deserialize, Serialize};

const SCHEMES: &[&str] = &["http:", "https:"];

/// Derived view of a referer; the raw value is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefererParts {
    pub scheme: String,
    pub host: String,
    /// Path and query, always starting with `/` for absolute URLs
    pub resource: String,
}

/// Decompose `referer`. `-` means no referer and yields `None`.
///
/// Values that do not start with a known scheme (relative paths, garbage)
/// keep an empty scheme and host and use the whole value as the resource.
pub fn decompose(referer: &str) -> Option<RefererParts> {
    if referer == "-" {
        return None;
    }

    let parts: Vec<&str> = referer.splitn(4, '/').collect();
    if SCHEMES.contains(&parts[0]) {
        Some(RefererParts {
            scheme: parts[0].to_string(),
            host: parts.get(2).copied().unwrap_or_default().to_string(),
            resource: match parts.get(3) {
                Some(rest) => format!("/{}", rest),
                None => "/".to_string(),
            },
        })
    } else {
        Some(RefererParts {
            scheme: String::new(),
            host: String::new(),
            resource: referer.to_string(),
        })
    }
}
