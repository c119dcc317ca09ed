//! Format: LogFormat compilation, predefined formats and LTSV labels.
//!
//! A [`FormatSpec`] is built once per configured log format and shared
//! read-only by every record parsed with it.

pub mod directive;
pub mod ltsv;
pub mod cache;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use cache::FormatCache;
pub use directive::FieldName;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unknown LogFormat directive {directive:?} in {format:?}")]
    UnknownDirective { directive: String, format: String },

    #[error("Unknown predefined format: {0}")]
    UnknownPreset(String),

    #[error("LogFormat is empty")]
    Empty,
}

/// Predefined LogFormat strings.
pub mod log_format {
    pub const COMMON: &str = "%h %l %u %t \"%r\" %>s %b";
    pub const COMMON_WITH_VH: &str = "%v %h %l %u %t \"%r\" %>s %b";
    pub const COMBINED: &str = "%h %l %u %t \"%r\" %>s %b \"%{Referer}i\" \"%{User-agent}i\"";
    /// Combined plus the time taken to serve the request (`%D`).
    pub const MOE: &str =
        "%h %l %u %t \"%r\" %>s %b \"%{Referer}i\" \"%{User-agent}i\" %D";
}

/// Directive and field of every column of the predefined formats.
mod columns {
    use super::FieldName::{self, *};

    pub const COMMON: &[(&str, FieldName)] = &[
        ("%h", RemoteHost),
        ("%l", RemoteLogname),
        ("%u", RemoteUser),
        ("%t", Time),
        ("%r", FirstLineOfRequest),
        ("%>s", LastRequestStatus),
        ("%b", ResponseBytes),
    ];

    pub const COMMON_WITH_VH: &[(&str, FieldName)] = &[
        ("%v", VirtualHost),
        ("%h", RemoteHost),
        ("%l", RemoteLogname),
        ("%u", RemoteUser),
        ("%t", Time),
        ("%r", FirstLineOfRequest),
        ("%>s", LastRequestStatus),
        ("%b", ResponseBytes),
    ];

    pub const COMBINED: &[(&str, FieldName)] = &[
        ("%h", RemoteHost),
        ("%l", RemoteLogname),
        ("%u", RemoteUser),
        ("%t", Time),
        ("%r", FirstLineOfRequest),
        ("%>s", LastRequestStatus),
        ("%b", ResponseBytes),
        ("%{Referer}i", Referer),
        ("%{User-agent}i", UserAgent),
    ];

    pub const MOE: &[(&str, FieldName)] = &[
        ("%h", RemoteHost),
        ("%l", RemoteLogname),
        ("%u", RemoteUser),
        ("%t", Time),
        ("%r", FirstLineOfRequest),
        ("%>s", LastRequestStatus),
        ("%b", ResponseBytes),
        ("%{Referer}i", Referer),
        ("%{User-agent}i", UserAgent),
        ("%D", TimeTakenUs),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Common Log Format (CLF)
    Common,
    /// CLF with virtual host
    CommonWithVh,
    /// NCSA extended/combined
    Combined,
    Moe,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Common, Preset::CommonWithVh, Preset::Combined, Preset::Moe];

    pub fn from_name(name: &str) -> Result<Preset, FormatError> {
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| FormatError::UnknownPreset(name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Common => "common",
            Preset::CommonWithVh => "common_with_vh",
            Preset::Combined => "combined",
            Preset::Moe => "moe",
        }
    }

    pub fn log_format(&self) -> &'static str {
        match self {
            Preset::Common => log_format::COMMON,
            Preset::CommonWithVh => log_format::COMMON_WITH_VH,
            Preset::Combined => log_format::COMBINED,
            Preset::Moe => log_format::MOE,
        }
    }

    fn columns(&self) -> &'static [(&'static str, FieldName)] {
        match self {
            Preset::Common => columns::COMMON,
            Preset::CommonWithVh => columns::COMMON_WITH_VH,
            Preset::Combined => columns::COMBINED,
            Preset::Moe => columns::MOE,
        }
    }

    /// Same spec as compiling [`Preset::log_format`], without the lookup.
    pub fn spec(&self) -> FormatSpec {
        let columns = self.columns();
        FormatSpec {
            fields: columns.iter().map(|(_, field)| *field).collect(),
            directives: Some(columns.iter().map(|(d, _)| d.to_string()).collect()),
        }
    }
}

/// Ordered field names of a log format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    fields: Vec<FieldName>,
    /// Raw directives, present when compiled from a LogFormat string.
    directives: Option<Vec<String>>,
}

impl FormatSpec {
    /// Build a spec directly from field names.
    pub fn from_fields(fields: Vec<FieldName>) -> Self {
        Self {
            fields,
            directives: None,
        }
    }

    pub fn fields(&self) -> &[FieldName] {
        &self.fields
    }

    pub fn directives(&self) -> Option<&[String]> {
        self.directives.as_deref()
    }

    /// Expected number of fields per line.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, name: FieldName) -> Option<usize> {
        self.fields.iter().position(|f| *f == name)
    }

    pub fn contains(&self, name: FieldName) -> bool {
        self.position(name).is_some()
    }

    /// Column keys: the directives when known, field names otherwise.
    pub fn keys(&self) -> Vec<&str> {
        match &self.directives {
            Some(directives) => directives.iter().map(String::as_str).collect(),
            None => self.fields.iter().map(FieldName::as_str).collect(),
        }
    }

    /// LTSV labels, one per column.
    pub fn ltsv_labels(&self) -> Vec<&str> {
        match &self.directives {
            Some(directives) => directives.iter().map(|d| ltsv::label_for(d)).collect(),
            None => self.fields.iter().map(FieldName::as_str).collect(),
        }
    }
}

/// Split a LogFormat into its directives, dropping the quotes around each one.
pub fn split_log_format(log_format: &str) -> Vec<String> {
    log_format
        .split_whitespace()
        .map(|s| {
            let s = s.strip_prefix('"').unwrap_or(s);
            s.strip_suffix('"').unwrap_or(s).to_string()
        })
        .collect()
}

/// Compile a LogFormat string such as `%h %l %u %t "%r" %>s %b`.
pub fn compile_format(log_format: &str) -> Result<FormatSpec, FormatError> {
    let directives = split_log_format(log_format);
    if directives.is_empty() {
        return Err(FormatError::Empty);
    }

    let fields = directives
        .iter()
        .map(|d| {
            FieldName::from_directive(d).ok_or_else(|| FormatError::UnknownDirective {
                directive: d.clone(),
                format: log_format.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(log_format, fields = fields.len(), "compiled log format");

    Ok(FormatSpec {
        fields,
        directives: Some(directives),
    })
}

/// Resolve a preset name or compile a LogFormat string.
pub fn resolve_format(name_or_format: &str) -> Result<FormatSpec, FormatError> {
    if name_or_format.contains('%') {
        compile_format(name_or_format)
    } else {
        Preset::from_name(name_or_format.trim()).map(|p| p.spec())
    }
}
