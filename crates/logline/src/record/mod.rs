//! Record: structured access-log records derived from parsed field values.
//!
//! `RecordParser` ties a [`LineParser`] to a [`FormatSpec`]: it splits the
//! line, checks the field count and derives the computed attributes
//! (request parts, numeric status and size, timestamp, referer parts).

pub mod request;
pub mod referer;
pub mod time;
mod serde_utils;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::format::{compile_format, FieldName, FormatError, FormatSpec, Preset};
use crate::parser::LineParser;
use serde_utils::{deserialize_fields_from_map, serialize_fields_as_map};

pub use referer::RefererParts;
pub use request::{split_request_line, RequestLine};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The line did not split into the number of fields the format expects.
    #[error("Malformed record: expected {expected} fields, found {found}")]
    Malformed {
        line: String,
        expected: usize,
        found: usize,
    },
}

impl RecordError {
    /// The offending line, exactly as it was handed to the parser.
    pub fn line(&self) -> &str {
        match self {
            RecordError::Malformed { line, .. } => line,
        }
    }
}

/// Knobs for record derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveOptions {
    pub parse_time: bool,
}

/// One parsed access-log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Raw field values in format order
    #[serde(
        serialize_with = "serialize_fields_as_map",
        deserialize_with = "deserialize_fields_from_map"
    )]
    fields: Vec<(FieldName, String)>,

    method: Option<String>,
    resource: Option<String>,
    protocol: Option<String>,
    status: Option<i64>,
    response_size: Option<i64>,
    /// Only set when time parsing is enabled and the value parses
    time: Option<DateTime<FixedOffset>>,
    referer_parts: Option<RefererParts>,
}

impl Record {
    fn derive(values: Vec<String>, spec: &FormatSpec, options: DeriveOptions) -> Record {
        let fields: Vec<(FieldName, String)> = spec.fields().iter().copied().zip(values).collect();
        let raw = |name: FieldName| {
            fields
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.as_str())
        };

        let status = raw(FieldName::LastRequestStatus)
            .or_else(|| raw(FieldName::OriginalRequestStatus))
            .map(coerce_int);
        let response_size = raw(FieldName::ResponseBytes).map(response_size);

        let time = if options.parse_time {
            raw(FieldName::Time).and_then(|t| {
                let parsed = time::parse_timestamp(t);
                if parsed.is_none() {
                    debug!(time = t, "unparsable timestamp");
                }
                parsed
            })
        } else {
            None
        };

        let (method, resource, protocol) = match raw(FieldName::FirstLineOfRequest) {
            Some(line) => {
                let req = split_request_line(line);
                (
                    req.method.map(str::to_string),
                    req.resource,
                    req.protocol.map(str::to_string),
                )
            }
            None => (None, None, None),
        };

        let referer_parts = raw(FieldName::Referer).and_then(referer::decompose);

        Record {
            fields,
            method,
            resource,
            protocol,
            status,
            response_size,
            time,
            referer_parts,
        }
    }

    /// Raw value of the first field called `name`.
    pub fn get(&self, name: FieldName) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(FieldName, String)] {
        &self.fields
    }

    /// Raw values in format order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.get(FieldName::RemoteHost)
    }

    pub fn remote_user(&self) -> Option<&str> {
        self.get(FieldName::RemoteUser)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.get(FieldName::UserAgent)
    }

    pub fn referer(&self) -> Option<&str> {
        self.get(FieldName::Referer)
    }

    pub fn first_line_of_request(&self) -> Option<&str> {
        self.get(FieldName::FirstLineOfRequest)
    }

    /// `%t` exactly as logged.
    pub fn time_raw(&self) -> Option<&str> {
        self.get(FieldName::Time)
    }

    /// Method from the request line, or the `%m` field.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref().or_else(|| self.get(FieldName::Method))
    }

    /// Path and query from the request line, or the `%U%q` field.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref().or_else(|| self.get(FieldName::Resource))
    }

    /// Protocol from the request line, or the `%H` field.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref().or_else(|| self.get(FieldName::Protocol))
    }

    pub fn status(&self) -> Option<i64> {
        self.status
    }

    /// Response size in bytes, `-` counted as 0.
    pub fn response_size(&self) -> Option<i64> {
        self.response_size
    }

    pub fn time(&self) -> Option<DateTime<FixedOffset>> {
        self.time
    }

    pub fn referer_parts(&self) -> Option<&RefererParts> {
        self.referer_parts.as_ref()
    }

    pub fn referer_scheme(&self) -> Option<&str> {
        self.referer_parts.as_ref().map(|r| r.scheme.as_str())
    }

    pub fn referer_host(&self) -> Option<&str> {
        self.referer_parts.as_ref().map(|r| r.host.as_str())
    }

    pub fn referer_resource(&self) -> Option<&str> {
        self.referer_parts.as_ref().map(|r| r.resource.as_str())
    }

    /// Calendar date of the request, shifted by `offset_days`, in the logged time zone.
    pub fn date(&self, offset_days: i64) -> Option<NaiveDate> {
        let time = self.time?;
        let shifted = time.checked_add_signed(chrono::Duration::days(offset_days))?;
        Some(shifted.date_naive())
    }

    pub fn referred_from_host(&self, host: &str) -> bool {
        self.referer_host() == Some(host)
    }
}

/// Integer coercion that reads leading digits and yields 0 when there are none.
pub fn coerce_int(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

/// Response size; the literal `-` (nothing sent) is 0.
pub fn response_size(raw: &str) -> i64 {
    if raw == "-" {
        0
    } else {
        coerce_int(raw)
    }
}

/// Build a record from already-split values.
///
/// Without a source line the error payload is the values joined by spaces.
pub fn make_record(
    values: Vec<String>,
    spec: &FormatSpec,
    options: DeriveOptions,
) -> Result<Record, RecordError> {
    if values.len() != spec.len() {
        return Err(RecordError::Malformed {
            line: values.join(" "),
            expected: spec.len(),
            found: values.len(),
        });
    }
    Ok(Record::derive(values, spec, options))
}

/// Parser for one log format: line → fields → [`Record`].
#[derive(Debug, Clone)]
pub struct RecordParser {
    line_parser: LineParser,
    spec: Arc<FormatSpec>,
    options: DeriveOptions,
}

impl RecordParser {
    pub fn new(spec: FormatSpec) -> Self {
        Self {
            line_parser: LineParser::default(),
            spec: Arc::new(spec),
            options: DeriveOptions::default(),
        }
    }

    /// Parser for a LogFormat string, e.g. `%h %l %u %t "%r" %>s %b`.
    pub fn from_log_format(log_format: &str) -> Result<Self, FormatError> {
        Ok(Self::new(compile_format(log_format)?))
    }

    pub fn preset(preset: Preset) -> Self {
        Self::new(preset.spec())
    }

    pub fn common() -> Self {
        Self::preset(Preset::Common)
    }

    pub fn combined() -> Self {
        Self::preset(Preset::Combined)
    }

    pub fn with_parse_time(mut self, parse_time: bool) -> Self {
        self.options.parse_time = parse_time;
        self
    }

    pub fn parse_time(&self) -> bool {
        self.options.parse_time
    }

    pub fn spec(&self) -> &FormatSpec {
        &self.spec
    }

    /// Split a line into field values without checking them against the format.
    pub fn split(&self, line: &str) -> Vec<String> {
        self.line_parser.parse(line)
    }

    pub fn parse(&self, line: &str) -> Result<Record, RecordError> {
        let values = self.split(line);
        if values.len() != self.spec.len() {
            return Err(RecordError::Malformed {
                line: line.to_string(),
                expected: self.spec.len(),
                found: values.len(),
            });
        }
        Ok(Record::derive(values, &self.spec, self.options))
    }

    pub fn create(&self, values: Vec<String>) -> Result<Record, RecordError> {
        make_record(values, &self.spec, self.options)
    }

    /// Values keyed by directive (or field name), plus the method, protocol
    /// and resource split out of the request line when not already present.
    pub fn to_hash(&self, values: &[String]) -> Vec<(String, String)> {
        let mut hash: Vec<(String, String)> = self
            .spec
            .keys()
            .into_iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        let request = self
            .spec
            .position(FieldName::FirstLineOfRequest)
            .and_then(|i| values.get(i));
        if let Some(line) = request {
            let req = split_request_line(line);
            let by_directive = self.spec.directives().is_some();
            let derived = [
                (if by_directive { "%m" } else { "method" }, req.method.map(str::to_string)),
                (if by_directive { "%H" } else { "protocol" }, req.protocol.map(str::to_string)),
                (if by_directive { "%U%q" } else { "resource" }, req.resource),
            ];
            for (key, value) in derived {
                if let Some(value) = value {
                    if !hash.iter().any(|(k, _)| k == key) {
                        hash.push((key.to_string(), value));
                    }
                }
            }
        }
        hash
    }

    pub fn parse_to_hash(&self, line: &str) -> Vec<(String, String)> {
        self.to_hash(&self.split(line))
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::combined()
    }
}
