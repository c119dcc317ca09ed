//! Output: line projections of parsed records (JSON, CSV, TSV, LTSV) and
//! the named logs that filter blocks route source lines to.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use thiserror::Error;

use crate::format::FormatSpec;
use crate::record::Record;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Tsv,
    Ltsv,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<OutputFormat> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "csv" => Some(OutputFormat::Csv),
            "tsv" => Some(OutputFormat::Tsv),
            "ltsv" => Some(OutputFormat::Ltsv),
            _ => None,
        }
    }
}

fn escape_tsv(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Tab-separated values, with embedded tabs and line breaks escaped. No trailing newline.
pub fn to_tsv<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| escape_tsv(v.as_ref()))
        .collect::<Vec<_>>()
        .join("\t")
}

/// One RFC 4180 record, newline terminated.
pub fn to_csv<S: AsRef<str>>(values: &[S]) -> Result<String, OutputError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
    let fields: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
    wtr.write_record(&fields)?;
    let bytes = wtr.into_inner().map_err(|e| OutputError::Io(e.into_error()))?;
    // csv only emits the UTF-8 it was given
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `label:value` pairs joined by tabs.
pub fn to_ltsv<L: AsRef<str>, S: AsRef<str>>(labels: &[L], values: &[S]) -> String {
    labels
        .iter()
        .zip(values)
        .map(|(l, v)| {
            let (label, value): (&str, &str) = (l.as_ref(), v.as_ref());
            format!("{}:{}", label, value)
        })
        .collect::<Vec<_>>()
        .join("\t")
}

pub fn to_json(record: &Record) -> Result<String, OutputError> {
    Ok(serde_json::to_string(record)?)
}

/// Writes one line per record in the configured projection.
pub struct RecordWriter<W: Write> {
    format: OutputFormat,
    labels: Vec<String>,
    inner: W,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(format: OutputFormat, spec: &FormatSpec, inner: W) -> Self {
        Self {
            format,
            labels: spec.ltsv_labels().into_iter().map(str::to_string).collect(),
            inner,
            written: 0,
        }
    }

    pub fn write(&mut self, record: &Record) -> Result<(), OutputError> {
        let values: Vec<&str> = record.values().collect();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.inner, record)?;
                self.inner.write_all(b"\n")?;
            }
            OutputFormat::Csv => self.inner.write_all(to_csv(&values)?.as_bytes())?,
            OutputFormat::Tsv => writeln!(self.inner, "{}", to_tsv(&values))?,
            OutputFormat::Ltsv => writeln!(self.inner, "{}", to_ltsv(&self.labels, &values))?,
        }
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Named logs under one directory, opened for append on first use.
///
/// Each write holds the file's shard lock, so lines from concurrent
/// sources never interleave mid-line.
#[derive(Debug)]
pub struct NamedLogs {
    dir: PathBuf,
    files: DashMap<String, BufWriter<File>>,
}

impl NamedLogs {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.log", name))
    }

    /// Append `line` and a newline to the log called `name`.
    pub fn write_line(&self, name: &str, line: &str) -> Result<(), OutputError> {
        let mut file = self.files.entry(name.to_string()).or_try_insert_with(|| {
            let path = self.path_for(name);
            info!("Opening named log {}", path.display());
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map(BufWriter::new)
        })?;
        writeln!(file.value_mut(), "{}", line)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), OutputError> {
        for mut file in self.files.iter_mut() {
            file.value_mut().flush()?;
        }
        Ok(())
    }

    /// Names of the logs opened so far.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.iter().map(|f| f.key().clone()).collect();
        names.sort();
        names
    }
}
