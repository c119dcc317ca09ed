//! Batch: drives a reader line by line through a [`RecordParser`].
//!
//! Malformed lines never stop the stream: they are counted and handed to
//! an [`ErrorSink`], which owns reporting them. Only I/O errors abort.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use crate::record::{Record, RecordParser};

/// Receives lines that could not be turned into records.
pub trait ErrorSink: Send + Sync {
    fn report(&self, line: &str, reason: &str);
}

/// Writes rejected lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn report(&self, line: &str, reason: &str) {
        eprintln!("{}: {}", reason, line);
    }
}

/// Keeps rejected lines in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    reports: Mutex<Vec<(String, String)>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(line, reason)` pairs in the order they were reported.
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.reports().into_iter().map(|(line, _)| line).collect()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for CollectSink {
    fn report(&self, line: &str, reason: &str) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((line.to_string(), reason.to_string()));
        }
    }
}

/// Line counters, shared between concurrent readers.
#[derive(Debug, Default)]
pub struct ParseStats {
    pub lines: AtomicU64,
    pub parsed: AtomicU64,
    pub malformed: AtomicU64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_parsed(&self) {
        self.lines.fetch_add(1, Ordering::Relaxed);
        self.parsed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_malformed(&self) {
        self.lines.fetch_add(1, Ordering::Relaxed);
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Individual reads are atomic; the snapshot as a whole is not.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines: self.lines.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub lines: u64,
    pub parsed: u64,
    pub malformed: u64,
}

fn strip_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

/// Parse every line of `reader`, calling `f` with the raw line and its record.
pub fn each_record<R, F>(
    parser: &RecordParser,
    reader: R,
    sink: &dyn ErrorSink,
    f: F,
) -> io::Result<StatsSnapshot>
where
    R: BufRead,
    F: FnMut(&str, Record),
{
    let stats = ParseStats::new();
    each_record_with_stats(parser, reader, sink, &stats, f)?;
    Ok(stats.snapshot())
}

/// Like [`each_record`], counting into caller-owned stats.
pub fn each_record_with_stats<R, F>(
    parser: &RecordParser,
    mut reader: R,
    sink: &dyn ErrorSink,
    stats: &ParseStats,
    mut f: F,
) -> io::Result<()>
where
    R: BufRead,
    F: FnMut(&str, Record),
{
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        strip_terminator(&mut buf);
        let line = String::from_utf8_lossy(&buf);

        match parser.parse(&line) {
            Ok(record) => {
                stats.record_parsed();
                f(&line, record);
            }
            Err(e) => {
                stats.record_malformed();
                debug!(line_no, error = %e, "skipping malformed line");
                sink.report(e.line(), &e.to_string());
            }
        }
    }
    Ok(())
}
