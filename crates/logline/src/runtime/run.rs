//! Run: stream input files through the parser and filter on blocking tasks,
//! emitting projections in argument order.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::batch::{each_record_with_stats, ErrorSink, ParseStats, StatsSnapshot, StderrSink};
use crate::filter::{Destination, Filter};
use crate::output::{NamedLogs, OutputError, OutputFormat, RecordWriter};
use crate::record::{Record, RecordParser};
use crate::runtime::boot::Runtime;

/// Where lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    /// Files in order, or stdin when none are given.
    pub fn from_args(args: Vec<String>) -> Vec<Source> {
        if args.is_empty() {
            vec![Source::Stdin]
        } else {
            args.into_iter().map(|a| Source::File(PathBuf::from(a))).collect()
        }
    }

    fn name(&self) -> String {
        match self {
            Source::Stdin => "<stdin>".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }
}

/// Parser, filter and outputs shared by every source of a run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    parser: Arc<RecordParser>,
    filter: Arc<Filter>,
    format: OutputFormat,
    named: Arc<NamedLogs>,
}

impl Pipeline {
    pub fn new(parser: Arc<RecordParser>, filter: Arc<Filter>, format: OutputFormat, named: Arc<NamedLogs>) -> Self {
        Self {
            parser,
            filter,
            format,
            named,
        }
    }

    pub fn from_runtime(rt: &Runtime) -> Self {
        Self::new(
            Arc::clone(&rt.parser),
            Arc::clone(&rt.filter),
            rt.config.output,
            Arc::clone(&rt.named),
        )
    }

    /// Stream `reader` into `out`, one projection per accepted record.
    ///
    /// Records are written as they are parsed; everything written before a
    /// read error stays in `out`. Returns the number of projections written.
    pub fn process<R: BufRead, W: Write>(
        &self,
        reader: R,
        out: W,
        sink: &dyn ErrorSink,
        stats: &ParseStats,
    ) -> Result<u64, OutputError> {
        let mut writer = RecordWriter::new(self.format, self.parser.spec(), out);
        let mut write_error: Option<OutputError> = None;

        let read = each_record_with_stats(&self.parser, reader, sink, stats, |line, record| {
            if write_error.is_some() {
                return;
            }
            if let Err(e) = self.emit(&mut writer, line, &record) {
                write_error = Some(e);
            }
        });

        let flushed = writer.flush().and_then(|_| self.named.flush());
        read?;
        if let Some(e) = write_error {
            return Err(e);
        }
        flushed?;
        Ok(writer.written())
    }

    fn emit<W: Write>(&self, writer: &mut RecordWriter<W>, line: &str, record: &Record) -> Result<(), OutputError> {
        for destination in self.filter.route(record) {
            match destination {
                Destination::Default => writer.write(record)?,
                Destination::Named(name) => self.named.write_line(name, line)?,
            }
        }
        Ok(())
    }

    fn process_source<W: Write>(&self, source: &Source, out: W, stats: &ParseStats) -> Result<u64, OutputError> {
        match source {
            Source::Stdin => self.process(io::stdin().lock(), out, &StderrSink, stats),
            Source::File(path) => {
                let file = File::open(path)?;
                self.process(BufReader::new(file), out, &StderrSink, stats)
            }
        }
    }
}

/// Process every source on its own blocking task.
///
/// A single source writes straight to stdout. With several, each spools to
/// an anonymous temp file that is copied to stdout in argument order, so a
/// source that fails part way still contributes what it parsed.
pub async fn run(rt: Runtime, sources: Vec<Source>) -> Result<StatsSnapshot, Box<dyn std::error::Error>> {
    let pipeline = Pipeline::from_runtime(&rt);
    let stats = Arc::new(ParseStats::new());

    let failed = match <[Source; 1]>::try_from(sources) {
        Ok([source]) => {
            let name = source.name();
            let pipeline = pipeline.clone();
            let stats = Arc::clone(&stats);
            let result = tokio::task::spawn_blocking(move || {
                pipeline.process_source(&source, io::stdout().lock(), &stats)
            })
            .await?;
            report(&name, result)
        }
        Err(sources) => run_spooled(&pipeline, sources, &stats).await?,
    };

    let snapshot = stats.snapshot();
    info!(
        lines = snapshot.lines,
        parsed = snapshot.parsed,
        malformed = snapshot.malformed,
        failed_sources = failed,
        "done"
    );

    if failed > 0 {
        return Err(format!("{} input(s) could not be processed", failed).into());
    }
    Ok(snapshot)
}

async fn run_spooled(
    pipeline: &Pipeline,
    sources: Vec<Source>,
    stats: &Arc<ParseStats>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let tasks: Vec<_> = sources
        .into_iter()
        .map(|source| {
            let name = source.name();
            let pipeline = pipeline.clone();
            let stats = Arc::clone(stats);
            let handle = tokio::task::spawn_blocking(move || -> io::Result<_> {
                let mut spool = tempfile::tempfile()?;
                let result = pipeline.process_source(&source, &mut spool, &stats);
                Ok((spool, result))
            });
            (handle, name)
        })
        .collect();

    let mut failed = 0usize;
    for (handle, name) in tasks {
        let (mut spool, result) = handle.await??;
        spool.seek(SeekFrom::Start(0))?;
        let mut stdout = io::stdout().lock();
        io::copy(&mut spool, &mut stdout)?;
        stdout.flush()?;
        failed += report(&name, result);
    }
    Ok(failed)
}

fn report(name: &str, result: Result<u64, OutputError>) -> usize {
    match result {
        Ok(written) => {
            info!("Processed {}: {} records written", name, written);
            0
        }
        Err(e) => {
            error!("Failed to process {}: {}", name, e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::CollectSink;
    use crate::conf::{Config, FilterConfig, QueryConfig};
    use crate::filter::{Query, QueryBlock, QueryMode, QueryType};
    use crate::format::FormatCache;
    use crate::runtime::boot;
    use std::io::{Cursor, Read};

    const LINES: &str = concat!(
        r#"192.168.3.4 - quidam [07/Feb/2016:07:39:42 +0900] "GET /index.html HTTP/1.1" 200 432 "-" "Firefox/1.0""#,
        "\n",
        r#"66.249.66.1 - - [07/Feb/2016:07:40:00 +0900] "GET /docs/a.html HTTP/1.1" 200 10 "-" "Googlebot/2.1""#,
        "\n",
        "some thing wrong\n",
    );

    fn pipeline(filter: Filter, format: OutputFormat, named: NamedLogs) -> Pipeline {
        Pipeline::new(
            Arc::new(RecordParser::combined()),
            Arc::new(filter),
            format,
            Arc::new(named),
        )
    }

    /// Yields its buffer, then fails.
    struct FailingReader {
        inner: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.inner.read(buf)? {
                0 => Err(io::Error::other("disk error")),
                n => Ok(n),
            }
        }
    }

    // ── Processing ───────────────────────────────────────────────

    #[test]
    fn test_process_tsv() {
        let stats = ParseStats::new();
        let sink = CollectSink::new();
        let mut out = Vec::new();
        let written = pipeline(Filter::pass_all(), OutputFormat::Tsv, NamedLogs::new("."))
            .process(Cursor::new(LINES), &mut out, &sink, &stats)
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(written, 2);
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("192.168.3.4\t-\tquidam\t"));
        assert_eq!(sink.lines(), vec!["some thing wrong"]);
        assert_eq!(stats.snapshot().malformed, 1);
    }

    #[test]
    fn test_process_applies_filter() {
        let filter = Filter::new(
            vec![QueryBlock::new(
                Query::new(None, vec!["/docs/".to_string()]),
                vec![QueryMode::AccessToUnderResources],
                QueryType::Any,
                None,
            )],
            None,
        );
        let mut out = Vec::new();
        pipeline(filter, OutputFormat::Csv, NamedLogs::new("."))
            .process(Cursor::new(LINES), &mut out, &CollectSink::new(), &ParseStats::new())
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("66.249.66.1,"));
    }

    #[test]
    fn test_process_keeps_records_before_read_error() {
        let line = LINES.lines().next().unwrap();
        let input: String = (0..1000).map(|_| format!("{}\n", line)).collect();
        let reader = BufReader::new(FailingReader {
            inner: Cursor::new(input.into_bytes()),
        });
        let stats = ParseStats::new();
        let mut out = Vec::new();

        let result = pipeline(Filter::pass_all(), OutputFormat::Tsv, NamedLogs::new("."))
            .process(reader, &mut out, &CollectSink::new(), &stats);

        assert!(matches!(result, Err(OutputError::Io(_))));
        assert_eq!(stats.snapshot().parsed, 1000);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1000);
    }

    #[test]
    fn test_process_routes_to_named_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config = FilterConfig {
            blocks: vec![
                QueryConfig {
                    queries: vec![QueryMode::AccessToUnderResources],
                    resources: vec!["/docs/".to_string()],
                    output_log_name: Some("docs".to_string()),
                    ..Default::default()
                },
                QueryConfig {
                    queries: vec![QueryMode::AccessToResources],
                    resources: vec!["/index.html".to_string()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let filter = Filter::from_config(&config, &Default::default()).unwrap();
        let mut out = Vec::new();
        let written = pipeline(filter, OutputFormat::Tsv, NamedLogs::new(dir.path()))
            .process(Cursor::new(LINES), &mut out, &CollectSink::new(), &ParseStats::new())
            .unwrap();

        assert_eq!(written, 1);
        assert!(String::from_utf8(out).unwrap().starts_with("192.168.3.4\t"));
        let docs = std::fs::read_to_string(dir.path().join("docs.log")).unwrap();
        assert_eq!(docs, format!("{}\n", LINES.lines().nth(1).unwrap()));
    }

    // ── Sources ──────────────────────────────────────────────────

    #[test]
    fn test_sources_from_args() {
        assert_eq!(Source::from_args(vec![]), vec![Source::Stdin]);
        assert_eq!(
            Source::from_args(vec!["a.log".to_string(), "b.log".to_string()]),
            vec![Source::File("a.log".into()), Source::File("b.log".into())]
        );
    }

    #[tokio::test]
    async fn test_run_counts_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        std::fs::write(&a, LINES).unwrap();
        std::fs::write(&b, LINES).unwrap();

        let rt = boot::build(Config::default(), &FormatCache::new()).unwrap();
        let snapshot = run(rt, vec![Source::File(a), Source::File(b)]).await.unwrap();
        assert_eq!(snapshot, StatsSnapshot { lines: 6, parsed: 4, malformed: 2 });
    }

    #[tokio::test]
    async fn test_run_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        std::fs::write(&a, LINES).unwrap();

        let rt = boot::build(Config::default(), &FormatCache::new()).unwrap();
        let snapshot = run(rt, vec![Source::File(a)]).await.unwrap();
        assert_eq!(snapshot, StatsSnapshot { lines: 3, parsed: 2, malformed: 1 });
    }

    #[tokio::test]
    async fn test_run_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        std::fs::write(&a, LINES).unwrap();

        let rt = boot::build(Config::default(), &FormatCache::new()).unwrap();
        let result = run(rt, vec![Source::File(a), Source::File(dir.path().join("missing.log"))]).await;
        assert!(result.is_err());
    }
}
