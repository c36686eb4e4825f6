//! Rendering of result records for stdout.

use std::io::{self, Write};
use std::sync::Arc;

use btdig_core::{ResultRecord, ResultSink};
use clap::ValueEnum;
use tokio::sync::Notify;

/// How records are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `link|name|size|seeds|leech|engine_url|desc_link|pub_date`, one per line.
    Nova,
    /// One JSON object per line.
    Json,
}

/// Sink writing one formatted line per record.
///
/// The first write error is kept and `closed` is notified, after which
/// further records are dropped.
pub struct LineSink<W> {
    writer: W,
    format: OutputFormat,
    closed: Arc<Notify>,
    error: Option<io::Error>,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(writer: W, format: OutputFormat, closed: Arc<Notify>) -> Self {
        Self {
            writer,
            format,
            closed,
            error: None,
        }
    }

    /// Flush and report the first write error. A closed pipe is not an error.
    pub fn finish(mut self) -> io::Result<()> {
        if self.error.is_none() {
            if let Err(e) = self.writer.flush() {
                self.error = Some(e);
            }
        }
        match self.error {
            Some(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<W: Write + Send> ResultSink for LineSink<W> {
    fn emit(&mut self, record: ResultRecord) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.writer, "{}", format_record(&record, self.format)) {
            self.error = Some(e);
            self.closed.notify_one();
        }
    }
}

/// Render a record as a single line (without trailing newline).
pub fn format_record(record: &ResultRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Nova => nova_line(record),
        OutputFormat::Json => serde_json::to_string(record).unwrap_or_default(),
    }
}

/// Pipe-separated line understood by search plugin hosts.
pub fn nova_line(record: &ResultRecord) -> String {
    [
        record.link.clone(),
        record.name.replace('|', " "),
        size_to_bytes(&record.size).to_string(),
        record.seeds.to_string(),
        record.leech.to_string(),
        record.engine_url.clone(),
        record.desc_link.clone(),
        record.pub_date.to_string(),
    ]
    .join("|")
}

/// Convert a human readable size ("1.5 GB", "700 MiB") to bytes.
///
/// Unit prefixes are binary (K = 1024). Returns -1 when no number is found.
pub fn size_to_bytes(size: &str) -> i64 {
    let size = size.trim();
    let split = size
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(size.len());
    let (number, unit) = size.split_at(split);

    let Ok(value) = number.replace(',', "").parse::<f64>() else {
        return -1;
    };

    let exponent = match unit.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('K') => 1,
        Some('M') => 2,
        Some('G') => 3,
        Some('T') => 4,
        Some('P') => 5,
        _ => 0,
    };

    (value * 1024f64.powi(exponent)).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use btdig_core::{UNKNOWN_COUNT, UNKNOWN_TIMESTAMP};
    use std::time::Duration;

    fn record() -> ResultRecord {
        ResultRecord {
            link: "magnet:?xt=urn:btih:abc".to_string(),
            name: "Left|Right".to_string(),
            size: "1.5 GB".to_string(),
            engine_url: "https://btdig.com".to_string(),
            desc_link: "https://btdig.com/abc/left".to_string(),
            pub_date: UNKNOWN_TIMESTAMP,
            seeds: UNKNOWN_COUNT,
            leech: UNKNOWN_COUNT,
        }
    }

    #[test]
    fn test_size_to_bytes_units() {
        assert_eq!(size_to_bytes("512 B"), 512);
        assert_eq!(size_to_bytes("1 KB"), 1024);
        assert_eq!(size_to_bytes("1.5 GB"), 1_610_612_736);
        assert_eq!(size_to_bytes("700 MiB"), 734_003_200);
        assert_eq!(size_to_bytes("2 TB"), 2 * 1024_i64.pow(4));
        assert_eq!(size_to_bytes("  3 mb "), 3 * 1024 * 1024);
        assert_eq!(size_to_bytes("1,024 KB"), 1024 * 1024);
    }

    #[test]
    fn test_size_to_bytes_unparseable() {
        assert_eq!(size_to_bytes(""), -1);
        assert_eq!(size_to_bytes("unknown"), -1);
    }

    #[test]
    fn test_nova_line() {
        assert_eq!(
            nova_line(&record()),
            "magnet:?xt=urn:btih:abc|Left Right|1610612736|-1|-1|https://btdig.com|https://btdig.com/abc/left|-1"
        );
    }

    /// Writer whose reader has gone away.
    struct ClosedPipe {
        writes: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_line_sink_writes_lines() {
        let mut sink = LineSink::new(Vec::new(), OutputFormat::Nova, Arc::new(Notify::new()));
        sink.emit(record());
        sink.emit(record());

        let text = String::from_utf8(sink.writer.clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("magnet:?xt=urn:btih:abc|Left Right|"));
        assert!(sink.finish().is_ok());
    }

    #[tokio::test]
    async fn test_line_sink_signals_closed_pipe() {
        let closed = Arc::new(Notify::new());
        let mut sink = LineSink::new(ClosedPipe { writes: 0 }, OutputFormat::Json, closed.clone());

        sink.emit(record());
        sink.emit(record());
        assert_eq!(sink.writer.writes, 1);

        let notified = tokio::time::timeout(Duration::from_millis(10), closed.notified()).await;
        assert!(notified.is_ok());
        assert!(sink.finish().is_ok());
    }

    #[test]
    fn test_json_line() {
        let line = format_record(&record(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["name"], "Left|Right");
        assert_eq!(value["size"], "1.5 GB");
        assert!(!line.contains('\n'));
    }
}
