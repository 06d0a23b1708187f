//! Structured logging to a file under the download directory, with a
//! graceful fallback to stderr if the file cannot be opened.
//!
//! Line format is fixed: `[<ISO8601>] [<LEVEL>] <message>`. `tracing-subscriber`'s
//! stock formatters don't produce this shape, so we implement `FormatEvent`
//! directly rather than configuring one of the built-in layers.

use chrono::Utc;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Writer that is either an open file or stderr, used when the file clone fails.
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileMakeWriter(std::fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = FileOrStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(FileOrStderr::File)
            .unwrap_or(FileOrStderr::Stderr)
    }
}

/// Renders `[<ISO8601>] [<LEVEL>] <message>`, dropping the span/field
/// decoration tracing-subscriber's default formatter would otherwise add.
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let now = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        write!(writer, "[{}] [{}] ", now, level_tag(*event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// Default log file name: `download_log_<ISO8601 timestamp>.txt`.
pub fn default_log_file_name() -> String {
    let ts = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let ts = ts.replace(':', "-");
    format!("download_log_{}.txt", ts)
}

/// Initializes logging to `<download_dir>/<log_file_name>`, creating
/// `download_dir` if necessary. Returns the resolved log file path.
pub fn init_logging(download_dir: &Path, log_file_name: Option<&str>) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(download_dir)?;
    let name = log_file_name
        .map(|s| s.to_string())
        .unwrap_or_else(default_log_file_name);
    let log_path = download_dir.join(name);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let writer: BoxMakeWriter = BoxMakeWriter::new(FileMakeWriter(file));
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,s3dl=debug"));

    tracing_subscriber::fmt()
        .event_format(LineFormat)
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!("logging initialized at {}", log_path.display());
    Ok(log_path)
}

/// Initializes logging to stderr only, for use when `init_logging` fails.
pub fn init_logging_stderr() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,s3dl=debug"));
    tracing_subscriber::fmt()
        .event_format(LineFormat)
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
