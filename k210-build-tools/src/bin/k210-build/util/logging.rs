//! Log output of the command line tool.
//!
//! Diagnostics go to stderr in a compact format. A JSON copy can be written
//! to a file with `--log-file`.

use std::{fs::File, path::Path};

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter as TracingLevel;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[clap(rename_all = "UPPER")]
#[serde(rename_all = "UPPERCASE")]
pub enum LevelFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LevelFilter> for TracingLevel {
    fn from(level: LevelFilter) -> Self {
        match level {
            LevelFilter::Off => TracingLevel::OFF,
            LevelFilter::Error => TracingLevel::ERROR,
            LevelFilter::Warn => TracingLevel::WARN,
            LevelFilter::Info => TracingLevel::INFO,
            LevelFilter::Debug => TracingLevel::DEBUG,
            LevelFilter::Trace => TracingLevel::TRACE,
        }
    }
}

/// An explicit level replaces `RUST_LOG`. Without one, `RUST_LOG` applies and
/// warnings are shown by default.
fn stderr_filter(level: Option<LevelFilter>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::builder()
            .with_default_directive(TracingLevel::from(level).into())
            .parse_lossy(""),
        None => EnvFilter::builder()
            .with_default_directive(TracingLevel::WARN.into())
            .from_env_lossy(),
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the log file when dropped, keep it alive until
/// the session ends.
pub fn setup_logging(
    log_file: Option<&Path>,
    level: Option<LevelFilter>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter(level));

    let Some(log_file) = log_file else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return Ok(None);
    };

    let (writer, guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(File::create(log_file)?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer),
        )
        .init();

    tracing::debug!("Logging to {}", log_file.display());

    Ok(Some(guard))
}

/// Prints a line to stderr.
pub fn eprintln(message: impl AsRef<str>) {
    eprintln!("{}", message.as_ref());
}

/// Prints a line to stdout.
pub fn println(message: impl AsRef<str>) {
    println!("{}", message.as_ref());
}
