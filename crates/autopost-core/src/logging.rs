use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{Subscriber, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::{LocalTime, UtcTime};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::config_directory;

pub const LOG_FILE_NAME: &str = "autopost.log";
pub const LOG_FILTER_ENV: &str = "AUTOPOST_LOG";
const DEFAULT_FILTER: &str = "info";

/// Where run diagnostics go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingDestination {
    /// JSON file plus human-readable stderr, for interactive use.
    FileAndStderr,
    /// JSON file only, for unattended scheduled runs.
    FileOnly,
    /// Stderr only (tests, ad-hoc tools).
    StderrOnly,
}

impl LoggingDestination {
    fn writes_file(self) -> bool {
        !matches!(self, LoggingDestination::StderrOnly)
    }

    fn writes_stderr(self) -> bool {
        !matches!(self, LoggingDestination::FileOnly)
    }
}

#[derive(Debug)]
struct LoggingState {
    _guard: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

static LOGGING_STATE: OnceLock<LoggingState> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to prepare log directory: {0}")]
    Io(#[from] io::Error),
    #[error("invalid logging filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to install logging subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. The first call wins; later calls return the same log path.
pub fn init_logging(
    destination: LoggingDestination,
) -> Result<Option<&'static PathBuf>, LoggingError> {
    if LOGGING_STATE.get().is_none() {
        let state = install(destination, &config_directory().join("logs"))?;
        let _ = LOGGING_STATE.set(state);
    }
    Ok(current_log_path())
}

pub fn current_log_path() -> Option<&'static PathBuf> {
    LOGGING_STATE.get().and_then(|state| state.log_path.as_ref())
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

fn json_file_layer<S>(dir: &Path) -> Result<(BoxedLayer<S>, WorkerGuard), io::Error>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .event_format(
            tracing_subscriber::fmt::format()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_level(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with_writer(writer)
        .with_ansi(false)
        .boxed();
    Ok((layer, guard))
}

fn stderr_layer<S>() -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(false)
        .boxed()
}

fn install(destination: LoggingDestination, dir: &Path) -> Result<LoggingState, LoggingError> {
    let filter = build_filter(|key| env::var(key).ok())?;

    let (file_layer, guard, log_path) = if destination.writes_file() {
        let (layer, guard) = json_file_layer(dir)?;
        (Some(layer), Some(guard), Some(dir.join(LOG_FILE_NAME)))
    } else {
        (None, None, None)
    };
    let stderr = destination.writes_stderr().then(stderr_layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr)
        .try_init()?;

    if let Some(path) = log_path.as_ref() {
        info!(path = %path.display(), "Structured logging enabled");
    }

    Ok(LoggingState {
        _guard: guard,
        log_path,
    })
}

/// `AUTOPOST_LOG`, then `RUST_LOG`, then `info`. Blank values count as unset.
fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `AUTOPOST_LOG` must parse. A broken `RUST_LOG` is reported and replaced by the default.
fn build_filter<F>(lookup: F) -> Result<EnvFilter, ParseError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(directive) = non_blank(&lookup, LOG_FILTER_ENV) {
        return EnvFilter::try_new(directive);
    }
    if let Some(directive) = non_blank(&lookup, EnvFilter::DEFAULT_ENV) {
        match EnvFilter::try_new(&directive) {
            Ok(filter) => return Ok(filter),
            Err(err) => eprintln!(
                "Warning: ignoring {}={directive:?}: {err}",
                EnvFilter::DEFAULT_ENV
            ),
        }
    }
    EnvFilter::try_new(DEFAULT_FILTER)
}
