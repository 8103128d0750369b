//! Console verbosity and tracing subscriber setup

use std::io;
use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// How much the bootstrapper writes to the console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No output at all (`-s -s`)
    Silent,
    /// Errors only (`-s`)
    ErrorsOnly,
    #[default]
    Normal,
    /// Informational output plus timing traces (`-v`)
    Trace,
}

impl Verbosity {
    /// Derive the verbosity from the number of `-s` flags and the `-v` flag.
    /// Silence wins over verbosity.
    pub fn from_flags(silent: u8, verbose: bool) -> Self {
        match (silent, verbose) {
            (0, false) => Self::Normal,
            (0, true) => Self::Trace,
            (1, _) => Self::ErrorsOnly,
            _ => Self::Silent,
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Silent => LevelFilter::OFF,
            Self::ErrorsOnly => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Diagnostics context handed to every strategy at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    verbosity: Verbosity,
}

impl Diagnostics {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Whether strategy calls should be timed and traced
    pub fn trace_enabled(&self) -> bool {
        self.verbosity == Verbosity::Trace
    }
}

/// Install the global tracing subscriber.
///
/// Console output goes to stderr, filtered by `verbosity` unless `RUST_LOG`
/// says otherwise. When `log_file` is set, every event down to debug level is
/// also appended to it as JSON. Keep the returned guard alive until exit so
/// the file writer is flushed.
pub fn init_logging(verbosity: Verbosity, log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let console_filter = EnvFilter::builder()
        .with_default_directive(verbosity.level_filter().into())
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(console_filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path.file_name().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Log file path has no file name: {}", path.display()),
                )
            })?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(guard)
}
