//! Logging and tracing setup for the `qopt` binary
//!
//! Console output goes to stderr so stdout stays clean for results and
//! `--json`. An optional daily-rolling JSON file captures everything the
//! console filter lets through, for bug reports.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files should be written
    pub log_dir: PathBuf,

    /// Whether to write JSON logs to `log_dir`
    pub enable_json_logs: bool,

    /// Whether to log to stderr
    pub enable_console_logs: bool,

    /// Whether to include file/line information in logs
    pub include_location: bool,

    /// Whether to log span open/close (for timing backend calls)
    pub enable_spans: bool,

    /// Default log level filter, overridden by `RUST_LOG`
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            enable_spans: false,
            default_filter: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Maps `-v` occurrences to a filter: warn, info, debug, trace
    pub fn for_verbosity(verbose: u8) -> Self {
        let default_filter = match verbose {
            0 => "warn",
            1 => "warn,qopt_cli=info,qopt_workbench=info,qopt_analyzer=info",
            2 => "info,qopt_cli=debug,qopt_workbench=debug,qopt_analyzer=debug",
            _ => "debug,qopt_cli=trace,qopt_workbench=trace,qopt_analyzer=trace",
        };
        Self {
            enable_spans: verbose >= 2,
            default_filter: default_filter.to_string(),
            ..Self::default()
        }
    }

    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.enable_json_logs = enabled;
        self
    }
}

/// Initialize the logging system with the given configuration
///
/// The returned guard flushes the JSON file writer when dropped, so keep it
/// alive until the program exits.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG takes precedence over the configured default
    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
    };

    // NEW fires once when the span is created; ENTER would fire on every async
    // re-poll of the backend future.
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_ansi(true)
            .compact()
            .with_filter(env_filter())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "qopt.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter())
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        console_enabled = config.enable_console_logs,
        "Logging system initialized"
    );

    Ok(guard)
}

/// Get the log directory path
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qopt")
        .join("logs")
}

/// Guard that logs timing information when dropped
pub struct TimingGuard {
    name: &'static str,
    start: std::time::Instant,
}

impl TimingGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        tracing::debug!(
            operation = self.name,
            duration_ms = elapsed.as_millis() as u64,
            "Operation completed"
        );
    }
}
