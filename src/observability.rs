//! Structured logging setup for host applications.
//!
//! [`writer::Writer`](crate::writer::Writer) emits `tracing` events at every
//! rotation boundary (subdirectory creation, file open/close) but never
//! installs a global subscriber itself — a library has no business deciding
//! how its host wants logs formatted. This module is the opt-in
//! initialization helper a binary embedding the writer can call, following
//! the teacher's `tracing_v4` module: a small `TracingConfig`, three output
//! formats, and an idempotent `init` that tolerates being called more than
//! once (tests, or multiple components racing to install the subscriber).

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Pretty-printed, ANSI-colored (development).
    Pretty,
    /// Compact, no color (production stdout/stderr).
    Compact,
    /// One JSON object per event (log aggregation).
    Json,
}

/// Tracing setup options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub level: Level,
    pub format: OutputFormat,
    pub with_span_events: bool,
    pub with_file_and_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Pretty,
            with_span_events: false,
            with_file_and_line: false,
        }
    }
}

impl TracingConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }
}

/// Install a global `tracing` subscriber per `config`. Idempotent: if a
/// subscriber is already installed (another component got there first, or a
/// prior test in the same process called this), this returns `Ok(())`
/// instead of erroring.
pub fn init(config: TracingConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_lowercase()));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = match config.format {
        OutputFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_file(config.with_file_and_line)
                .with_line_number(config.with_file_and_line)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(layer).try_init()
        }
        OutputFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_span_events(span_events)
                .with_file(config.with_file_and_line)
                .with_line_number(config.with_file_and_line)
                .with_ansi(false)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(layer).try_init()
        }
        OutputFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.with_file_and_line)
                .with_line_number(config.with_file_and_line)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(layer).try_init()
        }
    };

    result.or_else(|e| {
        if e.to_string()
            .contains("a global default trace dispatcher has already been set")
        {
            Ok(())
        } else {
            Err(format!("failed to initialize tracing: {e}"))
        }
    })
}
