//! Logging and metrics setup.
//!
//! Installs a `tracing` subscriber (pretty or JSON, stderr or file) and,
//! when enabled, the Prometheus metrics recorder. Library code only emits
//! events and counters; nothing is recorded until [`init`] runs.

use crate::config::{LogFormat, LoggingConfig, MetricsConfig};
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs::{File, OpenOptions};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Options supplied by the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// Whether `--verbose` was passed.
    pub verbose: bool,
    /// Whether to expose metrics on an HTTP listener (only for `serve`).
    pub metrics_expose: bool,
}

/// Handle for the installed metrics recorder.
#[derive(Debug, Default)]
pub struct ObservabilityHandle {
    metrics: Option<PrometheusHandle>,
}

impl ObservabilityHandle {
    /// Renders the current metrics in Prometheus text format, if a recorder
    /// was installed.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.as_ref().map(PrometheusHandle::render)
    }
}

/// Builds the event filter.
///
/// `RUST_LOG` wins, then the configured level, then `info` when verbose and
/// `warn` otherwise.
#[must_use]
pub fn build_filter(logging: &LoggingConfig, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let fallback = if verbose { "info" } else { "warn" };
    logging
        .level
        .as_deref()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

/// Initializes logging and metrics for the process.
///
/// # Errors
///
/// Returns an error if observability has already been initialized, the log
/// file cannot be opened, or the metrics recorder cannot be installed.
pub fn init(
    logging: &LoggingConfig,
    metrics: &MetricsConfig,
    options: InitOptions,
) -> Result<ObservabilityHandle> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(init_failed("observability already initialized"));
    }

    let filter = build_filter(logging, options.verbose);
    let (writer, ansi) = match &logging.file {
        Some(path) => (BoxMakeWriter::new(open_log_file(path)?), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    match logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true),
            )
            .with(filter)
            .try_init(),
    }
    .map_err(init_failed)?;

    let handle = ObservabilityHandle {
        metrics: install_prometheus(metrics, options.metrics_expose)?,
    };

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| init_failed("failed to mark observability initialized"))?;

    Ok(handle)
}

/// Installs the Prometheus recorder, with an HTTP listener when `expose`.
fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    if expose {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port);
        let handle = install_listener(builder.with_http_listener(addr))?;
        tracing::info!(%addr, "Metrics exporter listening");
        return Ok(Some(handle));
    }

    builder
        .install_recorder()
        .map(Some)
        .map_err(|e| Error::operation("metrics_recorder_install", e))
}

/// Runs the exporter on the current runtime, or on a dedicated thread when
/// called outside one.
fn install_listener(builder: PrometheusBuilder) -> Result<PrometheusHandle> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        return install_with_runtime(builder, &handle);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::operation("metrics_runtime_init", e))?;
    let handle = runtime.handle().clone();
    let prometheus = install_with_runtime(builder, &handle)?;
    std::thread::Builder::new()
        .name("metrics-exporter-prometheus-http".to_string())
        .spawn(move || runtime.block_on(std::future::pending::<()>()))
        .map_err(|e| Error::operation("metrics_runtime_thread", e))?;
    Ok(prometheus)
}

fn install_with_runtime(
    builder: PrometheusBuilder,
    runtime_handle: &tokio::runtime::Handle,
) -> Result<PrometheusHandle> {
    let (recorder, exporter) = {
        let _guard = runtime_handle.enter();
        builder.build().map_err(|e| Error::operation("metrics_exporter_build", e))?
    };
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| Error::operation("metrics_recorder_install", e))?;
    runtime_handle.spawn(exporter);
    Ok(handle)
}

/// Opens a log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<Mutex<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_log_dir", e))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::operation("open_log_file", format!("{}: {e}", path.display())))?;

    Ok(Mutex::new(file))
}

fn init_failed(cause: impl std::fmt::Display) -> Error {
    Error::operation("observability_init", cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("snipster.log");

        let writer = open_log_file(&path).unwrap();
        writer.lock().unwrap().write_all(b"hello\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig::default();
        assert!(install_prometheus(&config, false).unwrap().is_none());
    }

    #[test]
    fn test_handle_without_metrics_renders_none() {
        assert!(ObservabilityHandle::default().render_metrics().is_none());
    }
}
