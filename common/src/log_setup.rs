use std::path::PathBuf;
use std::sync::{Once, OnceLock};

use anyhow::{bail, Context};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where and how much an application logs.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or `"bibo=debug"`.
    pub base_level: String,
    pub dir: PathBuf,
    pub file_prefix: String,
    /// Rotated daily files kept on disk.
    pub max_files: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            base_level: "info".to_string(),
            dir: PathBuf::from("logs"),
            file_prefix: "bibo".to_string(),
            max_files: 5,
        }
    }
}

/// Console + daily rolling file logging. `RUST_LOG` overrides the base level.
///
/// Warnings and errors are also written to stderr. Fails when called twice.
pub fn setup_logging(settings: &LogSettings) -> anyhow::Result<()> {
    if LOG_GUARD.get().is_some() {
        bail!("Logging already initialized");
    }
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.base_level))
        .with_context(|| format!("Invalid log filter '{}'", settings.base_level))?;

    std::fs::create_dir_all(&settings.dir)
        .with_context(|| format!("Failed to create log directory {}", settings.dir.display()))?;
    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(&settings.file_prefix)
        .filename_suffix("log")
        .max_log_files(settings.max_files)
        .build(&settings.dir)
        .context("Failed to create log file appender")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN)));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Logger initialization failed")?;
    let _ = LOG_GUARD.set(guard);
    Ok(())
}

/// Captured-output logging for unit tests. Safe to call from every test.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
