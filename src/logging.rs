use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::EnvFilter;

use crate::data_paths::DataPaths;

#[derive(Debug, Clone, PartialEq)]
pub enum LogMode {
    /// Console + file logging (for interactive runs)
    ConsoleAndFile,
    /// File-only logging (for batch runs or embedding in a host process)
    FileOnly,
}

pub struct LoggingConfig {
    pub mode: LogMode,
    pub data_paths: DataPaths,
    pub session_id: String,
}

impl LoggingConfig {
    pub fn new(mode: LogMode, data_paths: DataPaths) -> Self {
        Self {
            mode,
            data_paths,
            session_id: generate_session_id(),
        }
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.data_paths
            .logs()
            .join(format!("tradeshed-{}.log", self.session_id))
    }
}

/// Initialize logging for one session.
///
/// Level comes from `RUST_LOG`, defaulting to info. Every session writes
/// its own log file under the data directory's `logs/`; interactive mode
/// mirrors output to stderr as well.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    config.data_paths.ensure_directories()?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_writer = session_writer(&config)?;

    match config.mode {
        LogMode::ConsoleAndFile => {
            use tracing_subscriber::fmt::writer::MakeWriterExt;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr.and(file_writer))
                .with_ansi(true)
                .with_target(false)
                .compact()
                .init();
        }
        LogMode::FileOnly => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .init();
        }
    }

    tracing::info!(
        session_id = %config.session_id,
        mode = ?config.mode,
        log_file = %config.log_file_path().display(),
        "Logging initialized"
    );

    Ok(())
}

/// Non-blocking writer over this session's log file. The flush guard is
/// leaked on purpose: logging stays alive for the whole process.
fn session_writer(config: &LoggingConfig) -> Result<NonBlocking> {
    let path = config.log_file_path();
    let log_file = std::fs::File::create(&path)
        .with_context(|| format!("creating log file {}", path.display()))?;

    let (writer, guard) = non_blocking(log_file);
    std::mem::forget(guard);
    Ok(writer)
}

/// Generate a unique session ID with timestamp
fn generate_session_id() -> String {
    Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Log session end
pub fn log_session_end() {
    tracing::info!("Session ended");
}
