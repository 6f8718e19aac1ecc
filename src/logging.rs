//! Tracing subscriber setup
//!
//! Console output only when asked for (`--verbose` or `RUST_LOG`); every
//! run also appends to `installer.log` under the local data directory.

use anyhow::Result;
use std::path::PathBuf;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE: &str = "installer.log";

/// `<data_local_dir>/pt-installer/logs`
pub fn log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("pt-installer").join("logs"))
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file when dropped; keep it alive for
/// the whole process. If the log file cannot be opened, logging continues
/// on the console only.
pub fn init(verbose: bool) -> Result<Option<WorkerGuard>> {
    let console = if verbose || std::env::var("RUST_LOG").is_ok() {
        let filter = EnvFilter::from_default_env().add_directive(if verbose {
            "pt_installer=debug".parse()?
        } else {
            "pt_installer=warn".parse()?
        });
        Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
    } else {
        None
    };

    let mut file_error = None;
    let (file, guard) = match open_log_file() {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("pt_installer=info"));
            (Some(layer), Some(guard))
        }
        Err(e) => {
            file_error = Some(e);
            (None, None)
        }
    };

    // A subscriber set earlier (tests, embedding) wins
    let _ = tracing_subscriber::registry().with(console).with(file).try_init();

    if let Some(e) = file_error {
        warn!("File logging disabled: {:#}", e);
    }
    Ok(guard)
}

fn open_log_file() -> Result<RollingFileAppender> {
    let dir = log_dir().ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(&dir)?;
    Ok(appender)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_is_app_scoped() {
        if let Some(dir) = log_dir() {
            assert!(dir.ends_with("pt-installer/logs"));
        }
    }
}
