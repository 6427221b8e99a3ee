use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::{format::FmtSpan, writer::MakeWriterExt};

pub const CLI_PREFIX: &str = "cli";
pub const HOST_PREFIX: &str = "host";

/// Installs the global subscriber. Logs always go to daily rolling files in `log_dir`.
/// `show_console` mirrors them to stderr: stdout belongs to the native messaging channel, so it
/// is never written to.
pub fn enable_logging(
    prefix: &str,
    log_dir: &Path,
    log_level: Option<LevelFilter>,
    show_console: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .build(log_dir)?;

    let stderr = std::io::stderr.with_filter(move |_| show_console);

    let level = log_level
        .map(|v| v.to_string())
        .unwrap_or_else(|| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!(
            "{}={level}",
            env!("CARGO_PKG_NAME").replace("-", "_"),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .with_ansi(false)
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});
