use std::path::Path;

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";
pub const DAEMON_PREFIX: &str = "daemon";
pub const SERVER_PREFIX: &str = "server";

/// Sets up file logging with daily rotation. Console output goes to stderr, the tracker uses
/// stdout for replies.
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

    let console = std::io::stderr.with_filter(move |_| show_console);

    let filter = build_filter(log_level, std::env::var("RUST_LOG").ok().as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(console.and(appender))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber {e}"))?;
    Ok(())
}

/// An explicit level applies to this crate and request tracing. Otherwise `RUST_LOG` is used
/// as a full directive string, falling back to `info` when it is missing or invalid.
fn build_filter(log_level: Option<LevelFilter>, rust_log: Option<&str>) -> EnvFilter {
    let scoped = |level: LevelFilter| {
        EnvFilter::new(format!(
            "{}={level},tower_http={level}",
            env!("CARGO_PKG_NAME").replace("-", "_"),
        ))
    };

    if let Some(level) = log_level {
        return scoped(level);
    }
    match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        Some(Err(e)) => {
            eprintln!("Ignoring invalid RUST_LOG: {e}");
            scoped(LevelFilter::INFO)
        }
        None => scoped(LevelFilter::INFO),
    }
}

#[cfg(test)]
pub static TEST_LOGGING: std::sync::LazyLock<()> = std::sync::LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::build_filter;

    #[test]
    fn test_filter_sources() {
        let hint = |level, env| build_filter(level, env).max_level_hint();

        assert_eq!(hint(Some(LevelFilter::WARN), Some("trace")), Some(LevelFilter::WARN));
        assert_eq!(hint(None, Some("debug,hyper=info")), Some(LevelFilter::DEBUG));
        assert_eq!(hint(None, Some("leettrack=notalevel")), Some(LevelFilter::INFO));
        assert_eq!(hint(None, None), Some(LevelFilter::INFO));
    }
}
