//! Logging setup.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use daytrade_config::{LogFormat, LoggingConfig};

/// `RUST_LOG` wins over the configured level; an unparsable level falls
/// back to `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Split a log file path into the rolling appender's directory and prefix.
fn file_target(file: &str) -> (PathBuf, PathBuf) {
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let prefix = path
        .file_name()
        .map_or_else(|| PathBuf::from("daytrade.log"), PathBuf::from);
    (dir, prefix)
}

/// Install the global subscriber.
///
/// With a log file configured, a daily-rotated JSON file sink is added
/// next to the console output. The returned guard flushes that sink and
/// must stay alive until exit.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, TryInitError> {
    let console = match config.format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match &config.file {
        Some(file) => {
            let (dir, prefix) = file_target(file);
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(console)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_file_target() {
        assert_eq!(
            file_target("logs/daytrade.log"),
            (PathBuf::from("logs"), PathBuf::from("daytrade.log"))
        );
        assert_eq!(
            file_target("run.log"),
            (PathBuf::from("."), PathBuf::from("run.log"))
        );
    }

    #[test]
    fn test_bad_level_falls_back() {
        // Only meaningful without RUST_LOG in the environment
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(
                build_filter("daytrade=loud").max_level_hint(),
                Some(LevelFilter::INFO)
            );
            assert_eq!(build_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        }
    }
}
