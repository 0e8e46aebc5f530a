//! Tracing setup for the host binary.
//!
//! Library code only emits events; installing a subscriber is left to the
//! host. Messages written by scripts through `log` carry [`SCRIPT_TARGET`],
//! so `RUST_LOG=luaflow::script=debug` isolates them.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Target used for messages emitted by the script `log` primitive.
pub const SCRIPT_TARGET: &str = "luaflow::script";

const LEVELS: &[(&str, Level)] = &[
    ("trace", Level::TRACE),
    ("debug", Level::DEBUG),
    ("info", Level::INFO),
    ("warn", Level::WARN),
    ("warning", Level::WARN),
    ("error", Level::ERROR),
];

/// Map a configured level name to a tracing level. Unknown names fall back
/// to `info`.
fn parse_level(level: &str) -> Level {
    let level = level.trim();
    LEVELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(level))
        .map_or(Level::INFO, |&(_, level)| level)
}

/// `RUST_LOG` directives with the configured level added on top.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(parse_level(level).into())
}

/// Open the log file, creating its directory first.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(File::create(path)?)
}

/// Install the global subscriber described by `config`.
///
/// With `config.file` set, every event is written to stdout and to that
/// file without ANSI colors.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let Some(path) = config.file.as_deref() else {
        init_console_only(&config.level);
        return Ok(());
    };

    let file = Arc::new(open_log_file(Path::new(path))?);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(env_filter(&config.level))
        .init();
    Ok(())
}

/// Install a colored stdout subscriber.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(env_filter(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        let cases = [
            ("trace", Level::TRACE),
            ("DEBUG", Level::DEBUG),
            (" info ", Level::INFO),
            ("Warning", Level::WARN),
            ("warn", Level::WARN),
            ("ERROR", Level::ERROR),
            ("verbose", Level::INFO),
            ("", Level::INFO),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_level(input), expected, "level {:?}", input);
        }
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("nested").join("luaflow.log");

        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }
}
