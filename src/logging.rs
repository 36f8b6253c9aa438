//! Logging configuration and initialization.
//!
//! Filter precedence: `RUST_LOG`, then an explicit level from configuration
//! (`log.level`), then the CLI's verbosity and quiet flags. Output goes to
//! stderr as text (or JSON lines with `log.json`), optionally mirrored as JSON
//! into a file.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Everything needed to build the global subscriber.
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub verbosity: u8,
    pub quiet: bool,
    /// Directive from configuration, e.g. `info` or `stored=trace`.
    pub level: Option<String>,
    pub file: Option<PathBuf>,
    /// Emit stderr logs as JSON lines instead of text.
    pub json: bool,
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the filter is malformed, the log file cannot be
/// created, or a subscriber is already installed.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(settings))
            .context("invalid log level directive")?,
    };

    let stderr_layer = if settings.json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(cfg!(debug_assertions))
            .with_line_number(cfg!(debug_assertions))
            .with_ansi(std::io::stderr().is_terminal())
            .boxed()
    };

    let file_layer = match &settings.file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .json(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("logging already initialized")?;

    Ok(())
}

fn filter_directive(settings: &LogSettings) -> String {
    if settings.quiet {
        return "error".to_string();
    }
    if let Some(level) = settings.level.as_deref().map(str::trim) {
        if !level.is_empty() {
            return if level.contains('=') {
                level.to_string()
            } else {
                format!("stored={level}")
            };
        }
    }

    match settings.verbosity {
        0 if cfg!(debug_assertions) => "stored=debug".to_string(),
        0 => "stored=info".to_string(),
        1 => "stored=debug".to_string(),
        2 => "stored=debug,rusqlite=debug".to_string(),
        _ => "stored=trace".to_string(),
    }
}

/// Initialize logging for tests with the test writer.
pub fn init_test_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("stored=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(verbosity: u8, quiet: bool, level: Option<&str>) -> LogSettings {
        LogSettings {
            verbosity,
            quiet,
            level: level.map(str::to_string),
            ..LogSettings::default()
        }
    }

    #[test]
    fn quiet_wins() {
        assert_eq!(filter_directive(&settings(3, true, Some("trace"))), "error");
    }

    #[test]
    fn configured_level_is_scoped_to_crate() {
        assert_eq!(filter_directive(&settings(0, false, Some("warn"))), "stored=warn");
        assert_eq!(
            filter_directive(&settings(0, false, Some("stored=info,rusqlite=trace"))),
            "stored=info,rusqlite=trace"
        );
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(filter_directive(&settings(1, false, None)), "stored=debug");
        assert_eq!(
            filter_directive(&settings(2, false, Some("  "))),
            "stored=debug,rusqlite=debug"
        );
        assert_eq!(filter_directive(&settings(5, false, None)), "stored=trace");
    }
}
