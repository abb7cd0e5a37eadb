//! Logging configuration and initialization
//!
//! Console output is compact text or JSON; a log file can be written
//! alongside through a non-blocking appender.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "CAMERA_TRAILS_LOG";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write to stderr
    pub console_enabled: bool,
    /// JSON lines on the console instead of compact text
    pub json_format: bool,
    /// Also write plain text to this file
    pub file_path: Option<PathBuf>,
    /// Filter used when neither `CAMERA_TRAILS_LOG` nor `RUST_LOG` is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            json_format: false,
            file_path: None,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Default level for a `-v` count
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.default_level = level_for_verbosity(verbose).to_string();
        self
    }
}

/// `-v` count to filter directive. Dependency noise (wgpu, naga) stays at warn.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "info,wgpu_core=warn,wgpu_hal=warn,naga=warn",
        1 => "debug,wgpu_core=warn,wgpu_hal=warn,naga=warn",
        _ => "trace",
    }
}

/// Initialize the global subscriber.
///
/// The filter is read from `CAMERA_TRAILS_LOG`, then `RUST_LOG`, then
/// `config.default_level`. Keep the returned guard alive so the file
/// writer is flushed on exit.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .or_else(|_| EnvFilter::try_new(&config.default_level))?;

    let (file_layer, guard) = match &config.file_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = std::fs::File::create(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = (config.console_enabled && config.json_format).then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
    });

    let console_layer = (config.console_enabled && !config.json_format).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        json_format = config.json_format,
        log_file = ?config.file_path,
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.console_enabled);
        assert!(!config.json_format);
        assert!(config.file_path.is_none());
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(level_for_verbosity(0).starts_with("info"));
        assert!(level_for_verbosity(1).starts_with("debug"));
        assert_eq!(level_for_verbosity(5), "trace");
        assert_eq!(LogConfig::default().with_verbosity(2).default_level, "trace");
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let config = LogConfig {
            file_path: Some(blocker.join("trails.log")),
            ..LogConfig::default()
        };
        // Fails before the global subscriber is installed
        let err = init_logging(&config).unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_verbosity_directives_parse() {
        for verbose in 0..3 {
            assert!(EnvFilter::try_new(level_for_verbosity(verbose)).is_ok());
        }
    }
}
