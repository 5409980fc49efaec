use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn};

/// Log file rotation cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Hourly,
    Daily,
    Never,
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Hourly
    }
}

impl From<Rotation> for rolling::Rotation {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Hourly => rolling::Rotation::HOURLY,
            Rotation::Daily => rolling::Rotation::DAILY,
            Rotation::Never => rolling::Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level filter (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for log files; no file logging when absent.
    pub log_dir: Option<PathBuf>,

    /// Prefix for log file names.
    #[serde(default = "default_prefix")]
    pub file_prefix: String,

    #[serde(default)]
    pub rotation: Rotation,

    /// Whether to also log to stdout.
    #[serde(default = "default_true")]
    pub console: bool,
}

fn default_level() -> String {
    "info".into()
}

fn default_prefix() -> String {
    "peermon".into()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
            file_prefix: default_prefix(),
            rotation: Rotation::default(),
            console: true,
        }
    }
}

/// Install the global tracing subscriber. Call once at startup.
///
/// Returns the non-blocking writer guard when file logging is enabled; it
/// must stay alive for the life of the process or tail log lines are lost.
pub fn init_logging(config: &LogConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = if config.console {
        Some(fmt::layer())
    } else {
        None
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(log_dir) => {
            let appender = rolling::RollingFileAppender::builder()
                .rotation(config.rotation.into())
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(log_dir)
                .expect("failed to create rolling file appender");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.file_prefix, "peermon");
        assert_eq!(config.rotation, Rotation::Hourly);
        assert!(config.console);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_rotation_serde() {
        let rotation: Rotation = serde_json::from_str("\"daily\"").unwrap();
        assert_eq!(rotation, Rotation::Daily);
        assert_eq!(serde_json::to_string(&Rotation::Never).unwrap(), "\"never\"");
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: LogConfig = serde_json::from_str(r#"{"level": "debug"}"#).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.rotation, Rotation::Hourly);
        assert!(config.console);
    }
}
