//! Logging setup for hosts and tests.
//!
//! The library itself only emits `tracing` events; nothing here runs unless a
//! caller asks for it.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const LOG_FILE_NAME: &str = "dbclient.log";

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Log settings as they appear in configuration files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// trace, debug, info, warn, error, or a full `EnvFilter` directive
    pub level: String,
    pub console: bool,
    /// File output is enabled when a directory is given
    pub dir: Option<PathBuf>,
    /// daily, hourly or never
    pub rotation: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            dir: None,
            rotation: "daily".to_string(),
            json: false,
        }
    }
}

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub rotation: LogRotation,
    pub console_enabled: bool,
    pub file_enabled: bool,
    /// JSON lines in the log file
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            rotation: LogRotation::Daily,
            console_enabled: true,
            file_enabled: false,
            json: false,
        }
    }
}

impl LogConfig {
    /// 設定からログ設定を作成
    pub fn from_settings(settings: &LogSettings) -> Self {
        let mut config = Self {
            level: settings.level.clone(),
            rotation: parse_rotation(&settings.rotation),
            console_enabled: settings.console,
            json: settings.json,
            ..Self::default()
        };

        if let Some(ref dir) = settings.dir {
            config.log_dir = dir.clone();
            config.file_enabled = true;
        }

        config
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enable file output into `dir`
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = dir.into();
        self.file_enabled = true;
        self
    }

    pub fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }
}

fn parse_rotation(value: &str) -> LogRotation {
    match value.to_ascii_lowercase().as_str() {
        "hourly" => LogRotation::Hourly,
        "never" => LogRotation::Never,
        _ => LogRotation::Daily,
    }
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Install a global subscriber built from `config`.
///
/// Keep the returned guard alive for as long as file output should be
/// flushed. Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let mut env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.console_enabled {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
        );
    }

    if config.file_enabled {
        ensure_log_dir(&config.log_dir)?;
        let file_appender = match config.rotation {
            LogRotation::Daily => rolling::daily(&config.log_dir, LOG_FILE_NAME),
            LogRotation::Hourly => rolling::hourly(&config.log_dir, LOG_FILE_NAME),
            LogRotation::Never => rolling::never(&config.log_dir, LOG_FILE_NAME),
        };
        let (writer, file_guard) = non_blocking(file_appender);
        guard = Some(file_guard);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        layers.push(if config.json {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
    }

    if layers.is_empty() {
        // 最低限のコンソール出力
        env_filter = EnvFilter::new("warn");
        layers.push(fmt::layer().with_writer(std::io::stderr).boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::debug!(
        level = %config.level,
        console = config.console_enabled,
        file = config.file_enabled,
        "logging initialized"
    );
    Ok(guard)
}
