//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use mcb_framework::BotSettings;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McbConfig {
    /// Overrides for the bot's settings marker.
    #[serde(default)]
    pub bot: BotOverrides,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot overrides
// =============================================================================

/// Settings a deployment may change without touching the bot's code.
///
/// Every field is optional; set fields replace the corresponding field of the
/// [`BotSettings`] the configuration declares.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_separation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_dispatch: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_build: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<Vec<i64>>,
}

impl BotOverrides {
    /// Writes every set field onto `settings`.
    pub fn apply(&self, settings: &mut BotSettings) {
        if let Some(token) = &self.token {
            settings.bot_token.clone_from(token);
        }
        if let Some(command) = &self.start_command {
            settings.start_command.clone_from(command);
        }
        if let Some(enabled) = self.thread_separation {
            settings.thread_separation = enabled;
        }
        if let Some(enabled) = self.double_dispatch {
            settings.double_dispatch = enabled;
        }
        if let Some(enabled) = self.static_build {
            settings.static_build = enabled;
        }
        if let Some(admins) = &self.admins {
            settings.admins.clone_from(admins);
        }
    }
}

impl fmt::Debug for BotOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotOverrides")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("start_command", &self.start_command)
            .field("thread_separation", &self.thread_separation)
            .field("double_dispatch", &self.double_dispatch)
            .field("static_build", &self.static_build)
            .field("admins", &self.admins)
            .finish()
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires [`LoggingConfig::file_path`].
    File,
}

/// How often file output starts a new file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    pub rotation: LogRotation,

    /// Rotated files to keep; `0` keeps all of them.
    pub max_files: usize,

    pub thread_ids: bool,

    /// Include source file and line in log lines.
    pub file_location: bool,

    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `mcb_framework = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}
