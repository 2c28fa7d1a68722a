//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use mcb_framework::BuildError;

/// Errors raised while setting up logging.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),

    /// The log file appender could not be created.
    #[error("Failed to open log file: {0}")]
    File(#[from] tracing_appender::rolling::InitError),

    /// JSON output was requested without the `json-log` feature.
    #[error("JSON log format requires the json-log feature")]
    JsonUnavailable,
}

/// Errors that can occur while building or running a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registration failed: {0}")]
    Build(#[from] BuildError),

    /// The bot token is empty after applying configuration overrides.
    #[error("Bot token is missing; set it in code, in bot.token or via MCB_BOT__TOKEN")]
    MissingToken,

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
