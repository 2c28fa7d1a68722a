//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotOverrides, LogFormat, LogOutput, LoggingConfig, McbConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &McbConfig) -> ConfigResult<()> {
    validate_bot_overrides(&config.bot)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_overrides(bot: &BotOverrides) -> ConfigResult<()> {
    if let Some(token) = &bot.token
        && token.trim().is_empty()
    {
        return Err(ConfigError::validation("bot.token must not be blank when set"));
    }

    if let Some(command) = &bot.start_command {
        let literal = command.strip_prefix('/').unwrap_or(command);
        if literal.is_empty() {
            return Err(ConfigError::validation(
                "bot.start_command must name a command",
            ));
        }
        if literal.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "bot.start_command must be a single word, got {command:?}"
            )));
        }
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "logging.format = \"json\" requires the json-log feature",
        ));
    }

    if let Some(target) = logging.filters.keys().find(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "logging.filters contains an empty target: {target:?}"
        )));
    }

    Ok(())
}
