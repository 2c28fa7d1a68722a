//! Configuration loading for the mcb runtime.
//!
//! Files (`mcb.toml`, `mcb.yaml`) and `MCB_` environment variables are merged
//! by figment into an [`McbConfig`], then checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotOverrides, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, McbConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
