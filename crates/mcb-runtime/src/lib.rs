//! mcb Runtime - configuration, logging and the update loop.
//!
//! This crate provides:
//! - Layered configuration (`mcb.toml` / `mcb.yaml`, `MCB_*` environment
//!   variables) with validation ([`config`])
//! - Subscriber setup for `tracing` ([`logging`])
//! - [`BotRuntime`], which builds a bot's handler registry and dispatches the
//!   updates an [`UpdateSource`] yields until shutdown
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcb_runtime::BotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BotRuntime::builder().build(Arc::new(MyBot), session)?;
//!     runtime.run(poller).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, McbConfig, load_config};
pub use error::{LoggingError, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BotRuntime, RuntimeBuilder, RuntimeStats, UpdateSource, wait_for_shutdown};

// Re-export tracing for use by bot crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and the `instrument` attribute.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
