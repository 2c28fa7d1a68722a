//! # mcb
//!
//! A handler-registration and dispatch engine for messaging bots.
//!
//! A bot is a [`Configuration`](framework::Configuration): it supplies a
//! settings marker and fills a [`Manifest`](framework::Manifest) with plain
//! async functions. Each function declares only the context it wants, in any
//! order; registration resolves every signature once, and dispatch hands each
//! handler its arguments already reordered.
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌────────────────────────────────┐
//! │ UpdateSource │──▶│ EventDispatcher │──▶│ UPDATE → MESSAGE → ENTITIES →   │
//! │  (runtime)   │   │                 │   │ START / COMMAND, CALLBACK_QUERY,│
//! └──────────────┘   └─────────────────┘   │ INLINE_QUERY handlers           │
//!                                          └────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcb::prelude::*;
//!
//! struct Echo;
//!
//! async fn echo(bot: BoxedBot, message: Arc<Message>) -> Result<(), ApiError> {
//!     if let Some(text) = &message.text {
//!         bot.send_text(message.chat.id, text).await?;
//!     }
//!     Ok(())
//! }
//!
//! impl Configuration for Echo {
//!     fn settings(&self) -> Option<BotSettings> {
//!         Some(BotSettings::new())
//!     }
//!
//!     fn register(self: Arc<Self>, manifest: &mut Manifest) {
//!         manifest.feedback("message", echo);
//!         manifest.command("/say", echo).trailing_text().admin_only();
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The token comes from mcb.toml or MCB_BOT__TOKEN
//!     let runtime = BotRuntime::builder().build(Arc::new(Echo), session)?;
//!     runtime.run(poller).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `mcb.toml` configuration files
//! - `yaml-config`: `mcb.yaml` configuration files
//! - `json-log`: JSON log output

pub use mcb_core as core;
pub use mcb_framework as framework;
pub use mcb_runtime as runtime;

/// Commonly used types for writing a bot.
pub mod prelude {
    // Runtime - main entry point
    pub use mcb_runtime::{BotRuntime, RuntimeStats, UpdateSource};

    // Registration
    pub use mcb_framework::{
        BotSettings, Configuration, EventSubtype, Manifest, SenderClass, UpdateListener,
    };

    // Per-user sessions
    pub use mcb_framework::{OnAddStrategy, OnEndStrategy, OnTimeoutStrategy, UserMapping};

    // Handler parameters
    pub use mcb_core::{
        Bot, BoxedBot, CallbackQuery, ContextValue, Entities, InlineQuery, Message, Query, Update,
    };

    // Errors handlers commonly return
    pub use mcb_core::ApiError;
    pub use mcb_framework::{BoxError, HandlerError};
}
