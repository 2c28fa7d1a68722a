//! The bot-session handle passed to handlers.
//!
//! A [`Bot`] is the outbound side of a connection to the messaging provider.
//! The transport that implements it lives outside this workspace; handlers
//! only see it as a [`BoxedBot`] and may downcast to the concrete type when
//! they need provider-specific calls.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;

/// An active session with the messaging provider.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the bot's unique identifier.
    fn id(&self) -> &str;

    /// Sends a plain text message to a chat and returns the new message id.
    async fn send_text(&self, chat_id: i64, text: &str) -> ApiResult<i64>;

    /// Answers a callback query, optionally showing a notification.
    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> ApiResult<()>;

    /// Converts into `Arc<dyn Any>` for downcasting.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared, type-erased bot session.
pub type BoxedBot = Arc<dyn Bot>;

/// Downcasts a boxed session to its concrete implementation.
pub fn downcast_bot<B: Bot>(bot: &BoxedBot) -> Option<Arc<B>> {
    Arc::clone(bot).as_any().downcast::<B>().ok()
}
