//! Double dispatch: a legacy listener notified alongside the registry.
//!
//! When the settings enable `double_dispatch`, every update is also handed
//! to an [`UpdateListener`] after the registered handlers ran. The listener
//! sees the same branches the registry does, through one hook per branch.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BoxError, DispatchError, DispatchResult};
use mcb_core::{BoxedBot, CallbackQuery, Entities, InlineQuery, Message, Update};

/// Hooks invoked by double dispatch. Every hook defaults to doing nothing.
#[async_trait]
#[allow(unused_variables)]
pub trait UpdateListener: Send + Sync + 'static {
    async fn on_update(&self, update: Arc<Update>, bot: BoxedBot) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_message(&self, message: Arc<Message>, bot: BoxedBot) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_entities(
        &self,
        message: Arc<Message>,
        entities: Entities,
        bot: BoxedBot,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_start(&self, message: Arc<Message>, bot: BoxedBot) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_callback_query(
        &self,
        query: Arc<CallbackQuery>,
        bot: BoxedBot,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_inline_query(&self, query: Arc<InlineQuery>, bot: BoxedBot) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A shared listener.
pub type BoxedListener = Arc<dyn UpdateListener>;

fn hook(name: &'static str) -> impl FnOnce(BoxError) -> DispatchError {
    move |source| DispatchError::Listener { hook: name, source }
}

/// Runs the listener hooks that apply to `update`.
///
/// Unlike the registry, the start hook does not depend on entities: any
/// `/`-prefixed text containing `start_command` triggers it.
pub async fn notify(
    listener: &dyn UpdateListener,
    update: &Arc<Update>,
    bot: &BoxedBot,
    start_command: &str,
) -> DispatchResult<()> {
    listener
        .on_update(Arc::clone(update), Arc::clone(bot))
        .await
        .map_err(hook("on_update"))?;

    if let Some(message) = &update.message
        && message.text.as_deref() != Some("")
    {
        listener
            .on_message(Arc::clone(message), Arc::clone(bot))
            .await
            .map_err(hook("on_message"))?;

        if !message.entities().is_empty() {
            listener
                .on_entities(Arc::clone(message), Entities::of(message), Arc::clone(bot))
                .await
                .map_err(hook("on_entities"))?;
        }

        if let Some(text) = message.text.as_deref()
            && text.starts_with('/')
            && text.contains(start_command)
        {
            listener
                .on_start(Arc::clone(message), Arc::clone(bot))
                .await
                .map_err(hook("on_start"))?;
        }
    } else if let Some(query) = &update.callback_query {
        listener
            .on_callback_query(Arc::clone(query), Arc::clone(bot))
            .await
            .map_err(hook("on_callback_query"))?;
    } else if let Some(query) = &update.inline_query {
        listener
            .on_inline_query(Arc::clone(query), Arc::clone(bot))
            .await
            .map_err(hook("on_inline_query"))?;
    }

    Ok(())
}
