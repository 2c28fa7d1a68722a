//! Shared fixtures for the framework's unit tests.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use mcb_core::{ApiResult, Bot, BoxedBot, Message, MessageEntity, Update, User};

/// A session handle that records every text it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingBot {
    sent: Mutex<Vec<String>>,
}

impl RecordingBot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    fn id(&self) -> &str {
        "recording"
    }

    async fn send_text(&self, _chat_id: i64, text: &str) -> ApiResult<i64> {
        let mut sent = self.sent.lock();
        sent.push(text.to_owned());
        Ok(sent.len() as i64)
    }

    async fn answer_callback_query(&self, query_id: &str, _text: Option<&str>) -> ApiResult<()> {
        self.sent.lock().push(format!("answer:{query_id}"));
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) fn boxed(bot: &Arc<RecordingBot>) -> BoxedBot {
    Arc::clone(bot) as BoxedBot
}

pub(crate) fn user(id: i64) -> User {
    User {
        id,
        first_name: format!("user{id}"),
        ..Default::default()
    }
}

/// A message update from user 42; `/`-prefixed text gets a command entity
/// when `with_entities` is set.
pub(crate) fn text_update(text: &str, with_entities: bool) -> Arc<Update> {
    let mut message = Message::text(100, text).with_sender(user(42));
    if with_entities {
        message = message.with_entities(vec![MessageEntity::new("bot_command", 0, text.len())]);
    }
    Arc::new(Update::with_message(1, message))
}
