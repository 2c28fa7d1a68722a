//! The handler registry: one ordered bucket per dispatch category.
//!
//! The registry is filled once by the
//! [`RegistrationBuilder`](crate::builder::RegistrationBuilder) and read-only
//! afterwards, so dispatch takes no locks.

use tracing::trace;

use crate::descriptor::{DispatchScope, HandlerDescriptor};
use crate::error::DispatchResult;
use crate::manifest::BotSettings;
use mcb_core::{ContextValue, DispatchCategory};

const BUCKETS: usize = DispatchCategory::ALL.len();

/// Registered handlers grouped by category, in insertion order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    settings: BotSettings,
    buckets: [Vec<HandlerDescriptor>; BUCKETS],
}

impl HandlerRegistry {
    pub fn new(settings: BotSettings) -> Self {
        Self {
            settings,
            buckets: Default::default(),
        }
    }

    /// The settings marker the registry was built from.
    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Appends a descriptor to its category's bucket.
    pub fn add(&mut self, descriptor: HandlerDescriptor) {
        self.buckets[descriptor.category().index()].push(descriptor);
    }

    pub fn handlers(&self, category: DispatchCategory) -> &[HandlerDescriptor] {
        &self.buckets[category.index()]
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Offers `args` to every handler of `category`, in registration order.
    ///
    /// Returns how many handlers were started. Stops at the first inline
    /// handler error.
    pub async fn call(
        &self,
        category: DispatchCategory,
        args: &[ContextValue],
        scope: DispatchScope<'_>,
    ) -> DispatchResult<usize> {
        let mut started = 0;
        for descriptor in self.handlers(category) {
            if descriptor.invoke(args, scope).await?.ran() {
                started += 1;
            }
        }
        Ok(started)
    }

    /// Offers `args` to every command handler whose routing key matches `text`.
    pub async fn call_commands(
        &self,
        text: &str,
        args: &[ContextValue],
        scope: DispatchScope<'_>,
    ) -> DispatchResult<usize> {
        let mut started = 0;
        for descriptor in self.handlers(DispatchCategory::Command) {
            if !descriptor.matches_command(text) {
                trace!(handler = descriptor.name(), key = descriptor.key(), "command mismatch");
                continue;
            }
            if descriptor.invoke(args, scope).await?.ran() {
                started += 1;
            }
        }
        Ok(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::EventTraits;
    use crate::handler::into_handler;
    use crate::testing::{RecordingBot, boxed, text_update};
    use crate::user::UserSessions;
    use mcb_core::{BoxedBot, Entities, Message, Update};
    use std::sync::Arc;

    fn command_args(update: &Arc<Update>, bot: BoxedBot) -> Vec<ContextValue> {
        let message = update.message.clone().unwrap();
        vec![
            ContextValue::Message(Arc::clone(&message)),
            ContextValue::Entities(Entities::of(&message)),
            ContextValue::Update(Arc::clone(update)),
            ContextValue::Session(bot),
        ]
    }

    fn replier(reply: &'static str) -> crate::handler::BoxedHandler {
        into_handler(move |bot: BoxedBot, message: Arc<Message>| async move {
            bot.send_text(message.chat.id, reply).await.map(|_| ())
        })
    }

    fn command(literal: &str, reply: &'static str, trailing: bool) -> HandlerDescriptor {
        HandlerDescriptor::resolve(literal, replier(reply), DispatchCategory::Command, literal)
            .unwrap()
            .with_trailing_text(trailing)
    }

    async fn run_commands(registry: &HandlerRegistry, text: &str) -> (usize, Vec<String>) {
        let bot = RecordingBot::new();
        let update = text_update(text, true);
        let traits = EventTraits::classify(&update, "start", &[]);
        let sessions = UserSessions::new();
        let scope = DispatchScope {
            traits: &traits,
            sessions: &sessions,
        };
        let started = registry
            .call_commands(text, &command_args(&update, boxed(&bot)), scope)
            .await
            .unwrap();
        (started, bot.sent())
    }

    #[test]
    fn test_add_places_in_bucket() {
        let mut registry = HandlerRegistry::default();
        registry.add(command("/docs", "docs", false));
        registry.add(
            HandlerDescriptor::resolve("m", replier("m"), DispatchCategory::Message, "message")
                .unwrap(),
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.handlers(DispatchCategory::Command).len(), 1);
        assert_eq!(registry.handlers(DispatchCategory::Message).len(), 1);
        assert!(registry.handlers(DispatchCategory::Start).is_empty());
    }

    #[tokio::test]
    async fn test_exact_command_match() {
        let mut registry = HandlerRegistry::default();
        registry.add(command("/docs", "docs", false));

        assert_eq!(run_commands(&registry, "/docs").await, (1, vec!["docs".into()]));
        assert_eq!(run_commands(&registry, "/docs extra").await, (0, vec![]));
    }

    #[tokio::test]
    async fn test_trailing_text_command_match() {
        let mut registry = HandlerRegistry::default();
        registry.add(command("/echo", "echo", true));

        assert_eq!(
            run_commands(&registry, "/echo hello world").await,
            (1, vec!["echo".into()])
        );
        assert_eq!(run_commands(&registry, "/help").await, (0, vec![]));
    }

    #[tokio::test]
    async fn test_all_matching_handlers_run_in_order() {
        let mut registry = HandlerRegistry::default();
        registry.add(command("/docs", "first", false));
        registry.add(command("/other", "skipped", false));
        registry.add(command("/docs", "second", true));

        let (started, sent) = run_commands(&registry, "/docs").await;
        assert_eq!(started, 2);
        assert_eq!(sent, vec!["first".to_owned(), "second".to_owned()]);
    }

    #[tokio::test]
    async fn test_call_category() {
        let mut registry = HandlerRegistry::default();
        registry.add(
            HandlerDescriptor::resolve("a", replier("a"), DispatchCategory::Message, "message")
                .unwrap(),
        );
        registry.add(
            HandlerDescriptor::resolve("b", replier("b"), DispatchCategory::Message, "message")
                .unwrap(),
        );

        let bot = RecordingBot::new();
        let update = text_update("hello", false);
        let traits = EventTraits::classify(&update, "start", &[]);
        let sessions = UserSessions::new();
        let args = vec![
            ContextValue::Update(Arc::clone(&update)),
            ContextValue::Message(update.message.clone().unwrap()),
            ContextValue::Session(boxed(&bot)),
        ];
        let scope = DispatchScope {
            traits: &traits,
            sessions: &sessions,
        };

        let started = registry
            .call(DispatchCategory::Message, &args, scope)
            .await
            .unwrap();
        assert_eq!(started, 2);
        assert_eq!(bot.sent(), vec!["a".to_owned(), "b".to_owned()]);
    }
}
