//! Resolved handlers ready for dispatch.
//!
//! A [`HandlerDescriptor`] pairs a [`BoxedHandler`] with everything needed to
//! call it for one category: the routing key, the [`ArgumentReorderer`] built
//! from the category's canonical list, its invocation mode, filters and
//! optional per-user mapping.

use futures::future::BoxFuture;
use tracing::{error, trace};

use crate::error::{DispatchError, DispatchResult, HandlerResult};
use crate::filter::{EventTraits, HandlerFilter};
use crate::handler::BoxedHandler;
use crate::user::{Admission, UserMapping, UserSessions};
use mcb_core::{
    ArgumentReorderer, ContextValue, DispatchCategory, SignatureResolver, SignatureResult,
};

/// Whether a handler runs on the dispatching task or detached from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationMode {
    /// Awaited by the dispatcher; errors reach the caller.
    #[default]
    Inline,
    /// Spawned and never joined; errors are logged and dropped.
    Dedicated,
}

/// What happened when a descriptor was offered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Ran inline to completion.
    Completed,
    /// Spawned as a detached task.
    Detached,
    /// Submitted to the sender's session.
    Session(Admission),
    /// Skipped by the handler's filter.
    Filtered,
}

impl Invocation {
    /// Whether the handler was actually started.
    pub fn ran(&self) -> bool {
        match self {
            Invocation::Completed | Invocation::Detached => true,
            Invocation::Session(admission) => matches!(admission, Admission::Started { .. }),
            Invocation::Filtered => false,
        }
    }
}

/// Per-event state shared by every descriptor call of one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct DispatchScope<'a> {
    pub traits: &'a EventTraits,
    pub sessions: &'a UserSessions,
}

/// A registered handler bound to one category.
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: String,
    handler: BoxedHandler,
    category: DispatchCategory,
    key: String,
    reorder: ArgumentReorderer,
    mode: InvocationMode,
    accepts_trailing_text: bool,
    filter: HandlerFilter,
    user_mapping: Option<UserMapping>,
}

impl HandlerDescriptor {
    /// Resolves `handler`'s declared parameters against `category`'s canonical
    /// list and builds the reorderer from canonical to declared order.
    pub fn resolve(
        name: impl Into<String>,
        handler: BoxedHandler,
        category: DispatchCategory,
        key: impl Into<String>,
    ) -> SignatureResult<Self> {
        let canonical = category.canonical_parameters();
        let resolved = SignatureResolver::new(canonical)?.resolve(&handler.parameter_types())?;
        let reorder = ArgumentReorderer::new(canonical, &resolved)?;

        Ok(Self {
            name: name.into(),
            handler,
            category,
            key: key.into(),
            reorder,
            mode: InvocationMode::Inline,
            accepts_trailing_text: false,
            filter: HandlerFilter::new(),
            user_mapping: None,
        })
    }

    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_trailing_text(mut self, accepts: bool) -> Self {
        self.accepts_trailing_text = accepts;
        self
    }

    pub fn with_filter(mut self, filter: HandlerFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_user_mapping(mut self, mapping: Option<UserMapping>) -> Self {
        self.user_mapping = mapping;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> DispatchCategory {
        self.category
    }

    /// The routing key: the command literal, or the category's event name.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn reorderer(&self) -> &ArgumentReorderer {
        &self.reorder
    }

    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    pub fn accepts_trailing_text(&self) -> bool {
        self.accepts_trailing_text
    }

    pub fn filter(&self) -> &HandlerFilter {
        &self.filter
    }

    pub fn user_mapping(&self) -> Option<&UserMapping> {
        self.user_mapping.as_ref()
    }

    /// Whether command `text` routes to this handler.
    pub fn matches_command(&self, text: &str) -> bool {
        let (text, key) = (text.trim(), self.key.trim());
        if self.accepts_trailing_text {
            text.starts_with(key)
        } else {
            text == key
        }
    }

    /// Offers one event to the handler.
    ///
    /// `args` is the category's canonical argument list. Inline handlers are
    /// awaited and their failure is returned. Dedicated handlers are spawned
    /// and this returns at once; a failure inside them is only logged.
    pub async fn invoke(
        &self,
        args: &[ContextValue],
        scope: DispatchScope<'_>,
    ) -> DispatchResult<Invocation> {
        if !self.filter.admits(scope.traits) {
            trace!(handler = %self.name, category = %self.category, "filtered out");
            return Ok(Invocation::Filtered);
        }

        let args = self
            .reorder
            .map(args)
            .map_err(|source| DispatchError::Arguments {
                handler: self.name.clone(),
                source,
            })?;
        let call = self.handler.call(args);

        match self.mode {
            InvocationMode::Inline => {
                call.await.map_err(|source| DispatchError::Handler {
                    handler: self.name.clone(),
                    source,
                })?;
                Ok(Invocation::Completed)
            }
            InvocationMode::Dedicated => {
                if let Some(mapping) = &self.user_mapping
                    && let Some(user) = scope.traits.sender()
                {
                    let session = scope.sessions.session(user);
                    return Ok(Invocation::Session(session.submit(&self.name, mapping, call)));
                }
                self.detach(call);
                Ok(Invocation::Detached)
            }
        }
    }

    fn detach(&self, call: BoxFuture<'static, HandlerResult>) {
        let name = self.name.clone();
        tokio::spawn(async move {
            if let Err(err) = call.await {
                error!(handler = %name, "detached handler failed: {err}");
            }
        });
    }
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("accepts_trailing_text", &self.accepts_trailing_text)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::into_handler;
    use crate::testing::{RecordingBot, boxed, text_update};
    use mcb_core::types::{MESSAGE, SESSION, UPDATE};
    use mcb_core::{BoxedBot, Message, SignatureError, Update};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn message_args(update: &Arc<Update>, bot: BoxedBot) -> Vec<ContextValue> {
        let message = update.message.clone().unwrap();
        vec![
            ContextValue::Update(Arc::clone(update)),
            ContextValue::Message(message),
            ContextValue::Session(bot),
        ]
    }

    #[test]
    fn test_resolve_builds_reorderer() {
        async fn reply(_bot: BoxedBot, _message: Arc<Message>) {}

        let descriptor = HandlerDescriptor::resolve(
            "reply",
            into_handler(reply),
            DispatchCategory::Message,
            "message",
        )
        .unwrap();

        assert_eq!(descriptor.reorderer().input(), &[&UPDATE, &MESSAGE, &SESSION]);
        assert_eq!(descriptor.reorderer().output(), &[&SESSION, &MESSAGE]);
        assert_eq!(descriptor.mode(), InvocationMode::Inline);
    }

    #[test]
    fn test_resolve_rejects_duplicates() {
        async fn twice(_a: Arc<Message>, _b: Arc<Message>) {}

        let err = HandlerDescriptor::resolve(
            "twice",
            into_handler(twice),
            DispatchCategory::Command,
            "/x",
        )
        .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_resolve_rejects_foreign_type() {
        async fn wants_entities(_entities: mcb_core::Entities) {}

        let err = HandlerDescriptor::resolve(
            "wants_entities",
            into_handler(wants_entities),
            DispatchCategory::Update,
            "update",
        )
        .unwrap_err();
        assert!(matches!(err, SignatureError::UnsupportedSignature { .. }));
    }

    #[test]
    fn test_matches_command() {
        async fn noop() {}

        let exact =
            HandlerDescriptor::resolve("docs", into_handler(noop), DispatchCategory::Command, "/docs")
                .unwrap();
        assert!(exact.matches_command("/docs"));
        assert!(exact.matches_command("  /docs \n"));
        assert!(!exact.matches_command("/docs extra"));

        let trailing =
            HandlerDescriptor::resolve("echo", into_handler(noop), DispatchCategory::Command, "/echo ")
                .unwrap()
                .with_trailing_text(true);
        assert!(trailing.matches_command("/echo hello world"));
        assert!(trailing.matches_command("/echo"));
        assert!(!trailing.matches_command("/ech"));
    }

    #[tokio::test]
    async fn test_invoke_inline_passes_reordered_args() {
        async fn reply(bot: BoxedBot, message: Arc<Message>) -> mcb_core::ApiResult<()> {
            let text = message.text.clone().unwrap_or_default();
            bot.send_text(message.chat.id, &text).await.map(|_| ())
        }

        let descriptor = HandlerDescriptor::resolve(
            "reply",
            into_handler(reply),
            DispatchCategory::Message,
            "message",
        )
        .unwrap();

        let bot = RecordingBot::new();
        let update = text_update("hi", false);
        let traits = EventTraits::classify(&update, "start", &[]);
        let sessions = UserSessions::new();
        let scope = DispatchScope {
            traits: &traits,
            sessions: &sessions,
        };

        let outcome = descriptor.invoke(&message_args(&update, boxed(&bot)), scope).await;
        assert_eq!(tokio_test::assert_ok!(outcome), Invocation::Completed);
        assert_eq!(bot.sent(), vec!["hi".to_owned()]);
    }

    #[tokio::test]
    async fn test_invoke_inline_error_is_reported() {
        async fn fails(_update: Arc<Update>) -> Result<(), std::io::Error> {
            Err(std::io::Error::other("disk full"))
        }

        let descriptor = HandlerDescriptor::resolve(
            "fails",
            into_handler(fails),
            DispatchCategory::Message,
            "message",
        )
        .unwrap();

        let update = text_update("hi", false);
        let traits = EventTraits::classify(&update, "start", &[]);
        let sessions = UserSessions::new();
        let scope = DispatchScope {
            traits: &traits,
            sessions: &sessions,
        };

        let err = descriptor
            .invoke(&message_args(&update, boxed(&RecordingBot::new())), scope)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler { ref handler, .. } if handler == "fails"));
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_invoke_dedicated_does_not_wait() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let release = Arc::new(tokio::sync::Notify::new());
        let gate = Arc::clone(&release);
        let handler = into_handler(move |update: Arc<Update>| {
            let tx = tx.clone();
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                let _ = tx.send(update.update_id);
                Err::<(), _>(std::io::Error::other("swallowed"))
            }
        });

        let descriptor =
            HandlerDescriptor::resolve("slow", handler, DispatchCategory::Message, "message")
                .unwrap()
                .with_mode(InvocationMode::Dedicated);

        let update = text_update("hi", false);
        let traits = EventTraits::classify(&update, "start", &[]);
        let sessions = UserSessions::new();
        let scope = DispatchScope {
            traits: &traits,
            sessions: &sessions,
        };

        let outcome = descriptor
            .invoke(&message_args(&update, boxed(&RecordingBot::new())), scope)
            .await
            .unwrap();
        assert_eq!(outcome, Invocation::Detached);
        assert!(rx.try_recv().is_err());

        release.notify_one();
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test]
    async fn test_invoke_with_user_mapping_uses_session() {
        async fn noop() {}

        let descriptor =
            HandlerDescriptor::resolve("quiz", into_handler(noop), DispatchCategory::Message, "message")
                .unwrap()
                .with_mode(InvocationMode::Dedicated)
                .with_user_mapping(Some(UserMapping::new()));

        let update = text_update("hi", false);
        let traits = EventTraits::classify(&update, "start", &[]);
        let sessions = UserSessions::new();
        let scope = DispatchScope {
            traits: &traits,
            sessions: &sessions,
        };

        let outcome = descriptor
            .invoke(&message_args(&update, boxed(&RecordingBot::new())), scope)
            .await
            .unwrap();
        assert_eq!(outcome, Invocation::Session(Admission::Started { interrupted: 0 }));
        assert!(outcome.ran());

        let session = sessions.get(42).unwrap();
        assert!(session.join().await.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_filtered_handler_is_not_called() {
        async fn never(_bot: BoxedBot) -> Result<(), std::io::Error> {
            Err(std::io::Error::other("should not run"))
        }

        let descriptor =
            HandlerDescriptor::resolve("ban", into_handler(never), DispatchCategory::Message, "message")
                .unwrap()
                .with_filter(HandlerFilter::new().admin_only(true));

        let update = text_update("hi", false);
        let traits = EventTraits::classify(&update, "start", &[]);
        let sessions = UserSessions::new();
        let scope = DispatchScope {
            traits: &traits,
            sessions: &sessions,
        };

        let outcome = descriptor
            .invoke(&message_args(&update, boxed(&RecordingBot::new())), scope)
            .await
            .unwrap();
        assert_eq!(outcome, Invocation::Filtered);
        assert!(!outcome.ran());
    }
}
