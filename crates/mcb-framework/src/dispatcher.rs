//! Event dispatcher.
//!
//! The [`EventDispatcher`] classifies each update and offers it to the
//! registry's categories. The branches are evaluated in a fixed order and
//! are not exclusive:
//!
//! 1. `update` handlers always run.
//! 2. A message whose text is not `""` runs `message` handlers. If it carries
//!    entities, `entities` handlers run, and `/`-prefixed text then runs
//!    `start` handlers (when it contains the configured start command) and command
//!    matching.
//! 3. Otherwise a callback query runs `callback_query` handlers.
//! 4. Otherwise an inline query runs `inline_query` handlers.
//!
//! Command matching sits inside the entities branch: a command typed without
//! a structured entity is never matched.
//!
//! ```rust,ignore
//! let dispatcher = EventDispatcher::new(registry).with_listener(LegacyHooks);
//! let report = dispatcher.dispatch(update, bot).await?;
//! ```

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::descriptor::DispatchScope;
use crate::error::DispatchResult;
use crate::filter::EventTraits;
use crate::listener::{BoxedListener, UpdateListener, notify};
use crate::registry::HandlerRegistry;
use crate::user::UserSessions;
use mcb_core::{BoxedBot, ContextValue, DispatchCategory, Entities, Update};

/// Which categories an update reached and how many handlers each started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    reached: Vec<(DispatchCategory, usize)>,
    listener_notified: bool,
}

impl DispatchReport {
    fn record(&mut self, category: DispatchCategory, started: usize) {
        self.reached.push((category, started));
    }

    /// Categories in the order they were offered the update.
    pub fn categories(&self) -> Vec<DispatchCategory> {
        self.reached.iter().map(|(category, _)| *category).collect()
    }

    /// Handlers started for `category`, or `None` if the branch was not taken.
    pub fn started(&self, category: DispatchCategory) -> Option<usize> {
        self.reached
            .iter()
            .find(|(reached, _)| *reached == category)
            .map(|(_, started)| *started)
    }

    /// Handlers started across all categories.
    pub fn total(&self) -> usize {
        self.reached.iter().map(|(_, started)| started).sum()
    }

    pub fn listener_notified(&self) -> bool {
        self.listener_notified
    }
}

/// Routes updates to the handlers of a built registry.
///
/// The registry is shared read-only. Per-user sessions live in the
/// dispatcher, so two dispatchers never share session state.
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<HandlerRegistry>,
    sessions: Arc<UserSessions>,
    listener: Option<BoxedListener>,
}

impl EventDispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions: Arc::new(UserSessions::new()),
            listener: None,
        }
    }

    /// Attaches the listener used when `double_dispatch` is enabled.
    pub fn with_listener(self, listener: impl UpdateListener) -> Self {
        self.with_shared_listener(Arc::new(listener))
    }

    pub fn with_shared_listener(mut self, listener: BoxedListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &UserSessions {
        &self.sessions
    }

    /// Dispatches one update.
    ///
    /// Inline handler failures stop the dispatch and are returned. Dedicated
    /// handlers have only been started when this returns; their failures are
    /// logged and never reported here.
    #[instrument(level = "debug", skip_all, fields(update_id = update.update_id))]
    pub async fn dispatch(&self, update: Arc<Update>, bot: BoxedBot) -> DispatchResult<DispatchReport> {
        let settings = self.registry.settings();
        let start_command = settings.start_command.as_str();
        let traits = EventTraits::classify(&update, start_command, &settings.admins);
        let scope = DispatchScope {
            traits: &traits,
            sessions: &self.sessions,
        };
        let registry = &self.registry;
        let mut report = DispatchReport::default();

        let session = ContextValue::Session(Arc::clone(&bot));
        let raw = ContextValue::Update(Arc::clone(&update));

        let args = [raw.clone(), session.clone()];
        report.record(
            DispatchCategory::Update,
            registry.call(DispatchCategory::Update, &args, scope).await?,
        );

        if let Some(message) = &update.message
            && message.text.as_deref() != Some("")
        {
            let msg = ContextValue::Message(Arc::clone(message));

            let args = [raw.clone(), msg.clone(), session.clone()];
            report.record(
                DispatchCategory::Message,
                registry.call(DispatchCategory::Message, &args, scope).await?,
            );

            if !message.entities().is_empty() {
                let entities = ContextValue::Entities(Entities::of(message));
                let args = [msg.clone(), entities.clone(), raw.clone(), session.clone()];
                report.record(
                    DispatchCategory::Entities,
                    registry.call(DispatchCategory::Entities, &args, scope).await?,
                );

                if let Some(text) = message.text.as_deref()
                    && text.starts_with('/')
                {
                    if text.contains(start_command) {
                        let args = [raw.clone(), msg.clone(), session.clone()];
                        report.record(
                            DispatchCategory::Start,
                            registry.call(DispatchCategory::Start, &args, scope).await?,
                        );
                    }

                    let args = [msg, entities, raw, session];
                    report.record(
                        DispatchCategory::Command,
                        registry.call_commands(text, &args, scope).await?,
                    );
                }
            }
        } else if let Some(query) = &update.callback_query {
            let args = [ContextValue::CallbackQuery(Arc::clone(query)), raw, session];
            report.record(
                DispatchCategory::CallbackQuery,
                registry.call(DispatchCategory::CallbackQuery, &args, scope).await?,
            );
        } else if let Some(query) = &update.inline_query {
            let args = [ContextValue::InlineQuery(Arc::clone(query)), raw, session];
            report.record(
                DispatchCategory::InlineQuery,
                registry.call(DispatchCategory::InlineQuery, &args, scope).await?,
            );
        }

        if settings.double_dispatch
            && let Some(listener) = &self.listener
        {
            notify(listener.as_ref(), &update, &bot, start_command).await?;
            report.listener_notified = true;
        }

        debug!(
            categories = ?report.categories(),
            started = report.total(),
            "dispatch complete"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.registry.len())
            .field("sessions", &self.sessions.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
