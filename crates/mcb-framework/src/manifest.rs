//! Registration manifests.
//!
//! A bot configuration describes its handlers by filling a [`Manifest`]: the
//! [`BotSettings`] marker plus one entry per handler. Entries are either
//! *feedback* handlers tagged with a category name, or *command* handlers
//! tagged with a command literal. The [`RegistrationBuilder`] turns a
//! manifest into a [`HandlerRegistry`].
//!
//! ```rust,ignore
//! struct EchoBot;
//!
//! impl Configuration for EchoBot {
//!     fn settings(&self) -> Option<BotSettings> {
//!         Some(BotSettings::new().with_bot_token("123:abc"))
//!     }
//!
//!     fn register(self: Arc<Self>, manifest: &mut Manifest) {
//!         manifest.feedback("message", echo);
//!         manifest.command("/say", say).trailing_text();
//!         manifest.command("/ban", ban).admin_only();
//!     }
//! }
//! ```
//!
//! [`RegistrationBuilder`]: crate::builder::RegistrationBuilder
//! [`HandlerRegistry`]: crate::registry::HandlerRegistry

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::InvocationMode;
use crate::filter::{EventSubtype, HandlerFilter, SenderClass};
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::user::UserMapping;

// ============================================================================
// BotSettings
// ============================================================================

/// The top-level configuration marker.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Run handlers as detached tasks unless an entry says otherwise.
    pub thread_separation: bool,
    /// The start command, e.g. `/start`. START fires for `/`-prefixed text
    /// that contains it exactly as written here.
    pub start_command: String,
    pub bot_token: String,
    /// Also notify the attached [`UpdateListener`](crate::listener::UpdateListener).
    pub double_dispatch: bool,
    /// Skip entries bound to a configuration instance.
    pub static_build: bool,
    /// User ids classified as [`SenderClass::Admins`].
    pub admins: Vec<i64>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            thread_separation: false,
            start_command: "/start".to_owned(),
            bot_token: String::new(),
            double_dispatch: false,
            static_build: false,
            admins: Vec::new(),
        }
    }
}

impl BotSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread_separation(mut self, enabled: bool) -> Self {
        self.thread_separation = enabled;
        self
    }

    pub fn with_start_command(mut self, command: impl Into<String>) -> Self {
        self.start_command = command.into();
        self
    }

    pub fn with_bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = token.into();
        self
    }

    pub fn with_double_dispatch(mut self, enabled: bool) -> Self {
        self.double_dispatch = enabled;
        self
    }

    pub fn with_static_build(mut self, enabled: bool) -> Self {
        self.static_build = enabled;
        self
    }

    pub fn with_admins(mut self, admins: impl IntoIterator<Item = i64>) -> Self {
        self.admins = admins.into_iter().collect();
        self
    }

    /// The mode entries get when they do not choose one.
    pub fn default_mode(&self) -> InvocationMode {
        if self.thread_separation {
            InvocationMode::Dedicated
        } else {
            InvocationMode::Inline
        }
    }
}

impl std::fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSettings")
            .field("thread_separation", &self.thread_separation)
            .field("start_command", &self.start_command)
            .field("bot_token", &if self.bot_token.is_empty() { "" } else { "***" })
            .field("double_dispatch", &self.double_dispatch)
            .field("static_build", &self.static_build)
            .field("admins", &self.admins)
            .finish()
    }
}

// ============================================================================
// Manifest entries
// ============================================================================

/// How an entry is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// A category name such as `message` or `callback_query`.
    Feedback(String),
    /// A command literal such as `/help`.
    Command {
        literal: String,
        accepts_trailing_text: bool,
    },
}

/// One handler declaration, refined through its builder methods.
pub struct ManifestEntry {
    pub(crate) name: String,
    pub(crate) tag: Tag,
    pub(crate) handler: BoxedHandler,
    pub(crate) mode: Option<InvocationMode>,
    pub(crate) filter: HandlerFilter,
    pub(crate) instance_bound: bool,
    pub(crate) user_mapping: Option<UserMapping>,
}

impl ManifestEntry {
    fn new(tag: Tag, handler: BoxedHandler) -> Self {
        Self {
            name: handler.name().to_owned(),
            tag,
            handler,
            mode: None,
            filter: HandlerFilter::new(),
            instance_bound: false,
            user_mapping: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Overrides the name used in logs and errors.
    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Command entries only: also match text that continues past the literal.
    pub fn trailing_text(&mut self) -> &mut Self {
        if let Tag::Command {
            accepts_trailing_text,
            ..
        } = &mut self.tag
        {
            *accepts_trailing_text = true;
        }
        self
    }

    pub fn admin_only(&mut self) -> &mut Self {
        self.filter = std::mem::take(&mut self.filter).admin_only(true);
        self
    }

    /// Run as a detached task regardless of `thread_separation`.
    pub fn dedicated(&mut self) -> &mut Self {
        self.mode = Some(InvocationMode::Dedicated);
        self
    }

    /// Run inline regardless of `thread_separation`.
    ///
    /// An entry that also carries a [`UserMapping`] fails to build.
    pub fn inline(&mut self) -> &mut Self {
        self.mode = Some(InvocationMode::Inline);
        self
    }

    pub fn ignore_types(&mut self, types: impl IntoIterator<Item = EventSubtype>) -> &mut Self {
        self.filter = std::mem::take(&mut self.filter).ignore_types(types);
        self
    }

    pub fn ignore_senders(&mut self, senders: impl IntoIterator<Item = SenderClass>) -> &mut Self {
        self.filter = std::mem::take(&mut self.filter).ignore_senders(senders);
        self
    }

    /// Marks the handler as needing the configuration instance.
    ///
    /// Such entries are dropped when the settings request a static build.
    pub fn instance_bound(&mut self) -> &mut Self {
        self.instance_bound = true;
        self
    }

    /// Runs the handler inside the sender's session. Implies [`dedicated`](Self::dedicated).
    pub fn user_mapping(&mut self, mapping: UserMapping) -> &mut Self {
        self.user_mapping = Some(mapping);
        self.mode = Some(InvocationMode::Dedicated);
        self
    }
}

impl std::fmt::Debug for ManifestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestEntry")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("mode", &self.mode)
            .finish()
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// The full registration table of one bot configuration.
#[derive(Debug, Default)]
pub struct Manifest {
    pub(crate) settings: Option<BotSettings>,
    pub(crate) entries: Vec<ManifestEntry>,
    pub(crate) ignored_types: Vec<EventSubtype>,
    pub(crate) ignored_senders: Vec<SenderClass>,
}

impl Manifest {
    /// An empty manifest without a settings marker.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: BotSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    /// Collects the settings and entries of a configuration.
    pub fn from_configuration<C: Configuration>(config: Arc<C>) -> Self {
        let mut manifest = Self {
            settings: config.settings(),
            ..Self::default()
        };
        config.register(&mut manifest);
        manifest
    }

    pub fn settings(&self) -> Option<&BotSettings> {
        self.settings.as_ref()
    }

    pub fn settings_mut(&mut self) -> Option<&mut BotSettings> {
        self.settings.as_mut()
    }

    pub fn set_settings(&mut self, settings: BotSettings) {
        self.settings = Some(settings);
    }

    /// Registers a handler for a category named by `category`
    /// (`update`, `message`, `entities`, `start`, `callback_query`, `inline_query`).
    pub fn feedback<H, T>(&mut self, category: &str, handler: H) -> &mut ManifestEntry
    where
        H: Handler<T>,
        T: 'static,
    {
        self.push(ManifestEntry::new(
            Tag::Feedback(category.to_owned()),
            into_handler(handler),
        ))
    }

    /// Registers a handler for an exact command literal.
    pub fn command<H, T>(&mut self, literal: &str, handler: H) -> &mut ManifestEntry
    where
        H: Handler<T>,
        T: 'static,
    {
        self.push(ManifestEntry::new(
            Tag::Command {
                literal: literal.to_owned(),
                accepts_trailing_text: false,
            },
            into_handler(handler),
        ))
    }

    /// Event subtypes every handler in this manifest ignores.
    pub fn ignore_types(&mut self, types: impl IntoIterator<Item = EventSubtype>) -> &mut Self {
        self.ignored_types.extend(types);
        self
    }

    /// Sender classes every handler in this manifest ignores.
    pub fn ignore_senders(&mut self, senders: impl IntoIterator<Item = SenderClass>) -> &mut Self {
        self.ignored_senders.extend(senders);
        self
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: ManifestEntry) -> &mut ManifestEntry {
        let index = self.entries.len();
        self.entries.push(entry);
        &mut self.entries[index]
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// A bot configuration: supplies the settings marker and registers handlers.
///
/// `register` receives the configuration behind an `Arc`, so handlers can be
/// closures that capture it and call its methods.
pub trait Configuration: Send + Sync + 'static {
    /// The settings marker. `None` makes registration fail.
    fn settings(&self) -> Option<BotSettings>;

    fn register(self: Arc<Self>, manifest: &mut Manifest);
}
