//! Turns a [`Manifest`] into a [`HandlerRegistry`].
//!
//! Every entry is resolved up front. The first entry that cannot be resolved
//! aborts the build, so a registry either holds every declared handler or
//! does not exist.
//!
//! ```rust,ignore
//! let registry = RegistrationBuilder::from_configuration(Arc::new(EchoBot)).build()?;
//! let dispatcher = EventDispatcher::new(registry);
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::descriptor::{HandlerDescriptor, InvocationMode};
use crate::error::{BuildError, BuildResult};
use crate::filter::{EventSubtype, SenderClass};
use crate::manifest::{BotSettings, Configuration, Manifest, ManifestEntry, Tag};
use crate::registry::HandlerRegistry;
use mcb_core::DispatchCategory;

/// Builds a registry from one manifest.
#[derive(Debug)]
pub struct RegistrationBuilder {
    manifest: Manifest,
}

impl RegistrationBuilder {
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    /// Collects the manifest of `config`.
    pub fn from_configuration<C: Configuration>(config: Arc<C>) -> Self {
        Self::new(Manifest::from_configuration(config))
    }

    /// The manifest before it is built, e.g. to apply settings overrides.
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// Resolves every entry and fills the registry.
    pub fn build(self) -> BuildResult<HandlerRegistry> {
        let Manifest {
            settings,
            entries,
            ignored_types,
            ignored_senders,
        } = self.manifest;
        let settings = settings.ok_or(BuildError::MissingConfiguration)?;

        let mut registry = HandlerRegistry::new(settings.clone());
        let mut skipped = 0;
        for entry in entries {
            if settings.static_build && entry.instance_bound {
                debug!(handler = %entry.name, "static build, instance-bound handler skipped");
                skipped += 1;
                continue;
            }

            let descriptor = describe(entry, &settings, &ignored_types, &ignored_senders)?;
            debug!(
                handler = descriptor.name(),
                category = %descriptor.category(),
                key = descriptor.key(),
                mode = ?descriptor.mode(),
                "handler registered"
            );
            registry.add(descriptor);
        }

        info!(handlers = registry.len(), skipped, "handler registry built");
        Ok(registry)
    }
}

fn describe(
    entry: ManifestEntry,
    settings: &BotSettings,
    ignored_types: &[EventSubtype],
    ignored_senders: &[SenderClass],
) -> BuildResult<HandlerDescriptor> {
    let ManifestEntry {
        name,
        tag,
        handler,
        mode,
        filter,
        user_mapping,
        ..
    } = entry;

    let (category, key, trailing) = match tag {
        Tag::Feedback(tag) => {
            let Some(category) = DispatchCategory::from_feedback(&tag) else {
                return Err(BuildError::UnknownFeedback { handler: name, tag });
            };
            let key = match category {
                DispatchCategory::Start => settings.start_command.clone(),
                other => other.as_str().to_owned(),
            };
            (category, key, false)
        }
        Tag::Command {
            literal,
            accepts_trailing_text,
        } => (DispatchCategory::Command, literal, accepts_trailing_text),
    };

    let mode = mode.unwrap_or_else(|| settings.default_mode());
    if user_mapping.is_some() && mode == InvocationMode::Inline {
        return Err(BuildError::InlineUserMapping { handler: name });
    }

    let filter = filter
        .ignore_types(ignored_types.iter().copied())
        .ignore_senders(ignored_senders.iter().copied());

    let descriptor = HandlerDescriptor::resolve(name.clone(), handler, category, key)
        .map_err(|source| BuildError::Signature {
            handler: name,
            category: category.as_str(),
            source,
        })?;

    Ok(descriptor
        .with_mode(mode)
        .with_trailing_text(trailing)
        .with_filter(filter)
        .with_user_mapping(user_mapping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserMapping;
    use mcb_core::{BoxedBot, CallbackQuery, Entities, Message, Query, SignatureError, Update};

    async fn on_update(_update: Arc<Update>) {}
    async fn on_message(_message: Arc<Message>, _bot: BoxedBot) {}
    async fn on_entities(_entities: Entities, _message: Arc<Message>) {}
    async fn on_query(_query: Query) {}
    async fn on_callback(_bot: BoxedBot, _query: Arc<CallbackQuery>) {}
    async fn twice(_a: Arc<Message>, _b: Arc<Message>) {}

    #[test]
    fn test_missing_configuration() {
        let mut manifest = Manifest::new();
        manifest.feedback("message", on_message);
        let err = RegistrationBuilder::new(manifest).build().unwrap_err();
        assert!(matches!(err, BuildError::MissingConfiguration));
    }

    #[test]
    fn test_build_registers_every_category() {
        let mut manifest = Manifest::with_settings(BotSettings::new());
        manifest.feedback("update", on_update);
        manifest.feedback("MESSAGE", on_message);
        manifest.feedback("entities", on_entities);
        manifest.feedback("start", on_message);
        manifest.feedback("callback_query", on_callback);
        manifest.feedback("inline_query", on_query);
        manifest.command("/docs", on_entities);

        let registry = RegistrationBuilder::new(manifest).build().unwrap();
        assert_eq!(registry.len(), 7);
        for category in DispatchCategory::ALL {
            assert_eq!(registry.handlers(category).len(), 1, "{category}");
        }
        assert_eq!(registry.handlers(DispatchCategory::Start)[0].key(), "/start");
        assert_eq!(registry.handlers(DispatchCategory::Message)[0].key(), "message");
        assert_eq!(registry.handlers(DispatchCategory::Command)[0].key(), "/docs");
    }

    #[test]
    fn test_duplicate_declared_types_fail_in_any_category() {
        for tag in ["update", "message", "entities", "start", "callback_query", "inline_query"] {
            let mut manifest = Manifest::with_settings(BotSettings::new());
            manifest.feedback(tag, twice);
            let err = RegistrationBuilder::new(manifest).build().unwrap_err();
            assert!(err.signature_error().is_some_and(SignatureError::is_duplicate), "{tag}");
        }

        let mut manifest = Manifest::with_settings(BotSettings::new());
        manifest.command("/x", twice);
        let err = RegistrationBuilder::new(manifest).build().unwrap_err();
        assert!(err.signature_error().is_some_and(SignatureError::is_duplicate));
    }

    #[test]
    fn test_unsupported_signature_aborts_build() {
        let mut manifest = Manifest::with_settings(BotSettings::new());
        manifest.feedback("message", on_message);
        manifest.feedback("update", on_callback).named("wrong_place");

        let err = RegistrationBuilder::new(manifest).build().unwrap_err();
        match err {
            BuildError::Signature {
                handler,
                category,
                source,
            } => {
                assert_eq!(handler, "wrong_place");
                assert_eq!(category, "update");
                assert!(source.is_unsupported());
                assert!(source.to_string().contains("Update, Session"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_feedback() {
        let mut manifest = Manifest::with_settings(BotSettings::new());
        manifest.feedback("command", on_message);
        let err = RegistrationBuilder::new(manifest).build().unwrap_err();
        assert!(matches!(err, BuildError::UnknownFeedback { ref tag, .. } if tag == "command"));
    }

    #[test]
    fn test_static_build_skips_instance_bound() {
        let settings = BotSettings::new().with_static_build(true);
        let mut manifest = Manifest::with_settings(settings);
        manifest.feedback("message", on_message).instance_bound();
        manifest.feedback("message", on_message);

        let registry = RegistrationBuilder::new(manifest).build().unwrap();
        assert_eq!(registry.handlers(DispatchCategory::Message).len(), 1);
    }

    #[test]
    fn test_modes_follow_thread_separation() {
        let settings = BotSettings::new().with_thread_separation(true);
        let mut manifest = Manifest::with_settings(settings);
        manifest.feedback("message", on_message);
        manifest.feedback("message", on_message).inline();

        let registry = RegistrationBuilder::new(manifest).build().unwrap();
        let modes: Vec<_> = registry
            .handlers(DispatchCategory::Message)
            .iter()
            .map(HandlerDescriptor::mode)
            .collect();
        assert_eq!(modes, vec![InvocationMode::Dedicated, InvocationMode::Inline]);
    }

    #[test]
    fn test_manifest_ignore_sets_merge_into_entries() {
        let mut manifest = Manifest::with_settings(BotSettings::new());
        manifest.ignore_types([EventSubtype::Start]);
        manifest
            .command("/docs", on_message)
            .ignore_types([EventSubtype::Entities, EventSubtype::Start]);

        let registry = RegistrationBuilder::new(manifest).build().unwrap();
        let filter = registry.handlers(DispatchCategory::Command)[0].filter();
        assert_eq!(
            filter.ignored_types(),
            &[EventSubtype::Entities, EventSubtype::Start]
        );
    }

    #[test]
    fn test_inline_after_user_mapping_is_rejected() {
        let mut manifest = Manifest::with_settings(BotSettings::new());
        manifest
            .feedback("message", on_message)
            .named("quiz")
            .user_mapping(UserMapping::new())
            .inline();

        let err = RegistrationBuilder::new(manifest).build().unwrap_err();
        assert!(matches!(err, BuildError::InlineUserMapping { ref handler } if handler == "quiz"));
    }

    #[test]
    fn test_user_mapping_registers_dedicated() {
        let mut manifest = Manifest::with_settings(BotSettings::new());
        manifest
            .feedback("message", on_message)
            .inline()
            .user_mapping(UserMapping::new());

        let registry = RegistrationBuilder::new(manifest).build().unwrap();
        let descriptor = &registry.handlers(DispatchCategory::Message)[0];
        assert_eq!(descriptor.mode(), InvocationMode::Dedicated);
    }
}
