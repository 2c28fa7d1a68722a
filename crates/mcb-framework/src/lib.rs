//! # mcb Framework
//!
//! Handler registration and event dispatch on top of `mcb-core`.
//!
//! This layer provides:
//! - The [`Handler`] trait over async functions taking any subset of a
//!   category's context, in any order
//! - [`Manifest`] / [`Configuration`]: the explicit registration table a bot
//!   configuration fills
//! - [`RegistrationBuilder`]: resolves every entry up front into a
//!   [`HandlerRegistry`], failing fast on the first bad signature
//! - [`EventDispatcher`]: routes updates through the category branches, with
//!   optional double dispatch to an [`UpdateListener`]
//! - Per-user sessions ([`user`]) governed by add/end/timeout strategies

pub mod builder;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod handler;
pub mod listener;
pub mod manifest;
pub mod registry;
pub mod user;

#[cfg(test)]
mod testing;

pub use builder::RegistrationBuilder;
pub use descriptor::{DispatchScope, HandlerDescriptor, Invocation, InvocationMode};
pub use dispatcher::{DispatchReport, EventDispatcher};
pub use error::{
    BoxError, BuildError, BuildResult, DispatchError, DispatchResult, HandlerError, HandlerResult,
    SessionError, SessionResult,
};
pub use filter::{EventSubtype, EventTraits, HandlerFilter, SenderClass};
pub use handler::{BoxedHandler, ErasedHandler, Handler, HandlerFn, IntoHandlerResult, into_handler};
pub use listener::{BoxedListener, UpdateListener};
pub use manifest::{BotSettings, Configuration, Manifest, ManifestEntry, Tag};
pub use registry::HandlerRegistry;
pub use user::{
    Admission, BotUser, OnAddStrategy, OnEndStrategy, OnTimeoutStrategy, Rejection, UserMapping,
    UserSessions,
};
