//! # mcb Core
//!
//! The type-level engine behind handler registration.
//!
//! - **Event model** ([`model`]): the raw update records delivered by a transport
//! - **Type graph** ([`types`]): static [`TypeDescriptor`]s and the
//!   [`is_compatible`] ancestor check
//! - **Context values** ([`context`]): the arguments handlers receive and the
//!   [`ContextParam`] trait that converts them
//! - **Categories** ([`category`]): the seven dispatch categories and the
//!   canonical parameter list each one supplies
//! - **Resolution** ([`signature`], [`reorder`]): matching a handler's declared
//!   parameters against a canonical list and rearranging arguments to fit
//! - **Session** ([`bot`]): the [`Bot`] handle a transport provides
//!
//! ```text
//! declared (Session, Message)          canonical MESSAGE list
//!            │                         (Update, Message, Session)
//!            ▼                                   │
//!    SignatureResolver ── resolved ──▶ ArgumentReorderer
//!                                   [0 → -, 1 → 1, 2 → 0]
//! ```

pub mod bot;
pub mod category;
pub mod context;
pub mod error;
pub mod model;
pub mod reorder;
pub mod signature;
pub mod types;

pub use bot::{Bot, BoxedBot, downcast_bot};
pub use category::{DispatchCategory, UnknownCategory};
pub use context::{ContextParam, ContextValue, Entities, Query};
pub use error::{
    ApiError, ApiResult, ExtractError, ExtractResult, SignatureError, SignatureResult,
};
pub use model::{CallbackQuery, Chat, InlineQuery, Message, MessageEntity, Update, User};
pub use reorder::{ArgumentReorderer, IndexPair};
pub use signature::{MAX_POOL_SIZE, SignatureResolver};
pub use types::{TypeDescriptor, is_compatible};
