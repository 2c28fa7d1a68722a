//! Dispatch categories and their canonical parameter lists.

use std::fmt;
use std::str::FromStr;

use crate::types::{
    CALLBACK_QUERY, ENTITIES, INLINE_QUERY, MESSAGE, SESSION, TypeDescriptor, UPDATE,
};

/// The closed set of event kinds handlers register against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DispatchCategory {
    Update,
    Message,
    Entities,
    Start,
    CallbackQuery,
    InlineQuery,
    Command,
}

static UPDATE_PARAMS: [&TypeDescriptor; 2] = [&UPDATE, &SESSION];
static MESSAGE_PARAMS: [&TypeDescriptor; 3] = [&UPDATE, &MESSAGE, &SESSION];
static ENTITIES_PARAMS: [&TypeDescriptor; 4] = [&MESSAGE, &ENTITIES, &UPDATE, &SESSION];
static START_PARAMS: [&TypeDescriptor; 3] = [&UPDATE, &MESSAGE, &SESSION];
static CALLBACK_QUERY_PARAMS: [&TypeDescriptor; 3] = [&CALLBACK_QUERY, &UPDATE, &SESSION];
static INLINE_QUERY_PARAMS: [&TypeDescriptor; 3] = [&INLINE_QUERY, &UPDATE, &SESSION];
static COMMAND_PARAMS: [&TypeDescriptor; 4] = [&MESSAGE, &ENTITIES, &UPDATE, &SESSION];

impl DispatchCategory {
    /// All categories, in dispatch precedence order.
    pub const ALL: [DispatchCategory; 7] = [
        DispatchCategory::Update,
        DispatchCategory::Message,
        DispatchCategory::Entities,
        DispatchCategory::Start,
        DispatchCategory::CallbackQuery,
        DispatchCategory::InlineQuery,
        DispatchCategory::Command,
    ];

    /// Stable index in `0..7`, matching the position in [`Self::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The ordered context types this category always supplies.
    pub fn canonical_parameters(self) -> &'static [&'static TypeDescriptor] {
        match self {
            DispatchCategory::Update => &UPDATE_PARAMS,
            DispatchCategory::Message => &MESSAGE_PARAMS,
            DispatchCategory::Entities => &ENTITIES_PARAMS,
            DispatchCategory::Start => &START_PARAMS,
            DispatchCategory::CallbackQuery => &CALLBACK_QUERY_PARAMS,
            DispatchCategory::InlineQuery => &INLINE_QUERY_PARAMS,
            DispatchCategory::Command => &COMMAND_PARAMS,
        }
    }

    /// The lowercase tag used in feedback declarations and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchCategory::Update => "update",
            DispatchCategory::Message => "message",
            DispatchCategory::Entities => "entities",
            DispatchCategory::Start => "start",
            DispatchCategory::CallbackQuery => "callback_query",
            DispatchCategory::InlineQuery => "inline_query",
            DispatchCategory::Command => "command",
        }
    }

    /// Parses a feedback tag. Case-insensitive; `command` is not a feedback tag.
    pub fn from_feedback(tag: &str) -> Option<Self> {
        match tag.parse() {
            Ok(DispatchCategory::Command) | Err(_) => None,
            Ok(category) => Some(category),
        }
    }
}

impl fmt::Display for DispatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no dispatch category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dispatch category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for DispatchCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DispatchCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}
