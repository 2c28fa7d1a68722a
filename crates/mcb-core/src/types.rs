//! Context type descriptors and the compatibility relation between them.
//!
//! Every value a handler can receive has a [`TypeDescriptor`]. Descriptors form
//! a small, static "is-a" graph: each one lists its direct supertypes. Two
//! descriptors are the same type only if they are the same static item, so
//! comparison is by identity, never by name.
//!
//! ```text
//! Context ─┬─ Update
//!          ├─ Message
//!          ├─ Entities
//!          ├─ Session
//!          └─ Query ─┬─ CallbackQuery
//!                    └─ InlineQuery
//! ```
//!
//! Custom parameter types may declare their own descriptors, including ones
//! that narrow a built-in type:
//!
//! ```rust,ignore
//! use mcb_core::types::{TypeDescriptor, SESSION};
//!
//! pub static ADMIN_SESSION: TypeDescriptor = TypeDescriptor::new("AdminSession", &[&SESSION]);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

/// A node in the context type graph.
pub struct TypeDescriptor {
    name: &'static str,
    supertypes: &'static [&'static TypeDescriptor],
}

impl TypeDescriptor {
    /// Declares a descriptor with its direct supertypes.
    pub const fn new(name: &'static str, supertypes: &'static [&'static TypeDescriptor]) -> Self {
        Self { name, supertypes }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Direct supertypes only; see [`is_compatible`] for the transitive relation.
    pub fn supertypes(&self) -> &'static [&'static TypeDescriptor] {
        self.supertypes
    }

    /// Whether a value of type `actual` may be passed where `self` is expected.
    pub fn accepts(&self, actual: &TypeDescriptor) -> bool {
        is_compatible(self, actual)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// Built-in descriptors
// ============================================================================

/// Root of the graph; a parameter of this type accepts any context value.
pub static CONTEXT: TypeDescriptor = TypeDescriptor::new("Context", &[]);
pub static UPDATE: TypeDescriptor = TypeDescriptor::new("Update", &[&CONTEXT]);
pub static MESSAGE: TypeDescriptor = TypeDescriptor::new("Message", &[&CONTEXT]);
pub static ENTITIES: TypeDescriptor = TypeDescriptor::new("Entities", &[&CONTEXT]);
/// The bot-session handle.
pub static SESSION: TypeDescriptor = TypeDescriptor::new("Session", &[&CONTEXT]);
/// Common ancestor of both query kinds.
pub static QUERY: TypeDescriptor = TypeDescriptor::new("Query", &[&CONTEXT]);
pub static CALLBACK_QUERY: TypeDescriptor = TypeDescriptor::new("CallbackQuery", &[&QUERY]);
pub static INLINE_QUERY: TypeDescriptor = TypeDescriptor::new("InlineQuery", &[&QUERY]);

// ============================================================================
// TypeMatcher
// ============================================================================

/// Returns `true` iff `required` is `actual` or a transitive supertype of it.
///
/// The walk is a depth-first search that never revisits a node, so diamond
/// and cyclic supertype graphs terminate.
pub fn is_compatible(required: &TypeDescriptor, actual: &TypeDescriptor) -> bool {
    let mut visited: Vec<&TypeDescriptor> = Vec::new();
    let mut stack: Vec<&TypeDescriptor> = vec![actual];

    while let Some(current) = stack.pop() {
        if current == required {
            return true;
        }
        if visited.contains(&current) {
            continue;
        }
        visited.push(current);
        stack.extend(current.supertypes.iter().copied());
    }

    false
}

/// Returns the first type that occurs more than once in `types`.
pub fn find_duplicate(types: &[&'static TypeDescriptor]) -> Option<&'static TypeDescriptor> {
    types
        .iter()
        .enumerate()
        .find(|&(i, ty)| types[..i].contains(ty))
        .map(|(_, ty)| *ty)
}

/// Renders a type list as `A, B, C` for diagnostics.
pub fn describe(types: &[&'static TypeDescriptor]) -> String {
    types
        .iter()
        .map(|ty| ty.name())
        .collect::<Vec<_>>()
        .join(", ")
}
