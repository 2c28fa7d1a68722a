//! Signature resolution.
//!
//! Handlers declare only the context values they need, in any order. At
//! registration the resolver searches the category's canonical pool for an
//! ordered subset that positionally satisfies the declaration:
//!
//! - subsets are visited by bitmask ascending, where bit `j` selects `pool[j]`
//! - each subset is permuted in swap order (`swap(start, i)`, recurse, swap back)
//! - position `i` matches when `declared[i]` is the candidate's type or one of
//!   its ancestors
//!
//! The first matching permutation wins, so resolution is deterministic.
//! Canonical pools hold a handful of types; a resolver refuses pools larger
//! than [`MAX_POOL_SIZE`], which bounds the subset masks.

use tracing::trace;

use crate::error::{SignatureError, SignatureResult};
use crate::types::{TypeDescriptor, describe, find_duplicate, is_compatible};

/// Largest canonical pool a [`SignatureResolver`] accepts.
pub const MAX_POOL_SIZE: usize = 16;

/// Resolves declared parameter lists against one canonical pool.
#[derive(Debug, Clone, Copy)]
pub struct SignatureResolver {
    pool: &'static [&'static TypeDescriptor],
}

impl SignatureResolver {
    /// Creates a resolver for `pool`, rejecting pools with repeated types or
    /// more than [`MAX_POOL_SIZE`] entries.
    pub fn new(pool: &'static [&'static TypeDescriptor]) -> SignatureResult<Self> {
        if pool.len() > MAX_POOL_SIZE {
            return Err(SignatureError::PoolTooLarge {
                len: pool.len(),
                max: MAX_POOL_SIZE,
            });
        }
        ensure_distinct(pool)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &'static [&'static TypeDescriptor] {
        self.pool
    }

    /// Finds the canonical types, in handler order, that satisfy `declared`.
    ///
    /// A declaration that repeats a type is ambiguous and fails with
    /// [`SignatureError::DuplicateType`] before any search happens.
    pub fn resolve(
        &self,
        declared: &[&'static TypeDescriptor],
    ) -> SignatureResult<Vec<&'static TypeDescriptor>> {
        ensure_distinct(declared)?;

        let n = self.pool.len();
        for mask in 0u32..(1u32 << n) {
            if mask.count_ones() as usize != declared.len() {
                continue;
            }

            let mut subset: Vec<&'static TypeDescriptor> = (0..n)
                .filter(|j| mask & (1 << j) != 0)
                .map(|j| self.pool[j])
                .collect();

            if permute_until(&mut subset, 0, &|candidate: &[&'static TypeDescriptor]| {
                matches(declared, candidate)
            }) {
                trace!(
                    declared = %describe(declared),
                    resolved = %describe(&subset),
                    "signature resolved"
                );
                return Ok(subset);
            }
        }

        Err(SignatureError::UnsupportedSignature {
            declared: describe(declared),
            supported: describe(self.pool),
        })
    }
}

/// Fails with [`SignatureError::DuplicateType`] if `types` repeats an entry.
pub fn ensure_distinct(types: &[&'static TypeDescriptor]) -> SignatureResult<()> {
    match find_duplicate(types) {
        Some(ty) => Err(SignatureError::DuplicateType {
            ty: ty.name(),
            types: describe(types),
        }),
        None => Ok(()),
    }
}

fn matches(declared: &[&'static TypeDescriptor], candidate: &[&'static TypeDescriptor]) -> bool {
    declared.len() == candidate.len()
        && declared
            .iter()
            .zip(candidate)
            .all(|(required, actual)| is_compatible(required, actual))
}

/// Visits permutations of `items[start..]` in swap order and stops at the
/// first one accepted by `accept`, leaving `items` in that order.
fn permute_until<T>(items: &mut [T], start: usize, accept: &dyn Fn(&[T]) -> bool) -> bool {
    if start >= items.len() {
        return accept(items);
    }
    for i in start..items.len() {
        items.swap(start, i);
        if permute_until(items, start + 1, accept) {
            return true;
        }
        items.swap(start, i);
    }
    false
}
