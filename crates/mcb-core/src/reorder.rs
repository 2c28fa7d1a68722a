//! Argument reordering from canonical order into a handler's declared order.

use crate::error::{SignatureError, SignatureResult};
use crate::signature::ensure_distinct;
use crate::types::TypeDescriptor;

/// Where one canonical argument goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPair {
    /// Position in the canonical (input) list.
    pub input: usize,
    /// Position in the handler's (output) list, `None` when the handler does not take it.
    pub output: Option<usize>,
}

/// A precomputed mapping from an input type list to an output type list.
///
/// Built once per handler at registration; [`map`](Self::map) is then a
/// linear pass on every call.
#[derive(Debug, Clone)]
pub struct ArgumentReorderer {
    input: Vec<&'static TypeDescriptor>,
    output: Vec<&'static TypeDescriptor>,
    pairs: Vec<IndexPair>,
}

impl ArgumentReorderer {
    /// Builds the mapping. Fails if either list repeats a type.
    pub fn new(
        input: &[&'static TypeDescriptor],
        output: &[&'static TypeDescriptor],
    ) -> SignatureResult<Self> {
        ensure_distinct(input)?;
        ensure_distinct(output)?;

        let pairs = input
            .iter()
            .enumerate()
            .map(|(i, ty)| IndexPair {
                input: i,
                output: output.iter().position(|candidate| candidate == ty),
            })
            .collect();

        Ok(Self {
            input: input.to_vec(),
            output: output.to_vec(),
            pairs,
        })
    }

    pub fn input(&self) -> &[&'static TypeDescriptor] {
        &self.input
    }

    pub fn output(&self) -> &[&'static TypeDescriptor] {
        &self.output
    }

    pub fn pairs(&self) -> &[IndexPair] {
        &self.pairs
    }

    /// Rearranges `args` (in input order) into output order.
    ///
    /// The result always has `output().len()` slots; slots with no input
    /// counterpart stay `None`.
    pub fn map<T: Clone>(&self, args: &[T]) -> SignatureResult<Vec<Option<T>>> {
        if args.len() != self.input.len() {
            return Err(SignatureError::ArityMismatch {
                expected: self.input.len(),
                got: args.len(),
            });
        }

        let mut mapped: Vec<Option<T>> = vec![None; self.output.len()];
        for pair in &self.pairs {
            if let Some(out) = pair.output {
                mapped[out] = Some(args[pair.input].clone());
            }
        }
        Ok(mapped)
    }
}
