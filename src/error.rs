//! Error type for the checked (`Result`-returning) operations.
//!
//! Try-prefixed operations never use this type: absence is reported by
//! `bool` or `Option`. `CollectionError` only backs the checked variants
//! such as `Map::insert_new` or `ConcurrentList::remove`.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollectionError {
    /// The key is already present; the stored value was left untouched.
    #[error("duplicate key")]
    DuplicateKey,

    /// Positional access past the end of a list.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A blocking dequeue found nothing before its deadline.
    #[error("timed out after {0:?} waiting for an item")]
    TimedOut(Duration),
}

impl CollectionError {
    #[inline]
    pub(crate) fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }
}
