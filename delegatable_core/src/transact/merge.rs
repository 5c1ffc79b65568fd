//! Merge [`Fork`]s back into their original data structures.

use super::fork::Fork;

/// Synchronously merge a fork back into its original data structure.
pub trait Merge: Fork {
    /// Consume the fork and merge it back into the original data structure.
    ///
    /// In general, this should not be used directly,
    /// but rather via [`transact_blocking`].
    ///
    /// [`transact_blocking`]: crate::transact::transact_blocking
    fn merge(&mut self, fork: Self::Forked);
}
