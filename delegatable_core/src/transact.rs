//! Checkpointed, all-or-nothing mutation.
//!
//! State is [`Fork`]ed before a transaction, the transaction runs against the
//! fork, and only a successful run is [`Merge`]d back. A failed run drops the
//! fork, leaving the trunk exactly as it was.

pub mod fork;
pub mod merge;

use self::merge::Merge;

/// Run `tx` against a fork of `trunk`, merging the fork back only on success.
pub fn transact_blocking<T: Merge, R, Error, F: FnOnce(&mut T::Forked) -> Result<R, Error>>(
    trunk: &mut T,
    tx: F,
) -> Result<R, Error> {
    let mut forked = trunk.fork();
    let out = tx(&mut forked)?;
    trunk.merge(forked);
    Ok(out)
}
