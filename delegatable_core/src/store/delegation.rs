//! [`SignedDelegation`] storage.
//!
//! Delegations reference their parents by digest only. The store resolves
//! those references back into the explicit, leaf-first chain arrays that
//! invocations carry.

use crate::{
    crypto::{digest::Digest, typed::TypedHasher},
    delegation::SignedDelegation,
};
use dupe::Dupe;
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use thiserror::Error;
use tracing::instrument;

/// [`SignedDelegation`] storage, keyed by the typed digest of the signed delegation.
#[derive(Debug, Default, Clone, Dupe)]
pub struct DelegationStore(Rc<RefCell<HashMap<Digest<SignedDelegation>, Rc<SignedDelegation>>>>);

impl DelegationStore {
    /// Create a new delegation store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a [`SignedDelegation`] by its [`Digest`].
    pub fn get(&self, key: &Digest<SignedDelegation>) -> Option<Rc<SignedDelegation>> {
        self.0.borrow().get(key).cloned()
    }

    /// Check if a [`Digest`] is present in the store.
    pub fn contains_key(&self, key: &Digest<SignedDelegation>) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Insert a [`SignedDelegation`] into the store.
    ///
    /// The key is computed under `hasher`, so it matches the `authority` that
    /// children signed under the same domain. Identical grants from different
    /// issuers are stored separately.
    pub fn insert(&self, hasher: &TypedHasher, delegation: Rc<SignedDelegation>) -> Digest<SignedDelegation> {
        let key = hasher.hash(&*delegation);
        self.0.borrow_mut().insert(key, delegation);
        key
    }

    /// Remove a [`SignedDelegation`] by its [`Digest`].
    pub fn remove_by_hash(&self, key: &Digest<SignedDelegation>) -> Option<Rc<SignedDelegation>> {
        self.0.borrow_mut().remove(key)
    }

    /// Rebuild the chain ending in `leaf`, leaf first, by following
    /// `authority` links until a root.
    ///
    /// This does not check signatures; the result is meant to be handed to
    /// chain validation.
    #[instrument(skip(self), fields(%leaf))]
    pub fn resolve_chain(
        &self,
        leaf: Digest<SignedDelegation>,
        max_len: usize,
    ) -> Result<Vec<SignedDelegation>, ResolveError> {
        let store = self.0.borrow();
        let mut chain = vec![];
        let mut next = leaf;

        loop {
            if chain.len() == max_len {
                return Err(ResolveError::ChainTooLong { max: max_len });
            }

            let link = store.get(&next).ok_or(ResolveError::MissingDependency(next))?;
            chain.push(link.as_ref().clone());

            if link.payload().is_root() {
                return Ok(chain);
            }
            next = link.payload().authority;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Missing dependency: {0}")]
    MissingDependency(Digest<SignedDelegation>),

    #[error("Chain is longer than {max} links")]
    ChainTooLong { max: usize },
}
