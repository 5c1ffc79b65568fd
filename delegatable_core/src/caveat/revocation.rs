//! Issuer-driven revocation of individual delegations.

use super::{CaveatEnforcer, CaveatRejection, Enforcement};
use crate::{
    crypto::{digest::Digest, typed::TypedHasher},
    delegation::SignedDelegation,
    principal::identifier::Identifier,
};
use std::{cell::RefCell, collections::HashSet};
use thiserror::Error;
use tracing::{info, instrument};

/// Denies any link whose delegation has been revoked by its own issuer.
///
/// Revocations are keyed by the signed delegation, so revoking a grant never
/// touches an identical grant from another issuer. The caveat must be
/// attached to the delegation it guards. Terms are ignored.
#[derive(Debug, Default)]
pub struct RevocationEnforcer {
    revoked: RefCell<HashSet<Digest<SignedDelegation>>>,
}

impl RevocationEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke `delegation`. Only its issuer may do so.
    #[instrument(skip_all, fields(%caller, issuer = %delegation.issuer()))]
    pub fn revoke(
        &self,
        caller: Identifier,
        delegation: &SignedDelegation,
        hasher: &TypedHasher,
    ) -> Result<Digest<SignedDelegation>, RevocationError> {
        if caller != delegation.issuer() {
            return Err(RevocationError::NotIssuer {
                caller,
                issuer: delegation.issuer(),
            });
        }

        let hash = hasher.hash(delegation);
        if self.revoked.borrow_mut().insert(hash) {
            info!(%hash, "delegation revoked");
        }
        Ok(hash)
    }

    pub fn is_revoked(&self, hash: &Digest<SignedDelegation>) -> bool {
        self.revoked.borrow().contains(hash)
    }
}

impl CaveatEnforcer for RevocationEnforcer {
    fn pre_enforce(&self, _terms: &[u8], enforcement: &Enforcement<'_>) -> Result<(), CaveatRejection> {
        if self.is_revoked(&enforcement.delegation_hash) {
            Err(CaveatRejection::new(format!(
                "revocation: delegation {} was revoked",
                enforcement.delegation_hash
            )))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevocationError {
    #[error("{caller} cannot revoke a delegation issued by {issuer}")]
    NotIssuer { caller: Identifier, issuer: Identifier },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::{
            domain_separator::DomainSeparator,
            signer::{memory::MemorySigner, sync_signer::SyncSigner},
        },
        delegation::Delegation,
        invocation::Action,
    };

    #[test]
    fn test_only_issuer_revokes() {
        let mut csprng = rand::rngs::OsRng;
        let alice = MemorySigner::generate(&mut csprng);
        let bob = MemorySigner::generate(&mut csprng);
        let hasher = TypedHasher::new(DomainSeparator::new("Test", "1", 1, Identifier::derive("app")));

        let dlg = alice
            .try_sign_typed(&hasher, Delegation::root(bob.id(), vec![]))
            .unwrap();

        let enforcer = RevocationEnforcer::new();
        assert_eq!(
            enforcer.revoke(bob.id(), &dlg, &hasher),
            Err(RevocationError::NotIssuer {
                caller: bob.id(),
                issuer: alice.id()
            })
        );

        let hash = enforcer.revoke(alice.id(), &dlg, &hasher).unwrap();
        assert!(enforcer.is_revoked(&hash));

        let action = Action::new(Identifier::derive("target"), vec![], 0);
        let enforcement = Enforcement {
            action: &action,
            delegation_hash: hash,
            delegate: bob.id(),
            delegator: alice.id(),
        };
        assert!(enforcer.pre_enforce(&[], &enforcement).is_err());

        let other = Enforcement {
            delegation_hash: Digest::zero(),
            ..enforcement
        };
        assert!(enforcer.pre_enforce(&[], &other).is_ok());
    }

    #[test]
    fn test_revoking_leaves_identical_grants_alone() {
        let mut csprng = rand::rngs::OsRng;
        let alice = MemorySigner::generate(&mut csprng);
        let carol = MemorySigner::generate(&mut csprng);
        let bob = MemorySigner::generate(&mut csprng);
        let hasher = TypedHasher::new(DomainSeparator::new("Test", "1", 1, Identifier::derive("app")));

        let grant = Delegation::root(bob.id(), vec![]);
        let by_alice = alice.try_sign_typed(&hasher, grant.clone()).unwrap();
        let by_carol = carol.try_sign_typed(&hasher, grant).unwrap();

        let enforcer = RevocationEnforcer::new();
        let revoked = enforcer.revoke(alice.id(), &by_alice, &hasher).unwrap();
        assert!(enforcer.is_revoked(&revoked));

        let action = Action::new(Identifier::derive("target"), vec![], 0);
        let carols = Enforcement {
            action: &action,
            delegation_hash: hasher.hash(&by_carol),
            delegate: bob.id(),
            delegator: carol.id(),
        };
        assert!(!enforcer.is_revoked(&carols.delegation_hash));
        assert!(enforcer.pre_enforce(&[], &carols).is_ok());
    }
}
