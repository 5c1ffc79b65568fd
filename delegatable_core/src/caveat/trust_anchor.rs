//! Require the delegator of a link to be a recognised root of trust.

use super::{CaveatEnforcer, CaveatRejection, Enforcement};
use crate::registry::TrustRegistry;

/// Allows an action iff the signer of the delegation carrying this caveat is
/// a trust anchor in the wrapped registry. Terms are ignored.
#[derive(Debug, Clone)]
pub struct TrustAnchorEnforcer<R: TrustRegistry> {
    registry: R,
}

impl<R: TrustRegistry> TrustAnchorEnforcer<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }
}

impl<R: TrustRegistry> CaveatEnforcer for TrustAnchorEnforcer<R> {
    fn pre_enforce(&self, _terms: &[u8], enforcement: &Enforcement<'_>) -> Result<(), CaveatRejection> {
        if self.registry.is_trust_anchor(&enforcement.delegator) {
            Ok(())
        } else {
            Err(CaveatRejection::new(format!(
                "trust-anchor: {} is not registered",
                enforcement.delegator
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::digest::Digest,
        invocation::Action,
        principal::identifier::Identifier,
        registry::MemoryTrustRegistry,
    };
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_follows_live_registry() {
        let controller = Identifier::derive("controller");
        let anchor = Identifier::derive("anchor");
        let registry = Rc::new(RefCell::new(MemoryTrustRegistry::new(controller)));
        let enforcer = TrustAnchorEnforcer::new(registry.clone());

        let action = Action::new(Identifier::derive("target"), vec![], 0);
        let enforcement = Enforcement {
            action: &action,
            delegation_hash: Digest::zero(),
            delegate: Identifier::derive("bob"),
            delegator: anchor,
        };

        assert!(enforcer.pre_enforce(&[], &enforcement).is_err());

        registry
            .borrow_mut()
            .add_trust_anchor(controller, anchor)
            .unwrap();
        assert!(enforcer.pre_enforce(&[], &enforcement).is_ok());
    }
}
