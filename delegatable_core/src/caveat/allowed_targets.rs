//! Restrict a delegation to a set of targets.

use super::{CaveatEnforcer, CaveatRejection, Enforcement};
use crate::principal::identifier::Identifier;

/// Allows an action iff its target appears in the terms.
///
/// Terms are a concatenation of 32-byte identities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllowedTargetsEnforcer;

impl AllowedTargetsEnforcer {
    pub fn terms(targets: &[Identifier]) -> Vec<u8> {
        targets.iter().flat_map(|t| t.to_bytes()).collect()
    }
}

impl CaveatEnforcer for AllowedTargetsEnforcer {
    fn pre_enforce(&self, terms: &[u8], enforcement: &Enforcement<'_>) -> Result<(), CaveatRejection> {
        if terms.is_empty() || terms.len() % 32 != 0 {
            return Err(CaveatRejection::new("allowed-targets: malformed terms"));
        }

        let target = enforcement.action.target;
        if terms.chunks_exact(32).any(|allowed| allowed == target.as_slice()) {
            Ok(())
        } else {
            Err(CaveatRejection::new(format!(
                "allowed-targets: {target} not allowed"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::digest::Digest, invocation::Action};

    #[test]
    fn test_targets() {
        let token = Identifier::derive("token");
        let vault = Identifier::derive("vault");
        let terms = AllowedTargetsEnforcer::terms(&[token]);

        for (target, allowed) in [(token, true), (vault, false)] {
            let action = Action::new(target, vec![], 0);
            let result = AllowedTargetsEnforcer.pre_enforce(
                &terms,
                &Enforcement {
                    action: &action,
                    delegation_hash: Digest::zero(),
                    delegate: Identifier::derive("bob"),
                    delegator: Identifier::derive("alice"),
                },
            );
            assert_eq!(result.is_ok(), allowed);
        }
    }
}
