//! Restrict a delegation to a set of method selectors.

use super::{CaveatEnforcer, CaveatRejection, Enforcement};
use crate::invocation::{selector, SELECTOR_LEN};

/// Allows an action iff its payload selector appears in the terms.
///
/// Terms are a concatenation of 4-byte selectors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllowedMethodsEnforcer;

impl AllowedMethodsEnforcer {
    /// Build terms from method signatures.
    ///
    /// # Examples
    ///
    /// ```
    /// # use delegatable_core::caveat::allowed_methods::AllowedMethodsEnforcer;
    /// let terms = AllowedMethodsEnforcer::terms(&["transfer(bytes32,uint64)", "approve(bytes32,uint64)"]);
    /// assert_eq!(terms.len(), 8);
    /// ```
    pub fn terms(methods: &[&str]) -> Vec<u8> {
        methods.iter().flat_map(|m| selector(m)).collect()
    }
}

impl CaveatEnforcer for AllowedMethodsEnforcer {
    fn pre_enforce(&self, terms: &[u8], enforcement: &Enforcement<'_>) -> Result<(), CaveatRejection> {
        if terms.is_empty() || terms.len() % SELECTOR_LEN != 0 {
            return Err(CaveatRejection::new("allowed-methods: malformed terms"));
        }

        let called = enforcement
            .action
            .selector()
            .ok_or_else(|| CaveatRejection::new("allowed-methods: payload has no selector"))?;

        if terms.chunks_exact(SELECTOR_LEN).any(|allowed| allowed == called) {
            Ok(())
        } else {
            Err(CaveatRejection::new("allowed-methods: method not allowed"))
        }
    }
}
