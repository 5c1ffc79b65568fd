//! Cap the resource budget an action may request.

use super::{CaveatEnforcer, CaveatRejection, Enforcement};

/// Allows an action iff its `resource_budget` is at most the limit in the terms.
///
/// Terms are the limit as an 8-byte big-endian integer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBudgetEnforcer;

impl ResourceBudgetEnforcer {
    pub fn terms(limit: u64) -> Vec<u8> {
        limit.to_be_bytes().to_vec()
    }
}

impl CaveatEnforcer for ResourceBudgetEnforcer {
    fn pre_enforce(&self, terms: &[u8], enforcement: &Enforcement<'_>) -> Result<(), CaveatRejection> {
        let limit = <[u8; 8]>::try_from(terms)
            .map(u64::from_be_bytes)
            .map_err(|_| CaveatRejection::new("resource-budget: malformed terms"))?;

        let requested = enforcement.action.resource_budget;
        if requested <= limit {
            Ok(())
        } else {
            Err(CaveatRejection::new(format!(
                "resource-budget: requested {requested} exceeds {limit}"
            )))
        }
    }
}
