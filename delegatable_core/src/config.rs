//! Deployment configuration.

use crate::{
    chain::MAX_CHAIN_LENGTH, crypto::domain_separator::DomainSeparator,
    principal::identifier::Identifier,
};
use serde::{Deserialize, Serialize};

/// Everything that distinguishes one deployment from another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Config {
    /// Bound into every signed digest.
    pub domain: DomainSeparator,

    /// Longest accepted delegation chain.
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,
}

fn default_max_chain_length() -> usize {
    MAX_CHAIN_LENGTH
}

impl Config {
    pub fn new<N: ToString, V: ToString>(
        name: N,
        version: V,
        chain_id: u64,
        verifying_contract: Identifier,
    ) -> Self {
        Self {
            domain: DomainSeparator::new(name, version, chain_id, verifying_contract),
            max_chain_length: MAX_CHAIN_LENGTH,
        }
    }

    pub fn with_max_chain_length(mut self, max_chain_length: usize) -> Self {
        self.max_chain_length = max_chain_length;
        self
    }
}

impl From<DomainSeparator> for Config {
    fn from(domain: DomainSeparator) -> Self {
        Self {
            domain,
            max_chain_length: MAX_CHAIN_LENGTH,
        }
    }
}
