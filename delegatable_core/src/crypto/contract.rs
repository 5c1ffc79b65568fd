//! A threshold account that signs through [`ContractValidator`].

use super::{
    signature::{Signature, SignerKind, EXTERNAL_SIGNATURE_LEN},
    signed::SigningError,
    signer::{memory::MemorySigner, sync_signer::SyncSigner},
    verifier::{ContractValidator, MAGIC_VALUE},
};
use crate::principal::identifier::Identifier;
use std::collections::BTreeSet;
use tracing::debug;

/// A k-of-n account controlled by Ed25519 owners.
///
/// The signature remainder is a concatenation of 64-byte owner signatures
/// over the digest. Each owner counts at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigAccount {
    threshold: usize,
    owners: BTreeSet<Identifier>,
}

impl MultisigAccount {
    /// Create a new account. A `threshold` of zero is raised to one.
    pub fn new<I: IntoIterator<Item = Identifier>>(threshold: usize, owners: I) -> Self {
        Self {
            threshold: threshold.max(1),
            owners: owners.into_iter().collect(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn owners(&self) -> &BTreeSet<Identifier> {
        &self.owners
    }

    fn approvals(&self, digest: &[u8; 32], signature: &[u8]) -> Option<usize> {
        if signature.is_empty() || signature.len() % EXTERNAL_SIGNATURE_LEN != 0 {
            return None;
        }

        let mut approved = BTreeSet::new();
        for chunk in signature.chunks_exact(EXTERNAL_SIGNATURE_LEN) {
            let bytes: [u8; EXTERNAL_SIGNATURE_LEN] = chunk.try_into().ok()?;
            let sig = ed25519_dalek::Signature::from_bytes(&bytes);

            let signer = self.owners.iter().find(|owner| {
                !approved.contains(*owner)
                    && owner
                        .to_verifying_key()
                        .is_ok_and(|key| key.verify_strict(digest, &sig).is_ok())
            })?;

            approved.insert(*signer);
        }

        Some(approved.len())
    }
}

impl ContractValidator for MultisigAccount {
    fn is_valid_signature(&self, digest: &[u8; 32], signature: &[u8]) -> [u8; 4] {
        match self.approvals(digest, signature) {
            Some(count) if count >= self.threshold => MAGIC_VALUE,
            other => {
                debug!(approvals = ?other, threshold = self.threshold, "multisig rejected");
                [0u8; 4]
            }
        }
    }
}

/// Signs on behalf of a [`MultisigAccount`] with some of its owners' keys.
#[derive(Debug, Clone)]
pub struct MultisigSigner {
    pub account: Identifier,
    pub keys: Vec<MemorySigner>,
}

impl SyncSigner for MultisigSigner {
    fn id(&self) -> Identifier {
        self.account
    }

    fn kind(&self) -> SignerKind {
        SignerKind::Contract
    }

    fn try_sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SigningError> {
        let mut inner = Vec::with_capacity(self.keys.len() * EXTERNAL_SIGNATURE_LEN);
        for key in &self.keys {
            inner.extend_from_slice(key.try_sign_digest(digest)?.as_slice());
        }

        Ok(Signature::for_contract(self.account, &inner))
    }
}
