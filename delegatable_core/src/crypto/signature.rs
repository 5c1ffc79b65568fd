//! Raw signature bytes and the kind of party that produced them.

use crate::principal::identifier::Identifier;
use dupe::Dupe;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte length of an externally-owned (Ed25519) signature.
pub const EXTERNAL_SIGNATURE_LEN: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// How a signature must be checked.
#[derive(Debug, Default, Clone, Dupe, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignerKind {
    /// A raw key pair signature over the digest.
    #[default]
    External,

    /// The first 32 bytes name a contract; the rest is handed to its validator.
    Contract,
}

impl SignerKind {
    pub fn is_contract(&self) -> bool {
        matches!(self, SignerKind::Contract)
    }
}

/// Opaque signature bytes.
///
/// The layout depends on the [`SignerKind`]: 64 raw Ed25519 bytes for
/// [`SignerKind::External`], or `contract_id ‖ remainder` for
/// [`SignerKind::Contract`].
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(pub(crate) Vec<u8>);

impl Signature {
    /// Prefix an inner signature with the identity of the contract that validates it.
    pub fn for_contract(contract: Identifier, inner: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(32 + inner.len());
        bytes.extend_from_slice(contract.as_slice());
        bytes.extend_from_slice(inner);
        Self(bytes)
    }

    /// Split a contract signature into its contract identity and remainder.
    pub fn split_contract(&self) -> Option<(Identifier, &[u8])> {
        if self.0.len() < 32 {
            return None;
        }

        let (head, rest) = self.0.split_at(32);
        let contract = Identifier::try_from(head).ok()?;
        Some((contract, rest))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(sig: ed25519_dalek::Signature) -> Self {
        Self(sig.to_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(")?;
        crate::util::hex::bytes_as_hex(&self.0, f)?;
        write!(f, ")")
    }
}
