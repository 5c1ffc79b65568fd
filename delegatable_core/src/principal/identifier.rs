//! The universally unique identifier of a signer, delegate, enforcer, or target.

use dupe::Dupe;
use serde::{Deserialize, Serialize};

/// An address-like identity.
///
/// For an externally-owned signer this is the raw bytes of its Ed25519
/// [`VerifyingKey`](ed25519_dalek::VerifyingKey). Contracts, enforcers, and
/// targets use arbitrary 32-byte values (see [`Identifier::derive`]).
///
/// Holding an [`Identifier`] never implies control over it: authority is only
/// ever established by a verified signature.
#[derive(Copy, Clone, Dupe, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier(pub(crate) [u8; 32]);

impl Identifier {
    /// The all-zero identity. Never a valid signer.
    pub const ZERO: Identifier = Identifier([0u8; 32]);

    /// Derive a stable identity from a context string.
    ///
    /// Useful for naming enforcers, contracts, and targets that have no key.
    ///
    /// # Examples
    ///
    /// ```
    /// # use delegatable_core::principal::identifier::Identifier;
    /// let a = Identifier::derive("allowed-methods");
    /// assert_eq!(a, Identifier::derive("allowed-methods"));
    /// assert_ne!(a, Identifier::derive("allowed-targets"));
    /// ```
    pub fn derive(context: &str) -> Self {
        Self(blake3::derive_key("delegatable identifier v1", context.as_bytes()))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lower the [`Identifier`] to an owned binary representation.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Lower the [`Identifier`] to a borrowed binary representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the underlying bytes as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Interpret the identity as an Ed25519 verifying key.
    ///
    /// Fails if the bytes are not a valid curve point. Derived identities may
    /// still decode, but nobody holds a matching secret key.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, ed25519_dalek::SignatureError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
    }
}

impl std::fmt::LowerHex for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        crate::util::hex::bytes_as_hex(&self.0, f)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:#x}", self)
    }
}

impl std::fmt::Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Identifier({})", self)
    }
}

impl From<[u8; 32]> for Identifier {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Identifier> for [u8; 32] {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl From<ed25519_dalek::VerifyingKey> for Identifier {
    fn from(verifying_key: ed25519_dalek::VerifyingKey) -> Self {
        Self(verifying_key.to_bytes())
    }
}

impl From<&ed25519_dalek::VerifyingKey> for Identifier {
    fn from(verifying_key: &ed25519_dalek::VerifyingKey) -> Self {
        Self(verifying_key.to_bytes())
    }
}

impl From<ed25519_dalek::SigningKey> for Identifier {
    fn from(sk: ed25519_dalek::SigningKey) -> Self {
        sk.verifying_key().into()
    }
}

impl TryFrom<&[u8]> for Identifier {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(<[u8; 32]>::try_from(bytes)?))
    }
}
