//! In-memory signer.

use super::sync_signer::SyncSigner;
use crate::{
    crypto::{
        signature::{Signature, SignerKind},
        signed::SigningError,
    },
    principal::identifier::Identifier,
};
use dupe::Dupe;
use ed25519_dalek::Signer;
use std::hash::Hash;
use tracing::instrument;

/// An in-memory signer.
///
/// This signer is backed by an in-memory Ed25519 signing key.
///
/// <div class="warning">
///
/// While very convenient, an in-memory signing key can be leaked.
/// Production deployments should sign with a non-extractable key
/// behind their own [`SyncSigner`] implementation.
///
/// </div>
#[derive(Debug, Clone)]
pub struct MemorySigner(
    /// Raw underlying Ed25519 signing key.
    pub ed25519_dalek::SigningKey,
);

impl MemorySigner {
    /// Randomly generates a new in-memory signer.
    ///
    /// # Arguments
    ///
    /// * `csprng` - A cryptographically secure random number generator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use delegatable_core::crypto::signer::{memory::MemorySigner, sync_signer::SyncSigner};
    /// let signer = MemorySigner::generate(&mut rand::rngs::OsRng);
    /// assert_eq!(signer.id().as_bytes(), signer.verifying_key().as_bytes());
    /// ```
    pub fn generate<R: rand::CryptoRng + rand::RngCore>(csprng: &mut R) -> Self {
        Self(ed25519_dalek::SigningKey::generate(csprng))
    }

    /// The public half of the key. Its bytes are this signer's [`Identifier`].
    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.0.verifying_key()
    }
}

impl SyncSigner for MemorySigner {
    fn id(&self) -> Identifier {
        self.verifying_key().into()
    }

    fn kind(&self) -> SignerKind {
        SignerKind::External
    }

    #[instrument(skip_all, fields(signer = %self.id()))]
    fn try_sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SigningError> {
        Ok(self.0.try_sign(digest)?.into())
    }
}

impl Hash for MemorySigner {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.verifying_key().hash(state);
    }
}

impl Dupe for MemorySigner {
    fn dupe(&self) -> Self {
        Self(self.0.clone())
    }
}

impl PartialEq for MemorySigner {
    fn eq(&self, other: &Self) -> bool {
        self.verifying_key() == other.verifying_key()
    }
}

impl Eq for MemorySigner {}

impl From<ed25519_dalek::SigningKey> for MemorySigner {
    fn from(key: ed25519_dalek::SigningKey) -> Self {
        Self(key)
    }
}
