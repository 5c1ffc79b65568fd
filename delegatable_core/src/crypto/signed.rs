//! Wrap typed messages in signatures.

use super::{
    digest::Digest,
    signature::{Signature, SignerKind},
    typed::{TypedHasher, TypedStruct},
    verifier::{SignatureVerifier, VerificationError},
};
use crate::principal::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;
use tracing::instrument;

/// A wrapper to add a signature and signer information to a typed payload.
///
/// The signature is over the domain-bound [`TypedHasher`] digest of the
/// payload, not over the serialized bytes.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signed<T> {
    /// The data that was signed.
    pub(crate) payload: T,

    /// The party claiming to have signed the payload.
    pub(crate) issuer: Identifier,

    /// Whether `issuer` is a key or a contract.
    pub(crate) kind: SignerKind,

    /// The signature over the typed digest of `payload`.
    pub(crate) signature: Signature,
}

impl<T: TypedStruct> Signed<T> {
    /// Assemble a signed value from parts, e.g. after receiving it over the wire.
    pub fn from_parts(payload: T, issuer: Identifier, kind: SignerKind, signature: Signature) -> Self {
        Self {
            payload,
            issuer,
            kind,
            signature,
        }
    }

    /// Getter for the payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Getter for the [`Identifier`] of the claimed signer.
    pub fn issuer(&self) -> Identifier {
        self.issuer
    }

    pub fn kind(&self) -> SignerKind {
        self.kind
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The domain-bound digest of the payload.
    pub fn digest(&self, hasher: &TypedHasher) -> Digest<T> {
        hasher.hash(&self.payload)
    }

    /// Verify the signature against the issuer, returning the payload digest.
    #[instrument(skip_all, fields(issuer = %self.issuer))]
    pub fn try_verify(
        &self,
        hasher: &TypedHasher,
        verifier: &SignatureVerifier<'_>,
    ) -> Result<Digest<T>, VerificationError> {
        let digest = self.digest(hasher);
        verifier.verify(&digest, &self.signature, self.issuer, self.kind)?;
        Ok(digest)
    }

    /// Swap in a new payload, keeping the signature.
    ///
    /// This invalidates the signature unless the payload hashes identically,
    /// which makes it handy for tamper tests.
    pub fn map<F: FnOnce(T) -> T>(self, f: F) -> Self {
        Signed {
            payload: f(self.payload),
            issuer: self.issuer,
            kind: self.kind,
            signature: self.signature,
        }
    }
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Signing failed: {0}")]
    SigningFailed(#[from] ed25519_dalek::SignatureError),
}
