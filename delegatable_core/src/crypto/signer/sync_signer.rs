use crate::{
    crypto::{
        signature::{Signature, SignerKind},
        signed::{Signed, SigningError},
        typed::{TypedHasher, TypedStruct},
    },
    principal::identifier::Identifier,
};
use ed25519_dalek::Signer;

/// Something that can sign typed digests on behalf of an [`Identifier`].
pub trait SyncSigner {
    /// The identity signatures are attributed to.
    fn id(&self) -> Identifier;

    /// How verifiers must check this signer's signatures.
    fn kind(&self) -> SignerKind;

    fn try_sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SigningError>;

    fn try_sign_typed<T: TypedStruct>(
        &self,
        hasher: &TypedHasher,
        payload: T,
    ) -> Result<Signed<T>, SigningError>
    where
        Self: Sized,
    {
        let digest = hasher.hash(&payload);

        Ok(Signed {
            payload,
            issuer: self.id(),
            kind: self.kind(),
            signature: self.try_sign_digest(digest.as_bytes())?,
        })
    }
}

impl SyncSigner for ed25519_dalek::SigningKey {
    fn id(&self) -> Identifier {
        self.verifying_key().into()
    }

    fn kind(&self) -> SignerKind {
        SignerKind::External
    }

    fn try_sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SigningError> {
        Ok(self.try_sign(digest)?.into())
    }
}
