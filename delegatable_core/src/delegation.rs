//! Signed grants of (possibly restricted) authority.

use crate::{
    crypto::{
        digest::Digest,
        signed::Signed,
        typed::{FieldEncoder, TypedStruct},
    },
    principal::identifier::Identifier,
};
use serde::{Deserialize, Serialize};

/// A restriction attached to a [`Delegation`].
///
/// `terms` are opaque to the core and interpreted only by the enforcer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Caveat {
    pub enforcer: Identifier,
    pub terms: Vec<u8>,
}

impl Caveat {
    pub fn new(enforcer: Identifier, terms: Vec<u8>) -> Self {
        Self { enforcer, terms }
    }
}

impl TypedStruct for Caveat {
    const TYPE_ENCODING: &'static str = "Caveat(bytes32 enforcer,bytes terms)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.identifier(&self.enforcer);
        encoder.bytes(&self.terms);
    }
}

/// A grant of authority from the signer to `delegate`.
///
/// `authority` links to the parent by the typed digest of the parent's
/// [`SignedDelegation`], so it pins the parent's issuer and signature as well
/// as its content. It is the zero digest when the signer acts on their own
/// authority.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Delegation {
    pub delegate: Identifier,
    pub authority: Digest<SignedDelegation>,
    pub caveats: Vec<Caveat>,
}

impl Delegation {
    pub fn new(delegate: Identifier, authority: Digest<SignedDelegation>, caveats: Vec<Caveat>) -> Self {
        Self {
            delegate,
            authority,
            caveats,
        }
    }

    /// A delegation directly from the signer, with no parent.
    pub fn root(delegate: Identifier, caveats: Vec<Caveat>) -> Self {
        Self::new(delegate, Digest::zero(), caveats)
    }

    pub fn is_root(&self) -> bool {
        self.authority.is_zero()
    }
}

impl TypedStruct for Delegation {
    const TYPE_ENCODING: &'static str =
        "Delegation(bytes32 delegate,bytes32 authority,Caveat[] caveats)Caveat(bytes32 enforcer,bytes terms)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.identifier(&self.delegate);
        encoder.digest(&self.authority);
        encoder.array(&self.caveats);
    }
}

/// A [`Delegation`] together with its signer and signature.
pub type SignedDelegation = Signed<Delegation>;

impl TypedStruct for SignedDelegation {
    const TYPE_ENCODING: &'static str = "SignedDelegation(Delegation delegation,bytes32 issuer,bool signerIsContract,bytes signature)Caveat(bytes32 enforcer,bytes terms)Delegation(bytes32 delegate,bytes32 authority,Caveat[] caveats)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.structure(&self.payload);
        encoder.identifier(&self.issuer);
        encoder.bool(self.kind.is_contract());
        encoder.bytes(self.signature.as_slice());
    }
}
