//! Structural hashing of domain-typed messages.
//!
//! A message is hashed as `H(type_hash ‖ field_0 ‖ … ‖ field_n)` where every
//! field is a fixed 32-byte word: scalars are encoded in place, while byte
//! strings, nested structs, and arrays are hashed first and embedded by their
//! hash. Arrays hash each element, then hash the concatenation of the element
//! hashes. The final signing digest additionally binds the domain separator:
//! `H(SEPARATOR ‖ domain_hash ‖ struct_hash)`.

use super::{
    digest::Digest,
    domain_separator::{DomainSeparator, SEPARATOR},
};
use crate::principal::identifier::Identifier;

/// A message type that can be hashed structurally.
pub trait TypedStruct {
    /// The canonical type encoding, e.g. `Caveat(bytes32 enforcer,bytes terms)`.
    ///
    /// Referenced struct types are appended after the primary type, sorted by name.
    const TYPE_ENCODING: &'static str;

    /// Feed each field, in declaration order, to the encoder.
    fn encode_fields(&self, encoder: &mut FieldEncoder);

    fn type_hash() -> blake3::Hash
    where
        Self: Sized,
    {
        blake3::hash(Self::TYPE_ENCODING.as_bytes())
    }

    /// The domain-free hash of this value.
    fn struct_hash(&self) -> blake3::Hash
    where
        Self: Sized,
    {
        let mut encoder = FieldEncoder::new(Self::type_hash());
        self.encode_fields(&mut encoder);
        encoder.finish()
    }
}

/// Accumulates the 32-byte words of a single struct.
#[derive(Debug, Clone)]
pub struct FieldEncoder {
    hasher: blake3::Hasher,
}

impl FieldEncoder {
    fn new(type_hash: blake3::Hash) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(type_hash.as_bytes());
        Self { hasher }
    }

    fn word(&mut self, word: &[u8; 32]) {
        self.hasher.update(word);
    }

    pub fn identifier(&mut self, id: &Identifier) {
        self.word(id.as_bytes());
    }

    pub fn digest<T>(&mut self, digest: &Digest<T>) {
        self.word(digest.as_bytes());
    }

    pub fn uint(&mut self, value: u64) {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        self.word(&word);
    }

    pub fn bool(&mut self, value: bool) {
        self.uint(u64::from(value));
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.word(blake3::hash(bytes).as_bytes());
    }

    pub fn string(&mut self, value: &str) {
        self.bytes(value.as_bytes());
    }

    pub fn structure<S: TypedStruct>(&mut self, value: &S) {
        self.word(value.struct_hash().as_bytes());
    }

    pub fn array<S: TypedStruct>(&mut self, values: &[S]) {
        let mut elements = blake3::Hasher::new();
        for value in values {
            elements.update(value.struct_hash().as_bytes());
        }
        self.word(elements.finalize().as_bytes());
    }

    fn finish(self) -> blake3::Hash {
        self.hasher.finalize()
    }
}

/// Produces domain-bound [`Digest`]s of typed messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedHasher {
    domain: DomainSeparator,
    domain_hash: blake3::Hash,
}

impl TypedHasher {
    pub fn new(domain: DomainSeparator) -> Self {
        let domain_hash = domain.struct_hash();
        Self {
            domain,
            domain_hash,
        }
    }

    pub fn domain(&self) -> &DomainSeparator {
        &self.domain
    }

    /// Hash a message for signing (or for referencing it as a parent).
    ///
    /// # Examples
    ///
    /// ```
    /// # use delegatable_core::{
    /// #     crypto::{domain_separator::DomainSeparator, typed::TypedHasher},
    /// #     delegation::{Caveat, Delegation},
    /// #     crypto::digest::Digest,
    /// #     principal::identifier::Identifier,
    /// # };
    /// let hasher = TypedHasher::new(DomainSeparator::new("Example", "1", 1, Identifier::derive("example")));
    /// let delegation = Delegation::new(Identifier::derive("bob"), Digest::zero(), vec![]);
    /// assert_eq!(hasher.hash(&delegation), hasher.hash(&delegation.clone()));
    /// ```
    pub fn hash<T: TypedStruct>(&self, message: &T) -> Digest<T> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(SEPARATOR);
        hasher.update(self.domain_hash.as_bytes());
        hasher.update(message.struct_hash().as_bytes());
        hasher.finalize().into()
    }
}
