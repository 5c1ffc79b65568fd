//! Helpers for working with hashes.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// A [`blake3::Hash`] tagged with which type it is a hash of.
///
/// This makes it easy to trace the origin type of hash identifiers flowing through the system.
/// Digests are produced by a [`TypedHasher`], which binds both the type and the
/// deployment domain into the hash.
///
/// [`TypedHasher`]: crate::crypto::typed::TypedHasher
#[derive(Debug)]
pub struct Digest<T> {
    /// The underlying, unparameterized [`blake3::Hash`].
    pub raw: blake3::Hash,

    /// A phantom parameter to retain the type of the preimage.
    pub(crate) _phantom: PhantomData<fn() -> T>,
}

impl<T> Digest<T> {
    /// The all-zero digest.
    ///
    /// Used as the `authority` of a root delegation, meaning "no parent".
    ///
    /// # Examples
    ///
    /// ```
    /// # use delegatable_core::{crypto::digest::Digest, delegation::Delegation};
    /// let root: Digest<Delegation> = Digest::zero();
    /// assert!(root.is_zero());
    /// assert_eq!(root.as_slice(), &[0u8; 32]);
    /// ```
    pub fn zero() -> Self {
        Self::from([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.raw.as_bytes() == &[0u8; 32]
    }

    /// Get the hash as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    /// Get the hash as a fixed-size byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.raw.as_bytes()
    }

    /// Forget the preimage type. Only for digests that are used as opaque
    /// fields inside another typed message.
    pub(crate) fn coerce<U>(&self) -> Digest<U> {
        Digest {
            raw: self.raw,
            _phantom: PhantomData,
        }
    }
}

impl<T> Serialize for Digest<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.raw.as_bytes().serialize(serializer)
    }
}

impl<'de, T> serde::Deserialize<'de> for Digest<T> {
    fn deserialize<D>(deserializer: D) -> Result<Digest<T>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes: [u8; 32] = Deserialize::deserialize(deserializer)?;
        Ok(Digest::from(bytes))
    }
}

impl<T> fmt::Display for Digest<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Digest({})", self.raw.to_hex())
    }
}

impl<T> Copy for Digest<T> {}

impl<T> Clone for Digest<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Digest<T> {
    fn eq(&self, other: &Self) -> bool {
        // blake3::Hash equality is constant-time
        self.raw == other.raw
    }
}

impl<T> Eq for Digest<T> {}

impl<T> PartialOrd for Digest<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Digest<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.as_bytes().cmp(other.raw.as_bytes())
    }
}

impl<T> Hash for Digest<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

impl<T> From<blake3::Hash> for Digest<T> {
    fn from(hash: blake3::Hash) -> Self {
        Self {
            raw: hash,
            _phantom: PhantomData,
        }
    }
}

impl<T> From<[u8; 32]> for Digest<T> {
    fn from(bytes: [u8; 32]) -> Self {
        Self {
            raw: blake3::Hash::from(bytes),
            _phantom: PhantomData,
        }
    }
}

impl<T> From<Digest<T>> for [u8; 32] {
    fn from(hash: Digest<T>) -> [u8; 32] {
        hash.raw.into()
    }
}
