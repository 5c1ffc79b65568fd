//! Validation of delegation chains.
//!
//! A chain is ordered from the delegation naming the invoker (index 0) to the
//! root delegation (last index). Link `i` must be signed by the delegate of
//! link `i + 1`; the root link is signed by the root authority itself and has
//! a zero `authority`. Every other link's `authority` is the typed digest of
//! the next link as signed, so a parent with the same content but a different
//! issuer does not connect.
//!
//! Validation runs in two passes. The first authenticates every signature and
//! every hash link. Only a fully authenticated chain reaches the second pass,
//! which runs caveats hop by hop from the invoker's link towards the root.

use crate::{
    caveat::{BoundCaveat, CaveatDispatcher, DispatchError, Enforcement},
    crypto::{
        digest::Digest,
        typed::TypedHasher,
        verifier::{SignatureVerifier, VerificationError},
    },
    delegation::SignedDelegation,
    invocation::Action,
    principal::identifier::Identifier,
};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// The longest chain accepted by default.
pub const MAX_CHAIN_LENGTH: usize = 20;

/// What a valid chain grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// The identity whose authority is being exercised.
    pub root: Identifier,

    /// Every caveat that was checked, in evaluation order.
    pub caveats: Vec<BoundCaveat>,
}

/// Walks chains against a domain, a set of contract validators, and a set of
/// caveat enforcers.
#[derive(Debug, Clone, Copy)]
pub struct ChainValidator<'a> {
    hasher: &'a TypedHasher,
    verifier: SignatureVerifier<'a>,
    dispatcher: &'a CaveatDispatcher,
    max_len: usize,
}

impl<'a> ChainValidator<'a> {
    pub fn new(
        hasher: &'a TypedHasher,
        verifier: SignatureVerifier<'a>,
        dispatcher: &'a CaveatDispatcher,
        max_len: usize,
    ) -> Self {
        Self {
            hasher,
            verifier,
            dispatcher,
            max_len,
        }
    }

    /// Check that `chain` lets `invoker` perform `action`.
    #[instrument(skip_all, fields(%invoker, len = chain.len()))]
    pub fn validate(
        &self,
        invoker: Identifier,
        action: &Action,
        chain: &[SignedDelegation],
    ) -> Result<Authorization, ChainError> {
        let result = self.authenticate(invoker, chain).and_then(|hashes| {
            let caveats = self.enforce(action, chain, &hashes)?;
            let root = chain.last().map(|link| link.issuer()).unwrap_or(invoker);
            Ok(Authorization { root, caveats })
        });

        match &result {
            Ok(auth) => debug!(root = %auth.root, "chain authorized"),
            Err(err) => warn!(%err, "chain rejected"),
        }

        result
    }

    /// First pass: signatures and hash links. Returns each signed link's digest.
    fn authenticate(
        &self,
        invoker: Identifier,
        chain: &[SignedDelegation],
    ) -> Result<Vec<Digest<SignedDelegation>>, ChainError> {
        if chain.len() > self.max_len {
            return Err(ChainError::ChainTooLong {
                len: chain.len(),
                max: self.max_len,
            });
        }

        let Some(leaf) = chain.first() else {
            return Ok(vec![]);
        };

        if leaf.payload().delegate != invoker {
            return Err(ChainError::BrokenLink {
                index: 0,
                fault: LinkFault::DelegateMismatch {
                    expected: invoker,
                    actual: leaf.payload().delegate,
                },
            });
        }

        let hashes: Vec<Digest<SignedDelegation>> =
            chain.iter().map(|link| self.hasher.hash(link)).collect();

        for (index, link) in chain.iter().enumerate() {
            let parent = chain.get(index + 1);

            let expected_signer = parent.map(|p| p.payload().delegate).unwrap_or(link.issuer());
            if link.issuer() != expected_signer {
                return Err(ChainError::InvalidSignature {
                    index,
                    source: VerificationError::UnexpectedSigner {
                        expected: expected_signer,
                        actual: link.issuer(),
                    },
                });
            }

            self.verifier
                .verify(
                    &self.hasher.hash(link.payload()),
                    link.signature(),
                    expected_signer,
                    link.kind(),
                )
                .map_err(|source| ChainError::InvalidSignature { index, source })?;

            let authority = link.payload().authority;
            match hashes.get(index + 1) {
                Some(parent_hash) if authority != *parent_hash => {
                    return Err(ChainError::BrokenLink {
                        index,
                        fault: LinkFault::ParentHashMismatch {
                            expected: *parent_hash,
                            actual: authority,
                        },
                    });
                }
                None if !authority.is_zero() => {
                    return Err(ChainError::BrokenLink {
                        index,
                        fault: LinkFault::RootNotZero(authority),
                    });
                }
                _ => {}
            }
        }

        Ok(hashes)
    }

    /// Second pass: caveats, invoker's link first, each link in declared order.
    fn enforce(
        &self,
        action: &Action,
        chain: &[SignedDelegation],
        hashes: &[Digest<SignedDelegation>],
    ) -> Result<Vec<BoundCaveat>, ChainError> {
        let mut bound = Vec::new();

        for (index, (link, hash)) in chain.iter().zip(hashes).enumerate() {
            let enforcement = Enforcement {
                action,
                delegation_hash: *hash,
                delegate: link.payload().delegate,
                delegator: link.issuer(),
            };

            self.dispatcher
                .enforce_all(&link.payload().caveats, &enforcement)
                .map_err(|(caveat, source)| ChainError::CaveatRejected {
                    index,
                    caveat,
                    source,
                })?;

            bound.extend(link.payload().caveats.iter().enumerate().map(|(i, caveat)| BoundCaveat {
                caveat: caveat.clone(),
                link: index,
                index: i,
                delegation_hash: *hash,
                delegate: enforcement.delegate,
                delegator: enforcement.delegator,
            }));
        }

        Ok(bound)
    }
}

/// How two adjacent links fail to connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkFault {
    #[error("delegate is {actual}, expected {expected}")]
    DelegateMismatch {
        expected: Identifier,
        actual: Identifier,
    },

    #[error("authority is {actual}, expected parent digest {expected}")]
    ParentHashMismatch {
        expected: Digest<SignedDelegation>,
        actual: Digest<SignedDelegation>,
    },

    #[error("root delegation has non-zero authority {0}")]
    RootNotZero(Digest<SignedDelegation>),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid signature on link {index}: {source}")]
    InvalidSignature {
        index: usize,
        #[source]
        source: VerificationError,
    },

    #[error("Broken link at {index}: {fault}")]
    BrokenLink {
        index: usize,
        #[source]
        fault: LinkFault,
    },

    #[error("Caveat {caveat} on link {index} rejected the action: {source}")]
    CaveatRejected {
        index: usize,
        caveat: usize,
        #[source]
        source: DispatchError,
    },

    #[error("Chain of {len} links exceeds the maximum of {max}")]
    ChainTooLong { len: usize, max: usize },
}
