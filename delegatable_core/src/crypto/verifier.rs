//! Signature verification for both key pairs and contract signers.

use super::{
    digest::Digest,
    signature::{Signature, SignerKind, EXTERNAL_SIGNATURE_LEN},
};
use crate::principal::identifier::Identifier;
use dupe::Dupe;
use std::{collections::HashMap, fmt, rc::Rc};
use thiserror::Error;
use tracing::{instrument, warn};

/// The value a [`ContractValidator`] returns to accept a signature.
pub const MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// The validation entry point of a contract signer.
///
/// A contract can implement arbitrary policy here (multisig, thresholds,
/// social recovery) while presenting a uniform signature to the chain.
pub trait ContractValidator: fmt::Debug {
    /// Return [`MAGIC_VALUE`] iff `signature` is acceptable for `digest`.
    fn is_valid_signature(&self, digest: &[u8; 32], signature: &[u8]) -> [u8; 4];
}

/// Contract validators by their identity.
#[derive(Debug, Default, Clone)]
pub struct ContractRegistry(HashMap<Identifier, Rc<dyn ContractValidator>>);

impl ContractRegistry {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Register (or replace) the validator for a contract identity.
    pub fn register(&mut self, contract: Identifier, validator: Rc<dyn ContractValidator>) {
        self.0.insert(contract, validator);
    }

    pub fn get(&self, contract: &Identifier) -> Option<Rc<dyn ContractValidator>> {
        self.0.get(contract).map(Rc::clone)
    }

    pub fn contains(&self, contract: &Identifier) -> bool {
        self.0.contains_key(contract)
    }
}

/// Checks that a digest was signed by a claimed [`Identifier`].
#[derive(Debug, Clone, Copy, Dupe)]
pub struct SignatureVerifier<'a> {
    contracts: &'a ContractRegistry,
}

impl<'a> SignatureVerifier<'a> {
    pub fn new(contracts: &'a ContractRegistry) -> Self {
        Self { contracts }
    }

    /// Verify `signature` over `digest` as coming from `claimed`.
    ///
    /// Key pair signatures must be exactly 64 bytes and verify (strictly)
    /// under the key whose bytes are `claimed`. Contract signatures must name
    /// `claimed` in their first 32 bytes, and that contract's validator must
    /// answer [`MAGIC_VALUE`] for the remainder.
    #[instrument(skip_all, fields(%claimed, ?kind))]
    pub fn verify<T>(
        &self,
        digest: &Digest<T>,
        signature: &Signature,
        claimed: Identifier,
        kind: SignerKind,
    ) -> Result<(), VerificationError> {
        if claimed.is_zero() {
            return Err(VerificationError::ZeroSigner);
        }

        let result = match kind {
            SignerKind::External => Self::verify_external(digest, signature, claimed),
            SignerKind::Contract => self.verify_contract(digest, signature, claimed),
        };

        if let Err(err) = &result {
            warn!(%err, "signature rejected");
        }

        result
    }

    fn verify_external<T>(
        digest: &Digest<T>,
        signature: &Signature,
        claimed: Identifier,
    ) -> Result<(), VerificationError> {
        let bytes: [u8; EXTERNAL_SIGNATURE_LEN] =
            signature
                .as_slice()
                .try_into()
                .map_err(|_| VerificationError::MalformedSignature {
                    expected: EXTERNAL_SIGNATURE_LEN,
                    actual: signature.len(),
                })?;

        let key = claimed
            .to_verifying_key()
            .map_err(|_| VerificationError::NotAKey(claimed))?;

        let sig = ed25519_dalek::Signature::from_bytes(&bytes);
        key.verify_strict(digest.as_slice(), &sig)
            .map_err(VerificationError::SignatureVerificationFailed)
    }

    fn verify_contract<T>(
        &self,
        digest: &Digest<T>,
        signature: &Signature,
        claimed: Identifier,
    ) -> Result<(), VerificationError> {
        let (contract, remainder) =
            signature
                .split_contract()
                .ok_or(VerificationError::MalformedSignature {
                    expected: 32,
                    actual: signature.len(),
                })?;

        if contract != claimed {
            return Err(VerificationError::ContractMismatch { claimed, contract });
        }

        let validator = self
            .contracts
            .get(&contract)
            .ok_or(VerificationError::UnknownContract(contract))?;

        let answer = validator.is_valid_signature(digest.as_bytes(), remainder);
        if answer != MAGIC_VALUE {
            return Err(VerificationError::ContractRejected { contract, answer });
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(#[source] signature::Error),

    #[error("Malformed signature: expected {expected} bytes, got {actual}")]
    MalformedSignature { expected: usize, actual: usize },

    #[error("The zero identity cannot sign")]
    ZeroSigner,

    #[error("{0} is not a verifying key")]
    NotAKey(Identifier),

    #[error("Expected signer {expected}, but the signature is attributed to {actual}")]
    UnexpectedSigner {
        expected: Identifier,
        actual: Identifier,
    },

    #[error("Signature names contract {contract}, but the claimed signer is {claimed}")]
    ContractMismatch {
        claimed: Identifier,
        contract: Identifier,
    },

    #[error("No validator is registered for contract {0}")]
    UnknownContract(Identifier),

    #[error("Contract {contract} answered {answer:02x?} instead of the magic value")]
    ContractRejected { contract: Identifier, answer: [u8; 4] },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signer::{memory::MemorySigner, sync_signer::SyncSigner};
    use std::cell::Cell;

    #[derive(Debug)]
    struct Fixed {
        answer: [u8; 4],
        calls: Cell<usize>,
    }

    impl ContractValidator for Fixed {
        fn is_valid_signature(&self, _digest: &[u8; 32], _signature: &[u8]) -> [u8; 4] {
            self.calls.set(self.calls.get() + 1);
            self.answer
        }
    }

    fn digest() -> Digest<()> {
        Digest::from(blake3::hash(b"some typed message"))
    }

    #[test]
    fn test_external_signature() {
        let registry = ContractRegistry::new();
        let verifier = SignatureVerifier::new(&registry);
        let alice = MemorySigner::generate(&mut rand::rngs::OsRng);
        let sig = alice.try_sign_digest(digest().as_bytes()).unwrap();

        assert!(verifier
            .verify(&digest(), &sig, alice.id(), SignerKind::External)
            .is_ok());
    }

    #[test]
    fn test_external_signature_wrong_signer() {
        let registry = ContractRegistry::new();
        let verifier = SignatureVerifier::new(&registry);
        let alice = MemorySigner::generate(&mut rand::rngs::OsRng);
        let bob = MemorySigner::generate(&mut rand::rngs::OsRng);
        let sig = alice.try_sign_digest(digest().as_bytes()).unwrap();

        assert!(matches!(
            verifier.verify(&digest(), &sig, bob.verifying_key().into(), SignerKind::External),
            Err(VerificationError::SignatureVerificationFailed(_))
        ));
    }

    #[test]
    fn test_external_signature_wrong_digest() {
        let registry = ContractRegistry::new();
        let verifier = SignatureVerifier::new(&registry);
        let alice = MemorySigner::generate(&mut rand::rngs::OsRng);
        let sig = alice.try_sign_digest(digest().as_bytes()).unwrap();
        let other: Digest<()> = Digest::from(blake3::hash(b"another message"));

        assert!(verifier
            .verify(&other, &sig, alice.id(), SignerKind::External)
            .is_err());
    }

    #[test]
    fn test_malformed_length() {
        let registry = ContractRegistry::new();
        let verifier = SignatureVerifier::new(&registry);
        let alice = MemorySigner::generate(&mut rand::rngs::OsRng);
        let mut bytes = alice
            .try_sign_digest(digest().as_bytes())
            .unwrap()
            .as_slice()
            .to_vec();
        bytes.push(0);

        assert!(matches!(
            verifier.verify(&digest(), &Signature::from(bytes), alice.id(), SignerKind::External),
            Err(VerificationError::MalformedSignature {
                expected: 64,
                actual: 65
            })
        ));
    }

    #[test]
    fn test_zero_signer() {
        let registry = ContractRegistry::new();
        let verifier = SignatureVerifier::new(&registry);

        assert!(matches!(
            verifier.verify(
                &digest(),
                &Signature::from(vec![0u8; 64]),
                Identifier::ZERO,
                SignerKind::External
            ),
            Err(VerificationError::ZeroSigner)
        ));
    }

    #[test]
    fn test_contract_magic_value() {
        let wallet = Identifier::derive("wallet");
        let validator = Rc::new(Fixed {
            answer: MAGIC_VALUE,
            calls: Cell::new(0),
        });

        let mut registry = ContractRegistry::new();
        registry.register(wallet, validator.clone());
        let verifier = SignatureVerifier::new(&registry);

        let sig = Signature::for_contract(wallet, b"anything the wallet likes");
        assert!(verifier
            .verify(&digest(), &sig, wallet, SignerKind::Contract)
            .is_ok());
        assert_eq!(validator.calls.get(), 1);
    }

    #[test]
    fn test_contract_other_value() {
        let wallet = Identifier::derive("wallet");
        let mut registry = ContractRegistry::new();
        registry.register(
            wallet,
            Rc::new(Fixed {
                answer: [0x16, 0x26, 0xba, 0x7f],
                calls: Cell::new(0),
            }),
        );
        let verifier = SignatureVerifier::new(&registry);

        let sig = Signature::for_contract(wallet, b"sig");
        assert!(matches!(
            verifier.verify(&digest(), &sig, wallet, SignerKind::Contract),
            Err(VerificationError::ContractRejected { .. })
        ));
    }

    #[test]
    fn test_contract_prefix_must_match_claimed() {
        let wallet = Identifier::derive("wallet");
        let imposter = Identifier::derive("imposter");
        let validator = Rc::new(Fixed {
            answer: MAGIC_VALUE,
            calls: Cell::new(0),
        });

        let mut registry = ContractRegistry::new();
        registry.register(imposter, validator.clone());
        let verifier = SignatureVerifier::new(&registry);

        let sig = Signature::for_contract(imposter, b"sig");
        assert!(matches!(
            verifier.verify(&digest(), &sig, wallet, SignerKind::Contract),
            Err(VerificationError::ContractMismatch { .. })
        ));
        assert_eq!(validator.calls.get(), 0);
    }

    #[test]
    fn test_unknown_contract() {
        let registry = ContractRegistry::new();
        let verifier = SignatureVerifier::new(&registry);
        let wallet = Identifier::derive("wallet");

        assert!(matches!(
            verifier.verify(
                &digest(),
                &Signature::for_contract(wallet, b"sig"),
                wallet,
                SignerKind::Contract
            ),
            Err(VerificationError::UnknownContract(_))
        ));
    }
}
