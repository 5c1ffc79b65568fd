//! Cryptographic primitives, wrappers, and utilities.

pub mod contract;
pub mod digest;
pub mod domain_separator;
pub mod signature;
pub mod signed;
pub mod signer;
pub mod typed;
pub mod verifier;
