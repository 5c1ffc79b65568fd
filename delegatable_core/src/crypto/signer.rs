//! Signing keys and helpers.

pub mod memory;
pub mod sync_signer;
