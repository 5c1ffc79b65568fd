//! Identities of the parties taking part in a delegation.

pub mod identifier;
