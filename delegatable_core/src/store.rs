//! Content-addressed storage.

pub mod delegation;
