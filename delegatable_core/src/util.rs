//! Miscellaneous helpers.

pub mod hex;
