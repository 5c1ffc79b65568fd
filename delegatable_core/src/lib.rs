#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_debug_implementations,
    future_incompatible,
    let_underscore,
//     missing_docs,
    rust_2021_compatibility,
    nonstandard_style
)]
#![deny(unreachable_pub)]

pub mod caveat;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod delegation;
pub mod error;
pub mod executor;
pub mod invocation;
pub mod listener;
pub mod principal;
pub mod registry;
pub mod replay;
pub mod store;
pub mod target;
pub mod transact;
pub mod util;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
