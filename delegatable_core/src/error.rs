//! Why an outer `invoke` call failed.
//!
//! Every variant is terminal for the whole call: nothing it touched is
//! committed.

use crate::{
    caveat::DispatchError,
    chain::{ChainError, LinkFault},
    crypto::verifier::VerificationError,
    principal::identifier::Identifier,
    replay::StaleNonce,
    target::TargetError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where in the outer call an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Index of the signed batch in the outer call.
    pub batch: usize,

    /// Index of the invocation within that batch, if the error is about one.
    pub invocation: Option<usize>,
}

impl Position {
    pub fn batch(batch: usize) -> Self {
        Self {
            batch,
            invocation: None,
        }
    }

    pub fn invocation(batch: usize, invocation: usize) -> Self {
        Self {
            batch,
            invocation: Some(invocation),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.invocation {
            Some(inv) => write!(f, "batch {}, invocation {}", self.batch, inv),
            None => write!(f, "batch {}", self.batch),
        }
    }
}

/// Before or after the action ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Pre,
    Post,
}

#[derive(Debug, Error)]
pub enum InvokeError {
    /// A batch signature, or a signature on link `link` of an invocation's chain.
    #[error("Invalid signature at {at} (link {link:?}): {source}")]
    InvalidSignature {
        at: Position,
        link: Option<usize>,
        #[source]
        source: VerificationError,
    },

    #[error("Broken link {link} at {at}: {fault}")]
    BrokenLink {
        at: Position,
        link: usize,
        #[source]
        fault: LinkFault,
    },

    #[error("Caveat {caveat} on link {link} rejected the action ({stage:?}) at {at}: {source}")]
    CaveatRejected {
        at: Position,
        link: usize,
        caveat: usize,
        stage: Stage,
        #[source]
        source: DispatchError,
    },

    #[error("Chain of {len} links exceeds the maximum of {max} at {at}")]
    ChainTooLong { at: Position, len: usize, max: usize },

    #[error("Replay rejected at {at}: {source}")]
    StaleNonce {
        at: Position,
        #[source]
        source: StaleNonce,
    },

    #[error("Target execution failed at {at}: {source}")]
    TargetExecutionFailed {
        at: Position,
        #[source]
        source: TargetError,
    },

    #[error("After-invoke hook of {target} rejected the call: {source}")]
    AfterInvokeRejected {
        target: Identifier,
        #[source]
        source: TargetError,
    },
}

/// The kind of an [`InvokeError`], without its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidSignature,
    BrokenLink,
    CaveatRejected,
    ChainTooLong,
    StaleNonce,
    TargetExecutionFailed,
    AfterInvokeRejected,
}

impl InvokeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvokeError::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            InvokeError::BrokenLink { .. } => ErrorKind::BrokenLink,
            InvokeError::CaveatRejected { .. } => ErrorKind::CaveatRejected,
            InvokeError::ChainTooLong { .. } => ErrorKind::ChainTooLong,
            InvokeError::StaleNonce { .. } => ErrorKind::StaleNonce,
            InvokeError::TargetExecutionFailed { .. } => ErrorKind::TargetExecutionFailed,
            InvokeError::AfterInvokeRejected { .. } => ErrorKind::AfterInvokeRejected,
        }
    }

    /// Attach a chain validation failure to its position in the call.
    pub fn from_chain(at: Position, err: ChainError) -> Self {
        match err {
            ChainError::InvalidSignature { index, source } => InvokeError::InvalidSignature {
                at,
                link: Some(index),
                source,
            },
            ChainError::BrokenLink { index, fault } => InvokeError::BrokenLink {
                at,
                link: index,
                fault,
            },
            ChainError::CaveatRejected {
                index,
                caveat,
                source,
            } => InvokeError::CaveatRejected {
                at,
                link: index,
                caveat,
                stage: Stage::Pre,
                source,
            },
            ChainError::ChainTooLong { len, max } => InvokeError::ChainTooLong { at, len, max },
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
