//! Multi-queue replay protection.
//!
//! Every signer owns any number of independent queues. Each queue is a
//! strictly increasing counter: the only acceptable nonce is the last used one
//! plus one. Queues never interfere with each other, so unrelated invocation
//! streams from one signer need no global ordering.

use crate::{
    principal::identifier::Identifier,
    transact::{fork::Fork, merge::Merge},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Persistent `(signer, queue) -> last used nonce` table.
///
/// A never-used queue reads as `0`, so the first acceptable nonce is `1`.
/// Forks must be independent copies: the executor checkpoints the store by
/// forking it and commits by merging the fork back.
pub trait NonceStore: Merge + Fork<Forked = Self> + fmt::Debug {
    fn last_used(&self, signer: &Identifier, queue: u64) -> u64;
    fn set_last_used(&mut self, signer: Identifier, queue: u64, nonce: u64);
}

/// Checks and advances queue counters over a [`NonceStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayLedger<N: NonceStore = MemoryNonceStore> {
    store: N,
}

impl<N: NonceStore> ReplayLedger<N> {
    pub fn new(store: N) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &N {
        &self.store
    }

    pub fn into_store(self) -> N {
        self.store
    }

    /// The nonce the next submission on `queue` must carry.
    ///
    /// Saturates at `u64::MAX`; a queue that has used `u64::MAX` is exhausted
    /// and rejects everything.
    pub fn next_nonce(&self, signer: &Identifier, queue: u64) -> u64 {
        self.store.last_used(signer, queue).saturating_add(1)
    }

    /// Accept `nonce` iff it is exactly one past the last used nonce, and
    /// record it.
    #[instrument(skip(self, signer), fields(%signer))]
    pub fn consume(&mut self, signer: Identifier, queue: u64, nonce: u64) -> Result<(), StaleNonce> {
        let last = self.store.last_used(&signer, queue);
        match last.checked_add(1) {
            Some(expected) if expected == nonce => {
                self.store.set_last_used(signer, queue, nonce);
                debug!("nonce consumed");
                Ok(())
            }
            _ => {
                let err = StaleNonce {
                    signer,
                    queue,
                    expected: last.saturating_add(1),
                    got: nonce,
                };
                warn!(%err, "nonce rejected");
                Err(err)
            }
        }
    }
}

impl<N: NonceStore> Fork for ReplayLedger<N> {
    type Forked = Self;

    fn fork(&self) -> Self {
        Self {
            store: self.store.fork(),
        }
    }
}

impl<N: NonceStore> Merge for ReplayLedger<N> {
    fn merge(&mut self, fork: Self) {
        self.store.merge(fork.store)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stale nonce for {signer} on queue {queue}: expected {expected}, got {got}")]
pub struct StaleNonce {
    pub signer: Identifier,
    pub queue: u64,
    pub expected: u64,
    pub got: u64,
}

/// An in-memory [`NonceStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryNonceStore {
    table: HashMap<(Identifier, u64), u64>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the table for persistence.
    pub fn export(&self) -> NonceArchive {
        let mut entries: Vec<NonceEntry> = self
            .table
            .iter()
            .map(|((signer, queue), nonce)| NonceEntry {
                signer: *signer,
                queue: *queue,
                last_used: *nonce,
            })
            .collect();
        entries.sort();
        NonceArchive { entries }
    }
}

impl NonceStore for MemoryNonceStore {
    fn last_used(&self, signer: &Identifier, queue: u64) -> u64 {
        self.table.get(&(*signer, queue)).copied().unwrap_or(0)
    }

    fn set_last_used(&mut self, signer: Identifier, queue: u64, nonce: u64) {
        self.table.insert((signer, queue), nonce);
    }
}

impl Fork for MemoryNonceStore {
    type Forked = Self;

    fn fork(&self) -> Self {
        self.clone()
    }
}

impl Merge for MemoryNonceStore {
    /// Counters only move forward, so the larger side wins.
    fn merge(&mut self, fork: Self) {
        for (key, nonce) in fork.table {
            let entry = self.table.entry(key).or_insert(0);
            *entry = (*entry).max(nonce);
        }
    }
}

impl From<NonceArchive> for MemoryNonceStore {
    fn from(archive: NonceArchive) -> Self {
        let mut store = MemoryNonceStore::new();
        for entry in archive.entries {
            let slot = store.table.entry((entry.signer, entry.queue)).or_insert(0);
            *slot = (*slot).max(entry.last_used);
        }
        store
    }
}

/// A serializable snapshot of a nonce table, sorted by signer then queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceArchive {
    pub entries: Vec<NonceEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NonceEntry {
    pub signer: Identifier,
    pub queue: u64,
    pub last_used: u64,
}

impl NonceArchive {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
