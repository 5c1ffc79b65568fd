//! The callable surface invocations are dispatched to.
//!
//! Business logic lives behind [`Target`]; the core only routes payloads to
//! it, hands it a [`CallContext`], and gives it a chance to veto the whole
//! outer call once every invocation has run.

use crate::{
    principal::identifier::Identifier,
    transact::{fork::Fork, merge::Merge},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// Who is acting, as seen by a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallContext {
    /// The root authority of the invocation's chain. Targets should treat
    /// this as the acting account.
    pub sender: Identifier,

    /// The party that signed the batch carrying the invocation.
    pub invoker: Identifier,

    /// The resource budget of the action.
    pub resource_budget: u64,
}

/// What one executed invocation returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub target: Identifier,
    pub return_data: Vec<u8>,
}

/// Opaque business logic.
pub trait Target: fmt::Debug {
    /// Execute `payload`, mutating state.
    fn call(&mut self, ctx: &CallContext, payload: &[u8]) -> Result<Vec<u8>, TargetError>;

    /// Answer a read-only `payload` without mutating state.
    fn query(&self, payload: &[u8]) -> Result<Vec<u8>, TargetError>;

    /// Post-execution veto, run once per outer call with the root authority
    /// of every invocation in that call (in submission order). Allows by
    /// default.
    fn after_invoke(&self, _root_signers: &[Identifier]) -> Result<(), TargetError> {
        Ok(())
    }

    /// A deep, independent copy used to checkpoint the target.
    fn fork_target(&self) -> Box<dyn Target>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("No target registered as {0}")]
    NoSuchTarget(Identifier),

    #[error("Unknown method {0:02x?}")]
    UnknownMethod(Option<[u8; 4]>),

    #[error("Malformed arguments: {0}")]
    MalformedArguments(String),

    #[error("Reverted: {0}")]
    Reverted(String),
}

impl TargetError {
    pub fn reverted<S: ToString>(reason: S) -> Self {
        TargetError::Reverted(reason.to_string())
    }
}

impl From<bincode::Error> for TargetError {
    fn from(err: bincode::Error) -> Self {
        TargetError::MalformedArguments(err.to_string())
    }
}

/// Targets by identity.
#[derive(Debug, Default)]
pub struct TargetTable(BTreeMap<Identifier, Box<dyn Target>>);

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Identifier, target: Box<dyn Target>) -> Option<Box<dyn Target>> {
        self.0.insert(id, target)
    }

    pub fn get(&self, id: &Identifier) -> Option<&dyn Target> {
        self.0.get(id).map(|t| t.as_ref())
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Dispatch a state-changing call.
    pub fn call(
        &mut self,
        id: &Identifier,
        ctx: &CallContext,
        payload: &[u8],
    ) -> Result<Vec<u8>, TargetError> {
        self.0
            .get_mut(id)
            .ok_or(TargetError::NoSuchTarget(*id))?
            .call(ctx, payload)
    }

    pub fn query(&self, id: &Identifier, payload: &[u8]) -> Result<Vec<u8>, TargetError> {
        self.0
            .get(id)
            .ok_or(TargetError::NoSuchTarget(*id))?
            .query(payload)
    }
}

impl Fork for TargetTable {
    type Forked = Self;

    fn fork(&self) -> Self {
        TargetTable(
            self.0
                .iter()
                .map(|(id, target)| (*id, target.fork_target()))
                .collect(),
        )
    }
}

impl Merge for TargetTable {
    fn merge(&mut self, fork: Self) {
        *self = fork;
    }
}
