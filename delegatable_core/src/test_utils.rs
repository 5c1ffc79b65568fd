//! Fixtures shared by unit and integration tests: recording enforcers and
//! two small demo targets.

use crate::{
    caveat::{CaveatEnforcer, CaveatRejection, Enforcement},
    crypto::{
        digest::Digest,
        signed::SigningError,
        signer::{memory::MemorySigner, sync_signer::SyncSigner},
        typed::TypedHasher,
    },
    delegation::{Caveat, Delegation, SignedDelegation},
    executor::Delegatable,
    invocation::{calldata, selector},
    listener::InvocationListener,
    principal::identifier::Identifier,
    replay::NonceStore,
    target::{CallContext, ExecutionOutput, Target, TargetError, TargetTable},
};
use serde::de::DeserializeOwned;
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

pub fn signer() -> MemorySigner {
    MemorySigner::generate(&mut rand::rngs::OsRng)
}

/// Sign a delegation from `from` to `to`, below `parent` (or as a root).
pub fn delegate<S: SyncSigner>(
    hasher: &TypedHasher,
    from: &S,
    to: Identifier,
    parent: Option<&SignedDelegation>,
    caveats: Vec<Caveat>,
) -> Result<SignedDelegation, SigningError> {
    let authority = parent
        .map(|p| hasher.hash(p))
        .unwrap_or_else(Digest::zero);
    from.try_sign_typed(hasher, Delegation::new(to, authority, caveats))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TargetError> {
    Ok(bincode::deserialize(bytes)?)
}

fn query<T: DeserializeOwned, N: NonceStore, L: InvocationListener>(
    engine: &Delegatable<N, L>,
    target: Identifier,
    method: &str,
) -> Result<T, TargetError> {
    decode(&engine.query(&target, &calldata(method, &())?)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    fn apply(self, name: &str) -> Result<(), CaveatRejection> {
        match self {
            Verdict::Allow => Ok(()),
            Verdict::Deny => Err(CaveatRejection::new(format!("{name} says no"))),
        }
    }
}

/// An enforcer that records every call into a shared log as `pre:<name>` or
/// `post:<name>`.
#[derive(Debug, Clone)]
pub struct Recorder {
    name: String,
    pre: Verdict,
    post: Verdict,
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new(name: &str, pre: Verdict, log: Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            pre,
            post: Verdict::Allow,
            log,
        }
    }

    pub fn with_post(mut self, post: Verdict) -> Self {
        self.post = post;
        self
    }
}

impl CaveatEnforcer for Recorder {
    fn pre_enforce(&self, _terms: &[u8], _enforcement: &Enforcement<'_>) -> Result<(), CaveatRejection> {
        self.log.borrow_mut().push(format!("pre:{}", self.name));
        self.pre.apply(&self.name)
    }

    fn post_enforce(
        &self,
        _terms: &[u8],
        _enforcement: &Enforcement<'_>,
        _output: &ExecutionOutput,
    ) -> Result<(), CaveatRejection> {
        self.log.borrow_mut().push(format!("post:{}", self.name));
        self.post.apply(&self.name)
    }
}

/// Stores a single string, like the classic "purpose" demo contract.
///
/// Methods: `setPurpose(string)`, `fail(string)`; queries: `purpose()`,
/// `lastSetter()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurposeTarget {
    purpose: String,
    last_setter: Identifier,
}

impl PurposeTarget {
    pub fn new(purpose: &str) -> Self {
        Self {
            purpose: purpose.to_string(),
            last_setter: Identifier::ZERO,
        }
    }

    pub fn read(table: &TargetTable, id: Identifier) -> Result<String, TargetError> {
        decode(&table.query(&id, &calldata("purpose()", &())?)?)
    }

    pub fn read_from<N: NonceStore, L: InvocationListener>(
        engine: &Delegatable<N, L>,
        id: Identifier,
    ) -> Result<String, TargetError> {
        query(engine, id, "purpose()")
    }

    pub fn last_setter<N: NonceStore, L: InvocationListener>(
        engine: &Delegatable<N, L>,
        id: Identifier,
    ) -> Result<Identifier, TargetError> {
        query(engine, id, "lastSetter()")
    }
}

impl Target for PurposeTarget {
    fn call(&mut self, ctx: &CallContext, payload: &[u8]) -> Result<Vec<u8>, TargetError> {
        let (sel, args) = split(payload)?;
        if sel == selector("setPurpose(string)") {
            self.purpose = decode(args)?;
            self.last_setter = ctx.sender;
            Ok(vec![])
        } else if sel == selector("fail(string)") {
            Err(TargetError::Reverted(decode(args)?))
        } else {
            Err(TargetError::UnknownMethod(Some(sel)))
        }
    }

    fn query(&self, payload: &[u8]) -> Result<Vec<u8>, TargetError> {
        let (sel, _) = split(payload)?;
        if sel == selector("purpose()") {
            Ok(bincode::serialize(&self.purpose)?)
        } else if sel == selector("lastSetter()") {
            Ok(bincode::serialize(&self.last_setter)?)
        } else {
            Err(TargetError::UnknownMethod(Some(sel)))
        }
    }

    fn fork_target(&self) -> Box<dyn Target> {
        Box::new(self.clone())
    }
}

/// A token with an owner.
///
/// Methods: `transfer(bytes32,uint64)`, `mint(bytes32,uint64)` (owner only),
/// `transferOwnership(bytes32)` (owner only); queries:
/// `balanceOf(bytes32)`, `owner()`.
///
/// With the owner guard on, its after-invoke hook denies any call in which
/// no invocation's root authority is the owner, as the owner stands after
/// the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTarget {
    owner: Identifier,
    balances: BTreeMap<Identifier, u64>,
    owner_guard: bool,
}

impl TokenTarget {
    pub fn new(owner: Identifier) -> Self {
        Self {
            owner,
            balances: BTreeMap::new(),
            owner_guard: false,
        }
    }

    pub fn with_balance(mut self, holder: Identifier, amount: u64) -> Self {
        self.balances.insert(holder, amount);
        self
    }

    pub fn with_owner_guard(mut self) -> Self {
        self.owner_guard = true;
        self
    }

    pub fn balance_of<N: NonceStore, L: InvocationListener>(
        engine: &Delegatable<N, L>,
        id: Identifier,
        holder: Identifier,
    ) -> Result<u64, TargetError> {
        decode(&engine.query(&id, &calldata("balanceOf(bytes32)", &holder)?)?)
    }

    pub fn owner_of<N: NonceStore, L: InvocationListener>(
        engine: &Delegatable<N, L>,
        id: Identifier,
    ) -> Result<Identifier, TargetError> {
        query(engine, id, "owner()")
    }

    fn only_owner(&self, ctx: &CallContext) -> Result<(), TargetError> {
        if ctx.sender == self.owner {
            Ok(())
        } else {
            Err(TargetError::reverted("caller is not the owner"))
        }
    }
}

impl Target for TokenTarget {
    fn call(&mut self, ctx: &CallContext, payload: &[u8]) -> Result<Vec<u8>, TargetError> {
        let (sel, args) = split(payload)?;
        if sel == selector("transfer(bytes32,uint64)") {
            let (to, amount): (Identifier, u64) = decode(args)?;
            let from = self.balances.entry(ctx.sender).or_default();
            *from = from
                .checked_sub(amount)
                .ok_or_else(|| TargetError::reverted("insufficient balance"))?;
            let to = self.balances.entry(to).or_default();
            *to = to
                .checked_add(amount)
                .ok_or_else(|| TargetError::reverted("balance overflow"))?;
            Ok(bincode::serialize(&true)?)
        } else if sel == selector("mint(bytes32,uint64)") {
            self.only_owner(ctx)?;
            let (to, amount): (Identifier, u64) = decode(args)?;
            let to = self.balances.entry(to).or_default();
            *to = to
                .checked_add(amount)
                .ok_or_else(|| TargetError::reverted("balance overflow"))?;
            Ok(vec![])
        } else if sel == selector("transferOwnership(bytes32)") {
            self.only_owner(ctx)?;
            self.owner = decode(args)?;
            Ok(vec![])
        } else {
            Err(TargetError::UnknownMethod(Some(sel)))
        }
    }

    fn query(&self, payload: &[u8]) -> Result<Vec<u8>, TargetError> {
        let (sel, args) = split(payload)?;
        if sel == selector("balanceOf(bytes32)") {
            let holder: Identifier = decode(args)?;
            Ok(bincode::serialize(&self.balances.get(&holder).copied().unwrap_or(0))?)
        } else if sel == selector("owner()") {
            Ok(bincode::serialize(&self.owner)?)
        } else {
            Err(TargetError::UnknownMethod(Some(sel)))
        }
    }

    fn after_invoke(&self, root_signers: &[Identifier]) -> Result<(), TargetError> {
        if !self.owner_guard || root_signers.contains(&self.owner) {
            Ok(())
        } else {
            Err(TargetError::reverted("no invocation was rooted at the owner"))
        }
    }

    fn fork_target(&self) -> Box<dyn Target> {
        Box::new(self.clone())
    }
}

fn split(payload: &[u8]) -> Result<([u8; 4], &[u8]), TargetError> {
    let sel = payload
        .get(..4)
        .and_then(|s| <[u8; 4]>::try_from(s).ok())
        .ok_or(TargetError::UnknownMethod(None))?;
    Ok((sel, &payload[4..]))
}
