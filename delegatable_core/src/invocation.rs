//! Concrete actions submitted under a chain of delegated authority.

use crate::{
    crypto::{
        signed::Signed,
        typed::{FieldEncoder, TypedStruct},
    },
    delegation::SignedDelegation,
    principal::identifier::Identifier,
};
use serde::{Deserialize, Serialize};

/// Width of a method selector.
pub const SELECTOR_LEN: usize = 4;

/// The selector of a method signature: the first four bytes of its blake3 hash.
///
/// # Examples
///
/// ```
/// # use delegatable_core::invocation::selector;
/// assert_eq!(selector("transfer(bytes32,uint64)"), selector("transfer(bytes32,uint64)"));
/// assert_ne!(selector("transfer(bytes32,uint64)"), selector("setPurpose(string)"));
/// ```
pub fn selector(method: &str) -> [u8; SELECTOR_LEN] {
    let hash = blake3::hash(method.as_bytes());
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(&hash.as_bytes()[..SELECTOR_LEN]);
    out
}

/// Encode a method call as `selector(method) ‖ bincode(args)`.
pub fn calldata<A: Serialize>(method: &str, args: &A) -> Result<Vec<u8>, bincode::Error> {
    let mut payload = selector(method).to_vec();
    payload.extend(bincode::serialize(args)?);
    Ok(payload)
}

/// An opaque call descriptor, dispatched verbatim to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub target: Identifier,
    pub payload: Vec<u8>,
    pub resource_budget: u64,
}

impl Action {
    pub fn new(target: Identifier, payload: Vec<u8>, resource_budget: u64) -> Self {
        Self {
            target,
            payload,
            resource_budget,
        }
    }

    /// An action calling `method` on `target`. See [`calldata`].
    pub fn call<A: Serialize>(
        target: Identifier,
        method: &str,
        args: &A,
        resource_budget: u64,
    ) -> Result<Self, bincode::Error> {
        Ok(Self::new(target, calldata(method, args)?, resource_budget))
    }

    /// The leading method selector, if the payload is long enough to have one.
    pub fn selector(&self) -> Option<[u8; SELECTOR_LEN]> {
        self.payload.get(..SELECTOR_LEN)?.try_into().ok()
    }

    /// The payload after the selector.
    pub fn arguments(&self) -> &[u8] {
        self.payload.get(SELECTOR_LEN..).unwrap_or_default()
    }
}

impl TypedStruct for Action {
    const TYPE_ENCODING: &'static str =
        "Action(bytes32 target,bytes payload,uint256 resourceBudget)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.identifier(&self.target);
        encoder.bytes(&self.payload);
        encoder.uint(self.resource_budget);
    }
}

/// Which replay queue a submission belongs to, and its position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplayProtection {
    pub queue: u64,
    pub nonce: u64,
}

impl ReplayProtection {
    pub fn new(queue: u64, nonce: u64) -> Self {
        Self { queue, nonce }
    }
}

impl TypedStruct for ReplayProtection {
    const TYPE_ENCODING: &'static str = "ReplayProtection(uint256 queue,uint256 nonce)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.uint(self.queue);
        encoder.uint(self.nonce);
    }
}

/// One action together with the chain that authorizes it.
///
/// `authority[0]` is the delegation naming the invoker as delegate; the last
/// element is the root delegation. An empty `authority` means the invoker
/// acts on its own behalf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invocation {
    pub authority: Vec<SignedDelegation>,
    pub action: Action,
    pub replay_protection: ReplayProtection,
}

impl Invocation {
    pub fn new(
        authority: Vec<SignedDelegation>,
        action: Action,
        replay_protection: ReplayProtection,
    ) -> Self {
        Self {
            authority,
            action,
            replay_protection,
        }
    }
}

impl TypedStruct for Invocation {
    const TYPE_ENCODING: &'static str = "Invocation(SignedDelegation[] authority,Action action,ReplayProtection replayProtection)Action(bytes32 target,bytes payload,uint256 resourceBudget)Caveat(bytes32 enforcer,bytes terms)Delegation(bytes32 delegate,bytes32 authority,Caveat[] caveats)ReplayProtection(uint256 queue,uint256 nonce)SignedDelegation(Delegation delegation,bytes32 issuer,bool signerIsContract,bytes signature)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.array(&self.authority);
        encoder.structure(&self.action);
        encoder.structure(&self.replay_protection);
    }
}

/// The batch payload signed by an invoker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invocations {
    pub batch: Vec<Invocation>,
}

impl Invocations {
    pub fn new(batch: Vec<Invocation>) -> Self {
        Self { batch }
    }
}

impl From<Vec<Invocation>> for Invocations {
    fn from(batch: Vec<Invocation>) -> Self {
        Self { batch }
    }
}

impl TypedStruct for Invocations {
    const TYPE_ENCODING: &'static str = "Invocations(Invocation[] batch)Action(bytes32 target,bytes payload,uint256 resourceBudget)Caveat(bytes32 enforcer,bytes terms)Delegation(bytes32 delegate,bytes32 authority,Caveat[] caveats)Invocation(SignedDelegation[] authority,Action action,ReplayProtection replayProtection)ReplayProtection(uint256 queue,uint256 nonce)SignedDelegation(Delegation delegation,bytes32 issuer,bool signerIsContract,bytes signature)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.array(&self.batch);
    }
}

/// A batch of invocations signed by its invoker.
pub type SignedInvocations = Signed<Invocations>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_call_encoding() {
        let target = Identifier::derive("token");
        let action = Action::call(target, "transfer(bytes32,uint64)", &(7u8, 99u64), 1_000).unwrap();

        assert_eq!(action.selector(), Some(selector("transfer(bytes32,uint64)")));
        let (a, b): (u8, u64) = bincode::deserialize(action.arguments()).unwrap();
        assert_eq!((a, b), (7, 99));
    }

    #[test]
    fn test_short_payload_has_no_selector() {
        let action = Action::new(Identifier::derive("token"), vec![1, 2, 3], 0);
        assert_eq!(action.selector(), None);
        assert!(action.arguments().is_empty());
    }
}
