use delegatable_core::{
    caveat::allowed_methods::AllowedMethodsEnforcer,
    config::Config,
    crypto::signer::{memory::MemorySigner, sync_signer::SyncSigner},
    delegation::{Caveat, SignedDelegation},
    error::{ErrorKind, InvokeError, Stage},
    executor::Delegatable,
    invocation::{Action, Invocation, Invocations, ReplayProtection, SignedInvocations},
    listener::log::Log,
    principal::identifier::Identifier,
    replay::MemoryNonceStore,
    test_utils::{delegate, signer, PurposeTarget, Recorder, TokenTarget, Verdict},
};
use pretty_assertions::assert_eq;
use std::{cell::RefCell, rc::Rc};
use testresult::TestResult;

const TRANSFER: &str = "transfer(bytes32,uint64)";

struct World {
    engine: Delegatable<MemoryNonceStore, Log>,
    token: Identifier,
    purpose: Identifier,
    methods: Identifier,
    root: MemorySigner,
    alice: MemorySigner,
    bob: MemorySigner,
    carol: Identifier,
}

impl World {
    fn new(guarded: bool) -> Self {
        test_utils::init_logging();

        let root = signer();
        let alice = signer();
        let bob = signer();
        let carol = Identifier::derive("carol");

        test_utils::add_rewrite(root.id(), "root");
        test_utils::add_rewrite(alice.id(), "alice");
        test_utils::add_rewrite(bob.id(), "bob");
        test_utils::add_rewrite(carol, "carol");

        let token = Identifier::derive("token");
        let purpose = Identifier::derive("purpose");
        let methods = Identifier::derive("allowed-methods");

        let mut engine = Delegatable::new(
            Config::new("Delegatable", "1", 1, Identifier::derive("world")),
            MemoryNonceStore::new(),
            Log::new(),
        );

        let mut erc20 = TokenTarget::new(root.id())
            .with_balance(root.id(), 100)
            .with_balance(alice.id(), 50);
        if guarded {
            erc20 = erc20.with_owner_guard();
        }
        engine.register_target(token, Box::new(erc20));
        engine.register_target(purpose, Box::new(PurposeTarget::new("genesis")));
        engine.register_enforcer(methods, Rc::new(AllowedMethodsEnforcer));

        Self {
            engine,
            token,
            purpose,
            methods,
            root,
            alice,
            bob,
            carol,
        }
    }

    /// root -> alice (no caveats) -> bob (transfer only)
    fn chain_to_bob(&self) -> Result<Vec<SignedDelegation>, Box<dyn std::error::Error>> {
        let hasher = self.engine.hasher();
        let to_alice = delegate(hasher, &self.root, self.alice.id(), None, vec![])?;
        let to_bob = delegate(
            hasher,
            &self.alice,
            self.bob.id(),
            Some(&to_alice),
            vec![Caveat::new(self.methods, AllowedMethodsEnforcer::terms(&[TRANSFER]))],
        )?;
        Ok(vec![to_bob, to_alice])
    }

    fn sign(
        &self,
        invoker: &MemorySigner,
        batch: Vec<Invocation>,
    ) -> Result<SignedInvocations, Box<dyn std::error::Error>> {
        Ok(invoker.try_sign_typed(self.engine.hasher(), Invocations::new(batch))?)
    }

    fn transfer(&self, to: Identifier, amount: u64) -> Action {
        Action::call(self.token, TRANSFER, &(to, amount), 50_000).unwrap()
    }

    fn balance(&self, holder: Identifier) -> u64 {
        TokenTarget::balance_of(&self.engine, self.token, holder).unwrap()
    }
}

#[test]
fn test_delegated_transfer() -> TestResult {
    // root ──▶ alice ──[transfer only]──▶ bob ──▶ token.transfer(carol, 10)
    let mut world = World::new(false);
    let chain = world.chain_to_bob()?;
    let action = world.transfer(world.carol, 10);

    let batch = world.sign(
        &world.bob,
        vec![Invocation::new(chain, action, ReplayProtection::new(0, 1))],
    )?;
    let outputs = world.engine.invoke(&[batch])?;

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].target, world.token);
    assert_eq!(world.balance(world.root.id()), 90);
    assert_eq!(world.balance(world.carol), 10);
    assert_eq!(world.engine.listener().len(), 1);
    Ok(())
}

#[test]
fn test_other_method_rejected_by_caveat() -> TestResult {
    let mut world = World::new(false);
    let chain = world.chain_to_bob()?;
    let mint = Action::call(world.token, "mint(bytes32,uint64)", &(world.bob.id(), 1_000u64), 0)?;

    let batch = world.sign(
        &world.bob,
        vec![Invocation::new(chain, mint, ReplayProtection::new(0, 1))],
    )?;
    let err = world.engine.invoke(&[batch]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CaveatRejected);
    assert!(matches!(
        err,
        InvokeError::CaveatRejected {
            link: 0,
            caveat: 0,
            stage: Stage::Pre,
            ..
        }
    ));
    assert_eq!(world.balance(world.bob.id()), 0);
    assert_eq!(world.engine.next_nonce(&world.bob.id(), 0), 1);
    Ok(())
}

#[test]
fn test_replay_rejected() -> TestResult {
    let mut world = World::new(false);
    let chain = world.chain_to_bob()?;
    let batch = world.sign(
        &world.bob,
        vec![Invocation::new(
            chain,
            world.transfer(world.carol, 1),
            ReplayProtection::new(0, 1),
        )],
    )?;

    world.engine.invoke(&[batch.clone()])?;
    let err = world.engine.invoke(&[batch]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StaleNonce);
    assert_eq!(world.balance(world.carol), 1);
    Ok(())
}

#[test]
fn test_queues_are_independent() -> TestResult {
    let mut world = World::new(false);
    let set = |to: &str, rp| {
        Invocation::new(
            vec![],
            Action::call(world.purpose, "setPurpose(string)", &to.to_string(), 0).unwrap(),
            rp,
        )
    };

    let q1 = world.sign(&world.alice, vec![set("from queue 1", ReplayProtection::new(1, 1))])?;
    let q0 = world.sign(&world.alice, vec![set("from queue 0", ReplayProtection::new(0, 1))])?;
    world.engine.invoke(&[q1])?;
    world.engine.invoke(&[q0])?;

    assert_eq!(world.engine.next_nonce(&world.alice.id(), 0), 2);
    assert_eq!(world.engine.next_nonce(&world.alice.id(), 1), 2);
    assert_eq!(PurposeTarget::read_from(&world.engine, world.purpose)?, "from queue 0");
    Ok(())
}

#[test]
fn test_after_invoke_requires_owner_rooted_invocation() -> TestResult {
    let mut world = World::new(true);

    // alice moves her own tokens: nothing in the call is rooted at the owner
    let own = Invocation::new(
        vec![],
        world.transfer(world.carol, 5),
        ReplayProtection::new(0, 1),
    );
    let batch = world.sign(&world.alice, vec![own.clone()])?;
    let err = world.engine.invoke(&[batch]).unwrap_err();

    assert!(matches!(err, InvokeError::AfterInvokeRejected { target, .. } if target == world.token));
    assert_eq!(world.balance(world.alice.id()), 50);
    assert_eq!(world.engine.next_nonce(&world.alice.id(), 0), 1);

    // the same transfer alongside one rooted at the owner goes through
    let to_alice = delegate(world.engine.hasher(), &world.root, world.alice.id(), None, vec![])?;
    let rooted = Invocation::new(
        vec![to_alice],
        world.transfer(world.carol, 1),
        ReplayProtection::new(0, 2),
    );
    let batch = world.sign(&world.alice, vec![own, rooted])?;
    world.engine.invoke(&[batch])?;

    assert_eq!(world.balance(world.alice.id()), 45);
    assert_eq!(world.balance(world.root.id()), 99);
    assert_eq!(world.balance(world.carol), 6);
    Ok(())
}

#[test]
fn test_after_invoke_sees_ownership_changes() -> TestResult {
    let mut world = World::new(true);
    let hasher = world.engine.hasher();
    let to_alice = delegate(hasher, &world.root, world.alice.id(), None, vec![])?;

    // root's authority hands the token to bob within the call: bob is now the
    // owner, and no invocation was rooted at bob
    let handover = Invocation::new(
        vec![to_alice],
        Action::call(world.token, "transferOwnership(bytes32)", &world.bob.id(), 0)?,
        ReplayProtection::new(0, 1),
    );
    let batch = world.sign(&world.alice, vec![handover])?;
    let err = world.engine.invoke(&[batch]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AfterInvokeRejected);
    assert_eq!(TokenTarget::owner_of(&world.engine, world.token)?, world.root.id());
    Ok(())
}

#[test]
fn test_batch_atomicity_across_batches() -> TestResult {
    let mut world = World::new(true);

    let set = Invocation::new(
        vec![],
        Action::call(world.purpose, "setPurpose(string)", &"changed".to_string(), 0)?,
        ReplayProtection::new(0, 1),
    );
    let first = world.sign(&world.bob, vec![set])?;

    let unguarded = Invocation::new(
        vec![],
        world.transfer(world.carol, 5),
        ReplayProtection::new(0, 1),
    );
    let second = world.sign(&world.alice, vec![unguarded])?;

    let err = world.engine.invoke(&[first.clone(), second]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AfterInvokeRejected);

    assert_eq!(PurposeTarget::read_from(&world.engine, world.purpose)?, "genesis");
    assert_eq!(world.engine.next_nonce(&world.bob.id(), 0), 1);
    assert_eq!(world.engine.next_nonce(&world.alice.id(), 0), 1);
    assert!(world.engine.listener().is_empty());

    // bob's batch alone is still valid, since nothing was consumed
    world.engine.invoke(&[first])?;
    assert_eq!(PurposeTarget::read_from(&world.engine, world.purpose)?, "changed");
    Ok(())
}

#[test]
fn test_post_enforce_veto_rolls_back() -> TestResult {
    let mut world = World::new(false);
    let log = Rc::new(RefCell::new(vec![]));
    let auditor = Identifier::derive("auditor");
    world.engine.register_enforcer(
        auditor,
        Rc::new(Recorder::new("auditor", Verdict::Allow, log.clone()).with_post(Verdict::Deny)),
    );

    let to_bob = delegate(
        world.engine.hasher(),
        &world.root,
        world.bob.id(),
        None,
        vec![Caveat::new(auditor, vec![])],
    )?;
    let batch = world.sign(
        &world.bob,
        vec![Invocation::new(
            vec![to_bob],
            world.transfer(world.carol, 10),
            ReplayProtection::new(0, 1),
        )],
    )?;

    let err = world.engine.invoke(&[batch]).unwrap_err();
    assert!(matches!(
        err,
        InvokeError::CaveatRejected {
            stage: Stage::Post,
            ..
        }
    ));
    assert_eq!(*log.borrow(), vec!["pre:auditor".to_string(), "post:auditor".to_string()]);
    assert_eq!(world.balance(world.root.id()), 100);
    assert_eq!(world.balance(world.carol), 0);
    Ok(())
}

#[test]
fn test_target_failure_rolls_back() -> TestResult {
    let mut world = World::new(false);
    let batch = world.sign(
        &world.alice,
        vec![
            Invocation::new(vec![], world.transfer(world.carol, 5), ReplayProtection::new(0, 1)),
            Invocation::new(vec![], world.transfer(world.carol, 500), ReplayProtection::new(0, 2)),
        ],
    )?;

    let err = world.engine.invoke(&[batch]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TargetExecutionFailed);
    assert_eq!(world.balance(world.alice.id()), 50);
    assert_eq!(world.balance(world.carol), 0);
    Ok(())
}

#[test]
fn test_chain_presented_by_wrong_invoker() -> TestResult {
    let mut world = World::new(false);
    let chain = world.chain_to_bob()?;
    let mallory = signer();

    let batch = world.sign(
        &mallory,
        vec![Invocation::new(chain, world.transfer(world.carol, 1), ReplayProtection::new(0, 1))],
    )?;
    let err = world.engine.invoke(&[batch]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BrokenLink);
    assert_eq!(world.balance(world.root.id()), 100);
    Ok(())
}
