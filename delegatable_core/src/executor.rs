//! Atomic execution of signed invocation batches.
//!
//! [`Delegatable`] owns everything an invocation touches: the nonce table,
//! the targets, the caveat enforcers and the contract validators. An outer
//! [`Delegatable::invoke`] call runs against a fork of that state and only
//! merges it back once every batch in the call has been verified and
//! executed, and every touched target's after-invoke hook has allowed the
//! result.

use crate::{
    caveat::{CaveatDispatcher, CaveatEnforcer},
    chain::{Authorization, ChainError, ChainValidator},
    config::Config,
    crypto::{
        typed::TypedHasher,
        verifier::{ContractRegistry, ContractValidator, SignatureVerifier},
    },
    delegation::SignedDelegation,
    error::{InvokeError, Position, Stage},
    invocation::{Action, SignedInvocations},
    listener::{no_listener::NoListener, InvocationListener},
    principal::identifier::Identifier,
    replay::{MemoryNonceStore, NonceStore, ReplayLedger},
    target::{CallContext, ExecutionOutput, Target, TargetError, TargetTable},
    transact::{fork::Fork, merge::Merge, transact_blocking},
};
use derive_where::derive_where;
use std::rc::Rc;
use tracing::{debug, info, instrument, warn};

/// The invocation engine.
#[derive_where(Debug; L)]
pub struct Delegatable<N: NonceStore = MemoryNonceStore, L: InvocationListener = NoListener> {
    config: Config,
    hasher: TypedHasher,
    contracts: ContractRegistry,
    enforcers: CaveatDispatcher,
    state: ExecutionState<N>,
    listener: L,
}

/// Everything an outer call may mutate.
#[derive(Debug)]
struct ExecutionState<N: NonceStore> {
    ledger: ReplayLedger<N>,
    targets: TargetTable,
}

impl<N: NonceStore> Fork for ExecutionState<N> {
    type Forked = Self;

    fn fork(&self) -> Self {
        Self {
            ledger: self.ledger.fork(),
            targets: self.targets.fork(),
        }
    }
}

impl<N: NonceStore> Merge for ExecutionState<N> {
    fn merge(&mut self, fork: Self) {
        self.ledger.merge(fork.ledger);
        self.targets.merge(fork.targets);
    }
}

impl Delegatable {
    /// An engine with an in-memory nonce table and no listener.
    pub fn from_config(config: Config) -> Self {
        Self::new(config, MemoryNonceStore::new(), NoListener)
    }
}

impl<N: NonceStore, L: InvocationListener> Delegatable<N, L> {
    pub fn new(config: Config, nonces: N, listener: L) -> Self {
        let hasher = TypedHasher::new(config.domain.clone());
        Self {
            config,
            hasher,
            contracts: ContractRegistry::new(),
            enforcers: CaveatDispatcher::new(),
            state: ExecutionState {
                ledger: ReplayLedger::new(nonces),
                targets: TargetTable::new(),
            },
            listener,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The hasher every signature in this deployment is made over.
    pub fn hasher(&self) -> &TypedHasher {
        &self.hasher
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn nonces(&self) -> &N {
        self.state.ledger.store()
    }

    pub fn register_target(&mut self, id: Identifier, target: Box<dyn Target>) {
        self.state.targets.insert(id, target);
    }

    pub fn register_enforcer(&mut self, id: Identifier, enforcer: Rc<dyn CaveatEnforcer>) {
        self.enforcers.register(id, enforcer);
    }

    pub fn register_contract(&mut self, id: Identifier, validator: Rc<dyn ContractValidator>) {
        self.contracts.register(id, validator);
    }

    /// The nonce `signer` must use next on `queue`.
    pub fn next_nonce(&self, signer: &Identifier, queue: u64) -> u64 {
        self.state.ledger.next_nonce(signer, queue)
    }

    /// Read-only call into a target.
    pub fn query(&self, target: &Identifier, payload: &[u8]) -> Result<Vec<u8>, TargetError> {
        self.state.targets.query(target, payload)
    }

    pub fn chain_validator(&self) -> ChainValidator<'_> {
        ChainValidator::new(
            &self.hasher,
            SignatureVerifier::new(&self.contracts),
            &self.enforcers,
            self.config.max_chain_length,
        )
    }

    /// Check a chain without executing anything.
    pub fn validate(
        &self,
        invoker: Identifier,
        action: &Action,
        chain: &[SignedDelegation],
    ) -> Result<Authorization, ChainError> {
        self.chain_validator().validate(invoker, action, chain)
    }

    /// Verify and execute every batch, all or nothing.
    ///
    /// Returns one output per invocation, in submission order. On error no
    /// state changes, consumed nonces included, survive.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub fn invoke(&mut self, batches: &[SignedInvocations]) -> Result<Vec<ExecutionOutput>, InvokeError> {
        let verifier = SignatureVerifier::new(&self.contracts);
        let validator = ChainValidator::new(
            &self.hasher,
            verifier,
            &self.enforcers,
            self.config.max_chain_length,
        );
        let hasher = &self.hasher;
        let dispatcher = &self.enforcers;

        let result: Result<_, InvokeError> = transact_blocking(&mut self.state, |state| {
            let mut outputs = vec![];
            let mut roots = vec![];
            let mut touched: Vec<Identifier> = vec![];

            for (b, signed) in batches.iter().enumerate() {
                signed
                    .try_verify(hasher, &verifier)
                    .map_err(|source| InvokeError::InvalidSignature {
                        at: Position::batch(b),
                        link: None,
                        source,
                    })?;
                let invoker = signed.issuer();

                for (i, invocation) in signed.payload().batch.iter().enumerate() {
                    let at = Position::invocation(b, i);
                    let action = &invocation.action;
                    let rp = invocation.replay_protection;

                    state
                        .ledger
                        .consume(invoker, rp.queue, rp.nonce)
                        .map_err(|source| InvokeError::StaleNonce { at, source })?;

                    let auth = validator
                        .validate(invoker, action, &invocation.authority)
                        .map_err(|err| InvokeError::from_chain(at, err))?;

                    let ctx = CallContext {
                        sender: auth.root,
                        invoker,
                        resource_budget: action.resource_budget,
                    };
                    let return_data = state
                        .targets
                        .call(&action.target, &ctx, &action.payload)
                        .map_err(|source| InvokeError::TargetExecutionFailed { at, source })?;

                    let output = ExecutionOutput {
                        target: action.target,
                        return_data,
                    };

                    for bound in &auth.caveats {
                        dispatcher.enforce_after(bound, action, &output).map_err(|source| {
                            InvokeError::CaveatRejected {
                                at,
                                link: bound.link,
                                caveat: bound.index,
                                stage: Stage::Post,
                                source,
                            }
                        })?;
                    }

                    debug!(%at, root = %auth.root, target = %action.target, "invocation executed");
                    roots.push(auth.root);
                    if !touched.contains(&action.target) {
                        touched.push(action.target);
                    }
                    outputs.push((b, i, output));
                }
            }

            for id in touched {
                if let Some(target) = state.targets.get(&id) {
                    target
                        .after_invoke(&roots)
                        .map_err(|source| InvokeError::AfterInvokeRejected { target: id, source })?;
                }
            }

            Ok(outputs)
        });

        let outputs = match result {
            Ok(outputs) => outputs,
            Err(err) => {
                warn!(kind = %err.kind(), %err, "invoke rolled back");
                return Err(err);
            }
        };

        info!(invocations = outputs.len(), "invoke committed");

        Ok(outputs
            .into_iter()
            .map(|(b, i, output)| {
                if let Some(invocation) = batches[b].payload().batch.get(i) {
                    self.listener.on_invocation(invocation, &output);
                }
                output
            })
            .collect())
    }
}
