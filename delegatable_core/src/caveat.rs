//! Dispatch of caveats to their enforcers.
//!
//! Every [`Caveat`] names an enforcer by [`Identifier`]. The
//! [`CaveatDispatcher`] resolves that identifier to a registered
//! [`CaveatEnforcer`] and asks it to allow or deny the pending action, once
//! before execution and once after. An unknown enforcer always denies.

pub mod allowed_methods;
pub mod allowed_targets;
pub mod resource_budget;
pub mod revocation;
pub mod trust_anchor;

use crate::{
    crypto::digest::Digest,
    delegation::{Caveat, SignedDelegation},
    invocation::Action,
    principal::identifier::Identifier,
    target::ExecutionOutput,
};
use std::{collections::HashMap, fmt, rc::Rc};
use thiserror::Error;
use tracing::{instrument, warn};

/// What an enforcer gets to see about the link carrying its caveat.
#[derive(Debug, Clone, Copy)]
pub struct Enforcement<'a> {
    /// The action being authorized.
    pub action: &'a Action,

    /// Typed digest of the signed delegation that carries the caveat.
    pub delegation_hash: Digest<SignedDelegation>,

    /// The delegate named by that delegation.
    pub delegate: Identifier,

    /// The signer of that delegation.
    pub delegator: Identifier,
}

/// An external check that can veto an action.
pub trait CaveatEnforcer: fmt::Debug {
    /// Inspect the pending action before it runs.
    fn pre_enforce(&self, terms: &[u8], enforcement: &Enforcement<'_>) -> Result<(), CaveatRejection>;

    /// Inspect the action after it ran. Allows by default.
    fn post_enforce(
        &self,
        _terms: &[u8],
        _enforcement: &Enforcement<'_>,
        _output: &ExecutionOutput,
    ) -> Result<(), CaveatRejection> {
        Ok(())
    }
}

/// An enforcer's reason for denying an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CaveatRejection(pub String);

impl CaveatRejection {
    pub fn new<S: ToString>(reason: S) -> Self {
        Self(reason.to_string())
    }
}

/// A caveat together with the link it was found on.
///
/// Produced by chain validation so that post-execution checks run against
/// exactly the caveats that were checked before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundCaveat {
    pub caveat: Caveat,

    /// Position of the carrying link in its chain.
    pub link: usize,

    /// Position of the caveat within that link.
    pub index: usize,

    pub delegation_hash: Digest<SignedDelegation>,
    pub delegate: Identifier,
    pub delegator: Identifier,
}

impl BoundCaveat {
    pub fn enforcement<'a>(&self, action: &'a Action) -> Enforcement<'a> {
        Enforcement {
            action,
            delegation_hash: self.delegation_hash,
            delegate: self.delegate,
            delegator: self.delegator,
        }
    }
}

/// Registered enforcers by identity.
#[derive(Debug, Default, Clone)]
pub struct CaveatDispatcher {
    enforcers: HashMap<Identifier, Rc<dyn CaveatEnforcer>>,
}

impl CaveatDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the enforcer answering for `id`.
    pub fn register(&mut self, id: Identifier, enforcer: Rc<dyn CaveatEnforcer>) {
        self.enforcers.insert(id, enforcer);
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.enforcers.contains_key(id)
    }

    fn resolve(&self, id: &Identifier) -> Result<&Rc<dyn CaveatEnforcer>, DispatchError> {
        self.enforcers
            .get(id)
            .ok_or(DispatchError::UnknownEnforcer(*id))
    }

    /// Run one caveat's pre-execution check.
    #[instrument(skip_all, fields(enforcer = %caveat.enforcer, delegate = %enforcement.delegate))]
    pub fn enforce(&self, caveat: &Caveat, enforcement: &Enforcement<'_>) -> Result<(), DispatchError> {
        let enforcer = self.resolve(&caveat.enforcer)?;
        enforcer
            .pre_enforce(&caveat.terms, enforcement)
            .map_err(|reason| {
                warn!(%reason, "caveat rejected action");
                DispatchError::Rejected {
                    enforcer: caveat.enforcer,
                    reason,
                }
            })
    }

    /// Run every caveat of one link, in declaration order. All must allow.
    ///
    /// On failure, returns the index of the first caveat that denied.
    pub fn enforce_all(
        &self,
        caveats: &[Caveat],
        enforcement: &Enforcement<'_>,
    ) -> Result<(), (usize, DispatchError)> {
        caveats
            .iter()
            .enumerate()
            .try_for_each(|(idx, caveat)| self.enforce(caveat, enforcement).map_err(|e| (idx, e)))
    }

    /// Run one caveat's post-execution check.
    #[instrument(skip_all, fields(enforcer = %bound.caveat.enforcer))]
    pub fn enforce_after(
        &self,
        bound: &BoundCaveat,
        action: &Action,
        output: &ExecutionOutput,
    ) -> Result<(), DispatchError> {
        let enforcer = self.resolve(&bound.caveat.enforcer)?;
        enforcer
            .post_enforce(&bound.caveat.terms, &bound.enforcement(action), output)
            .map_err(|reason| {
                warn!(%reason, "caveat rejected result");
                DispatchError::Rejected {
                    enforcer: bound.caveat.enforcer,
                    reason,
                }
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No enforcer registered as {0}")]
    UnknownEnforcer(Identifier),

    #[error("Enforcer {enforcer} rejected: {reason}")]
    Rejected {
        enforcer: Identifier,
        #[source]
        reason: CaveatRejection,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Recorder, Verdict};
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, rc::Rc};

    fn enforcement(action: &Action) -> Enforcement<'_> {
        Enforcement {
            action,
            delegation_hash: Digest::zero(),
            delegate: Identifier::derive("bob"),
            delegator: Identifier::derive("alice"),
        }
    }

    fn setup() -> (CaveatDispatcher, Rc<RefCell<Vec<String>>>, Identifier, Identifier) {
        let log = Rc::new(RefCell::new(vec![]));
        let allow = Identifier::derive("allow");
        let deny = Identifier::derive("deny");

        let mut dispatcher = CaveatDispatcher::new();
        dispatcher.register(allow, Rc::new(Recorder::new("allow", Verdict::Allow, log.clone())));
        dispatcher.register(deny, Rc::new(Recorder::new("deny", Verdict::Deny, log.clone())));
        (dispatcher, log, allow, deny)
    }

    #[test]
    fn test_empty_caveats_pass() {
        let (dispatcher, log, _, _) = setup();
        let action = Action::new(Identifier::derive("target"), vec![], 0);

        assert!(dispatcher.enforce_all(&[], &enforcement(&action)).is_ok());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_conjunction_allow_deny() {
        let (dispatcher, log, allow, deny) = setup();
        let action = Action::new(Identifier::derive("target"), vec![], 0);
        let caveats = [Caveat::new(allow, vec![]), Caveat::new(deny, vec![])];

        let (idx, err) = dispatcher
            .enforce_all(&caveats, &enforcement(&action))
            .unwrap_err();

        assert_eq!(idx, 1);
        assert!(matches!(err, DispatchError::Rejected { enforcer, .. } if enforcer == deny));
        assert_eq!(*log.borrow(), vec!["pre:allow".to_string(), "pre:deny".to_string()]);
    }

    #[test]
    fn test_conjunction_short_circuits() {
        let (dispatcher, log, allow, deny) = setup();
        let action = Action::new(Identifier::derive("target"), vec![], 0);
        let caveats = [Caveat::new(deny, vec![]), Caveat::new(allow, vec![])];

        assert!(dispatcher.enforce_all(&caveats, &enforcement(&action)).is_err());
        assert_eq!(*log.borrow(), vec!["pre:deny".to_string()]);
    }

    #[test]
    fn test_declared_order() {
        let log = Rc::new(RefCell::new(vec![]));
        let mut dispatcher = CaveatDispatcher::new();
        let names = ["first", "second", "third"];
        for name in names {
            dispatcher.register(
                Identifier::derive(name),
                Rc::new(Recorder::new(name, Verdict::Allow, log.clone())),
            );
        }

        let action = Action::new(Identifier::derive("target"), vec![], 0);
        let caveats: Vec<Caveat> = ["third", "first", "second"]
            .iter()
            .map(|name| Caveat::new(Identifier::derive(name), vec![]))
            .collect();

        dispatcher.enforce_all(&caveats, &enforcement(&action)).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                "pre:third".to_string(),
                "pre:first".to_string(),
                "pre:second".to_string()
            ]
        );
    }

    #[test]
    fn test_unknown_enforcer_denies() {
        let dispatcher = CaveatDispatcher::new();
        let action = Action::new(Identifier::derive("target"), vec![], 0);
        let ghost = Identifier::derive("ghost");

        assert_eq!(
            dispatcher.enforce(&Caveat::new(ghost, vec![]), &enforcement(&action)),
            Err(DispatchError::UnknownEnforcer(ghost))
        );
    }
}
