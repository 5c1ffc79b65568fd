//! Trust anchors: identities an external registry vouches for.
//!
//! The core only ever asks [`TrustRegistry::is_trust_anchor`]. Mutation is
//! reserved to a single controller identity.

use crate::principal::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeSet, fmt, rc::Rc};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Read-only view of a trust registry.
pub trait TrustRegistry: fmt::Debug {
    fn is_trust_anchor(&self, id: &Identifier) -> bool;
}

impl<R: TrustRegistry> TrustRegistry for Rc<RefCell<R>> {
    fn is_trust_anchor(&self, id: &Identifier) -> bool {
        self.borrow().is_trust_anchor(id)
    }
}

/// An in-memory registry whose anchors are managed by one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTrustRegistry {
    controller: Identifier,
    anchors: BTreeSet<Identifier>,
}

impl MemoryTrustRegistry {
    pub fn new(controller: Identifier) -> Self {
        Self {
            controller,
            anchors: BTreeSet::new(),
        }
    }

    pub fn controller(&self) -> Identifier {
        self.controller
    }

    fn authorize(&self, caller: Identifier) -> Result<(), RegistryError> {
        if caller == self.controller {
            Ok(())
        } else {
            warn!(%caller, "unauthorized registry action");
            Err(RegistryError::UnauthorizedRegistryAction { caller })
        }
    }

    /// Add an anchor. `caller` must be the controller, as authenticated by the host.
    #[instrument(skip(self))]
    pub fn add_trust_anchor(&mut self, caller: Identifier, anchor: Identifier) -> Result<(), RegistryError> {
        self.authorize(caller)?;
        if self.anchors.insert(anchor) {
            info!("trust anchor added");
        }
        Ok(())
    }

    /// Remove an anchor. `caller` must be the controller, as authenticated by the host.
    #[instrument(skip(self))]
    pub fn remove_trust_anchor(
        &mut self,
        caller: Identifier,
        anchor: Identifier,
    ) -> Result<(), RegistryError> {
        self.authorize(caller)?;
        if self.anchors.remove(&anchor) {
            info!("trust anchor removed");
        }
        Ok(())
    }

    /// Hand control to a new controller.
    pub fn transfer_control(&mut self, caller: Identifier, controller: Identifier) -> Result<(), RegistryError> {
        self.authorize(caller)?;
        self.controller = controller;
        Ok(())
    }
}

impl TrustRegistry for MemoryTrustRegistry {
    fn is_trust_anchor(&self, id: &Identifier) -> bool {
        self.anchors.contains(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{caller} may not modify the trust registry")]
    UnauthorizedRegistryAction { caller: Identifier },
}
