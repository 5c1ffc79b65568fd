use super::InvocationListener;
use crate::{invocation::Invocation, target::ExecutionOutput};
use derive_more::{From, Into};
use dupe::Dupe;
use std::{cell::RefCell, rc::Rc};
use tracing::instrument;

/// A committed invocation and what it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub invocation: Invocation,
    pub output: ExecutionOutput,
}

/// Records every committed invocation in memory.
#[derive(Debug, Default, Clone, Dupe, From, Into)]
pub struct Log(pub Rc<RefCell<Vec<Event>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event)
    }

    pub fn pop(&self) -> Option<Event> {
        self.0.borrow_mut().pop()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }
}

impl InvocationListener for Log {
    #[instrument(skip_all, fields(target = %output.target))]
    fn on_invocation(&self, invocation: &Invocation, output: &ExecutionOutput) {
        self.push(Event {
            invocation: invocation.clone(),
            output: output.clone(),
        })
    }
}
