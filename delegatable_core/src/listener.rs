//! Observers of committed invocations.

pub mod log;
pub mod no_listener;

use crate::{invocation::Invocation, target::ExecutionOutput};

/// Trait for observing invocations.
///
/// Only fires for calls that committed: a rolled-back call never reaches a
/// listener. Invocations are reported in execution order.
pub trait InvocationListener {
    fn on_invocation(&self, invocation: &Invocation, output: &ExecutionOutput);
}
