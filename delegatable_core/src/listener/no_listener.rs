use super::InvocationListener;
use crate::{invocation::Invocation, target::ExecutionOutput};
use dupe::Dupe;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Dupe, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoListener;

impl InvocationListener for NoListener {
    fn on_invocation(&self, _invocation: &Invocation, _output: &ExecutionOutput) {}
}
