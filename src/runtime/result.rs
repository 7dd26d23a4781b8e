use std::fmt;

use super::Value;

/// Outcome of executing a function: a trap, or a normal return carrying the
/// function's result if its signature declares one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionResult {
    Trapped,
    Returned(Option<Value>),
}

impl ExecutionResult {
    pub const VOID: ExecutionResult = ExecutionResult::Returned(None);

    pub fn trapped(&self) -> bool {
        matches!(self, ExecutionResult::Trapped)
    }

    pub fn has_value(&self) -> bool {
        matches!(self, ExecutionResult::Returned(Some(_)))
    }

    pub fn value(&self) -> Option<Value> {
        match self {
            ExecutionResult::Returned(value) => *value,
            ExecutionResult::Trapped => None,
        }
    }
}

impl From<Value> for ExecutionResult {
    fn from(value: Value) -> Self {
        ExecutionResult::Returned(Some(value))
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Trapped => write!(f, "trapped"),
            ExecutionResult::Returned(None) => write!(f, "returned"),
            ExecutionResult::Returned(Some(value)) => write!(f, "returned {value}"),
        }
    }
}
