//! WebAssembly runtime
//!
//! Linking ([`Store`], [`ImportObject`]), the host function bridge and the
//! execution engine ([`execute`]). Execution never unwinds: every outcome is
//! an [`ExecutionResult`].

pub mod control;
pub mod executor;
pub mod frame;
pub mod host;
pub mod imports;
pub mod instance;
pub mod limits;
pub mod memory;
pub mod ops;
pub mod result;
pub mod stack;
pub mod store;
pub mod table;
pub mod value;

#[cfg(test)]
pub mod test_utils;

pub use executor::{execute, invoke};
pub use host::{HostCallback, HostContext, HostFunction};
pub use imports::{ExternalFunction, ExternalGlobal, ImportObject};
pub use instance::{FuncRef, FunctionSlot, Instance, InstanceId};
pub use memory::{Memory, SharedMemory};
pub use result::ExecutionResult;
pub use store::Store;
pub use table::{SharedTable, Table};
pub use value::{SharedGlobal, Value};

use crate::parser::module::ValueType;

/// Errors raised while linking and instantiating a module
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown import {module}.{name}")]
    UnknownImport { module: String, name: String },
    #[error("incompatible import type for {module}.{name}: {reason}")]
    ImportTypeMismatch {
        module: String,
        name: String,
        reason: String,
    },
    #[error("incompatible import type for {module}.{name}: expected {expected}")]
    IncompatibleImportType {
        module: String,
        name: String,
        expected: &'static str,
    },
    #[error("{0} segment does not fit")]
    SegmentOutOfBounds(&'static str),
    #[error("memory size must be at most {limit} pages, got {requested}")]
    MemoryLimitExceeded { requested: u32, limit: u32 },
    #[error("memory pages limit {0} exceeds the maximum of 65536")]
    InvalidMemoryPagesLimit(u32),
    #[error("unknown {kind} {index}")]
    UnknownIndex { kind: &'static str, index: u32 },
    #[error("constant expression type mismatch")]
    ConstExprTypeMismatch,
    #[error("start function trapped")]
    StartTrapped,
}

/// Reasons a call chain stops with a trap. These never cross the
/// [`execute`] boundary: they collapse into [`ExecutionResult::Trapped`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Trap {
    #[error("unreachable executed")]
    Unreachable,
    #[error("call stack exhausted")]
    CallStackExhausted,
    #[error("integer divide by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("invalid conversion to integer")]
    InvalidConversion,
    #[error("out of bounds memory access")]
    MemoryOutOfBounds,
    #[error("undefined element")]
    UndefinedElement,
    #[error("uninitialized element")]
    UninitializedElement,
    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,
    #[error("host function trapped")]
    HostTrap,
    #[error("global is immutable")]
    ImmutableGlobal,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ValueType,
        actual: ValueType,
    },
    #[error("wrong number of values: expected {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("unknown {kind} {index}")]
    UnknownIndex { kind: &'static str, index: u32 },
}
