//! Host function bridge
//!
//! A host function is a plain callback plus an opaque context and the
//! signature it was declared with. The callback receives the store (so it can
//! re-enter [`super::execute`]), the instance it was invoked through, the
//! arguments, and the current call depth. Any state it mutates lives in the
//! context behind interior mutability.
//!
//! A callback that re-enters the engine recurses natively. When the native
//! stack runs low, the callback is moved onto a fresh heap-allocated stack
//! segment, so host recursion up to `CALL_STACK_LIMIT` cannot overflow the
//! thread's stack.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use log::trace;

use super::limits::{HOST_CALL_RED_ZONE, HOST_CALL_STACK_SEGMENT};
use super::{ExecutionResult, InstanceId, Store, Trap, Value};
use crate::parser::module::FunctionType;

/// Opaque state handed back to a callback on every invocation
pub type HostContext = Rc<dyn Any>;

pub type HostCallback = fn(&HostContext, &mut Store, InstanceId, &[Value], u32) -> ExecutionResult;

pub struct HostFunction {
    pub callback: HostCallback,
    pub context: HostContext,
    pub func_type: FunctionType,
}

impl HostFunction {
    pub fn new(func_type: FunctionType, callback: HostCallback) -> Self {
        Self::with_context(func_type, Rc::new(()), callback)
    }

    pub fn with_context(func_type: FunctionType, context: HostContext, callback: HostCallback) -> Self {
        HostFunction {
            callback,
            context,
            func_type,
        }
    }

    /// Run the callback and check its result against the declared signature.
    pub(crate) fn invoke(
        &self,
        store: &mut Store,
        instance: InstanceId,
        args: &[Value],
        depth: u32,
    ) -> Result<Option<Value>, Trap> {
        trace!("invoking host function {} at depth {}", self.func_type, depth);
        let result = stacker::maybe_grow(HOST_CALL_RED_ZONE, HOST_CALL_STACK_SEGMENT, || {
            (self.callback)(&self.context, store, instance, args, depth)
        });
        match result {
            ExecutionResult::Trapped => Err(Trap::HostTrap),
            ExecutionResult::Returned(value) => {
                let returned = usize::from(value.is_some());
                if returned != self.func_type.return_types.len() {
                    return Err(Trap::ArityMismatch {
                        expected: self.func_type.return_types.len(),
                        actual: returned,
                    });
                }
                Ok(value)
            }
        }
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("func_type", &self.func_type)
            .finish_non_exhaustive()
    }
}
