//! Activation frame of a wasm function
//!
//! Frames live on the engine's heap-allocated frame stack, so wasm-to-wasm
//! calls do not consume native stack.

use std::rc::Rc;

use super::control::LabelStack;
use super::{InstanceId, Trap, Value};
use crate::parser::module::{FunctionType, Module};

#[derive(Debug)]
pub struct Frame {
    pub instance: InstanceId,
    pub module: Rc<Module>,
    pub code_idx: usize,
    pub pc: usize,
    /// Parameters followed by declared locals
    pub locals: Vec<Value>,
    pub labels: LabelStack,
    /// Operand stack height when the frame was entered, arguments excluded
    pub stack_base: usize,
    /// Number of results the function leaves on the stack
    pub arity: usize,
    pub depth: u32,
}

impl Frame {
    pub fn new(
        instance: InstanceId,
        module: Rc<Module>,
        code_idx: usize,
        args: Vec<Value>,
        stack_base: usize,
        depth: u32,
    ) -> Result<Frame, Trap> {
        let unknown = Trap::UnknownIndex {
            kind: "code",
            index: code_idx as u32,
        };
        let func_type = module.code_type(code_idx).ok_or(unknown.clone())?;
        let body = module.code.get(code_idx).ok_or(unknown)?;

        check_args(func_type, &args)?;

        let arity = func_type.return_types.len();
        let mut locals = args;
        locals.extend(body.locals.iter().map(|t| Value::default_for(*t)));

        Ok(Frame {
            instance,
            module,
            code_idx,
            pc: 0,
            locals,
            labels: LabelStack::new(),
            stack_base,
            arity,
            depth,
        })
    }

    pub fn local(&self, local_idx: u32) -> Result<Value, Trap> {
        self.locals
            .get(local_idx as usize)
            .copied()
            .ok_or(Trap::UnknownIndex {
                kind: "local",
                index: local_idx,
            })
    }

    pub fn set_local(&mut self, local_idx: u32, value: Value) -> Result<(), Trap> {
        let slot = self.locals.get_mut(local_idx as usize).ok_or(Trap::UnknownIndex {
            kind: "local",
            index: local_idx,
        })?;
        if slot.typ() != value.typ() {
            return Err(Trap::TypeMismatch {
                expected: slot.typ(),
                actual: value.typ(),
            });
        }
        *slot = value;
        Ok(())
    }
}


/// Check call arguments against the callee's parameter types.
pub(crate) fn check_args(func_type: &FunctionType, args: &[Value]) -> Result<(), Trap> {
    if args.len() != func_type.parameters.len() {
        return Err(Trap::ArityMismatch {
            expected: func_type.parameters.len(),
            actual: args.len(),
        });
    }
    for (arg, expected) in args.iter().zip(&func_type.parameters) {
        if arg.typ() != *expected {
            return Err(Trap::TypeMismatch {
                expected: *expected,
                actual: arg.typ(),
            });
        }
    }
    Ok(())
}
