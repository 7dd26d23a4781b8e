//! Instruction implementations, grouped by category
//!
//! Every operation takes the operand stack (plus whatever state it touches)
//! and returns `Result<_, Trap>`.

pub mod bitwise;
pub mod comparison;
pub mod control;
pub mod conversion;
pub mod memory;
pub mod numeric;
pub mod parametric;
pub mod variable;

pub(crate) use crate::parser::instruction::MemArg;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::{Trap, Value};

/// A number type that can be popped from the stack with a type check
pub(crate) trait Operand: Sized {
    fn pop(stack: &mut Stack) -> Result<Self, Trap>;
}

impl Operand for i32 {
    fn pop(stack: &mut Stack) -> Result<Self, Trap> {
        stack.pop_i32()
    }
}

impl Operand for i64 {
    fn pop(stack: &mut Stack) -> Result<Self, Trap> {
        stack.pop_i64()
    }
}

impl Operand for f32 {
    fn pop(stack: &mut Stack) -> Result<Self, Trap> {
        stack.pop_f32()
    }
}

impl Operand for f64 {
    fn pop(stack: &mut Stack) -> Result<Self, Trap> {
        stack.pop_f64()
    }
}

pub(crate) fn unop<T: Operand, R: Into<Value>>(stack: &mut Stack, op: impl FnOnce(T) -> R) -> Result<(), Trap> {
    let c = T::pop(stack)?;
    stack.push(op(c).into());
    Ok(())
}

/// Pops `c2` then `c1` and pushes `op(c1, c2)`
pub(crate) fn binop<T: Operand, R: Into<Value>>(stack: &mut Stack, op: impl FnOnce(T, T) -> R) -> Result<(), Trap> {
    let c2 = T::pop(stack)?;
    let c1 = T::pop(stack)?;
    stack.push(op(c1, c2).into());
    Ok(())
}

pub(crate) fn try_unop<T: Operand, R: Into<Value>>(
    stack: &mut Stack,
    op: impl FnOnce(T) -> Result<R, Trap>,
) -> Result<(), Trap> {
    let c = T::pop(stack)?;
    stack.push(op(c)?.into());
    Ok(())
}

pub(crate) fn try_binop<T: Operand, R: Into<Value>>(
    stack: &mut Stack,
    op: impl FnOnce(T, T) -> Result<R, Trap>,
) -> Result<(), Trap> {
    let c2 = T::pop(stack)?;
    let c1 = T::pop(stack)?;
    stack.push(op(c1, c2)?.into());
    Ok(())
}

/// Comparisons push an i32 boolean
pub(crate) fn relop<T: Operand>(stack: &mut Stack, op: impl FnOnce(T, T) -> bool) -> Result<(), Trap> {
    binop(stack, |c1, c2| i32::from(op(c1, c2)))
}

pub(crate) fn testop<T: Operand>(stack: &mut Stack, op: impl FnOnce(T) -> bool) -> Result<(), Trap> {
    unop(stack, |c| i32::from(op(c)))
}
