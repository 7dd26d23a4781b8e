//! Operand stack
//!
//! One stack serves a whole call chain; each frame owns the segment above its
//! base height.

use super::{Trap, Value};
use crate::parser::module::ValueType;

#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, Trap> {
        self.values.pop().ok_or(Trap::StackUnderflow)
    }

    pub fn pop_typed(&mut self, expected: ValueType) -> Result<Value, Trap> {
        let value = self.pop()?;
        if value.typ() != expected {
            return Err(Trap::TypeMismatch {
                expected,
                actual: value.typ(),
            });
        }
        Ok(value)
    }

    pub fn pop_i32(&mut self) -> Result<i32, Trap> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            other => Err(mismatch(ValueType::I32, other)),
        }
    }

    pub fn pop_i64(&mut self) -> Result<i64, Trap> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            other => Err(mismatch(ValueType::I64, other)),
        }
    }

    pub fn pop_f32(&mut self) -> Result<f32, Trap> {
        match self.pop()? {
            Value::F32(v) => Ok(v),
            other => Err(mismatch(ValueType::F32, other)),
        }
    }

    pub fn pop_f64(&mut self) -> Result<f64, Trap> {
        match self.pop()? {
            Value::F64(v) => Ok(v),
            other => Err(mismatch(ValueType::F64, other)),
        }
    }

    /// Pop the top `n` values, returned in push order
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Trap> {
        let at = self.values.len().checked_sub(n).ok_or(Trap::StackUnderflow)?;
        Ok(self.values.split_off(at))
    }

    /// Keep the top `arity` values and discard everything between them and
    /// `height`. This is how branches and returns unwind the stack.
    pub fn unwind(&mut self, height: usize, arity: usize) -> Result<(), Trap> {
        let len = self.values.len();
        if len < height + arity {
            return Err(Trap::StackUnderflow);
        }
        self.values.drain(height..len - arity);
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn mismatch(expected: ValueType, actual: Value) -> Trap {
    Trap::TypeMismatch {
        expected,
        actual: actual.typ(),
    }
}
