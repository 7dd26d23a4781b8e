//! Control instructions
//!
//! Structured instructions push labels on the frame's label stack; branches
//! unwind the operand stack to the target label and jump to its
//! continuation. Calls are not performed here: they are reported to the
//! executor as [`Flow::Call`] so it can push a frame.

use super::*;
use crate::parser::instruction::BlockType;
use crate::runtime::control::{Label, LabelType};
use crate::runtime::frame::Frame;
use crate::runtime::{FuncRef, Store};

/// What the executor does after an instruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Continue,
    Call(FuncRef),
    Return,
}

pub fn unreachable() -> Result<Flow, Trap> {
    Err(Trap::Unreachable)
}

fn block_arity(frame: &Frame, block_type: &BlockType) -> Result<(usize, usize), Trap> {
    block_type.arity(&frame.module).ok_or(match block_type {
        BlockType::FuncType(idx) => Trap::UnknownIndex {
            kind: "type",
            index: *idx,
        },
        _ => Trap::UnknownIndex { kind: "type", index: 0 },
    })
}

fn enter(
    stack: &Stack,
    frame: &mut Frame,
    label_type: LabelType,
    block_type: &BlockType,
    continuation: usize,
) -> Result<(), Trap> {
    let (params, results) = block_arity(frame, block_type)?;
    let stack_height = stack.depth().checked_sub(params).ok_or(Trap::StackUnderflow)?;
    let arity = match label_type {
        LabelType::Loop => params,
        LabelType::Block | LabelType::If => results,
    };
    frame.labels.push(Label {
        label_type,
        arity,
        stack_height,
        continuation,
    });
    Ok(())
}

pub fn block(stack: &mut Stack, frame: &mut Frame, block_type: &BlockType, end: u32) -> Result<Flow, Trap> {
    enter(stack, frame, LabelType::Block, block_type, end as usize + 1)?;
    Ok(Flow::Continue)
}

/// loop: a branch to the label re-enters the body
pub fn loop_(stack: &mut Stack, frame: &mut Frame, block_type: &BlockType) -> Result<Flow, Trap> {
    let body = frame.pc;
    enter(stack, frame, LabelType::Loop, block_type, body)?;
    Ok(Flow::Continue)
}

pub fn if_(
    stack: &mut Stack,
    frame: &mut Frame,
    block_type: &BlockType,
    else_pc: Option<u32>,
    end: u32,
) -> Result<Flow, Trap> {
    let condition = stack.pop_i32()?;
    enter(stack, frame, LabelType::If, block_type, end as usize + 1)?;
    if condition == 0 {
        // The matching end pops the label
        frame.pc = match else_pc {
            Some(else_pc) => else_pc as usize + 1,
            None => end as usize,
        };
    }
    Ok(Flow::Continue)
}

/// Reached only at the end of a taken then-branch
pub fn else_(frame: &mut Frame, end: u32) -> Result<Flow, Trap> {
    frame.pc = end as usize;
    Ok(Flow::Continue)
}

/// end of a block, or of the function body once no labels remain
pub fn end(frame: &mut Frame) -> Result<Flow, Trap> {
    match frame.labels.pop() {
        Some(_) => Ok(Flow::Continue),
        None => Ok(Flow::Return),
    }
}

/// Branch to the label `label_idx` levels out. One past the innermost
/// block is the function body itself, which returns.
fn branch(stack: &mut Stack, frame: &mut Frame, label_idx: u32) -> Result<Flow, Trap> {
    if label_idx as usize == frame.labels.len() {
        return Ok(Flow::Return);
    }
    let target = frame.labels.branch(label_idx)?;
    stack.unwind(target.stack_height, target.arity)?;
    frame.pc = target.continuation;
    Ok(Flow::Continue)
}

pub fn br(stack: &mut Stack, frame: &mut Frame, label_idx: u32) -> Result<Flow, Trap> {
    branch(stack, frame, label_idx)
}

pub fn br_if(stack: &mut Stack, frame: &mut Frame, label_idx: u32) -> Result<Flow, Trap> {
    if stack.pop_i32()? != 0 {
        branch(stack, frame, label_idx)
    } else {
        Ok(Flow::Continue)
    }
}

pub fn br_table(stack: &mut Stack, frame: &mut Frame, labels: &[u32], default: u32) -> Result<Flow, Trap> {
    let index = stack.pop_i32()? as u32 as usize;
    let label_idx = labels.get(index).copied().unwrap_or(default);
    branch(stack, frame, label_idx)
}

pub fn return_() -> Result<Flow, Trap> {
    Ok(Flow::Return)
}

pub fn call(frame: &Frame, func_idx: u32) -> Result<Flow, Trap> {
    Ok(Flow::Call(FuncRef {
        instance: frame.instance,
        func_idx,
    }))
}

/// call_indirect: look the callee up in the table and check its signature
/// against the expected type before calling
pub fn call_indirect(
    stack: &mut Stack,
    store: &Store,
    frame: &Frame,
    type_idx: u32,
    table_idx: u32,
) -> Result<Flow, Trap> {
    let unknown_table = Trap::UnknownIndex {
        kind: "table",
        index: table_idx,
    };
    if table_idx != 0 {
        return Err(unknown_table);
    }
    let table = store.instance(frame.instance)?.table().ok_or(unknown_table)?;
    let expected = frame.module.types.get(type_idx as usize).ok_or(Trap::UnknownIndex {
        kind: "type",
        index: type_idx,
    })?;

    let elem_idx = stack.pop_i32()? as u32;
    let target = table.borrow().get(elem_idx)?;
    let actual = store.function_type(target).ok_or(Trap::UndefinedElement)?;
    if actual != expected {
        return Err(Trap::IndirectCallTypeMismatch);
    }
    Ok(Flow::Call(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::ExecutorTest;

    const I32_BLOCK: BlockType = BlockType::Value(ValueType::I32);

    #[test]
    fn block_branch_skips_rest() {
        ExecutorTest::new()
            .inst(Instruction::Block {
                block_type: I32_BLOCK,
                end: 0,
            })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::Br { label_idx: 0 })
            .inst(Instruction::Unreachable)
            .inst(Instruction::End)
            .returns(ValueType::I32)
            .expect(Value::I32(2));
    }

    #[test]
    fn if_else() {
        for (condition, expected) in [(1, 10), (0, 20)] {
            ExecutorTest::new()
                .inst(Instruction::I32Const { value: condition })
                .inst(Instruction::If {
                    block_type: I32_BLOCK,
                    else_pc: None,
                    end: 0,
                })
                .inst(Instruction::I32Const { value: 10 })
                .inst(Instruction::Else { end: 0 })
                .inst(Instruction::I32Const { value: 20 })
                .inst(Instruction::End)
                .returns(ValueType::I32)
                .expect(Value::I32(expected));
        }
    }

    #[test]
    fn if_without_else() {
        ExecutorTest::new()
            .local(ValueType::I32)
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::If {
                block_type: BlockType::Empty,
                else_pc: None,
                end: 0,
            })
            .inst(Instruction::Unreachable)
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 7 })
            .returns(ValueType::I32)
            .expect(Value::I32(7));
    }

    #[test]
    fn loop_counts_down() {
        // local0 = 5; loop { local1 += local0; local0 -= 1; br_if local0 }
        ExecutorTest::new()
            .local(ValueType::I32)
            .local(ValueType::I32)
            .inst(Instruction::I32Const { value: 5 })
            .inst(Instruction::LocalSet { local_idx: 0 })
            .inst(Instruction::Loop {
                block_type: BlockType::Empty,
            })
            .inst(Instruction::LocalGet { local_idx: 1 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::I32Add)
            .inst(Instruction::LocalSet { local_idx: 1 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Sub)
            .inst(Instruction::LocalTee { local_idx: 0 })
            .inst(Instruction::BrIf { label_idx: 0 })
            .inst(Instruction::End)
            .inst(Instruction::LocalGet { local_idx: 1 })
            .returns(ValueType::I32)
            .expect(Value::I32(15));
    }

    #[test]
    fn br_table_selects_label() {
        for (index, expected) in [(0, 100), (1, 200), (7, 300)] {
            ExecutorTest::new()
                .inst(Instruction::Block {
                    block_type: BlockType::Empty,
                    end: 0,
                })
                .inst(Instruction::Block {
                    block_type: BlockType::Empty,
                    end: 0,
                })
                .inst(Instruction::Block {
                    block_type: BlockType::Empty,
                    end: 0,
                })
                .inst(Instruction::I32Const { value: index })
                .inst(Instruction::BrTable {
                    labels: vec![0, 1].into_boxed_slice(),
                    default: 2,
                })
                .inst(Instruction::End)
                .inst(Instruction::I32Const { value: 100 })
                .inst(Instruction::Return)
                .inst(Instruction::End)
                .inst(Instruction::I32Const { value: 200 })
                .inst(Instruction::Return)
                .inst(Instruction::End)
                .inst(Instruction::I32Const { value: 300 })
                .returns(ValueType::I32)
                .expect(Value::I32(expected));
        }
    }

    #[test]
    fn branch_to_function_label_returns() {
        ExecutorTest::new()
            .inst(Instruction::Block {
                block_type: BlockType::Empty,
                end: 0,
            })
            .inst(Instruction::I32Const { value: 3 })
            .inst(Instruction::Br { label_idx: 1 })
            .inst(Instruction::End)
            .inst(Instruction::Unreachable)
            .returns(ValueType::I32)
            .expect(Value::I32(3));
    }

    #[test]
    fn branch_unwinds_extra_values() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 9 })
            .inst(Instruction::Block {
                block_type: I32_BLOCK,
                end: 0,
            })
            .inst(Instruction::I64Const { value: 1 })
            .inst(Instruction::I32Const { value: 4 })
            .inst(Instruction::Br { label_idx: 0 })
            .inst(Instruction::End)
            .inst(Instruction::Return)
            .returns(ValueType::I32)
            .expect(Value::I32(4));
    }

    #[test]
    fn unreachable_traps() {
        ExecutorTest::new()
            .inst(Instruction::Unreachable)
            .expect_trap(Trap::Unreachable);
    }

    #[test]
    fn unknown_label() {
        ExecutorTest::new()
            .inst(Instruction::Br { label_idx: 3 })
            .expect_trap(Trap::UnknownIndex {
                kind: "label",
                index: 3,
            });
    }
}
