//! Memory instructions
//!
//! Effective address is the popped i32 (as u32) plus the static offset,
//! computed without wrapping. Accesses are little endian.

use super::*;
use crate::runtime::SharedMemory;

macro_rules! load {
    ($name:ident, $read:ident, |$raw:ident| $convert:expr) => {
        pub fn $name(stack: &mut Stack, memory: &SharedMemory, memarg: &MemArg) -> Result<(), Trap> {
            let addr = stack.pop_i32()? as u32;
            let $raw = memory.borrow().$read(addr, memarg.offset)?;
            stack.push(Value::from($convert));
            Ok(())
        }
    };
}

macro_rules! store {
    ($name:ident, $pop:ident, $write:ident, |$c:ident| $convert:expr) => {
        pub fn $name(stack: &mut Stack, memory: &SharedMemory, memarg: &MemArg) -> Result<(), Trap> {
            let $c = stack.$pop()?;
            let addr = stack.pop_i32()? as u32;
            memory.borrow_mut().$write(addr, memarg.offset, $convert)
        }
    };
}

load!(i32_load, read_u32, |v| v as i32);
load!(i64_load, read_u64, |v| v as i64);
load!(f32_load, read_u32, |v| f32::from_bits(v));
load!(f64_load, read_u64, |v| f64::from_bits(v));
load!(i32_load8_s, read_u8, |v| i32::from(v as i8));
load!(i32_load8_u, read_u8, |v| i32::from(v));
load!(i32_load16_s, read_u16, |v| i32::from(v as i16));
load!(i32_load16_u, read_u16, |v| i32::from(v));
load!(i64_load8_s, read_u8, |v| i64::from(v as i8));
load!(i64_load8_u, read_u8, |v| i64::from(v));
load!(i64_load16_s, read_u16, |v| i64::from(v as i16));
load!(i64_load16_u, read_u16, |v| i64::from(v));
load!(i64_load32_s, read_u32, |v| i64::from(v as i32));
load!(i64_load32_u, read_u32, |v| i64::from(v));

store!(i32_store, pop_i32, write_u32, |c| c as u32);
store!(i64_store, pop_i64, write_u64, |c| c as u64);
store!(f32_store, pop_f32, write_u32, |c| c.to_bits());
store!(f64_store, pop_f64, write_u64, |c| c.to_bits());
store!(i32_store8, pop_i32, write_u8, |c| c as u8);
store!(i32_store16, pop_i32, write_u16, |c| c as u16);
store!(i64_store8, pop_i64, write_u8, |c| c as u8);
store!(i64_store16, pop_i64, write_u16, |c| c as u16);
store!(i64_store32, pop_i64, write_u32, |c| c as u32);

/// memory.size, in pages
pub fn memory_size(stack: &mut Stack, memory: &SharedMemory) -> Result<(), Trap> {
    stack.push(Value::I32(memory.borrow().size() as i32));
    Ok(())
}

/// memory.grow pushes the old size, or -1 on failure
pub fn memory_grow(stack: &mut Stack, memory: &SharedMemory) -> Result<(), Trap> {
    let delta = stack.pop_i32()? as u32;
    let result = memory.borrow_mut().grow(delta);
    stack.push(Value::I32(result));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::ExecutorTest;

    const fn memarg(offset: u32) -> MemArg {
        MemArg { align: 0, offset }
    }

    #[test]
    fn store_then_load() {
        ExecutorTest::new()
            .memory(1)
            .inst(Instruction::I32Const { value: 8 })
            .inst(Instruction::I32Const { value: -2 })
            .inst(Instruction::I32Store { memarg: memarg(4) })
            .inst(Instruction::I32Const { value: 12 })
            .inst(Instruction::I32Load8S { memarg: memarg(0) })
            .returns(ValueType::I32)
            .expect(Value::I32(-2));

        ExecutorTest::new()
            .memory(1)
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::I64Const { value: -1 })
            .inst(Instruction::I64Store32 { memarg: memarg(0) })
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::I64Load { memarg: memarg(0) })
            .returns(ValueType::I64)
            .expect(Value::I64(0xffff_ffff));

        ExecutorTest::new()
            .memory(1)
            .inst(Instruction::I32Const { value: 16 })
            .inst(Instruction::F64Const { value: 2.5 })
            .inst(Instruction::F64Store { memarg: memarg(0) })
            .inst(Instruction::I32Const { value: 16 })
            .inst(Instruction::F64Load { memarg: memarg(0) })
            .returns(ValueType::F64)
            .expect(Value::F64(2.5));
    }

    #[test]
    fn out_of_bounds() {
        ExecutorTest::new()
            .memory(1)
            .inst(Instruction::I32Const { value: 65533 })
            .inst(Instruction::I32Load { memarg: memarg(0) })
            .returns(ValueType::I32)
            .expect_trap(Trap::MemoryOutOfBounds);

        ExecutorTest::new()
            .memory(1)
            .inst(Instruction::I32Const { value: -1 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Store8 { memarg: memarg(u32::MAX) })
            .expect_trap(Trap::MemoryOutOfBounds);
    }

    #[test]
    fn size_and_grow() {
        ExecutorTest::new()
            .memory(1)
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::MemoryGrow)
            .inst(Instruction::Drop)
            .inst(Instruction::MemorySize)
            .returns(ValueType::I32)
            .expect(Value::I32(3));

        ExecutorTest::new()
            .memory(1)
            .inst(Instruction::I32Const { value: 70000 })
            .inst(Instruction::MemoryGrow)
            .returns(ValueType::I32)
            .expect(Value::I32(-1));
    }

    #[test]
    fn missing_memory_traps() {
        ExecutorTest::new()
            .inst(Instruction::MemorySize)
            .returns(ValueType::I32)
            .expect_trap(Trap::UnknownIndex {
                kind: "memory",
                index: 0,
            });
    }
}
