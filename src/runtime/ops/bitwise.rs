//! Bitwise operations
//!
//! Shift and rotate counts are taken modulo the bit width.

use super::*;

pub fn i32_clz(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| c.leading_zeros() as i32)
}

pub fn i32_ctz(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| c.trailing_zeros() as i32)
}

pub fn i32_popcnt(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| c.count_ones() as i32)
}

pub fn i32_and(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| c1 & c2)
}

pub fn i32_or(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| c1 | c2)
}

pub fn i32_xor(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| c1 ^ c2)
}

pub fn i32_shl(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| c1.wrapping_shl(c2 as u32))
}

pub fn i32_shr_s(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| c1.wrapping_shr(c2 as u32))
}

pub fn i32_shr_u(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| (c1 as u32).wrapping_shr(c2 as u32) as i32)
}

pub fn i32_rotl(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| c1.rotate_left(c2 as u32 % 32))
}

pub fn i32_rotr(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i32, c2: i32| c1.rotate_right(c2 as u32 % 32))
}

pub fn i64_clz(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| i64::from(c.leading_zeros()))
}

pub fn i64_ctz(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| i64::from(c.trailing_zeros()))
}

pub fn i64_popcnt(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| i64::from(c.count_ones()))
}

pub fn i64_and(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| c1 & c2)
}

pub fn i64_or(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| c1 | c2)
}

pub fn i64_xor(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| c1 ^ c2)
}

pub fn i64_shl(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| c1.wrapping_shl(c2 as u32))
}

pub fn i64_shr_s(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| c1.wrapping_shr(c2 as u32))
}

pub fn i64_shr_u(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| (c1 as u64).wrapping_shr(c2 as u32) as i64)
}

pub fn i64_rotl(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| c1.rotate_left((c2 as u64 % 64) as u32))
}

pub fn i64_rotr(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: i64, c2: i64| c1.rotate_right((c2 as u64 % 64) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::ExecutorTest;
    use rstest::rstest;

    #[rstest]
    #[case(Instruction::I32Shl, 1, 33, 2)]
    #[case(Instruction::I32ShrS, -8, 1, -4)]
    #[case(Instruction::I32ShrU, -8, 28, 15)]
    #[case(Instruction::I32Rotl, 0x8000_0001u32 as i32, 1, 3)]
    #[case(Instruction::I32Rotr, 3, 1, 0x8000_0001u32 as i32)]
    #[case(Instruction::I32And, 0b1100, 0b1010, 0b1000)]
    #[case(Instruction::I32Or, 0b1100, 0b1010, 0b1110)]
    #[case(Instruction::I32Xor, 0b1100, 0b1010, 0b0110)]
    fn i32_bitwise(#[case] op: Instruction, #[case] a: i32, #[case] b: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: a })
            .inst(Instruction::I32Const { value: b })
            .inst(op)
            .returns(ValueType::I32)
            .expect(Value::I32(expected));
    }

    #[rstest]
    #[case(Instruction::I32Clz, 1, 31)]
    #[case(Instruction::I32Clz, 0, 32)]
    #[case(Instruction::I32Ctz, 0x100, 8)]
    #[case(Instruction::I32Popcnt, -1, 32)]
    fn i32_bit_counts(#[case] op: Instruction, #[case] a: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: a })
            .inst(op)
            .returns(ValueType::I32)
            .expect(Value::I32(expected));
    }

    #[test]
    fn i64_shifts() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 1 })
            .inst(Instruction::I64Const { value: 65 })
            .inst(Instruction::I64Shl)
            .returns(ValueType::I64)
            .expect(Value::I64(2));

        ExecutorTest::new()
            .inst(Instruction::I64Const { value: i64::MIN })
            .inst(Instruction::I64Const { value: 63 })
            .inst(Instruction::I64ShrU)
            .returns(ValueType::I64)
            .expect(Value::I64(1));

        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 1 })
            .inst(Instruction::I64Const { value: -1 })
            .inst(Instruction::I64Rotl)
            .returns(ValueType::I64)
            .expect(Value::I64(i64::MIN));

        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 0 })
            .inst(Instruction::I64Ctz)
            .returns(ValueType::I64)
            .expect(Value::I64(64));
    }
}
