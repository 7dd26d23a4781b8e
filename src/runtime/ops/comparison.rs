//! Comparison operations, each pushing an i32 boolean

use super::*;

pub fn i32_eqz(stack: &mut Stack) -> Result<(), Trap> {
    testop(stack, |c: i32| c == 0)
}

pub fn i32_eq(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| c1 == c2)
}

pub fn i32_ne(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| c1 != c2)
}

pub fn i32_lt_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| c1 < c2)
}

pub fn i32_lt_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| (c1 as u32) < (c2 as u32))
}

pub fn i32_gt_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| c1 > c2)
}

pub fn i32_gt_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| (c1 as u32) > (c2 as u32))
}

pub fn i32_le_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| c1 <= c2)
}

pub fn i32_le_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| (c1 as u32) <= (c2 as u32))
}

pub fn i32_ge_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| c1 >= c2)
}

pub fn i32_ge_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i32, c2: i32| (c1 as u32) >= (c2 as u32))
}

pub fn i64_eqz(stack: &mut Stack) -> Result<(), Trap> {
    testop(stack, |c: i64| c == 0)
}

pub fn i64_eq(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| c1 == c2)
}

pub fn i64_ne(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| c1 != c2)
}

pub fn i64_lt_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| c1 < c2)
}

pub fn i64_lt_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| (c1 as u64) < (c2 as u64))
}

pub fn i64_gt_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| c1 > c2)
}

pub fn i64_gt_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| (c1 as u64) > (c2 as u64))
}

pub fn i64_le_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| c1 <= c2)
}

pub fn i64_le_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| (c1 as u64) <= (c2 as u64))
}

pub fn i64_ge_s(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| c1 >= c2)
}

pub fn i64_ge_u(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: i64, c2: i64| (c1 as u64) >= (c2 as u64))
}

// Float comparisons follow IEEE 754: any comparison with NaN is false except ne

pub fn f32_eq(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f32, c2: f32| c1 == c2)
}

pub fn f32_ne(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f32, c2: f32| c1 != c2)
}

pub fn f32_lt(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f32, c2: f32| c1 < c2)
}

pub fn f32_gt(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f32, c2: f32| c1 > c2)
}

pub fn f32_le(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f32, c2: f32| c1 <= c2)
}

pub fn f32_ge(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f32, c2: f32| c1 >= c2)
}

pub fn f64_eq(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f64, c2: f64| c1 == c2)
}

pub fn f64_ne(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f64, c2: f64| c1 != c2)
}

pub fn f64_lt(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f64, c2: f64| c1 < c2)
}

pub fn f64_gt(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f64, c2: f64| c1 > c2)
}

pub fn f64_le(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f64, c2: f64| c1 <= c2)
}

pub fn f64_ge(stack: &mut Stack) -> Result<(), Trap> {
    relop(stack, |c1: f64, c2: f64| c1 >= c2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::Instruction;
    use crate::parser::module::ValueType;
    use crate::runtime::test_utils::ExecutorTest;
    use rstest::rstest;

    fn compare(a: Instruction, b: Instruction, op: Instruction) -> ExecutorTest {
        ExecutorTest::new().inst(a).inst(b).inst(op).returns(ValueType::I32)
    }

    #[rstest]
    #[case(Instruction::I32LtS, -1, 0, 1)]
    #[case(Instruction::I32LtU, -1, 0, 0)]
    #[case(Instruction::I32GtU, -1, 0, 1)]
    #[case(Instruction::I32GeS, 5, 5, 1)]
    #[case(Instruction::I32LeU, 6, 5, 0)]
    #[case(Instruction::I32Ne, 6, 5, 1)]
    #[case(Instruction::I32Eq, 6, 5, 0)]
    fn i32_compare(#[case] op: Instruction, #[case] a: i32, #[case] b: i32, #[case] expected: i32) {
        compare(
            Instruction::I32Const { value: a },
            Instruction::I32Const { value: b },
            op,
        )
        .expect(Value::I32(expected));
    }

    #[test]
    fn eqz() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::I32Eqz)
            .returns(ValueType::I32)
            .expect(Value::I32(1));
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 3 })
            .inst(Instruction::I64Eqz)
            .returns(ValueType::I32)
            .expect(Value::I32(0));
    }

    #[test]
    fn i64_unsigned() {
        compare(
            Instruction::I64Const { value: -1 },
            Instruction::I64Const { value: 1 },
            Instruction::I64GtU,
        )
        .expect(Value::I32(1));
    }

    #[test]
    fn nan_compares_false() {
        compare(
            Instruction::F32Const { value: f32::NAN },
            Instruction::F32Const { value: f32::NAN },
            Instruction::F32Eq,
        )
        .expect(Value::I32(0));
        compare(
            Instruction::F64Const { value: f64::NAN },
            Instruction::F64Const { value: 1.0 },
            Instruction::F64Ne,
        )
        .expect(Value::I32(1));
        compare(
            Instruction::F64Const { value: -0.0 },
            Instruction::F64Const { value: 0.0 },
            Instruction::F64Ge,
        )
        .expect(Value::I32(1));
    }
}
