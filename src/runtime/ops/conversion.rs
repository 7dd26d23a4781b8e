//! Conversion operations
//!
//! Float to integer truncation traps on NaN (`InvalidConversion`) and on
//! values outside the target range (`IntegerOverflow`).

use super::*;

/// Truncate toward zero and check the result lies in `[min, max]`, with both
/// bounds given as exactly representable floats.
macro_rules! trunc_checked {
    ($name:ident, $from:ty, $to:ty, $lower:expr, $upper:expr) => {
        fn $name(c: $from) -> Result<$to, Trap> {
            if c.is_nan() {
                return Err(Trap::InvalidConversion);
            }
            let t = c.trunc();
            if t < $lower || t >= $upper {
                return Err(Trap::IntegerOverflow);
            }
            Ok(t as $to)
        }
    };
}

trunc_checked!(f32_to_i32, f32, i32, -2147483648.0f32, 2147483648.0f32);
trunc_checked!(f32_to_u32, f32, u32, 0.0f32, 4294967296.0f32);
trunc_checked!(f64_to_i32, f64, i32, -2147483648.0f64, 2147483648.0f64);
trunc_checked!(f64_to_u32, f64, u32, 0.0f64, 4294967296.0f64);
trunc_checked!(f32_to_i64, f32, i64, -9223372036854775808.0f32, 9223372036854775808.0f32);
trunc_checked!(f32_to_u64, f32, u64, 0.0f32, 18446744073709551616.0f32);
trunc_checked!(f64_to_i64, f64, i64, -9223372036854775808.0f64, 9223372036854775808.0f64);
trunc_checked!(f64_to_u64, f64, u64, 0.0f64, 18446744073709551616.0f64);

pub fn i32_wrap_i64(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| c as i32)
}

pub fn i32_trunc_f32_s(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, f32_to_i32)
}

pub fn i32_trunc_f32_u(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, |c: f32| f32_to_u32(c).map(|v| v as i32))
}

pub fn i32_trunc_f64_s(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, f64_to_i32)
}

pub fn i32_trunc_f64_u(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, |c: f64| f64_to_u32(c).map(|v| v as i32))
}

pub fn i64_extend_i32_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| i64::from(c))
}

pub fn i64_extend_i32_u(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| i64::from(c as u32))
}

pub fn i64_trunc_f32_s(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, f32_to_i64)
}

pub fn i64_trunc_f32_u(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, |c: f32| f32_to_u64(c).map(|v| v as i64))
}

pub fn i64_trunc_f64_s(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, f64_to_i64)
}

pub fn i64_trunc_f64_u(stack: &mut Stack) -> Result<(), Trap> {
    try_unop(stack, |c: f64| f64_to_u64(c).map(|v| v as i64))
}

pub fn f32_convert_i32_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| c as f32)
}

pub fn f32_convert_i32_u(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| c as u32 as f32)
}

pub fn f32_convert_i64_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| c as f32)
}

pub fn f32_convert_i64_u(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| c as u64 as f32)
}

pub fn f32_demote_f64(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: f64| c as f32)
}

pub fn f64_convert_i32_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| f64::from(c))
}

pub fn f64_convert_i32_u(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| f64::from(c as u32))
}

pub fn f64_convert_i64_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| c as f64)
}

pub fn f64_convert_i64_u(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| c as u64 as f64)
}

pub fn f64_promote_f32(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: f32| f64::from(c))
}

pub fn i32_reinterpret_f32(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: f32| c.to_bits() as i32)
}

pub fn i64_reinterpret_f64(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: f64| c.to_bits() as i64)
}

pub fn f32_reinterpret_i32(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| f32::from_bits(c as u32))
}

pub fn f64_reinterpret_i64(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| f64::from_bits(c as u64))
}

// Sign extension

pub fn i32_extend8_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| i32::from(c as i8))
}

pub fn i32_extend16_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i32| i32::from(c as i16))
}

pub fn i64_extend8_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| i64::from(c as i8))
}

pub fn i64_extend16_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| i64::from(c as i16))
}

pub fn i64_extend32_s(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: i64| i64::from(c as i32))
}
