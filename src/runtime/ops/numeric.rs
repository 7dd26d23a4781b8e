//! Numeric operations
//!
//! Constants and the arithmetic `t.unop`/`t.binop` instructions for all four
//! number types (WebAssembly core 4.4.1). Integer arithmetic wraps modulo
//! 2^N; division and remainder trap on a zero divisor, signed division also
//! traps on `MIN / -1`.

use super::*;

// ============================================================================
// Constants
// ============================================================================

pub fn i32_const(stack: &mut Stack, value: i32) -> Result<(), Trap> {
    stack.push(Value::I32(value));
    Ok(())
}

pub fn i64_const(stack: &mut Stack, value: i64) -> Result<(), Trap> {
    stack.push(Value::I64(value));
    Ok(())
}

pub fn f32_const(stack: &mut Stack, value: f32) -> Result<(), Trap> {
    stack.push(Value::F32(value));
    Ok(())
}

pub fn f64_const(stack: &mut Stack, value: f64) -> Result<(), Trap> {
    stack.push(Value::F64(value));
    Ok(())
}

// ============================================================================
// Integer arithmetic
// ============================================================================

pub fn i32_add(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, i32::wrapping_add)
}

pub fn i32_sub(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, i32::wrapping_sub)
}

pub fn i32_mul(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, i32::wrapping_mul)
}

/// i32.div_s
pub fn i32_div_s(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i32, c2: i32| {
        if c2 == 0 {
            Err(Trap::DivisionByZero)
        } else {
            c1.checked_div(c2).ok_or(Trap::IntegerOverflow)
        }
    })
}

pub fn i32_div_u(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i32, c2: i32| {
        (c1 as u32)
            .checked_div(c2 as u32)
            .map(|v| v as i32)
            .ok_or(Trap::DivisionByZero)
    })
}

/// i32.rem_s; `MIN % -1` is 0, not a trap
pub fn i32_rem_s(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i32, c2: i32| {
        if c2 == 0 {
            Err(Trap::DivisionByZero)
        } else {
            Ok(c1.wrapping_rem(c2))
        }
    })
}

pub fn i32_rem_u(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i32, c2: i32| {
        (c1 as u32)
            .checked_rem(c2 as u32)
            .map(|v| v as i32)
            .ok_or(Trap::DivisionByZero)
    })
}

pub fn i64_add(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, i64::wrapping_add)
}

pub fn i64_sub(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, i64::wrapping_sub)
}

pub fn i64_mul(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, i64::wrapping_mul)
}

pub fn i64_div_s(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i64, c2: i64| {
        if c2 == 0 {
            Err(Trap::DivisionByZero)
        } else {
            c1.checked_div(c2).ok_or(Trap::IntegerOverflow)
        }
    })
}

pub fn i64_div_u(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i64, c2: i64| {
        (c1 as u64)
            .checked_div(c2 as u64)
            .map(|v| v as i64)
            .ok_or(Trap::DivisionByZero)
    })
}

pub fn i64_rem_s(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i64, c2: i64| {
        if c2 == 0 {
            Err(Trap::DivisionByZero)
        } else {
            Ok(c1.wrapping_rem(c2))
        }
    })
}

pub fn i64_rem_u(stack: &mut Stack) -> Result<(), Trap> {
    try_binop(stack, |c1: i64, c2: i64| {
        (c1 as u64)
            .checked_rem(c2 as u64)
            .map(|v| v as i64)
            .ok_or(Trap::DivisionByZero)
    })
}

// ============================================================================
// Float arithmetic
// ============================================================================

/// Round to nearest, ties to even
fn nearest_f32(x: f32) -> f32 {
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        x.round()
    }
}

fn nearest_f64(x: f64) -> f64 {
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        x.round()
    }
}

// NaN if either operand is NaN, and -0 orders below +0
fn min_f32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_negative() {
            a
        } else {
            b
        }
    } else {
        a.min(b)
    }
}

fn max_f32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_positive() {
            a
        } else {
            b
        }
    } else {
        a.max(b)
    }
}

fn min_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_negative() {
            a
        } else {
            b
        }
    } else {
        a.min(b)
    }
}

fn max_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_positive() {
            a
        } else {
            b
        }
    } else {
        a.max(b)
    }
}

pub fn f32_abs(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f32::abs)
}

pub fn f32_neg(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: f32| -c)
}

pub fn f32_ceil(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f32::ceil)
}

pub fn f32_floor(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f32::floor)
}

pub fn f32_trunc(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f32::trunc)
}

pub fn f32_nearest(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, nearest_f32)
}

pub fn f32_sqrt(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f32::sqrt)
}

pub fn f32_add(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f32, c2: f32| c1 + c2)
}

pub fn f32_sub(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f32, c2: f32| c1 - c2)
}

pub fn f32_mul(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f32, c2: f32| c1 * c2)
}

pub fn f32_div(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f32, c2: f32| c1 / c2)
}

pub fn f32_min(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, min_f32)
}

pub fn f32_max(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, max_f32)
}

pub fn f32_copysign(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, f32::copysign)
}

pub fn f64_abs(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f64::abs)
}

pub fn f64_neg(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, |c: f64| -c)
}

pub fn f64_ceil(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f64::ceil)
}

pub fn f64_floor(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f64::floor)
}

pub fn f64_trunc(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f64::trunc)
}

pub fn f64_nearest(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, nearest_f64)
}

pub fn f64_sqrt(stack: &mut Stack) -> Result<(), Trap> {
    unop(stack, f64::sqrt)
}

pub fn f64_add(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f64, c2: f64| c1 + c2)
}

pub fn f64_sub(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f64, c2: f64| c1 - c2)
}

pub fn f64_mul(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f64, c2: f64| c1 * c2)
}

pub fn f64_div(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, |c1: f64, c2: f64| c1 / c2)
}

pub fn f64_min(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, min_f64)
}

pub fn f64_max(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, max_f64)
}

pub fn f64_copysign(stack: &mut Stack) -> Result<(), Trap> {
    binop(stack, f64::copysign)
}
