use super::*;

pub fn drop(stack: &mut Stack) -> Result<(), Trap> {
    stack.pop()?;
    Ok(())
}

/// select: `val1` if the condition is non-zero, else `val2`
pub fn select(stack: &mut Stack) -> Result<(), Trap> {
    let condition = stack.pop_i32()?;
    let val2 = stack.pop()?;
    let val1 = stack.pop()?;
    if val1.typ() != val2.typ() {
        return Err(Trap::TypeMismatch {
            expected: val1.typ(),
            actual: val2.typ(),
        });
    }
    stack.push(if condition != 0 { val1 } else { val2 });
    Ok(())
}
