//! Local and global variable access

use super::*;
use crate::runtime::frame::Frame;
use crate::runtime::ExternalGlobal;

pub fn local_get(stack: &mut Stack, frame: &Frame, local_idx: u32) -> Result<(), Trap> {
    stack.push(frame.local(local_idx)?);
    Ok(())
}

pub fn local_set(stack: &mut Stack, frame: &mut Frame, local_idx: u32) -> Result<(), Trap> {
    let value = stack.pop()?;
    frame.set_local(local_idx, value)
}

/// local.tee: like local.set but leaves the value on the stack
pub fn local_tee(stack: &mut Stack, frame: &mut Frame, local_idx: u32) -> Result<(), Trap> {
    let value = stack.pop()?;
    frame.set_local(local_idx, value)?;
    stack.push(value);
    Ok(())
}

pub fn global_get(stack: &mut Stack, global: &ExternalGlobal) -> Result<(), Trap> {
    stack.push(global.get());
    Ok(())
}

pub fn global_set(stack: &mut Stack, global: &ExternalGlobal) -> Result<(), Trap> {
    if !global.global_type.mutable {
        return Err(Trap::ImmutableGlobal);
    }
    let value = stack.pop_typed(global.global_type.value_type)?;
    global.value.set(value);
    Ok(())
}
