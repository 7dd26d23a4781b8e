//! Function execution
//!
//! [`execute`] is the single entry point for running a function of an
//! instance. It applies the call depth guard, resolves the callee through
//! imported-wasm links, and either runs a host callback or interprets the
//! body.
//!
//! Wasm-to-wasm calls, including calls into other instances, do not recurse
//! natively. Each activation is a [`Frame`] on a heap-allocated frame stack
//! and every frame carries its own call depth, so `CALL_STACK_LIMIT` bounds
//! heap frames rather than native stack. The only native recursion left is a
//! host callback re-entering [`execute`], which passes through the same guard
//! and grows the native stack on demand (see [`super::host`]).

use std::rc::Rc;

use log::{debug, trace};

use super::frame::{check_args, Frame};
use super::limits::CALL_STACK_LIMIT;
use super::ops::control::Flow;
use super::ops::{bitwise, comparison, control, conversion, memory, numeric, parametric, variable};
use super::stack::Stack;
use super::{ExecutionResult, FuncRef, FunctionSlot, HostFunction, InstanceId, SharedMemory, Store, Trap, Value};
use crate::parser::instruction::Instruction;
use crate::parser::module::Module;

/// Run function `func_idx` of `instance` with the given arguments at call
/// depth `depth`.
///
/// A `depth` at or above [`CALL_STACK_LIMIT`] traps before anything runs.
/// Nested calls made by the body run at `depth + 1`; a host function is
/// handed `depth` itself. Every failure, whatever its cause, comes back as
/// [`ExecutionResult::Trapped`].
pub fn execute(store: &mut Store, instance: InstanceId, func_idx: u32, args: &[Value], depth: u32) -> ExecutionResult {
    match call(store, FuncRef { instance, func_idx }, args, depth) {
        Ok(value) => ExecutionResult::Returned(value),
        Err(trap) => {
            debug!(
                "function {} of instance {} trapped (entered at depth {}): {}",
                func_idx, instance.0, depth, trap
            );
            ExecutionResult::Trapped
        }
    }
}

/// [`execute`] from the top of a call chain
pub fn invoke(store: &mut Store, instance: InstanceId, func_idx: u32, args: &[Value]) -> ExecutionResult {
    execute(store, instance, func_idx, args, 0)
}

/// Where a call ends up once imported-wasm links are followed
enum Callee {
    Wasm {
        instance: InstanceId,
        module: Rc<Module>,
        code_idx: usize,
    },
    Host {
        instance: InstanceId,
        function: Rc<HostFunction>,
    },
}

/// Same as [`execute`], keeping the trap reason.
pub(crate) fn call(store: &mut Store, target: FuncRef, args: &[Value], depth: u32) -> Result<Option<Value>, Trap> {
    match dispatch(store, target, depth)? {
        Callee::Host { instance, function } => {
            check_args(&function.func_type, args)?;
            function.invoke(store, instance, args, depth)
        }
        Callee::Wasm {
            instance,
            module,
            code_idx,
        } => {
            let frame = Frame::new(instance, module, code_idx, args.to_vec(), 0, depth)?;
            run(store, frame)
        }
    }
}

/// Apply the depth guard, then resolve `target` to the function that
/// actually runs. Imported-wasm links are followed without changing the
/// depth. A host function belongs to the instance whose slot it fills.
fn dispatch(store: &Store, target: FuncRef, depth: u32) -> Result<Callee, Trap> {
    if depth >= CALL_STACK_LIMIT {
        trace!("call depth {} reached the limit of {}", depth, CALL_STACK_LIMIT);
        return Err(Trap::CallStackExhausted);
    }

    let mut target = target;
    loop {
        let instance = store.instance(target.instance)?;
        match instance.function(target.func_idx)? {
            FunctionSlot::Internal { code_idx } => {
                return Ok(Callee::Wasm {
                    instance: target.instance,
                    module: Rc::clone(&instance.module),
                    code_idx: *code_idx,
                })
            }
            // links only point at instances created earlier, so this ends
            FunctionSlot::ImportedWasm(next) => target = *next,
            FunctionSlot::ImportedHost(function) => {
                return Ok(Callee::Host {
                    instance: target.instance,
                    function: Rc::clone(function),
                })
            }
        }
    }
}

/// Interpret `entry` and everything it calls until it returns.
fn run(store: &mut Store, entry: Frame) -> Result<Option<Value>, Trap> {
    let arity = entry.arity;
    let mut stack = Stack::new();
    let mut frames = vec![entry];

    while let Some(frame) = frames.last_mut() {
        match run_frame(store, &mut stack, frame)? {
            Flow::Continue => {}
            Flow::Return => {
                stack.unwind(frame.stack_base, frame.arity)?;
                frames.pop();
            }
            Flow::Call(target) => {
                let depth = frame.depth + 1;
                match dispatch(store, target, depth)? {
                    Callee::Wasm {
                        instance,
                        module,
                        code_idx,
                    } => {
                        let params = module.code_type(code_idx).map_or(0, |t| t.parameters.len());
                        let args = stack.pop_n(params)?;
                        let callee = Frame::new(instance, module, code_idx, args, stack.depth(), depth)?;
                        frames.push(callee);
                    }
                    Callee::Host { instance, function } => {
                        let args = stack.pop_n(function.func_type.parameters.len())?;
                        check_args(&function.func_type, &args)?;
                        if let Some(value) = function.invoke(store, instance, &args, depth)? {
                            stack.push(value);
                        }
                    }
                }
            }
        }
    }

    match arity {
        0 => Ok(None),
        _ => Ok(Some(stack.pop()?)),
    }
}

/// Execute instructions of `frame` until it calls or returns. Running off
/// the end of the body is a return.
fn run_frame(store: &Store, stack: &mut Stack, frame: &mut Frame) -> Result<Flow, Trap> {
    let module = Rc::clone(&frame.module);
    let body = module.code.get(frame.code_idx).ok_or(Trap::UnknownIndex {
        kind: "code",
        index: frame.code_idx as u32,
    })?;

    while let Some(instruction) = body.instructions.get(frame.pc) {
        frame.pc += 1;
        match step(store, stack, frame, instruction)? {
            Flow::Continue => {}
            flow => return Ok(flow),
        }
    }
    Ok(Flow::Return)
}

fn instance_memory<'s>(store: &'s Store, frame: &Frame) -> Result<&'s SharedMemory, Trap> {
    store
        .instance(frame.instance)?
        .memory()
        .ok_or(Trap::UnknownIndex { kind: "memory", index: 0 })
}

fn step(store: &Store, stack: &mut Stack, frame: &mut Frame, instruction: &Instruction) -> Result<Flow, Trap> {
    use Instruction::*;

    match instruction {
        // Control
        Unreachable => return control::unreachable(),
        Nop => {}
        Block { block_type, end } => return control::block(stack, frame, block_type, *end),
        Loop { block_type } => return control::loop_(stack, frame, block_type),
        If {
            block_type,
            else_pc,
            end,
        } => return control::if_(stack, frame, block_type, *else_pc, *end),
        Else { end } => return control::else_(frame, *end),
        End => return control::end(frame),
        Br { label_idx } => return control::br(stack, frame, *label_idx),
        BrIf { label_idx } => return control::br_if(stack, frame, *label_idx),
        BrTable { labels, default } => return control::br_table(stack, frame, labels, *default),
        Return => return control::return_(),
        Call { func_idx } => return control::call(frame, *func_idx),
        CallIndirect { type_idx, table_idx } => {
            return control::call_indirect(stack, store, frame, *type_idx, *table_idx)
        }

        // Parametric
        Drop => parametric::drop(stack)?,
        Select => parametric::select(stack)?,

        // Variable
        LocalGet { local_idx } => variable::local_get(stack, frame, *local_idx)?,
        LocalSet { local_idx } => variable::local_set(stack, frame, *local_idx)?,
        LocalTee { local_idx } => variable::local_tee(stack, frame, *local_idx)?,
        GlobalGet { global_idx } => {
            variable::global_get(stack, store.instance(frame.instance)?.global(*global_idx)?)?
        }
        GlobalSet { global_idx } => {
            variable::global_set(stack, store.instance(frame.instance)?.global(*global_idx)?)?
        }

        // Memory
        I32Load { memarg } => memory::i32_load(stack, instance_memory(store, frame)?, memarg)?,
        I64Load { memarg } => memory::i64_load(stack, instance_memory(store, frame)?, memarg)?,
        F32Load { memarg } => memory::f32_load(stack, instance_memory(store, frame)?, memarg)?,
        F64Load { memarg } => memory::f64_load(stack, instance_memory(store, frame)?, memarg)?,
        I32Load8S { memarg } => memory::i32_load8_s(stack, instance_memory(store, frame)?, memarg)?,
        I32Load8U { memarg } => memory::i32_load8_u(stack, instance_memory(store, frame)?, memarg)?,
        I32Load16S { memarg } => memory::i32_load16_s(stack, instance_memory(store, frame)?, memarg)?,
        I32Load16U { memarg } => memory::i32_load16_u(stack, instance_memory(store, frame)?, memarg)?,
        I64Load8S { memarg } => memory::i64_load8_s(stack, instance_memory(store, frame)?, memarg)?,
        I64Load8U { memarg } => memory::i64_load8_u(stack, instance_memory(store, frame)?, memarg)?,
        I64Load16S { memarg } => memory::i64_load16_s(stack, instance_memory(store, frame)?, memarg)?,
        I64Load16U { memarg } => memory::i64_load16_u(stack, instance_memory(store, frame)?, memarg)?,
        I64Load32S { memarg } => memory::i64_load32_s(stack, instance_memory(store, frame)?, memarg)?,
        I64Load32U { memarg } => memory::i64_load32_u(stack, instance_memory(store, frame)?, memarg)?,
        I32Store { memarg } => memory::i32_store(stack, instance_memory(store, frame)?, memarg)?,
        I64Store { memarg } => memory::i64_store(stack, instance_memory(store, frame)?, memarg)?,
        F32Store { memarg } => memory::f32_store(stack, instance_memory(store, frame)?, memarg)?,
        F64Store { memarg } => memory::f64_store(stack, instance_memory(store, frame)?, memarg)?,
        I32Store8 { memarg } => memory::i32_store8(stack, instance_memory(store, frame)?, memarg)?,
        I32Store16 { memarg } => memory::i32_store16(stack, instance_memory(store, frame)?, memarg)?,
        I64Store8 { memarg } => memory::i64_store8(stack, instance_memory(store, frame)?, memarg)?,
        I64Store16 { memarg } => memory::i64_store16(stack, instance_memory(store, frame)?, memarg)?,
        I64Store32 { memarg } => memory::i64_store32(stack, instance_memory(store, frame)?, memarg)?,
        MemorySize => memory::memory_size(stack, instance_memory(store, frame)?)?,
        MemoryGrow => memory::memory_grow(stack, instance_memory(store, frame)?)?,

        // Constants
        I32Const { value } => numeric::i32_const(stack, *value)?,
        I64Const { value } => numeric::i64_const(stack, *value)?,
        F32Const { value } => numeric::f32_const(stack, *value)?,
        F64Const { value } => numeric::f64_const(stack, *value)?,

        // Comparison
        I32Eqz => comparison::i32_eqz(stack)?,
        I32Eq => comparison::i32_eq(stack)?,
        I32Ne => comparison::i32_ne(stack)?,
        I32LtS => comparison::i32_lt_s(stack)?,
        I32LtU => comparison::i32_lt_u(stack)?,
        I32GtS => comparison::i32_gt_s(stack)?,
        I32GtU => comparison::i32_gt_u(stack)?,
        I32LeS => comparison::i32_le_s(stack)?,
        I32LeU => comparison::i32_le_u(stack)?,
        I32GeS => comparison::i32_ge_s(stack)?,
        I32GeU => comparison::i32_ge_u(stack)?,
        I64Eqz => comparison::i64_eqz(stack)?,
        I64Eq => comparison::i64_eq(stack)?,
        I64Ne => comparison::i64_ne(stack)?,
        I64LtS => comparison::i64_lt_s(stack)?,
        I64LtU => comparison::i64_lt_u(stack)?,
        I64GtS => comparison::i64_gt_s(stack)?,
        I64GtU => comparison::i64_gt_u(stack)?,
        I64LeS => comparison::i64_le_s(stack)?,
        I64LeU => comparison::i64_le_u(stack)?,
        I64GeS => comparison::i64_ge_s(stack)?,
        I64GeU => comparison::i64_ge_u(stack)?,
        F32Eq => comparison::f32_eq(stack)?,
        F32Ne => comparison::f32_ne(stack)?,
        F32Lt => comparison::f32_lt(stack)?,
        F32Gt => comparison::f32_gt(stack)?,
        F32Le => comparison::f32_le(stack)?,
        F32Ge => comparison::f32_ge(stack)?,
        F64Eq => comparison::f64_eq(stack)?,
        F64Ne => comparison::f64_ne(stack)?,
        F64Lt => comparison::f64_lt(stack)?,
        F64Gt => comparison::f64_gt(stack)?,
        F64Le => comparison::f64_le(stack)?,
        F64Ge => comparison::f64_ge(stack)?,

        // Integer arithmetic and bitwise
        I32Clz => bitwise::i32_clz(stack)?,
        I32Ctz => bitwise::i32_ctz(stack)?,
        I32Popcnt => bitwise::i32_popcnt(stack)?,
        I32Add => numeric::i32_add(stack)?,
        I32Sub => numeric::i32_sub(stack)?,
        I32Mul => numeric::i32_mul(stack)?,
        I32DivS => numeric::i32_div_s(stack)?,
        I32DivU => numeric::i32_div_u(stack)?,
        I32RemS => numeric::i32_rem_s(stack)?,
        I32RemU => numeric::i32_rem_u(stack)?,
        I32And => bitwise::i32_and(stack)?,
        I32Or => bitwise::i32_or(stack)?,
        I32Xor => bitwise::i32_xor(stack)?,
        I32Shl => bitwise::i32_shl(stack)?,
        I32ShrS => bitwise::i32_shr_s(stack)?,
        I32ShrU => bitwise::i32_shr_u(stack)?,
        I32Rotl => bitwise::i32_rotl(stack)?,
        I32Rotr => bitwise::i32_rotr(stack)?,
        I64Clz => bitwise::i64_clz(stack)?,
        I64Ctz => bitwise::i64_ctz(stack)?,
        I64Popcnt => bitwise::i64_popcnt(stack)?,
        I64Add => numeric::i64_add(stack)?,
        I64Sub => numeric::i64_sub(stack)?,
        I64Mul => numeric::i64_mul(stack)?,
        I64DivS => numeric::i64_div_s(stack)?,
        I64DivU => numeric::i64_div_u(stack)?,
        I64RemS => numeric::i64_rem_s(stack)?,
        I64RemU => numeric::i64_rem_u(stack)?,
        I64And => bitwise::i64_and(stack)?,
        I64Or => bitwise::i64_or(stack)?,
        I64Xor => bitwise::i64_xor(stack)?,
        I64Shl => bitwise::i64_shl(stack)?,
        I64ShrS => bitwise::i64_shr_s(stack)?,
        I64ShrU => bitwise::i64_shr_u(stack)?,
        I64Rotl => bitwise::i64_rotl(stack)?,
        I64Rotr => bitwise::i64_rotr(stack)?,

        // Float arithmetic
        F32Abs => numeric::f32_abs(stack)?,
        F32Neg => numeric::f32_neg(stack)?,
        F32Ceil => numeric::f32_ceil(stack)?,
        F32Floor => numeric::f32_floor(stack)?,
        F32Trunc => numeric::f32_trunc(stack)?,
        F32Nearest => numeric::f32_nearest(stack)?,
        F32Sqrt => numeric::f32_sqrt(stack)?,
        F32Add => numeric::f32_add(stack)?,
        F32Sub => numeric::f32_sub(stack)?,
        F32Mul => numeric::f32_mul(stack)?,
        F32Div => numeric::f32_div(stack)?,
        F32Min => numeric::f32_min(stack)?,
        F32Max => numeric::f32_max(stack)?,
        F32Copysign => numeric::f32_copysign(stack)?,
        F64Abs => numeric::f64_abs(stack)?,
        F64Neg => numeric::f64_neg(stack)?,
        F64Ceil => numeric::f64_ceil(stack)?,
        F64Floor => numeric::f64_floor(stack)?,
        F64Trunc => numeric::f64_trunc(stack)?,
        F64Nearest => numeric::f64_nearest(stack)?,
        F64Sqrt => numeric::f64_sqrt(stack)?,
        F64Add => numeric::f64_add(stack)?,
        F64Sub => numeric::f64_sub(stack)?,
        F64Mul => numeric::f64_mul(stack)?,
        F64Div => numeric::f64_div(stack)?,
        F64Min => numeric::f64_min(stack)?,
        F64Max => numeric::f64_max(stack)?,
        F64Copysign => numeric::f64_copysign(stack)?,

        // Conversion
        I32WrapI64 => conversion::i32_wrap_i64(stack)?,
        I32TruncF32S => conversion::i32_trunc_f32_s(stack)?,
        I32TruncF32U => conversion::i32_trunc_f32_u(stack)?,
        I32TruncF64S => conversion::i32_trunc_f64_s(stack)?,
        I32TruncF64U => conversion::i32_trunc_f64_u(stack)?,
        I64ExtendI32S => conversion::i64_extend_i32_s(stack)?,
        I64ExtendI32U => conversion::i64_extend_i32_u(stack)?,
        I64TruncF32S => conversion::i64_trunc_f32_s(stack)?,
        I64TruncF32U => conversion::i64_trunc_f32_u(stack)?,
        I64TruncF64S => conversion::i64_trunc_f64_s(stack)?,
        I64TruncF64U => conversion::i64_trunc_f64_u(stack)?,
        F32ConvertI32S => conversion::f32_convert_i32_s(stack)?,
        F32ConvertI32U => conversion::f32_convert_i32_u(stack)?,
        F32ConvertI64S => conversion::f32_convert_i64_s(stack)?,
        F32ConvertI64U => conversion::f32_convert_i64_u(stack)?,
        F32DemoteF64 => conversion::f32_demote_f64(stack)?,
        F64ConvertI32S => conversion::f64_convert_i32_s(stack)?,
        F64ConvertI32U => conversion::f64_convert_i32_u(stack)?,
        F64ConvertI64S => conversion::f64_convert_i64_s(stack)?,
        F64ConvertI64U => conversion::f64_convert_i64_u(stack)?,
        F64PromoteF32 => conversion::f64_promote_f32(stack)?,
        I32ReinterpretF32 => conversion::i32_reinterpret_f32(stack)?,
        I64ReinterpretF64 => conversion::i64_reinterpret_f64(stack)?,
        F32ReinterpretI32 => conversion::f32_reinterpret_i32(stack)?,
        F64ReinterpretI64 => conversion::f64_reinterpret_i64(stack)?,
        I32Extend8S => conversion::i32_extend8_s(stack)?,
        I32Extend16S => conversion::i32_extend16_s(stack)?,
        I64Extend8S => conversion::i64_extend8_s(stack)?,
        I64Extend16S => conversion::i64_extend16_s(stack)?,
        I64Extend32S => conversion::i64_extend32_s(stack)?,
    }

    Ok(Flow::Continue)
}
