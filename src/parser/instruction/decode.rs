//! Function body decoding from binary format

use super::{BlockType, Instruction, MemArg};
use crate::parser::limits;
use crate::parser::module::{FunctionBody, ValueType};
use crate::parser::reader::Reader;
use crate::parser::ParseError;

impl MemArg {
    pub fn decode(reader: &mut Reader) -> Result<Self, ParseError> {
        let align = reader.read_vu32()?;
        let offset = reader.read_vu32()?;
        Ok(MemArg { align, offset })
    }
}

impl BlockType {
    /// Block types are encoded as a signed 33-bit integer: negative values
    /// are the single-byte type codes, non-negative values are type indices.
    pub fn decode(reader: &mut Reader) -> Result<Self, ParseError> {
        match reader.read_vs33()? {
            -0x40 => Ok(BlockType::Empty),
            -0x01 => Ok(BlockType::Value(ValueType::I32)),
            -0x02 => Ok(BlockType::Value(ValueType::I64)),
            -0x03 => Ok(BlockType::Value(ValueType::F32)),
            -0x04 => Ok(BlockType::Value(ValueType::F64)),
            idx if idx >= 0 => Ok(BlockType::FuncType(idx as u32)),
            _ => Err(ParseError::InvalidBlockType),
        }
    }
}

/// Decode a complete function body (locals followed by the expression). The
/// reader must be bounded to exactly the body's bytes.
pub fn decode_function_body(reader: &mut Reader) -> Result<FunctionBody, ParseError> {
    let locals = decode_locals(reader)?;
    let instructions = decode_expression(reader)?;
    if !reader.is_empty() {
        return Err(ParseError::TrailingBytes);
    }
    Ok(FunctionBody {
        locals,
        instructions,
    })
}

fn decode_locals(reader: &mut Reader) -> Result<Vec<ValueType>, ParseError> {
    let groups = reader.read_vu32()?;
    let mut locals = Vec::new();
    let mut total: u64 = 0;
    for _ in 0..groups {
        let count = reader.read_vu32()?;
        total += u64::from(count);
        if total > u64::from(limits::MAX_FUNCTION_LOCALS) {
            return Err(ParseError::TooManyLocals);
        }
        let value_type = ValueType::decode(reader.read_byte()?)?;
        locals.extend(std::iter::repeat(value_type).take(count as usize));
    }
    Ok(locals)
}

/// Decode instructions up to and including the `end` that closes the
/// function, then resolve control targets.
fn decode_expression(reader: &mut Reader) -> Result<Vec<Instruction>, ParseError> {
    let mut instructions: Vec<Instruction> = Vec::new();
    let mut depth = 0usize;

    loop {
        let opcode = reader.read_byte()?;
        let instruction = decode_instruction(opcode, reader)?;
        match instruction {
            Instruction::Block { .. } | Instruction::Loop { .. } | Instruction::If { .. } => depth += 1,
            Instruction::End if depth == 0 => {
                instructions.push(instruction);
                break;
            }
            Instruction::End => depth -= 1,
            _ => {}
        }
        instructions.push(instruction);
    }

    resolve_targets(&mut instructions)?;
    Ok(instructions)
}

/// Patch every structured instruction with the position of its matching
/// `else`/`end`. Expects a balanced sequence whose last `end` closes the
/// function.
pub fn resolve_targets(instructions: &mut [Instruction]) -> Result<(), ParseError> {
    // positions of the currently open block, loop and if instructions
    let mut open: Vec<usize> = Vec::new();

    for pc in 0..instructions.len() {
        match instructions[pc] {
            Instruction::Block { .. } | Instruction::Loop { .. } | Instruction::If { .. } => open.push(pc),
            Instruction::Else { .. } => {
                let start = *open.last().ok_or(ParseError::ElseWithoutIf)?;
                match &mut instructions[start] {
                    Instruction::If { else_pc, .. } if else_pc.is_none() => {
                        *else_pc = Some(pc as u32);
                    }
                    _ => return Err(ParseError::ElseWithoutIf),
                }
            }
            Instruction::End => {
                if let Some(start) = open.pop() {
                    patch_end(instructions, start, pc as u32);
                }
            }
            _ => {}
        }
    }

    if open.is_empty() {
        Ok(())
    } else {
        Err(ParseError::UnexpectedEof)
    }
}

fn patch_end(instructions: &mut [Instruction], start: usize, end_pc: u32) {
    let mut else_pos = None;
    match &mut instructions[start] {
        Instruction::Block { end, .. } => *end = end_pc,
        Instruction::If { end, else_pc, .. } => {
            *end = end_pc;
            else_pos = *else_pc;
        }
        _ => {}
    }
    if let Some(pos) = else_pos {
        if let Instruction::Else { end } = &mut instructions[pos as usize] {
            *end = end_pc;
        }
    }
}

fn read_zero_byte(reader: &mut Reader) -> Result<(), ParseError> {
    match reader.read_byte()? {
        0 => Ok(()),
        _ => Err(ParseError::ZeroByteExpected),
    }
}

fn decode_instruction(opcode: u8, reader: &mut Reader) -> Result<Instruction, ParseError> {
    use Instruction::*;

    let instruction = match opcode {
        // Control instructions
        0x00 => Unreachable,
        0x01 => Nop,
        0x02 => Block {
            block_type: BlockType::decode(reader)?,
            end: 0,
        },
        0x03 => Loop {
            block_type: BlockType::decode(reader)?,
        },
        0x04 => If {
            block_type: BlockType::decode(reader)?,
            else_pc: None,
            end: 0,
        },
        0x05 => Else { end: 0 },
        0x0b => End,
        0x0c => Br {
            label_idx: reader.read_vu32()?,
        },
        0x0d => BrIf {
            label_idx: reader.read_vu32()?,
        },
        0x0e => {
            let count = reader.read_vu32()?;
            if count > limits::MAX_BR_TABLE_LABELS {
                return Err(ParseError::LimitExceeded("br_table labels", count));
            }
            let labels = (0..count)
                .map(|_| reader.read_vu32())
                .collect::<Result<Vec<_>, _>>()?;
            BrTable {
                labels: labels.into_boxed_slice(),
                default: reader.read_vu32()?,
            }
        }
        0x0f => Return,
        0x10 => Call {
            func_idx: reader.read_vu32()?,
        },
        0x11 => CallIndirect {
            type_idx: reader.read_vu32()?,
            table_idx: reader.read_vu32()?,
        },

        // Parametric instructions
        0x1a => Drop,
        0x1b => Select,

        // Variable instructions
        0x20 => LocalGet {
            local_idx: reader.read_vu32()?,
        },
        0x21 => LocalSet {
            local_idx: reader.read_vu32()?,
        },
        0x22 => LocalTee {
            local_idx: reader.read_vu32()?,
        },
        0x23 => GlobalGet {
            global_idx: reader.read_vu32()?,
        },
        0x24 => GlobalSet {
            global_idx: reader.read_vu32()?,
        },

        // Memory instructions
        0x28..=0x3e => decode_memory_access(opcode, MemArg::decode(reader)?)?,
        0x3f => {
            read_zero_byte(reader)?;
            MemorySize
        }
        0x40 => {
            read_zero_byte(reader)?;
            MemoryGrow
        }

        // Numeric instructions
        0x41 => I32Const {
            value: reader.read_vs32()?,
        },
        0x42 => I64Const {
            value: reader.read_vs64()?,
        },
        0x43 => F32Const {
            value: reader.read_f32()?,
        },
        0x44 => F64Const {
            value: reader.read_f64()?,
        },

        0x45 => I32Eqz,
        0x46 => I32Eq,
        0x47 => I32Ne,
        0x48 => I32LtS,
        0x49 => I32LtU,
        0x4a => I32GtS,
        0x4b => I32GtU,
        0x4c => I32LeS,
        0x4d => I32LeU,
        0x4e => I32GeS,
        0x4f => I32GeU,

        0x50 => I64Eqz,
        0x51 => I64Eq,
        0x52 => I64Ne,
        0x53 => I64LtS,
        0x54 => I64LtU,
        0x55 => I64GtS,
        0x56 => I64GtU,
        0x57 => I64LeS,
        0x58 => I64LeU,
        0x59 => I64GeS,
        0x5a => I64GeU,

        0x5b => F32Eq,
        0x5c => F32Ne,
        0x5d => F32Lt,
        0x5e => F32Gt,
        0x5f => F32Le,
        0x60 => F32Ge,

        0x61 => F64Eq,
        0x62 => F64Ne,
        0x63 => F64Lt,
        0x64 => F64Gt,
        0x65 => F64Le,
        0x66 => F64Ge,

        0x67 => I32Clz,
        0x68 => I32Ctz,
        0x69 => I32Popcnt,
        0x6a => I32Add,
        0x6b => I32Sub,
        0x6c => I32Mul,
        0x6d => I32DivS,
        0x6e => I32DivU,
        0x6f => I32RemS,
        0x70 => I32RemU,
        0x71 => I32And,
        0x72 => I32Or,
        0x73 => I32Xor,
        0x74 => I32Shl,
        0x75 => I32ShrS,
        0x76 => I32ShrU,
        0x77 => I32Rotl,
        0x78 => I32Rotr,

        0x79 => I64Clz,
        0x7a => I64Ctz,
        0x7b => I64Popcnt,
        0x7c => I64Add,
        0x7d => I64Sub,
        0x7e => I64Mul,
        0x7f => I64DivS,
        0x80 => I64DivU,
        0x81 => I64RemS,
        0x82 => I64RemU,
        0x83 => I64And,
        0x84 => I64Or,
        0x85 => I64Xor,
        0x86 => I64Shl,
        0x87 => I64ShrS,
        0x88 => I64ShrU,
        0x89 => I64Rotl,
        0x8a => I64Rotr,

        0x8b => F32Abs,
        0x8c => F32Neg,
        0x8d => F32Ceil,
        0x8e => F32Floor,
        0x8f => F32Trunc,
        0x90 => F32Nearest,
        0x91 => F32Sqrt,
        0x92 => F32Add,
        0x93 => F32Sub,
        0x94 => F32Mul,
        0x95 => F32Div,
        0x96 => F32Min,
        0x97 => F32Max,
        0x98 => F32Copysign,

        0x99 => F64Abs,
        0x9a => F64Neg,
        0x9b => F64Ceil,
        0x9c => F64Floor,
        0x9d => F64Trunc,
        0x9e => F64Nearest,
        0x9f => F64Sqrt,
        0xa0 => F64Add,
        0xa1 => F64Sub,
        0xa2 => F64Mul,
        0xa3 => F64Div,
        0xa4 => F64Min,
        0xa5 => F64Max,
        0xa6 => F64Copysign,

        0xa7 => I32WrapI64,
        0xa8 => I32TruncF32S,
        0xa9 => I32TruncF32U,
        0xaa => I32TruncF64S,
        0xab => I32TruncF64U,
        0xac => I64ExtendI32S,
        0xad => I64ExtendI32U,
        0xae => I64TruncF32S,
        0xaf => I64TruncF32U,
        0xb0 => I64TruncF64S,
        0xb1 => I64TruncF64U,
        0xb2 => F32ConvertI32S,
        0xb3 => F32ConvertI32U,
        0xb4 => F32ConvertI64S,
        0xb5 => F32ConvertI64U,
        0xb6 => F32DemoteF64,
        0xb7 => F64ConvertI32S,
        0xb8 => F64ConvertI32U,
        0xb9 => F64ConvertI64S,
        0xba => F64ConvertI64U,
        0xbb => F64PromoteF32,
        0xbc => I32ReinterpretF32,
        0xbd => I64ReinterpretF64,
        0xbe => F32ReinterpretI32,
        0xbf => F64ReinterpretI64,

        0xc0 => I32Extend8S,
        0xc1 => I32Extend16S,
        0xc2 => I64Extend8S,
        0xc3 => I64Extend16S,
        0xc4 => I64Extend32S,

        _ => return Err(ParseError::UnknownOpcode(opcode)),
    };
    Ok(instruction)
}

fn decode_memory_access(opcode: u8, memarg: MemArg) -> Result<Instruction, ParseError> {
    use Instruction::*;

    let instruction = match opcode {
        0x28 => I32Load { memarg },
        0x29 => I64Load { memarg },
        0x2a => F32Load { memarg },
        0x2b => F64Load { memarg },
        0x2c => I32Load8S { memarg },
        0x2d => I32Load8U { memarg },
        0x2e => I32Load16S { memarg },
        0x2f => I32Load16U { memarg },
        0x30 => I64Load8S { memarg },
        0x31 => I64Load8U { memarg },
        0x32 => I64Load16S { memarg },
        0x33 => I64Load16U { memarg },
        0x34 => I64Load32S { memarg },
        0x35 => I64Load32U { memarg },
        0x36 => I32Store { memarg },
        0x37 => I64Store { memarg },
        0x38 => F32Store { memarg },
        0x39 => F64Store { memarg },
        0x3a => I32Store8 { memarg },
        0x3b => I32Store16 { memarg },
        0x3c => I64Store8 { memarg },
        0x3d => I64Store16 { memarg },
        0x3e => I64Store32 { memarg },
        _ => return Err(ParseError::UnknownOpcode(opcode)),
    };
    Ok(instruction)
}
