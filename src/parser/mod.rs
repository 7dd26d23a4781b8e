//! WebAssembly binary decoder
//!
//! Decodes the 1.0 binary format into an immutable [`Module`]. This is a
//! decoder, not a validator: structural problems (truncation, unknown
//! opcodes, unbalanced blocks, bad section sizes) are reported, typing is
//! not checked.

pub mod instruction;
pub mod limits;
pub mod module;
pub mod reader;

use std::io;

use log::debug;
use thiserror::Error;

use instruction::decode_function_body;
use module::{
    ConstExpr, Data, Element, Export, ExportIndex, FunctionType, Global, GlobalType, Import,
    ImportDescriptor, Limits, MemoryType, Module, TableType, ValueType,
};
use reader::Reader;

const MAGIC: u32 = 0x6d736100; // '\0asm'
const VERSION: u32 = 1;
const FUNCREF: u8 = 0x70;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end")]
    UnexpectedEof,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("magic header not detected")]
    InvalidMagic,
    #[error("unknown binary version {0}")]
    UnsupportedVersion(u32),
    #[error("integer too large")]
    IntegerTooLarge,
    #[error("integer representation too long")]
    IntegerRepresentationTooLong,
    #[error("malformed UTF-8 encoding")]
    InvalidUtf8,
    #[error("invalid value type 0x{0:02x}")]
    InvalidValueType(u8),
    #[error("invalid block type")]
    InvalidBlockType,
    #[error("illegal opcode 0x{0:02x}")]
    UnknownOpcode(u8),
    #[error("zero byte expected")]
    ZeroByteExpected,
    #[error("else without matching if")]
    ElseWithoutIf,
    #[error("too many locals")]
    TooManyLocals,
    #[error("too many {0}: {1}")]
    LimitExceeded(&'static str, u32),
    #[error("unexpected content after last section")]
    TrailingBytes,
    #[error("malformed section id {0}")]
    UnknownSection(u8),
    #[error("section {0} out of order")]
    SectionOutOfOrder(u8),
    #[error("section size mismatch in section {0}")]
    SectionSizeMismatch(u8),
    #[error("function and code section have inconsistent lengths")]
    FunctionCodeMismatch,
    #[error("expected function type form 0x60, got 0x{0:02x}")]
    InvalidFunctionForm(u8),
    #[error("function types with more than one result are not supported")]
    MultipleResults,
    #[error("malformed limits flags 0x{0:02x}")]
    InvalidLimitsFlag(u8),
    #[error("malformed element type 0x{0:02x}")]
    InvalidElementType(u8),
    #[error("malformed mutability 0x{0:02x}")]
    InvalidMutability(u8),
    #[error("malformed import kind 0x{0:02x}")]
    InvalidImportKind(u8),
    #[error("malformed export kind 0x{0:02x}")]
    InvalidExportKind(u8),
    #[error("constant expression required")]
    InvalidConstExpr,
    #[error("multiple memories")]
    MultipleMemories,
    #[error("multiple tables")]
    MultipleTables,
}

/// Decode a complete module from its binary encoding.
pub fn parse(bytes: &[u8]) -> Result<Module, ParseError> {
    let mut reader = Reader::new(bytes);
    read_header(&mut reader)?;

    let mut module = Module::default();
    let mut last_id = 0u8;

    while !reader.is_empty() {
        let id = reader.read_byte()?;
        let len = reader.read_vu32()? as usize;
        let mut section = reader.sub_reader(len)?;

        if id != 0 {
            if id <= last_id {
                return Err(ParseError::SectionOutOfOrder(id));
            }
            last_id = id;
        }

        read_section(id, &mut section, &mut module)?;
        if !section.is_empty() {
            return Err(ParseError::SectionSizeMismatch(id));
        }
    }

    if module.functions.len() != module.code.len() {
        return Err(ParseError::FunctionCodeMismatch);
    }
    if module.memories.len() + import_count(&module, |d| matches!(d, ImportDescriptor::Memory(_))) > 1 {
        return Err(ParseError::MultipleMemories);
    }
    if module.tables.len() + import_count(&module, |d| matches!(d, ImportDescriptor::Table(_))) > 1 {
        return Err(ParseError::MultipleTables);
    }

    debug!(
        "parsed module: {} types, {} imports, {} functions, {} exports",
        module.types.len(),
        module.imports.len(),
        module.functions.len(),
        module.exports.len()
    );
    Ok(module)
}

fn import_count(module: &Module, pred: impl Fn(&ImportDescriptor) -> bool) -> usize {
    module.imports.iter().filter(|i| pred(&i.descriptor)).count()
}

fn read_header(reader: &mut Reader) -> Result<(), ParseError> {
    if reader.read_u32().map_err(|_| ParseError::InvalidMagic)? != MAGIC {
        return Err(ParseError::InvalidMagic);
    }
    let version = reader.read_u32()?;
    if version != VERSION {
        return Err(ParseError::UnsupportedVersion(version));
    }
    Ok(())
}

fn read_section(id: u8, reader: &mut Reader, module: &mut Module) -> Result<(), ParseError> {
    match id {
        0 => read_section_custom(reader),
        1 => read_section_type(reader, &mut module.types),
        2 => read_section_import(reader, &mut module.imports),
        3 => read_section_function(reader, &mut module.functions),
        4 => read_section_table(reader, &mut module.tables),
        5 => read_section_memory(reader, &mut module.memories),
        6 => read_section_global(reader, &mut module.globals),
        7 => read_section_export(reader, &mut module.exports),
        8 => read_section_start(reader, &mut module.start),
        9 => read_section_element(reader, &mut module.elements),
        10 => read_section_code(reader, module),
        11 => read_section_data(reader, &mut module.data),
        _ => Err(ParseError::UnknownSection(id)),
    }
}

/* SECTION READERS ************************************************/

fn read_count(reader: &mut Reader, what: &'static str, limit: u32) -> Result<u32, ParseError> {
    limits::check(what, reader.read_vu32()?, limit)
}

fn read_section_custom(reader: &mut Reader) -> Result<(), ParseError> {
    let _name = reader.read_name()?;
    let rest = reader.remaining();
    reader.read_bytes(rest)?;
    Ok(())
}

fn read_value_types(reader: &mut Reader) -> Result<Vec<ValueType>, ParseError> {
    let count = read_count(reader, "function parameters", limits::MAX_FUNCTION_PARAMS)?;
    (0..count)
        .map(|_| ValueType::decode(reader.read_byte()?))
        .collect()
}

fn read_section_type(reader: &mut Reader, types: &mut Vec<FunctionType>) -> Result<(), ParseError> {
    let count = read_count(reader, "types", limits::MAX_TYPES)?;
    for _ in 0..count {
        let form = reader.read_byte()?;
        if form != 0x60 {
            return Err(ParseError::InvalidFunctionForm(form));
        }
        let parameters = read_value_types(reader)?;
        let return_types = read_value_types(reader)?;
        if return_types.len() > 1 {
            return Err(ParseError::MultipleResults);
        }
        types.push(FunctionType {
            parameters,
            return_types,
        });
    }
    Ok(())
}

fn read_limits(reader: &mut Reader) -> Result<Limits, ParseError> {
    match reader.read_byte()? {
        0x00 => Ok(Limits {
            min: reader.read_vu32()?,
            max: None,
        }),
        0x01 => Ok(Limits {
            min: reader.read_vu32()?,
            max: Some(reader.read_vu32()?),
        }),
        flag => Err(ParseError::InvalidLimitsFlag(flag)),
    }
}

fn read_table_type(reader: &mut Reader) -> Result<TableType, ParseError> {
    let element_type = reader.read_byte()?;
    if element_type != FUNCREF {
        return Err(ParseError::InvalidElementType(element_type));
    }
    let limits = read_limits(reader)?;
    limits::check("table elements", limits.min, limits::MAX_TABLE_SIZE)?;
    Ok(TableType { limits })
}

fn read_global_type(reader: &mut Reader) -> Result<GlobalType, ParseError> {
    let value_type = ValueType::decode(reader.read_byte()?)?;
    let mutable = match reader.read_byte()? {
        0x00 => false,
        0x01 => true,
        other => return Err(ParseError::InvalidMutability(other)),
    };
    Ok(GlobalType {
        value_type,
        mutable,
    })
}

fn read_section_import(reader: &mut Reader, imports: &mut Vec<Import>) -> Result<(), ParseError> {
    let count = read_count(reader, "imports", limits::MAX_IMPORTS)?;
    for _ in 0..count {
        let module = reader.read_name()?;
        let name = reader.read_name()?;
        let descriptor = match reader.read_byte()? {
            0x00 => ImportDescriptor::Function(reader.read_vu32()?),
            0x01 => ImportDescriptor::Table(read_table_type(reader)?),
            0x02 => ImportDescriptor::Memory(MemoryType {
                limits: read_limits(reader)?,
            }),
            0x03 => ImportDescriptor::Global(read_global_type(reader)?),
            kind => return Err(ParseError::InvalidImportKind(kind)),
        };
        imports.push(Import {
            module,
            name,
            descriptor,
        });
    }
    Ok(())
}

fn read_section_function(reader: &mut Reader, functions: &mut Vec<u32>) -> Result<(), ParseError> {
    let count = read_count(reader, "functions", limits::MAX_FUNCTIONS)?;
    for _ in 0..count {
        functions.push(reader.read_vu32()?);
    }
    Ok(())
}

fn read_section_table(reader: &mut Reader, tables: &mut Vec<TableType>) -> Result<(), ParseError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        tables.push(read_table_type(reader)?);
    }
    Ok(())
}

fn read_section_memory(reader: &mut Reader, memories: &mut Vec<MemoryType>) -> Result<(), ParseError> {
    let count = reader.read_vu32()?;
    for _ in 0..count {
        memories.push(MemoryType {
            limits: read_limits(reader)?,
        });
    }
    Ok(())
}

/// Constant expressions: a single constant or `global.get`, then `end`.
fn read_const_expr(reader: &mut Reader) -> Result<ConstExpr, ParseError> {
    let expr = match reader.read_byte()? {
        0x41 => ConstExpr::I32(reader.read_vs32()?),
        0x42 => ConstExpr::I64(reader.read_vs64()?),
        0x43 => ConstExpr::F32(reader.read_f32()?),
        0x44 => ConstExpr::F64(reader.read_f64()?),
        0x23 => ConstExpr::GlobalGet(reader.read_vu32()?),
        _ => return Err(ParseError::InvalidConstExpr),
    };
    if reader.read_byte()? != 0x0b {
        return Err(ParseError::InvalidConstExpr);
    }
    Ok(expr)
}

fn read_section_global(reader: &mut Reader, globals: &mut Vec<Global>) -> Result<(), ParseError> {
    let count = read_count(reader, "globals", limits::MAX_GLOBALS)?;
    for _ in 0..count {
        let global_type = read_global_type(reader)?;
        let init = read_const_expr(reader)?;
        globals.push(Global { global_type, init });
    }
    Ok(())
}

fn read_section_export(reader: &mut Reader, exports: &mut Vec<Export>) -> Result<(), ParseError> {
    let count = read_count(reader, "exports", limits::MAX_EXPORTS)?;
    for _ in 0..count {
        let name = reader.read_name()?;
        let kind = reader.read_byte()?;
        let idx = reader.read_vu32()?;
        let index = match kind {
            0x00 => ExportIndex::Function(idx),
            0x01 => ExportIndex::Table(idx),
            0x02 => ExportIndex::Memory(idx),
            0x03 => ExportIndex::Global(idx),
            _ => return Err(ParseError::InvalidExportKind(kind)),
        };
        exports.push(Export { name, index });
    }
    Ok(())
}

fn read_section_start(reader: &mut Reader, start: &mut Option<u32>) -> Result<(), ParseError> {
    *start = Some(reader.read_vu32()?);
    Ok(())
}

fn read_section_element(reader: &mut Reader, elements: &mut Vec<Element>) -> Result<(), ParseError> {
    let count = read_count(reader, "element segments", limits::MAX_ELEMENT_SEGMENTS)?;
    for _ in 0..count {
        let table_idx = reader.read_vu32()?;
        let offset = read_const_expr(reader)?;
        let len = read_count(reader, "table elements", limits::MAX_TABLE_SIZE)?;
        let functions = (0..len)
            .map(|_| reader.read_vu32())
            .collect::<Result<Vec<_>, _>>()?;
        elements.push(Element {
            table_idx,
            offset,
            functions,
        });
    }
    Ok(())
}

fn read_section_code(reader: &mut Reader, module: &mut Module) -> Result<(), ParseError> {
    let count = read_count(reader, "functions", limits::MAX_FUNCTIONS)?;
    if count as usize != module.functions.len() {
        return Err(ParseError::FunctionCodeMismatch);
    }
    for code_idx in 0..count as usize {
        let size = limits::check("function body bytes", reader.read_vu32()?, limits::MAX_FUNCTION_SIZE)?;
        let mut body_reader = reader.sub_reader(size as usize)?;
        let body = decode_function_body(&mut body_reader)?;

        let params = module.code_type(code_idx).map_or(0, |t| t.parameters.len());
        if params + body.locals.len() > limits::MAX_FUNCTION_LOCALS as usize {
            return Err(ParseError::TooManyLocals);
        }
        module.code.push(body);
    }
    Ok(())
}

fn read_section_data(reader: &mut Reader, data: &mut Vec<Data>) -> Result<(), ParseError> {
    let count = read_count(reader, "data segments", limits::MAX_DATA_SEGMENTS)?;
    for _ in 0..count {
        let memory_idx = reader.read_vu32()?;
        let offset = read_const_expr(reader)?;
        let len = reader.read_vu32()? as usize;
        let bytes = reader.read_bytes(len)?.to_vec();
        data.push(Data {
            memory_idx,
            offset,
            bytes,
        });
    }
    Ok(())
}
