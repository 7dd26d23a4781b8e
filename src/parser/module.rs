use std::fmt;

use super::instruction::Instruction;
use super::ParseError;

/// A decoded module. Immutable once [`super::parse`] returns it; instances
/// share it through an `Rc`.
#[derive(Debug, Default)]
pub struct Module {
    pub types: Vec<FunctionType>,
    pub imports: Vec<Import>,
    /// Type index of each function defined in this module, in code order
    pub functions: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<Element>,
    pub code: Vec<FunctionBody>,
    pub data: Vec<Data>,
}

impl Module {
    pub fn imported_function_count(&self) -> u32 {
        self.count_imports(|d| matches!(d, ImportDescriptor::Function(_)))
    }

    pub fn imported_global_count(&self) -> u32 {
        self.count_imports(|d| matches!(d, ImportDescriptor::Global(_)))
    }

    fn count_imports(&self, pred: impl Fn(&ImportDescriptor) -> bool) -> u32 {
        self.imports.iter().filter(|i| pred(&i.descriptor)).count() as u32
    }

    /// Type index for a function in the module's function index space
    /// (imports first, then defined functions).
    pub fn function_type_idx(&self, func_idx: u32) -> Option<u32> {
        let mut remaining = func_idx;
        for import in &self.imports {
            if let ImportDescriptor::Function(type_idx) = import.descriptor {
                if remaining == 0 {
                    return Some(type_idx);
                }
                remaining -= 1;
            }
        }
        self.functions.get(remaining as usize).copied()
    }

    pub fn function_type(&self, func_idx: u32) -> Option<&FunctionType> {
        self.function_type_idx(func_idx)
            .and_then(|type_idx| self.types.get(type_idx as usize))
    }

    /// The type of a defined function, looked up by its position in the code section
    pub fn code_type(&self, code_idx: usize) -> Option<&FunctionType> {
        self.functions
            .get(code_idx)
            .and_then(|type_idx| self.types.get(*type_idx as usize))
    }

    pub fn find_export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn decode(byte: u8) -> Result<ValueType, ParseError> {
        match byte {
            0x7f => Ok(ValueType::I32),
            0x7e => Ok(ValueType::I64),
            0x7d => Ok(ValueType::F32),
            0x7c => Ok(ValueType::F64),
            _ => Err(ParseError::InvalidValueType(byte)),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionType {
    pub parameters: Vec<ValueType>,
    pub return_types: Vec<ValueType>,
}

impl FunctionType {
    pub fn new(parameters: &[ValueType], return_types: &[ValueType]) -> FunctionType {
        FunctionType {
            parameters: parameters.to_vec(),
            return_types: return_types.to_vec(),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> (")?;
        for (i, ret) in self.return_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ret}")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    /// Whether a provided object with limits `self` may satisfy an import
    /// declaring `required`.
    pub fn matches(&self, required: &Limits) -> bool {
        if self.min < required.min {
            return false;
        }
        match (self.max, required.max) {
            (_, None) => true,
            (Some(actual), Some(limit)) => actual <= limit,
            (None, Some(_)) => false,
        }
    }
}

/// Only `funcref` tables exist in the supported feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportDescriptor {
    Function(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub descriptor: ImportDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportIndex {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub index: ExportIndex,
}

/// Constant expressions used for global initialisers and segment offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstExpr {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    GlobalGet(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: ConstExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub table_idx: u32,
    pub offset: ConstExpr,
    pub functions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub memory_idx: u32,
    pub offset: ConstExpr,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    /// Declared locals, expanded; parameters are not included
    pub locals: Vec<ValueType>,
    pub instructions: Vec<Instruction>,
}
