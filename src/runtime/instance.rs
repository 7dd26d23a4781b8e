//! Module instances and the function index space
//!
//! An instance's function table is resolved once, at instantiation. Every
//! entry says where the body lives, so calls never look names up.

use std::rc::Rc;

use super::{ExternalGlobal, HostFunction, SharedMemory, SharedTable, Trap};
use crate::parser::module::{FunctionType, Module};

/// Handle to an instance registered in a [`super::Store`]. Instances are
/// never removed, so a handle stays valid for the store's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub usize);

/// Non-owning reference to a function of some instance in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef {
    pub instance: InstanceId,
    pub func_idx: u32,
}

/// One entry of the function index space
#[derive(Debug, Clone)]
pub enum FunctionSlot {
    /// Body at `code_idx` in the owning module's code section
    Internal { code_idx: usize },
    /// Function of another instance
    ImportedWasm(FuncRef),
    /// Native callback
    ImportedHost(Rc<HostFunction>),
}

#[derive(Debug)]
pub struct Instance {
    pub(crate) module: Rc<Module>,
    pub(crate) functions: Vec<FunctionSlot>,
    pub(crate) memory: Option<SharedMemory>,
    pub(crate) table: Option<SharedTable>,
    pub(crate) globals: Vec<ExternalGlobal>,
}

impl Instance {
    pub fn module(&self) -> &Rc<Module> {
        &self.module
    }

    pub fn function_count(&self) -> u32 {
        self.functions.len() as u32
    }

    pub fn function(&self, func_idx: u32) -> Result<&FunctionSlot, Trap> {
        self.functions
            .get(func_idx as usize)
            .ok_or(Trap::UnknownIndex {
                kind: "function",
                index: func_idx,
            })
    }

    /// Declared type of a function in this instance's index space. For
    /// imports this is the importing module's declaration, which linking has
    /// checked against the provider.
    pub fn function_type(&self, func_idx: u32) -> Option<&FunctionType> {
        self.module.function_type(func_idx)
    }

    pub fn memory(&self) -> Option<&SharedMemory> {
        self.memory.as_ref()
    }

    pub fn table(&self) -> Option<&SharedTable> {
        self.table.as_ref()
    }

    pub fn global(&self, global_idx: u32) -> Result<&ExternalGlobal, Trap> {
        self.globals
            .get(global_idx as usize)
            .ok_or(Trap::UnknownIndex {
                kind: "global",
                index: global_idx,
            })
    }
}
