//! Import bindings supplied at instantiation

use std::collections::HashMap;
use std::rc::Rc;

use super::{FuncRef, HostFunction, SharedGlobal, SharedMemory, SharedTable, Value};
use crate::parser::module::GlobalType;

/// A function that can satisfy a function import
#[derive(Debug, Clone)]
pub enum ExternalFunction {
    /// Function of an already instantiated module
    Wasm(FuncRef),
    Host(Rc<HostFunction>),
}

/// A global together with its declared type
#[derive(Debug, Clone)]
pub struct ExternalGlobal {
    pub value: SharedGlobal,
    pub global_type: GlobalType,
}

impl ExternalGlobal {
    pub fn new(value: Value, mutable: bool) -> Self {
        ExternalGlobal {
            global_type: GlobalType {
                value_type: value.typ(),
                mutable,
            },
            value: Rc::new(std::cell::Cell::new(value)),
        }
    }

    pub fn get(&self) -> Value {
        self.value.get()
    }
}

type ImportKey = (String, String);

/// Named imports for one instantiation, keyed by `(module, name)`
#[derive(Debug, Default)]
pub struct ImportObject {
    functions: HashMap<ImportKey, ExternalFunction>,
    globals: HashMap<ImportKey, ExternalGlobal>,
    memories: HashMap<ImportKey, SharedMemory>,
    tables: HashMap<ImportKey, SharedTable>,
}

fn key(module: impl Into<String>, name: impl Into<String>) -> ImportKey {
    (module.into(), name.into())
}

impl ImportObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, module: impl Into<String>, name: impl Into<String>, func: ExternalFunction) {
        self.functions.insert(key(module, name), func);
    }

    pub fn add_host_function(&mut self, module: impl Into<String>, name: impl Into<String>, func: HostFunction) {
        self.add_function(module, name, ExternalFunction::Host(Rc::new(func)));
    }

    pub fn add_global(&mut self, module: impl Into<String>, name: impl Into<String>, global: ExternalGlobal) {
        self.globals.insert(key(module, name), global);
    }

    pub fn add_memory(&mut self, module: impl Into<String>, name: impl Into<String>, memory: SharedMemory) {
        self.memories.insert(key(module, name), memory);
    }

    pub fn add_table(&mut self, module: impl Into<String>, name: impl Into<String>, table: SharedTable) {
        self.tables.insert(key(module, name), table);
    }

    pub fn get_function(&self, module: &str, name: &str) -> Option<&ExternalFunction> {
        self.functions.get(&key(module, name))
    }

    pub fn get_global(&self, module: &str, name: &str) -> Option<&ExternalGlobal> {
        self.globals.get(&key(module, name))
    }

    pub fn get_memory(&self, module: &str, name: &str) -> Option<&SharedMemory> {
        self.memories.get(&key(module, name))
    }

    pub fn get_table(&self, module: &str, name: &str) -> Option<&SharedTable> {
        self.tables.get(&key(module, name))
    }

    /// Whether anything at all is bound under `(module, name)`
    pub fn contains(&self, module: &str, name: &str) -> bool {
        let k = key(module, name);
        self.functions.contains_key(&k)
            || self.globals.contains_key(&k)
            || self.memories.contains_key(&k)
            || self.tables.contains_key(&k)
    }
}
