//! Instance registry and instantiation
//!
//! The store owns every instance. Cross-instance references are
//! [`FuncRef`] handles into it rather than pointers, and instances are never
//! removed, so a handle obtained from the store is valid for as long as the
//! store lives.

use std::rc::Rc;

use log::debug;

use super::limits::{DEFAULT_MEMORY_PAGES_LIMIT, MAX_MEMORY_PAGES_LIMIT};
use super::{
    execute, ExecutionResult, ExternalFunction, ExternalGlobal, FuncRef, FunctionSlot, ImportObject, Instance,
    InstanceId, Memory, RuntimeError, SharedMemory, SharedTable, Table, Trap, Value,
};
use crate::parser::module::{ConstExpr, ExportIndex, FunctionType, ImportDescriptor, Module};

#[derive(Debug, Default)]
pub struct Store {
    instances: Vec<Instance>,
}

impl Store {
    pub fn new() -> Self {
        Store {
            instances: Vec::new(),
        }
    }

    pub fn instance(&self, id: InstanceId) -> Result<&Instance, Trap> {
        self.instances.get(id.0).ok_or(Trap::UnknownIndex {
            kind: "instance",
            index: id.0 as u32,
        })
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Signature of a function as declared by the instance that owns the slot
    pub fn function_type(&self, func: FuncRef) -> Option<&FunctionType> {
        self.instances.get(func.instance.0)?.function_type(func.func_idx)
    }

    /// Instantiate with the default memory pages limit.
    pub fn instantiate(
        &mut self,
        module: impl Into<Rc<Module>>,
        imports: &ImportObject,
    ) -> Result<InstanceId, RuntimeError> {
        self.instantiate_with_limit(module, imports, DEFAULT_MEMORY_PAGES_LIMIT)
    }

    /// Link `module` against `imports`, allocate its state, apply segments and
    /// run the start function. `memory_pages_limit` caps the module's own
    /// memory, both its initial size and `memory.grow`.
    pub fn instantiate_with_limit(
        &mut self,
        module: impl Into<Rc<Module>>,
        imports: &ImportObject,
        memory_pages_limit: u32,
    ) -> Result<InstanceId, RuntimeError> {
        let module: Rc<Module> = module.into();
        if memory_pages_limit > MAX_MEMORY_PAGES_LIMIT {
            return Err(RuntimeError::InvalidMemoryPagesLimit(memory_pages_limit));
        }

        let mut functions = Vec::with_capacity(module.imports.len() + module.functions.len());
        let mut globals = Vec::new();
        let mut memory = None;
        let mut table = None;

        for import in &module.imports {
            match &import.descriptor {
                ImportDescriptor::Function(type_idx) => {
                    let expected = module.types.get(*type_idx as usize).ok_or(RuntimeError::UnknownIndex {
                        kind: "type",
                        index: *type_idx,
                    })?;
                    functions.push(self.resolve_function(imports, &import.module, &import.name, expected)?);
                }
                ImportDescriptor::Global(global_type) => {
                    let global = imports
                        .get_global(&import.module, &import.name)
                        .ok_or_else(|| missing(imports, &import.module, &import.name, "global"))?;
                    if global.global_type != *global_type {
                        return Err(mismatch(&import.module, &import.name, "global type differs"));
                    }
                    globals.push(global.clone());
                }
                ImportDescriptor::Memory(memory_type) => {
                    let shared = imports
                        .get_memory(&import.module, &import.name)
                        .ok_or_else(|| missing(imports, &import.module, &import.name, "memory"))?;
                    if !shared.borrow().limits().matches(&memory_type.limits) {
                        return Err(mismatch(&import.module, &import.name, "memory limits do not match"));
                    }
                    memory = Some(Rc::clone(shared));
                }
                ImportDescriptor::Table(table_type) => {
                    let shared = imports
                        .get_table(&import.module, &import.name)
                        .ok_or_else(|| missing(imports, &import.module, &import.name, "table"))?;
                    if !shared.borrow().limits().matches(&table_type.limits) {
                        return Err(mismatch(&import.module, &import.name, "table limits do not match"));
                    }
                    table = Some(Rc::clone(shared));
                }
            }
        }

        if let Some(memory_type) = module.memories.first() {
            memory = Some(Memory::new(memory_type.limits, memory_pages_limit)?.shared());
        }
        if let Some(table_type) = module.tables.first() {
            table = Some(Table::new(table_type.limits).shared());
        }

        for global in &module.globals {
            let value = eval_const_expr(&global.init, &globals)?;
            if value.typ() != global.global_type.value_type {
                return Err(RuntimeError::ConstExprTypeMismatch);
            }
            globals.push(ExternalGlobal::new(value, global.global_type.mutable));
        }

        functions.extend((0..module.functions.len()).map(|code_idx| FunctionSlot::Internal { code_idx }));

        // all segments are checked before any of them is written
        let element_offsets = module
            .elements
            .iter()
            .map(|element| {
                let offset = eval_offset(&element.offset, &globals)?;
                let fits = table
                    .as_ref()
                    .map_or(false, |t| t.borrow().fits(offset, element.functions.len()));
                if !fits {
                    return Err(RuntimeError::SegmentOutOfBounds("element"));
                }
                Ok(offset)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let data_offsets = module
            .data
            .iter()
            .map(|data| {
                let offset = eval_offset(&data.offset, &globals)?;
                let fits = memory.as_ref().map_or(false, |m| {
                    offset as usize + data.bytes.len() <= m.borrow().byte_len()
                });
                if !fits {
                    return Err(RuntimeError::SegmentOutOfBounds("data"));
                }
                Ok(offset)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let id = InstanceId(self.instance_count());

        if let Some(table) = &table {
            let mut table = table.borrow_mut();
            for (element, offset) in module.elements.iter().zip(element_offsets) {
                for (i, func_idx) in element.functions.iter().enumerate() {
                    let func = FuncRef {
                        instance: id,
                        func_idx: *func_idx,
                    };
                    table
                        .set(offset + i as u32, Some(func))
                        .map_err(|_| RuntimeError::SegmentOutOfBounds("element"))?;
                }
            }
        }
        if let Some(memory) = &memory {
            let mut memory = memory.borrow_mut();
            for (data, offset) in module.data.iter().zip(data_offsets) {
                memory
                    .write_bytes(offset, &data.bytes)
                    .map_err(|_| RuntimeError::SegmentOutOfBounds("data"))?;
            }
        }

        let start = module.start;
        self.instances.push(Instance {
            module,
            functions,
            memory,
            table,
            globals,
        });
        debug!("instantiated module as instance {}", id.0);

        if let Some(start) = start {
            if execute(self, id, start, &[], 0) == ExecutionResult::Trapped {
                return Err(RuntimeError::StartTrapped);
            }
        }

        Ok(id)
    }

    fn resolve_function(
        &self,
        imports: &ImportObject,
        module: &str,
        name: &str,
        expected: &FunctionType,
    ) -> Result<FunctionSlot, RuntimeError> {
        let func = imports
            .get_function(module, name)
            .ok_or_else(|| missing(imports, module, name, "function"))?;
        match func {
            ExternalFunction::Wasm(func_ref) => {
                let actual = self
                    .function_type(*func_ref)
                    .ok_or_else(|| mismatch(module, name, "function does not exist"))?;
                if actual != expected {
                    return Err(mismatch(
                        module,
                        name,
                        &format!("expected {expected}, got {actual}"),
                    ));
                }
                Ok(FunctionSlot::ImportedWasm(*func_ref))
            }
            ExternalFunction::Host(host) => {
                if host.func_type != *expected {
                    return Err(mismatch(
                        module,
                        name,
                        &format!("expected {expected}, got {}", host.func_type),
                    ));
                }
                Ok(FunctionSlot::ImportedHost(Rc::clone(host)))
            }
        }
    }

    fn find_export(&self, id: InstanceId, name: &str) -> Option<(&Instance, ExportIndex)> {
        let instance = self.instances.get(id.0)?;
        let export = instance.module.find_export(name)?;
        Some((instance, export.index))
    }

    /// Index of an exported function in the instance's own index space
    pub fn find_exported_function_index(&self, id: InstanceId, name: &str) -> Option<u32> {
        match self.find_export(id, name)? {
            (_, ExportIndex::Function(func_idx)) => Some(func_idx),
            _ => None,
        }
    }

    /// An exported function in a form that can be bound into another
    /// [`ImportObject`]. Re-exported imports yield the original function.
    pub fn find_exported_function(&self, id: InstanceId, name: &str) -> Option<ExternalFunction> {
        let func_idx = self.find_exported_function_index(id, name)?;
        match self.instances.get(id.0)?.function(func_idx).ok()? {
            FunctionSlot::Internal { .. } => Some(ExternalFunction::Wasm(FuncRef {
                instance: id,
                func_idx,
            })),
            FunctionSlot::ImportedWasm(func_ref) => Some(ExternalFunction::Wasm(*func_ref)),
            FunctionSlot::ImportedHost(host) => Some(ExternalFunction::Host(Rc::clone(host))),
        }
    }

    pub fn find_exported_global(&self, id: InstanceId, name: &str) -> Option<ExternalGlobal> {
        match self.find_export(id, name)? {
            (instance, ExportIndex::Global(idx)) => instance.global(idx).ok().cloned(),
            _ => None,
        }
    }

    pub fn find_exported_memory(&self, id: InstanceId, name: &str) -> Option<SharedMemory> {
        match self.find_export(id, name)? {
            (instance, ExportIndex::Memory(0)) => instance.memory().cloned(),
            _ => None,
        }
    }

    pub fn find_exported_table(&self, id: InstanceId, name: &str) -> Option<SharedTable> {
        match self.find_export(id, name)? {
            (instance, ExportIndex::Table(0)) => instance.table().cloned(),
            _ => None,
        }
    }
}

fn missing(imports: &ImportObject, module: &str, name: &str, expected: &'static str) -> RuntimeError {
    if imports.contains(module, name) {
        RuntimeError::IncompatibleImportType {
            module: module.to_string(),
            name: name.to_string(),
            expected,
        }
    } else {
        RuntimeError::UnknownImport {
            module: module.to_string(),
            name: name.to_string(),
        }
    }
}

fn mismatch(module: &str, name: &str, reason: &str) -> RuntimeError {
    RuntimeError::ImportTypeMismatch {
        module: module.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn eval_const_expr(expr: &ConstExpr, globals: &[ExternalGlobal]) -> Result<Value, RuntimeError> {
    match expr {
        ConstExpr::I32(v) => Ok(Value::I32(*v)),
        ConstExpr::I64(v) => Ok(Value::I64(*v)),
        ConstExpr::F32(v) => Ok(Value::F32(*v)),
        ConstExpr::F64(v) => Ok(Value::F64(*v)),
        ConstExpr::GlobalGet(idx) => globals
            .get(*idx as usize)
            .map(ExternalGlobal::get)
            .ok_or(RuntimeError::UnknownIndex {
                kind: "global",
                index: *idx,
            }),
    }
}

fn eval_offset(expr: &ConstExpr, globals: &[ExternalGlobal]) -> Result<u32, RuntimeError> {
    match eval_const_expr(expr, globals)? {
        Value::I32(offset) => Ok(offset as u32),
        _ => Err(RuntimeError::ConstExprTypeMismatch),
    }
}
