//! Builder for running a hand-written function body in a fresh store

use crate::parser::instruction::decode::resolve_targets;
use crate::parser::instruction::Instruction;
use crate::parser::module::{ConstExpr, FunctionBody, FunctionType, Global, GlobalType, Limits, MemoryType, Module, ValueType};
use crate::runtime::executor::call;
use crate::runtime::{FuncRef, ImportObject, Store, Trap, Value};

/// Builds a single-function module around the given instructions, runs it
/// at depth 0 and checks the outcome. A closing `end` is appended.
#[derive(Default)]
pub struct ExecutorTest {
    instructions: Vec<Instruction>,
    args: Vec<Value>,
    locals: Vec<ValueType>,
    return_types: Vec<ValueType>,
    memory_pages: Option<u32>,
    globals: Vec<Global>,
}

impl ExecutorTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inst(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Arguments, which also fix the parameter types
    pub fn args(mut self, args: &[Value]) -> Self {
        self.args = args.to_vec();
        self
    }

    pub fn local(mut self, typ: ValueType) -> Self {
        self.locals.push(typ);
        self
    }

    pub fn returns(mut self, typ: ValueType) -> Self {
        self.return_types = vec![typ];
        self
    }

    pub fn memory(mut self, pages: u32) -> Self {
        self.memory_pages = Some(pages);
        self
    }

    pub fn global(mut self, value: Value, mutable: bool) -> Self {
        let init = match value {
            Value::I32(v) => ConstExpr::I32(v),
            Value::I64(v) => ConstExpr::I64(v),
            Value::F32(v) => ConstExpr::F32(v),
            Value::F64(v) => ConstExpr::F64(v),
        };
        self.globals.push(Global {
            global_type: GlobalType {
                value_type: value.typ(),
                mutable,
            },
            init,
        });
        self
    }

    pub fn run(mut self) -> Result<Option<Value>, Trap> {
        self.instructions.push(Instruction::End);
        resolve_targets(&mut self.instructions).expect("unbalanced test body");

        let params: Vec<ValueType> = self.args.iter().map(Value::typ).collect();
        let module = Module {
            types: vec![FunctionType::new(&params, &self.return_types)],
            functions: vec![0],
            memories: self
                .memory_pages
                .map(|min| MemoryType {
                    limits: Limits { min, max: None },
                })
                .into_iter()
                .collect(),
            globals: self.globals,
            code: vec![FunctionBody {
                locals: self.locals,
                instructions: self.instructions,
            }],
            ..Default::default()
        };

        let mut store = Store::new();
        let instance = store
            .instantiate(module, &ImportObject::new())
            .expect("test module should instantiate");
        call(&mut store, FuncRef { instance, func_idx: 0 }, &self.args, 0)
    }

    pub fn expect(self, expected: Value) {
        assert_eq!(self.run(), Ok(Some(expected)));
    }

    pub fn expect_trap(self, trap: Trap) {
        assert_eq!(self.run(), Err(trap));
    }
}
