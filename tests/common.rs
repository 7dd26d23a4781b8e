//! Common fixtures shared between integration tests
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use kexec::parser;
use kexec::parser::module::{FunctionType, Module, ValueType};
use kexec::runtime::{ExecutionResult, HostContext, HostFunction, ImportObject, InstanceId, Store, Value};

// wat2wasm output of the modules used by the call tests

/// `(func (result i32) (i32.const 1))`
pub const INTERNAL_LEAF: &str = "0061736d010000000105016000017f030201000a0601040041010b";
/// `(func (export "f") (result i32) (i32.const 1))`
pub const EXPORTER: &str = "0061736d010000000105016000017f03020100070501016600000a0601040041010b";
/// `(import "exporter" "f" (func (result i32)))`
pub const IMPORT_WASM_ONLY: &str = "0061736d010000000105016000017f020e01086578706f7274657201660000";
/// `(import "host" "f" (func (result i32)))`
pub const IMPORT_HOST_ONLY: &str = "0061736d010000000105016000017f020a0104686f737401660000";
/// func0 returns 1, func1 calls func0
pub const CALL_INTERNAL: &str = "0061736d010000000105016000017f03030200000a0b02040041010b040010000b";
/// func0 imports `exporter.f`, func1 calls it
pub const CALL_IMPORTED_WASM: &str =
    "0061736d010000000105016000017f020e01086578706f7274657201660000030201000a0601040010000b";
/// func0 imports `host.f`, func1 calls it
pub const CALL_IMPORTED_HOST: &str =
    "0061736d010000000105016000017f020a0104686f737401660000030201000a0601040010000b";
/// `(func (call 0))`
pub const INFINITE_RECURSION: &str = "0061736d01000000010401600000030201000a0601040010000b";
/// Imports `exporter.f` and exports it again as "g"
pub const REEXPORTER: &str = "0061736d010000000105016000017f020e01086578706f727465720166000007050101670000";

pub fn module(hex_bytes: &str) -> Module {
    let bytes = hex::decode(hex_bytes).expect("fixture is valid hex");
    parser::parse(&bytes).expect("fixture parses")
}

/// Last depth a recording host function was invoked at
pub type DepthRecord = Rc<Cell<Option<u32>>>;

fn record_depth(context: &HostContext, _: &mut Store, _: InstanceId, _: &[Value], depth: u32) -> ExecutionResult {
    match context.downcast_ref::<Cell<Option<u32>>>() {
        Some(record) => {
            record.set(Some(depth));
            ExecutionResult::from(Value::I32(1))
        }
        None => ExecutionResult::Trapped,
    }
}

/// `() -> i32` host function returning 1 and recording its depth
pub fn recording_host() -> (HostFunction, DepthRecord) {
    let record: DepthRecord = Rc::new(Cell::new(None));
    let context: HostContext = record.clone();
    let host = HostFunction::with_context(FunctionType::new(&[], &[ValueType::I32]), context, record_depth);
    (host, record)
}

/// Imports binding the recording host function as `host.f`
pub fn recording_imports() -> (ImportObject, DepthRecord) {
    let (host, record) = recording_host();
    let mut imports = ImportObject::new();
    imports.add_host_function("host", "f", host);
    (imports, record)
}

/// Instantiate `EXPORTER`, then `hex_bytes` with `exporter.f` bound to it
pub fn link_to_exporter(store: &mut Store, hex_bytes: &str) -> InstanceId {
    let exporter = store
        .instantiate(module(EXPORTER), &ImportObject::new())
        .expect("exporter instantiates");
    let f = store.find_exported_function(exporter, "f").expect("exporter exports f");

    let mut imports = ImportObject::new();
    imports.add_function("exporter", "f", f);
    store.instantiate(module(hex_bytes), &imports).expect("importer instantiates")
}
