//! The execution core of a WebAssembly interpreter.
//!
//! kexec decodes WebAssembly 1.0 binaries, links them into a [`runtime::Store`]
//! and runs their functions. Calls may cross into other instances or out to
//! host functions, and every call chain is bounded by a call depth guard so
//! runaway recursion ends in a trap instead of exhausting the native stack.
//!
//! # Modules
//!
//! - [`parser`] -- Binary format decoder. Reads `.wasm` bytes into a [`parser::module::Module`].
//! - [`runtime`] -- Linking, the host function bridge and the interpreter.
//!
//! # Example
//!
//! Link a module against a host function and call it:
//!
//! ```
//! use kexec::parser;
//! use kexec::parser::module::{FunctionType, ValueType};
//! use kexec::runtime::{invoke, ExecutionResult, HostContext, HostFunction, ImportObject, InstanceId, Store, Value};
//!
//! fn double(_: &HostContext, _: &mut Store, _: InstanceId, args: &[Value], _: u32) -> ExecutionResult {
//!     match args {
//!         [Value::I32(v)] => ExecutionResult::from(Value::I32(v * 2)),
//!         _ => ExecutionResult::Trapped,
//!     }
//! }
//!
//! // (module
//! //   (import "host" "double" (func $double (param i32) (result i32)))
//! //   (func (export "run") (result i32) (call $double (i32.const 21))))
//! let bytes = [
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x01, 0x0a, 0x02, 0x60, 0x01, 0x7f, 0x01, 0x7f,
//!     0x60, 0x00, 0x01, 0x7f, 0x02, 0x0f, 0x01, 0x04, 0x68, 0x6f, 0x73, 0x74, 0x06, 0x64, 0x6f, 0x75,
//!     0x62, 0x6c, 0x65, 0x00, 0x00, 0x03, 0x02, 0x01, 0x01, 0x07, 0x07, 0x01, 0x03, 0x72, 0x75, 0x6e,
//!     0x00, 0x01, 0x0a, 0x08, 0x01, 0x06, 0x00, 0x41, 0x15, 0x10, 0x00, 0x0b,
//! ];
//! let module = parser::parse(&bytes).unwrap();
//!
//! let mut imports = ImportObject::new();
//! let signature = FunctionType::new(&[ValueType::I32], &[ValueType::I32]);
//! imports.add_host_function("host", "double", HostFunction::new(signature, double));
//!
//! let mut store = Store::new();
//! let id = store.instantiate(module, &imports).unwrap();
//! let run = store.find_exported_function_index(id, "run").unwrap();
//! assert_eq!(invoke(&mut store, id, run, &[]), ExecutionResult::from(Value::I32(42)));
//! ```

pub mod parser;
pub mod runtime;
