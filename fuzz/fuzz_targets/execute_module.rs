#![no_main]

use libfuzzer_sys::fuzz_target;

use kexec::parser::{self, module::ExportIndex};
use kexec::runtime::{invoke, ImportObject, Store, Value};

fuzz_target!(|data: &[u8]| {
    let module = match parser::parse(data) {
        Ok(m) => m,
        Err(_) => return,
    };
    let exports: Vec<u32> = module
        .exports
        .iter()
        .filter_map(|export| match export.index {
            ExportIndex::Function(idx) => Some(idx),
            _ => None,
        })
        .collect();

    // Modules with imports fail to link here, which is still a clean outcome
    let mut store = Store::new();
    let id = match store.instantiate(module, &ImportObject::new()) {
        Ok(id) => id,
        Err(_) => return,
    };

    for func_idx in exports {
        let args: Vec<Value> = match store.instance(id).ok().and_then(|i| i.function_type(func_idx)) {
            Some(func_type) => func_type.parameters.iter().map(|t| Value::default_for(*t)).collect(),
            None => continue,
        };
        let _ = invoke(&mut store, id, func_idx, &args);
    }
});
