mod common;

#[cfg(test)]
mod tests {
    use crate::common::*;
    use kexec::parser::module::{FunctionType, ValueType};
    use kexec::runtime::limits::CALL_STACK_LIMIT;
    use kexec::runtime::{
        execute, invoke, ExecutionResult, ExternalFunction, ExternalGlobal, HostContext, HostFunction, ImportObject,
        InstanceId, Store, Value,
    };
    use rstest::rstest;
    use std::cell::Cell;
    use std::rc::Rc;

    /// func0 returns 0x2a002a, func1 calls it
    const CALL: &str = "0061736d010000000105016000017f03030200000a0e02070041aa80a8010b040010000b";
    /// func0 is `unreachable`, func1 calls it
    const CALL_TRAP: &str = "0061736d010000000105016000017f03030200000a0a020300000b040010000b";
    /// func0 = (a, b) -> b - a, func1 calls it with (13, 17)
    const CALL_WITH_ARGUMENTS: &str =
        "0061736d01000000010b0260027f7f017f6000017f03030200010a12020700200120006b0b0800410d411110000b";
    /// `count(n)` recurses n times and returns n
    const COUNTDOWN: &str =
        "0061736d0100000001060160017f017f0302010007090105636f756e7400000a17011500200045047f410005200041016b100041016a0b0b";
    /// Table [f0 -> 7, f1 -> 9, null]; `dispatch(i)` calls slot i as `() -> i32`,
    /// `mismatch` calls slot 0 as `(i32) -> i32`
    const CALL_INDIRECT: &str = "0061736d01000000010a026000017f60017f017f030504000001000404017000030717020864697370617463680002086d69736d6174636800030908010041000b0200010a1d04040041070b040041090b070020001100000b0900410041001101000b";
    /// Exports `infinite`, which adds 1 to the imported `m0.counter` and calls
    /// itself
    const COUNTING_RECURSION: &str = "0061736d01000000010401600000020f01026d3007636f756e746572037e0103020100070c0108696e66696e69746500000a0d010b00230042017c240010000b";
    /// Imports `m1.infinite`
    const IMPORT_INFINITE: &str = "0061736d01000000010401600000020f01026d3108696e66696e6974650000";
    /// Calls the `host.tick` import three times, then returns 1
    const TICK: &str = "0061736d010000000108026000006000017f020d0104686f7374047469636b0000030201010707010372756e00010a0c010a0010001000100041010b";

    fn instantiate(hex_bytes: &str) -> (Store, InstanceId) {
        let mut store = Store::new();
        let id = store.instantiate(module(hex_bytes), &ImportObject::new()).unwrap();
        (store, id)
    }

    #[test]
    fn call() {
        let (mut store, id) = instantiate(CALL);
        assert_eq!(invoke(&mut store, id, 1, &[]), ExecutionResult::from(Value::I32(0x2a002a)));
    }

    #[test]
    fn call_trap() {
        let (mut store, id) = instantiate(CALL_TRAP);
        assert_eq!(invoke(&mut store, id, 1, &[]), ExecutionResult::Trapped);
    }

    #[test]
    fn call_with_arguments() {
        let (mut store, id) = instantiate(CALL_WITH_ARGUMENTS);
        assert_eq!(invoke(&mut store, id, 1, &[]), ExecutionResult::from(Value::I32(4)));
        assert_eq!(
            invoke(&mut store, id, 0, &[Value::I32(2), Value::I32(7)]),
            ExecutionResult::from(Value::I32(5))
        );
    }

    #[rstest]
    #[case(0, ExecutionResult::from(Value::I32(0)))]
    #[case(1000, ExecutionResult::from(Value::I32(1000)))]
    #[case(CALL_STACK_LIMIT - 1, ExecutionResult::from(Value::I32(CALL_STACK_LIMIT as i32 - 1)))]
    #[case(CALL_STACK_LIMIT, ExecutionResult::Trapped)]
    fn deep_recursion_runs_to_the_limit(#[case] n: u32, #[case] expected: ExecutionResult) {
        let (mut store, id) = instantiate(COUNTDOWN);
        let count = store.find_exported_function_index(id, "count").unwrap();
        assert_eq!(invoke(&mut store, id, count, &[Value::I32(n as i32)]), expected);
    }

    #[test]
    fn recursion_depth_counts_from_the_entry_depth() {
        let (mut store, id) = instantiate(COUNTDOWN);
        assert_eq!(
            execute(&mut store, id, 0, &[Value::I32(10)], CALL_STACK_LIMIT - 11),
            ExecutionResult::from(Value::I32(10))
        );
        assert_eq!(
            execute(&mut store, id, 0, &[Value::I32(10)], CALL_STACK_LIMIT - 10),
            ExecutionResult::Trapped
        );
    }

    #[rstest]
    #[case(0, ExecutionResult::from(Value::I32(7)))]
    #[case(1, ExecutionResult::from(Value::I32(9)))]
    #[case(2, ExecutionResult::Trapped)]
    #[case(3, ExecutionResult::Trapped)]
    #[case(-1, ExecutionResult::Trapped)]
    fn call_indirect(#[case] slot: i32, #[case] expected: ExecutionResult) {
        let (mut store, id) = instantiate(CALL_INDIRECT);
        let dispatch = store.find_exported_function_index(id, "dispatch").unwrap();
        assert_eq!(invoke(&mut store, id, dispatch, &[Value::I32(slot)]), expected);
    }

    #[test]
    fn call_indirect_signature_mismatch() {
        let (mut store, id) = instantiate(CALL_INDIRECT);
        let mismatch = store.find_exported_function_index(id, "mismatch").unwrap();
        assert_eq!(invoke(&mut store, id, mismatch, &[]), ExecutionResult::Trapped);
    }

    fn tick(context: &HostContext, _: &mut Store, _: InstanceId, _: &[Value], _: u32) -> ExecutionResult {
        match context.downcast_ref::<Cell<u32>>() {
            Some(ticks) => {
                ticks.set(ticks.get() + 1);
                ExecutionResult::VOID
            }
            None => ExecutionResult::Trapped,
        }
    }

    #[test]
    fn host_context_carries_state() {
        let ticks = Rc::new(Cell::new(0u32));
        let context: HostContext = ticks.clone();
        let mut imports = ImportObject::new();
        imports.add_host_function(
            "host",
            "tick",
            HostFunction::with_context(FunctionType::new(&[], &[]), context, tick),
        );

        let mut store = Store::new();
        let id = store.instantiate(module(TICK), &imports).unwrap();
        let run = store.find_exported_function_index(id, "run").unwrap();

        assert_eq!(invoke(&mut store, id, run, &[]), ExecutionResult::from(Value::I32(1)));
        assert_eq!(ticks.get(), 3);
        assert_eq!(invoke(&mut store, id, run, &[]), ExecutionResult::from(Value::I32(1)));
        assert_eq!(ticks.get(), 6);
    }

    fn refuse(_: &HostContext, _: &mut Store, _: InstanceId, _: &[Value], _: u32) -> ExecutionResult {
        ExecutionResult::Trapped
    }

    fn wrong_arity(_: &HostContext, _: &mut Store, _: InstanceId, _: &[Value], _: u32) -> ExecutionResult {
        ExecutionResult::VOID
    }

    #[rstest]
    #[case(refuse as kexec::runtime::HostCallback)]
    #[case(wrong_arity as kexec::runtime::HostCallback)]
    fn host_failure_traps_the_caller(#[case] callback: kexec::runtime::HostCallback) {
        let mut imports = ImportObject::new();
        imports.add_host_function(
            "host",
            "f",
            HostFunction::new(FunctionType::new(&[], &[ValueType::I32]), callback),
        );
        let mut store = Store::new();
        let id = store.instantiate(module(CALL_IMPORTED_HOST), &imports).unwrap();

        assert_eq!(invoke(&mut store, id, 1, &[]), ExecutionResult::Trapped);
    }

    #[test]
    fn cross_instance_call() {
        let mut store = Store::new();
        let importer = link_to_exporter(&mut store, CALL_IMPORTED_WASM);
        assert_eq!(store.instance_count(), 2);
        assert_eq!(invoke(&mut store, importer, 1, &[]), ExecutionResult::from(Value::I32(1)));
    }

    #[test]
    fn host_function_shared_between_instances() {
        let (imports, record) = recording_imports();
        let mut store = Store::new();
        let first = store.instantiate(module(CALL_IMPORTED_HOST), &imports).unwrap();

        let host = match store.instance(first).unwrap().function(0).unwrap() {
            kexec::runtime::FunctionSlot::ImportedHost(host) => Rc::clone(host),
            other => panic!("unexpected slot {:?}", other),
        };
        let mut imports = ImportObject::new();
        imports.add_function("host", "f", ExternalFunction::Host(host));
        let second = store.instantiate(module(CALL_IMPORTED_HOST), &imports).unwrap();

        assert_eq!(execute(&mut store, second, 1, &[], 5), ExecutionResult::from(Value::I32(1)));
        assert_eq!(record.get(), Some(6));
    }

    #[test]
    fn count_calls_to_imported_function() {
        let counter = ExternalGlobal::new(Value::I64(0), true);
        let mut imports = ImportObject::new();
        imports.add_global("m0", "counter", counter.clone());

        let mut store = Store::new();
        let counting = store.instantiate(module(COUNTING_RECURSION), &imports).unwrap();
        assert_eq!(invoke(&mut store, counting, 0, &[]), ExecutionResult::Trapped);
        assert_eq!(counter.get(), Value::I64(i64::from(CALL_STACK_LIMIT)));

        let mut imports = ImportObject::new();
        imports.add_function("m1", "infinite", store.find_exported_function(counting, "infinite").unwrap());
        let importer = store.instantiate(module(IMPORT_INFINITE), &imports).unwrap();

        counter.value.set(Value::I64(0));
        assert_eq!(invoke(&mut store, importer, 0, &[]), ExecutionResult::Trapped);
        assert_eq!(counter.get(), Value::I64(i64::from(CALL_STACK_LIMIT)));
    }
}
