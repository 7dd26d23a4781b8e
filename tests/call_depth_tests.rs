mod common;

#[cfg(test)]
mod tests {
    use crate::common::*;
    use kexec::runtime::limits::CALL_STACK_LIMIT;
    use kexec::runtime::{execute, ExecutionResult, HostContext, HostFunction, ImportObject, InstanceId, Store, Value};
    use kexec::parser::module::{FunctionType, ValueType};
    use rstest::rstest;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::thread;

    const L: u32 = CALL_STACK_LIMIT;
    const ONE: ExecutionResult = ExecutionResult::Returned(Some(Value::I32(1)));

    fn single(hex_bytes: &str) -> (Store, InstanceId) {
        let mut store = Store::new();
        let id = store.instantiate(module(hex_bytes), &ImportObject::new()).unwrap();
        (store, id)
    }

    #[rstest]
    #[case(0, ONE)]
    #[case(L - 1, ONE)]
    #[case(L, ExecutionResult::Trapped)]
    #[case(L + 1, ExecutionResult::Trapped)]
    #[case(u32::MAX, ExecutionResult::Trapped)]
    fn internal_leaf(#[case] depth: u32, #[case] expected: ExecutionResult) {
        let (mut store, id) = single(INTERNAL_LEAF);
        assert_eq!(execute(&mut store, id, 0, &[], depth), expected);
    }

    #[rstest]
    #[case(0, ONE)]
    #[case(L - 1, ONE)]
    #[case(L, ExecutionResult::Trapped)]
    fn imported_wasm_executed_directly(#[case] depth: u32, #[case] expected: ExecutionResult) {
        let mut store = Store::new();
        let importer = link_to_exporter(&mut store, IMPORT_WASM_ONLY);
        assert_eq!(execute(&mut store, importer, 0, &[], depth), expected);
    }

    #[rstest]
    #[case(0, ONE, Some(0))]
    #[case(L - 1, ONE, Some(L - 1))]
    #[case(L, ExecutionResult::Trapped, None)]
    fn host_executed_directly(#[case] depth: u32, #[case] expected: ExecutionResult, #[case] recorded: Option<u32>) {
        let (imports, record) = recording_imports();
        let mut store = Store::new();
        let id = store.instantiate(module(IMPORT_HOST_ONLY), &imports).unwrap();

        assert_eq!(execute(&mut store, id, 0, &[], depth), expected);
        assert_eq!(record.get(), recorded);
    }

    #[rstest]
    #[case(0, ONE)]
    #[case(L - 2, ONE)]
    #[case(L - 1, ExecutionResult::Trapped)]
    #[case(L, ExecutionResult::Trapped)]
    fn one_internal_call(#[case] depth: u32, #[case] expected: ExecutionResult) {
        let (mut store, id) = single(CALL_INTERNAL);
        assert_eq!(execute(&mut store, id, 1, &[], depth), expected);
    }

    #[rstest]
    #[case(0, ONE)]
    #[case(L - 2, ONE)]
    #[case(L - 1, ExecutionResult::Trapped)]
    #[case(L, ExecutionResult::Trapped)]
    fn one_cross_instance_call(#[case] depth: u32, #[case] expected: ExecutionResult) {
        let mut store = Store::new();
        let importer = link_to_exporter(&mut store, CALL_IMPORTED_WASM);
        assert_eq!(execute(&mut store, importer, 1, &[], depth), expected);
    }

    #[rstest]
    #[case(0, ONE, Some(1))]
    #[case(L - 2, ONE, Some(L - 1))]
    #[case(L - 1, ExecutionResult::Trapped, None)]
    #[case(L, ExecutionResult::Trapped, None)]
    fn host_behind_one_call(#[case] depth: u32, #[case] expected: ExecutionResult, #[case] recorded: Option<u32>) {
        let (imports, record) = recording_imports();
        let mut store = Store::new();
        let id = store.instantiate(module(CALL_IMPORTED_HOST), &imports).unwrap();

        assert_eq!(execute(&mut store, id, 1, &[], depth), expected);
        assert_eq!(record.get(), recorded);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(L - 1)]
    #[case(L)]
    fn unbounded_recursion_traps(#[case] depth: u32) {
        let (mut store, id) = single(INFINITE_RECURSION);
        assert_eq!(execute(&mut store, id, 0, &[], depth), ExecutionResult::Trapped);
    }

    #[test]
    fn store_survives_a_trap() {
        let (mut store, id) = single(INFINITE_RECURSION);
        assert_eq!(execute(&mut store, id, 0, &[], 0), ExecutionResult::Trapped);

        let leaf = store.instantiate(module(INTERNAL_LEAF), &ImportObject::new()).unwrap();
        assert_eq!(execute(&mut store, leaf, 0, &[], 0), ONE);
        assert_eq!(execute(&mut store, id, 0, &[], L), ExecutionResult::Trapped);
    }

    #[test]
    fn reexported_import_keeps_arithmetic() {
        let mut store = Store::new();
        let middle = link_to_exporter(&mut store, REEXPORTER);
        let g = store.find_exported_function(middle, "g").unwrap();

        let mut imports = ImportObject::new();
        imports.add_function("exporter", "f", g);
        let importer = store.instantiate(module(CALL_IMPORTED_WASM), &imports).unwrap();

        assert_eq!(execute(&mut store, importer, 1, &[], L - 2), ONE);
        assert_eq!(execute(&mut store, importer, 1, &[], L - 1), ExecutionResult::Trapped);
    }

    /// Calls function 0 of the instance in its context one level deeper
    fn reenter(context: &HostContext, store: &mut Store, _: InstanceId, _: &[Value], depth: u32) -> ExecutionResult {
        match context.downcast_ref::<InstanceId>() {
            Some(target) => execute(store, *target, 0, &[], depth.saturating_add(1)),
            None => ExecutionResult::Trapped,
        }
    }

    #[rstest]
    #[case(0, ONE)]
    #[case(L - 3, ONE)]
    #[case(L - 2, ExecutionResult::Trapped)]
    fn host_reentry_shares_the_counter(#[case] depth: u32, #[case] expected: ExecutionResult) {
        let mut store = Store::new();
        let leaf = store.instantiate(module(INTERNAL_LEAF), &ImportObject::new()).unwrap();

        let context: HostContext = Rc::new(leaf);
        let host = HostFunction::with_context(FunctionType::new(&[], &[ValueType::I32]), context, reenter);
        let mut imports = ImportObject::new();
        imports.add_host_function("host", "f", host);
        let id = store.instantiate(module(CALL_IMPORTED_HOST), &imports).unwrap();

        // func1 at depth, host at depth + 1, leaf at depth + 2
        assert_eq!(execute(&mut store, id, 1, &[], depth), expected);
    }

    /// State of a recursing host function: the function it re-enters, whether
    /// it stops at the deepest allowed depth, and how often it ran
    struct Recursion {
        target: u32,
        stop_at_limit: bool,
        calls: Cell<u32>,
    }

    fn recurse(context: &HostContext, store: &mut Store, instance: InstanceId, args: &[Value], depth: u32) -> ExecutionResult {
        let recursion = match context.downcast_ref::<Recursion>() {
            Some(recursion) => recursion,
            None => return ExecutionResult::Trapped,
        };
        recursion.calls.set(recursion.calls.get() + 1);
        if recursion.stop_at_limit && depth == L - 1 {
            return ONE;
        }
        execute(store, instance, recursion.target, args, depth + 1)
    }

    fn run_recursion(hex_bytes: &str, entry: u32, target: u32, stop_at_limit: bool) -> (ExecutionResult, u32) {
        let recursion = Rc::new(Recursion {
            target,
            stop_at_limit,
            calls: Cell::new(0),
        });
        let context: HostContext = recursion.clone();
        let mut imports = ImportObject::new();
        imports.add_host_function(
            "host",
            "f",
            HostFunction::with_context(FunctionType::new(&[], &[ValueType::I32]), context, recurse),
        );
        let mut store = Store::new();
        let id = store.instantiate(module(hex_bytes), &imports).unwrap();

        let result = execute(&mut store, id, entry, &[], 0);
        (result, recursion.calls.get())
    }

    // The host sits at every depth when it re-enters itself, and at every
    // other depth when it goes through func1's call.
    #[rstest]
    #[case::host_to_the_limit(IMPORT_HOST_ONLY, 0, 0, true, ONE, L)]
    #[case::through_a_call_to_the_limit(CALL_IMPORTED_HOST, 1, 1, true, ONE, L / 2)]
    #[case::runaway_host(CALL_IMPORTED_HOST, 0, 0, false, ExecutionResult::Trapped, L)]
    #[case::runaway_host_from_wasm(CALL_IMPORTED_HOST, 1, 0, false, ExecutionResult::Trapped, L - 1)]
    #[case::interleaved_from_host(CALL_IMPORTED_HOST, 0, 1, false, ExecutionResult::Trapped, L / 2)]
    #[case::interleaved_from_wasm(CALL_IMPORTED_HOST, 1, 1, false, ExecutionResult::Trapped, L / 2)]
    fn host_recursion_is_bounded_by_the_limit(
        #[case] hex_bytes: &str,
        #[case] entry: u32,
        #[case] target: u32,
        #[case] stop_at_limit: bool,
        #[case] expected: ExecutionResult,
        #[case] calls: u32,
    ) {
        assert_eq!(run_recursion(hex_bytes, entry, target, stop_at_limit), (expected, calls));
    }

    #[test]
    fn host_recursion_on_a_small_thread_stack() {
        let handle = thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                (
                    run_recursion(IMPORT_HOST_ONLY, 0, 0, true),
                    run_recursion(CALL_IMPORTED_HOST, 0, 1, false),
                )
            })
            .unwrap();
        let (to_the_limit, interleaved) = handle.join().unwrap();
        assert_eq!(to_the_limit, (ONE, L));
        assert_eq!(interleaved, (ExecutionResult::Trapped, L / 2));
    }
}
