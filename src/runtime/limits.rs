//! Execution policy constants

/// Maximum call depth. Valid depths are `0..CALL_STACK_LIMIT`; a call at
/// `CALL_STACK_LIMIT` or deeper traps before doing any work.
pub const CALL_STACK_LIMIT: u32 = 2048;

/// Native stack that must remain before a host callback runs. Host callbacks
/// may re-enter the engine, which is the only native recursion, so every
/// invocation is checked against this red zone.
pub const HOST_CALL_RED_ZONE: usize = 256 * 1024;

/// Size of each extra stack segment allocated once the red zone is reached
pub const HOST_CALL_STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Size of a linear memory page in bytes
pub const PAGE_SIZE: u32 = 65536;

/// Number of pages addressable with a 32-bit index
pub const MAX_MEMORY_PAGES_LIMIT: u32 = 65536;

/// 256 MiB
pub const DEFAULT_MEMORY_PAGES_LIMIT: u32 = (256 * 1024 * 1024) / PAGE_SIZE;
