//! Decoder limits
//!
//! Counts read from the binary are checked against these before anything is
//! allocated, so a short malformed input cannot claim a huge vector. Values
//! follow V8's wasm-limits.h.

pub const MAX_TYPES: u32 = 1_000_000;
pub const MAX_FUNCTIONS: u32 = 1_000_000;
pub const MAX_IMPORTS: u32 = 100_000;
pub const MAX_EXPORTS: u32 = 100_000;
pub const MAX_GLOBALS: u32 = 1_000_000;
pub const MAX_DATA_SEGMENTS: u32 = 100_000;
pub const MAX_ELEMENT_SEGMENTS: u32 = 10_000_000;

/// Initial table size
pub const MAX_TABLE_SIZE: u32 = 10_000_000;

pub const MAX_FUNCTION_SIZE: u32 = 7_654_321;
pub const MAX_FUNCTION_PARAMS: u32 = 1_000;

/// Parameters plus declared locals
pub const MAX_FUNCTION_LOCALS: u32 = 50_000;

pub const MAX_BR_TABLE_LABELS: u32 = 65_520;

/// Check a decoded count against its limit.
pub fn check(what: &'static str, count: u32, limit: u32) -> Result<u32, super::ParseError> {
    if count > limit {
        Err(super::ParseError::LimitExceeded(what, count))
    } else {
        Ok(count)
    }
}
