//! Linear memory
//!
//! All accesses are bounds-checked against the current size; the effective
//! address is computed in 64 bits so `address + offset` cannot wrap.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};

use super::limits::{MAX_MEMORY_PAGES_LIMIT, PAGE_SIZE};
use super::{RuntimeError, Trap};
use crate::parser::module::Limits;

/// Memory shared between the defining instance and importers
pub type SharedMemory = Rc<RefCell<Memory>>;

#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    max_pages: Option<u32>,
    /// Hard cap applied on top of `max_pages`, set at instantiation
    pages_limit: u32,
}

impl Memory {
    pub fn new(limits: Limits, pages_limit: u32) -> Result<Self, RuntimeError> {
        let pages_limit = pages_limit.min(MAX_MEMORY_PAGES_LIMIT);
        if limits.min > pages_limit {
            return Err(RuntimeError::MemoryLimitExceeded {
                requested: limits.min,
                limit: pages_limit,
            });
        }
        Ok(Memory {
            data: vec![0; limits.min as usize * PAGE_SIZE as usize],
            max_pages: limits.max,
            pages_limit,
        })
    }

    pub fn shared(self) -> SharedMemory {
        Rc::new(RefCell::new(self))
    }

    /// Current size in pages
    pub fn size(&self) -> u32 {
        (self.data.len() / PAGE_SIZE as usize) as u32
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Limits as seen by an importer
    pub fn limits(&self) -> Limits {
        Limits {
            min: self.size(),
            max: self.max_pages,
        }
    }

    /// Grow by `delta` pages, returning the previous size in pages, or -1 if
    /// the new size would exceed the declared maximum or the pages limit.
    pub fn grow(&mut self, delta: u32) -> i32 {
        let old = self.size();
        let ceiling = self.max_pages.unwrap_or(MAX_MEMORY_PAGES_LIMIT).min(self.pages_limit);
        match old.checked_add(delta) {
            Some(new) if new <= ceiling => {
                self.data.resize(new as usize * PAGE_SIZE as usize, 0);
                old as i32
            }
            _ => -1,
        }
    }

    fn range(&self, addr: u32, offset: u32, len: usize) -> Result<Range<usize>, Trap> {
        let start = u64::from(addr) + u64::from(offset);
        let end = start + len as u64;
        if end > self.data.len() as u64 {
            return Err(Trap::MemoryOutOfBounds);
        }
        Ok(start as usize..end as usize)
    }

    fn slice(&self, addr: u32, offset: u32, len: usize) -> Result<&[u8], Trap> {
        let range = self.range(addr, offset, len)?;
        Ok(&self.data[range])
    }

    fn slice_mut(&mut self, addr: u32, offset: u32, len: usize) -> Result<&mut [u8], Trap> {
        let range = self.range(addr, offset, len)?;
        Ok(&mut self.data[range])
    }

    pub fn read_u8(&self, addr: u32, offset: u32) -> Result<u8, Trap> {
        Ok(self.slice(addr, offset, 1)?[0])
    }

    pub fn read_u16(&self, addr: u32, offset: u32) -> Result<u16, Trap> {
        Ok(LittleEndian::read_u16(self.slice(addr, offset, 2)?))
    }

    pub fn read_u32(&self, addr: u32, offset: u32) -> Result<u32, Trap> {
        Ok(LittleEndian::read_u32(self.slice(addr, offset, 4)?))
    }

    pub fn read_u64(&self, addr: u32, offset: u32) -> Result<u64, Trap> {
        Ok(LittleEndian::read_u64(self.slice(addr, offset, 8)?))
    }

    pub fn write_u8(&mut self, addr: u32, offset: u32, value: u8) -> Result<(), Trap> {
        self.slice_mut(addr, offset, 1)?[0] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: u32, offset: u32, value: u16) -> Result<(), Trap> {
        LittleEndian::write_u16(self.slice_mut(addr, offset, 2)?, value);
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u32, offset: u32, value: u32) -> Result<(), Trap> {
        LittleEndian::write_u32(self.slice_mut(addr, offset, 4)?, value);
        Ok(())
    }

    pub fn write_u64(&mut self, addr: u32, offset: u32, value: u64) -> Result<(), Trap> {
        LittleEndian::write_u64(self.slice_mut(addr, offset, 8)?, value);
        Ok(())
    }

    pub fn read_bytes(&self, addr: u32, len: usize) -> Result<&[u8], Trap> {
        self.slice(addr, 0, len)
    }

    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), Trap> {
        self.slice_mut(addr, 0, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }
}
