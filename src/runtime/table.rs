//! Function table
//!
//! Elements are handles into the store's function registry; an empty slot is
//! `None` and traps when called through `call_indirect`.

use std::cell::RefCell;
use std::rc::Rc;

use super::{FuncRef, Trap};
use crate::parser::module::Limits;

pub type SharedTable = Rc<RefCell<Table>>;

#[derive(Debug)]
pub struct Table {
    elements: Vec<Option<FuncRef>>,
    max: Option<u32>,
}

impl Table {
    pub fn new(limits: Limits) -> Self {
        Table {
            elements: vec![None; limits.min as usize],
            max: limits.max,
        }
    }

    pub fn shared(self) -> SharedTable {
        Rc::new(RefCell::new(self))
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn limits(&self) -> Limits {
        Limits {
            min: self.size(),
            max: self.max,
        }
    }

    /// Element at `index`; out of range is `UndefinedElement`, an empty slot
    /// is `UninitializedElement`.
    pub fn get(&self, index: u32) -> Result<FuncRef, Trap> {
        self.elements
            .get(index as usize)
            .ok_or(Trap::UndefinedElement)?
            .ok_or(Trap::UninitializedElement)
    }

    pub fn set(&mut self, index: u32, func: Option<FuncRef>) -> Result<(), Trap> {
        let slot = self
            .elements
            .get_mut(index as usize)
            .ok_or(Trap::UndefinedElement)?;
        *slot = func;
        Ok(())
    }

    /// Whether `len` elements starting at `offset` fit in the table
    pub fn fits(&self, offset: u32, len: usize) -> bool {
        (offset as usize)
            .checked_add(len)
            .map_or(false, |end| end <= self.elements.len())
    }
}
