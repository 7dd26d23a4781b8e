//! Label stack for structured control flow
//!
//! Each active `block`, `loop` or `if` has a label recording where a branch to
//! it continues, how many values the branch carries and the operand stack
//! height to unwind to.

use super::Trap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelType {
    Block,
    /// Branches to a loop label restart the loop and keep the label active
    Loop,
    If,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub label_type: LabelType,
    /// Values carried by a branch: results for blocks, parameters for loops
    pub arity: usize,
    /// Operand stack height below the block's parameters
    pub stack_height: usize,
    /// Instruction a branch to this label continues at
    pub continuation: usize,
}

#[derive(Debug, Default)]
pub struct LabelStack {
    labels: Vec<Label>,
}

impl LabelStack {
    pub fn new() -> Self {
        LabelStack { labels: Vec::new() }
    }

    pub fn push(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn pop(&mut self) -> Option<Label> {
        self.labels.pop()
    }

    /// Label at `depth` from the top, 0 being the innermost
    pub fn get(&self, depth: u32) -> Result<&Label, Trap> {
        let depth = depth as usize;
        if depth >= self.labels.len() {
            return Err(Trap::UnknownIndex {
                kind: "label",
                index: depth as u32,
            });
        }
        Ok(&self.labels[self.labels.len() - 1 - depth])
    }

    /// Resolve a branch to the label at `depth`: drop the labels it exits and
    /// return the target. A loop target stays on the stack.
    pub fn branch(&mut self, depth: u32) -> Result<Label, Trap> {
        let target = self.get(depth)?.clone();
        let keep = self.labels.len() - depth as usize;
        let keep = match target.label_type {
            LabelType::Loop => keep,
            LabelType::Block | LabelType::If => keep - 1,
        };
        self.labels.truncate(keep);
        Ok(target)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
