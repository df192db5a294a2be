//! Labels and fixups (spec.md §3 "Label / fixup", §4.1 "Label protocol").
//!
//! A label is an opaque handle for an instruction index that isn't known
//! yet. Branch instructions are emitted referencing a label; `mark_label`
//! records the real index once it's reached; every pending reference is
//! backpatched when the CCO is sealed. Grounded in the teacher crate's own
//! `emit::Label` (`src/emit.rs`) and its `builder().label(...)` /
//! `bind_label(...)` calls seen throughout `src/emit/expr.rs`.

use span::LineCol;

use crate::error::{fault, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(usize);

/// Where a branch instruction's target currently stands: either still
/// waiting on a label to be marked, or already resolved to a concrete
/// instruction index (set at seal time).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchTarget {
  Label(Label),
  Resolved(u32),
}

impl BranchTarget {
  pub fn resolved(&self) -> Option<u32> {
    match self {
      BranchTarget::Resolved(i) => Some(*i),
      BranchTarget::Label(_) => None,
    }
  }
}

#[derive(Default)]
pub struct Labels {
  /// Instruction index each label was marked at, once known.
  marks: Vec<Option<u32>>,
}

impl Labels {
  pub fn new() -> Self {
    Self { marks: Vec::new() }
  }

  /// Allocate a fresh, unmarked label.
  pub fn label(&mut self) -> Label {
    self.marks.push(None);
    Label(self.marks.len() - 1)
  }

  /// Record that `label` refers to `instruction_index`. Marking the same
  /// label twice is a compiler fault — the protocol assumes each label
  /// names exactly one program point.
  pub fn mark(&mut self, label: Label, instruction_index: u32, at: LineCol) -> Result<()> {
    match self.marks.get_mut(label.0) {
      Some(slot @ None) => {
        *slot = Some(instruction_index);
        Ok(())
      }
      Some(Some(_)) => fault!(at, "label {:?} marked twice", label),
      None => fault!(at, "label {:?} does not belong to this CCO", label),
    }
  }

  /// Resolve `label` to its marked instruction index. An unmarked label at
  /// this point is a compiler fault (spec.md §4.1 "Label protocol": "an
  /// unmarked label is a compiler fault").
  pub fn resolve(&self, label: Label, at: LineCol) -> Result<u32> {
    match self.marks.get(label.0) {
      Some(Some(index)) => Ok(*index),
      _ => fault!(at, "label {:?} was never marked", label),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pos() -> LineCol {
    LineCol { line: 1, column: 1 }
  }

  #[test]
  fn mark_then_resolve() {
    let mut labels = Labels::new();
    let l = labels.label();
    labels.mark(l, 7, pos()).unwrap();
    assert_eq!(labels.resolve(l, pos()).unwrap(), 7);
  }

  #[test]
  fn marking_twice_faults() {
    let mut labels = Labels::new();
    let l = labels.label();
    labels.mark(l, 1, pos()).unwrap();
    assert!(labels.mark(l, 2, pos()).is_err());
  }

  #[test]
  fn resolving_unmarked_faults() {
    let mut labels = Labels::new();
    let l = labels.label();
    assert!(labels.resolve(l, pos()).is_err());
  }
}
