//! The per-routine CCO builder (spec.md §4.2 "CCO builder").
//!
//! One [`CcoBuilder`] exists per routine currently being lowered. Nested
//! routines (methods, closures, class bodies) get their own builder, parented
//! to the enclosing one so `resolve_local` can walk outward. The nesting
//! trick is `mem::replace`: starting a child routine swaps the *current*
//! builder for a fresh one and tucks the old one inside it as `parent`;
//! finishing the child swaps back. This is the same shape as the teacher
//! crate's real `Emitter::emit_func` (`crates/emit/src/emitter.rs`), which
//! does `mem::replace(&mut self.function, Function::new(..))` around the
//! nested function body and restores the parent afterward.

use std::mem;

use span::LineCol;
use tracing::trace;

use crate::ast::{RoutineKind, Visibility};
use crate::error::{fault, Result};

use super::instr::{Instr, Opcode};
use super::label::{BranchTarget, Label, Labels};
use super::locals::LocalTable;
use super::operand::{ChildIdx, ConstIdx};
use super::pool::{Pool, PoolFloat};
use super::register::{RegAlloc, Register};
use super::Cco;

pub struct CcoBuilder {
  name: String,
  file: String,
  start_line: u32,
  visibility: Visibility,
  kind: RoutineKind,
  required_args: u32,
  total_args: u32,
  rest_argument: bool,

  regalloc: RegAlloc,
  locals: LocalTable,
  integers: Pool<i64>,
  floats: Pool<PoolFloat>,
  strings: Pool<String>,
  children: Vec<Cco>,
  instructions: Vec<Instr>,
  labels: Labels,

  parent: Option<Box<CcoBuilder>>,
}

impl CcoBuilder {
  pub fn new(
    name: impl Into<String>,
    file: impl Into<String>,
    start_line: u32,
    visibility: Visibility,
    kind: RoutineKind,
  ) -> Self {
    Self {
      name: name.into(),
      file: file.into(),
      start_line,
      visibility,
      kind,
      required_args: 0,
      total_args: 0,
      rest_argument: false,
      regalloc: RegAlloc::new(),
      locals: LocalTable::new(),
      integers: Pool::new(),
      floats: Pool::new(),
      strings: Pool::new(),
      children: Vec::new(),
      instructions: Vec::new(),
      labels: Labels::new(),
      parent: None,
    }
  }

  pub fn set_arity(&mut self, required: u32, total: u32, rest: bool) {
    self.required_args = required;
    self.total_args = total;
    self.rest_argument = rest;
  }

  pub fn alloc_register(&mut self) -> Register {
    self.regalloc.alloc()
  }

  pub fn add_integer(&mut self, value: i64) -> ConstIdx {
    ConstIdx(self.integers.add(value))
  }

  pub fn add_float(&mut self, value: f64, at: LineCol) -> Result<ConstIdx> {
    match PoolFloat::new(value) {
      Some(f) => Ok(ConstIdx(self.floats.add(f))),
      None => fault!(at, "NaN float literal cannot be pooled"),
    }
  }

  pub fn add_string(&mut self, value: impl Into<String>) -> ConstIdx {
    ConstIdx(self.strings.add(value.into()))
  }

  pub fn set_local(&mut self, name: impl Into<String>) -> super::operand::LocalIdx {
    super::operand::LocalIdx(self.locals.add(name))
  }

  pub fn locals_include(&self, name: &str) -> bool {
    self.locals.include(name)
  }

  /// Walk from the current routine outward, returning `(depth, index)` of
  /// the nearest enclosing local named `name`. Depth 0 is the current CCO.
  pub fn resolve_local(&self, name: &str) -> Option<(u32, u32)> {
    self.resolve_local_at_depth(name, 0)
  }

  fn resolve_local_at_depth(&self, name: &str, depth: u32) -> Option<(u32, u32)> {
    if let Some(index) = self.locals.index_of(name) {
      return Some((depth, index));
    }
    self.parent.as_ref()?.resolve_local_at_depth(name, depth + 1)
  }

  pub fn label(&mut self) -> Label {
    self.labels.label()
  }

  pub fn mark_label(&mut self, label: Label, at: LineCol) -> Result<()> {
    let index = self.instructions.len() as u32;
    self.labels.mark(label, index, at)
  }

  /// Append an instruction, returning its index.
  pub fn push(&mut self, opcode: Opcode, at: LineCol) -> u32 {
    let index = self.instructions.len() as u32;
    trace!(mnemonic = opcode.mnemonic().as_ref(), index, "push");
    self.instructions.push(Instr::new(opcode, at));
    index
  }

  /// Begin lowering a nested routine: the current builder becomes `parent`
  /// of a fresh builder, which becomes current. Call [`Self::end_child`]
  /// once the nested body is fully lowered.
  pub fn begin_child(
    &mut self,
    name: impl Into<String>,
    file: impl Into<String>,
    start_line: u32,
    visibility: Visibility,
    kind: RoutineKind,
  ) {
    let name = name.into();
    trace!(name = %name, ?kind, start_line, "begin_child");
    let fresh = CcoBuilder::new(name, file, start_line, visibility, kind);
    let parent = mem::replace(self, fresh);
    self.parent = Some(Box::new(parent));
  }

  /// Seal the current (child) builder and restore `self` to the parent
  /// builder it was swapped in for. Panics if called without a matching
  /// `begin_child` — that would be a lowering bug, not a source error.
  pub fn end_child(&mut self) -> Result<Cco> {
    let parent = self
      .parent
      .take()
      .expect("end_child called without a matching begin_child");
    let finished = mem::replace(self, *parent);
    trace!(name = %finished.name, "end_child");
    finished.seal()
  }

  /// Register a fully-built child CCO in this builder's child pool, not
  /// de-duplicated (spec.md §3: "the child-CCO pool is *not*
  /// de-duplicated").
  pub fn add_child(&mut self, cco: Cco) -> ChildIdx {
    let index = self.children.len() as u32;
    self.children.push(cco);
    ChildIdx(index)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn file(&self) -> &str {
    &self.file
  }

  pub fn kind(&self) -> RoutineKind {
    self.kind
  }

  /// The most recently pushed instruction, if any. Used to insert an
  /// implicit return at the end of a routine body (spec.md §4.1 "Method
  /// definition").
  pub fn last_instruction(&self) -> Option<&Instr> {
    self.instructions.last()
  }

  /// Finish this routine: resolve every pending branch target against its
  /// label, faulting on any label never marked (spec.md §4.1 "Label
  /// protocol"), then freeze everything into an immutable [`Cco`].
  pub fn seal(mut self) -> Result<Cco> {
    trace!(name = %self.name, instructions = self.instructions.len(), "seal");
    for instr in &mut self.instructions {
      let at = instr.at;
      let target = match &mut instr.opcode {
        Opcode::Goto { target } => target,
        Opcode::GotoIfTrue { target, .. } => target,
        Opcode::GotoIfFalse { target, .. } => target,
        _ => continue,
      };
      if let BranchTarget::Label(label) = *target {
        let index = self.labels.resolve(label, at)?;
        *target = BranchTarget::Resolved(index);
      }
    }

    Ok(Cco {
      name: self.name,
      file: self.file,
      start_line: self.start_line,
      visibility: self.visibility,
      kind: self.kind,
      argument_count: self.total_args,
      required_args: self.required_args,
      rest_argument: self.rest_argument,
      frame_size: self.regalloc.count(),
      locals: self.locals.into_vec(),
      instructions: self.instructions,
      integer_pool: self.integers.into_vec(),
      float_pool: self.floats.into_vec().into_iter().map(PoolFloat::get).collect(),
      string_pool: self.strings.into_vec(),
      children: self.children,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pos() -> LineCol {
    LineCol { line: 1, column: 1 }
  }

  #[test]
  fn nested_child_resolves_parent_local() {
    let mut root = CcoBuilder::new("<module>", "t.rb", 1, Visibility::Public, RoutineKind::Module);
    root.set_local("a");

    root.begin_child("<closure>", "t.rb", 1, Visibility::Public, RoutineKind::Closure);
    assert_eq!(root.resolve_local("a"), Some((1, 0)));
    assert_eq!(root.resolve_local("missing"), None);
    let sealed = root.end_child().unwrap();

    assert_eq!(sealed.name, "<closure>");
    assert_eq!(root.name(), "<module>");
  }

  #[test]
  fn seal_resolves_marked_labels() {
    let mut b = CcoBuilder::new("<module>", "t.rb", 1, Visibility::Public, RoutineKind::Module);
    let done = b.label();
    let r = b.alloc_register();
    b.push(Opcode::Goto { target: BranchTarget::Label(done) }, pos());
    b.mark_label(done, pos()).unwrap();
    b.push(Opcode::Return { value: r }, pos());
    let cco = b.seal().unwrap();
    match &cco.instructions[0].opcode {
      Opcode::Goto { target } => assert_eq!(target.resolved(), Some(1)),
      _ => panic!("expected goto"),
    }
  }

  #[test]
  fn seal_faults_on_unmarked_label() {
    let mut b = CcoBuilder::new("<module>", "t.rb", 1, Visibility::Public, RoutineKind::Module);
    let l = b.label();
    b.push(Opcode::Goto { target: BranchTarget::Label(l) }, pos());
    assert!(b.seal().is_err());
  }
}
