//! Visitor dispatch over a TIR [`super::Stream`] (spec.md §4.3: "passes
//! walk the instruction stream and dispatch by identifier to a per-kind
//! handler").
//!
//! A `Visitor` implements only the kinds it cares about; [`walk`] dispatches
//! every instruction to its corresponding method via [`super::Kind::visitor_id`],
//! falling back to [`Visitor::otherwise`] for anything a particular pass
//! doesn't override. [`Visitor::enter`] runs before dispatch on every
//! instruction regardless of kind, so a pass tracking position-dependent
//! state (e.g. a pending branch join keyed by instruction index) has
//! somewhere to hook in without overriding all thirty methods.

use super::{Instruction, Stream};

#[allow(unused_variables)]
pub trait Visitor {
  /// Runs before the per-kind dispatch below, for every instruction. The
  /// default does nothing.
  fn enter(&mut self, instr: &Instruction, index: usize) {}

  fn visit_allocate(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_allocate_array(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_integer(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_float(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_string(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_array(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_object(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_attribute(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_get_attribute(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_get_local(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_local(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_get_parent_local(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_parent_local(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_get_global(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_set_global(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_get_toplevel(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_get_true(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_get_false(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_local_exists(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_goto(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_goto_if_true(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_goto_if_false(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_return(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_send_object_message(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_run_block(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_integer_add(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_integer_equals(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_integer_greater(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_integer_smaller(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_integer_to_string(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }
  fn visit_object_equals(&mut self, instr: &Instruction, index: usize) {
    self.otherwise(instr, index)
  }

  /// Catch-all for every instruction kind a visitor doesn't override.
  fn otherwise(&mut self, instr: &Instruction, index: usize) {
    let _ = (instr, index);
  }
}

pub fn walk(stream: &Stream, visitor: &mut dyn Visitor) {
  use super::VisitorId::*;
  for (index, instr) in stream.instructions.iter().enumerate() {
    visitor.enter(instr, index);
    match instr.kind.visitor_id() {
      Allocate => visitor.visit_allocate(instr, index),
      AllocateArray => visitor.visit_allocate_array(instr, index),
      SetInteger => visitor.visit_set_integer(instr, index),
      SetFloat => visitor.visit_set_float(instr, index),
      SetString => visitor.visit_set_string(instr, index),
      SetArray => visitor.visit_set_array(instr, index),
      SetObject => visitor.visit_set_object(instr, index),
      SetAttribute => visitor.visit_set_attribute(instr, index),
      GetAttribute => visitor.visit_get_attribute(instr, index),
      GetLocal => visitor.visit_get_local(instr, index),
      SetLocal => visitor.visit_set_local(instr, index),
      GetParentLocal => visitor.visit_get_parent_local(instr, index),
      SetParentLocal => visitor.visit_set_parent_local(instr, index),
      GetGlobal => visitor.visit_get_global(instr, index),
      SetGlobal => visitor.visit_set_global(instr, index),
      GetToplevel => visitor.visit_get_toplevel(instr, index),
      GetTrue => visitor.visit_get_true(instr, index),
      GetFalse => visitor.visit_get_false(instr, index),
      LocalExists => visitor.visit_local_exists(instr, index),
      Goto => visitor.visit_goto(instr, index),
      GotoIfTrue => visitor.visit_goto_if_true(instr, index),
      GotoIfFalse => visitor.visit_goto_if_false(instr, index),
      Return => visitor.visit_return(instr, index),
      SendObjectMessage => visitor.visit_send_object_message(instr, index),
      RunBlock => visitor.visit_run_block(instr, index),
      IntegerAdd => visitor.visit_integer_add(instr, index),
      IntegerEquals => visitor.visit_integer_equals(instr, index),
      IntegerGreater => visitor.visit_integer_greater(instr, index),
      IntegerSmaller => visitor.visit_integer_smaller(instr, index),
      IntegerToString => visitor.visit_integer_to_string(instr, index),
      ObjectEquals => visitor.visit_object_equals(instr, index),
    }
  }
}

#[cfg(test)]
mod tests {
  use span::LineCol;

  use super::*;
  use crate::tir::{Kind, TirRegister};

  #[derive(Default)]
  struct Counts {
    adds: u32,
    returns: u32,
    other: u32,
  }

  impl Visitor for Counts {
    fn visit_integer_add(&mut self, _instr: &Instruction, _index: usize) {
      self.adds += 1;
    }
    fn visit_return(&mut self, _instr: &Instruction, _index: usize) {
      self.returns += 1;
    }
    fn otherwise(&mut self, _instr: &Instruction, _index: usize) {
      self.other += 1;
    }
  }

  fn at() -> LineCol {
    LineCol { line: 1, column: 1 }
  }

  #[test]
  fn walk_dispatches_each_instruction_to_its_overridden_method() {
    let r = TirRegister(0);
    let mut stream = Stream::new();
    stream.push(Instruction::new(Kind::IntegerAdd { lhs: r, rhs: r }, Some(r), at()));
    stream.push(Instruction::new(Kind::IntegerAdd { lhs: r, rhs: r }, Some(r), at()));
    stream.push(Instruction::new(Kind::Return { value: r }, None, at()));
    stream.push(Instruction::new(Kind::GetTrue, Some(r), at()));

    let mut counts = Counts::default();
    walk(&stream, &mut counts);

    assert_eq!(counts.adds, 2);
    assert_eq!(counts.returns, 1);
    assert_eq!(counts.other, 1, "GetTrue has its own method, overridden here only via otherwise");
  }

  #[test]
  fn unoverridden_visitor_methods_fall_back_to_otherwise_by_default() {
    struct JustCounts(u32);
    impl Visitor for JustCounts {
      fn otherwise(&mut self, _instr: &Instruction, _index: usize) {
        self.0 += 1;
      }
    }

    let r = TirRegister(0);
    let mut stream = Stream::new();
    stream.push(Instruction::new(Kind::IntegerAdd { lhs: r, rhs: r }, Some(r), at()));
    stream.push(Instruction::new(Kind::Return { value: r }, None, at()));

    let mut counts = JustCounts(0);
    walk(&stream, &mut counts);

    assert_eq!(counts.0, 2, "the default visit_* impls forward to otherwise when unoverridden");
  }

  #[test]
  fn enter_runs_on_every_instruction_regardless_of_kind() {
    struct Positions(Vec<usize>);
    impl Visitor for Positions {
      fn enter(&mut self, _instr: &Instruction, index: usize) {
        self.0.push(index);
      }
    }

    let r = TirRegister(0);
    let mut stream = Stream::new();
    stream.push(Instruction::new(Kind::GetTrue, Some(r), at()));
    stream.push(Instruction::new(Kind::Return { value: r }, None, at()));

    let mut positions = Positions(Vec::new());
    walk(&stream, &mut positions);

    assert_eq!(positions.0, vec![0, 1]);
  }
}
