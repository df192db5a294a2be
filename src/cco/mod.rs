//! Compiled-code objects (spec.md §3 "CCO", §4.2).
//!
//! A [`Cco`] is the sealed, immutable result of lowering one routine — a
//! module body, a method, a closure, or a class body. It is built up
//! in-progress by a [`builder::CcoBuilder`] and frozen by
//! [`builder::CcoBuilder::seal`].

pub mod builder;
pub mod instr;
pub mod label;
pub mod locals;
pub mod operand;
pub mod pool;
pub mod register;

use crate::ast::{RoutineKind, Visibility};
use instr::Instr;

/// One sealed routine. Mirrors the wire layout in spec.md §4.5 exactly for
/// the fields that cross the encoder boundary; `visibility`, `kind`, and
/// `frame_size` are compile-time metadata the wire format has no slot for
/// (see `DESIGN.md`) and are only used by lowering and diagnostics.
#[derive(Debug, Clone)]
pub struct Cco {
  pub name: String,
  pub file: String,
  pub start_line: u32,
  pub visibility: Visibility,
  pub kind: RoutineKind,
  pub argument_count: u32,
  pub required_args: u32,
  pub rest_argument: bool,
  /// Total virtual registers this routine's body allocated. Not part of
  /// the wire image; useful for frame sizing by a future consumer.
  pub frame_size: u32,
  pub locals: Vec<String>,
  pub instructions: Vec<Instr>,
  pub integer_pool: Vec<i64>,
  pub float_pool: Vec<f64>,
  pub string_pool: Vec<String>,
  pub children: Vec<Cco>,
}

impl Cco {
  /// A newline-joined disassembly, one instruction per line, in the
  /// teacher crate's own `Chunk::disassemble` style
  /// (`crates/emit/src/emitter/tests.rs`'s `chunk.disassemble()` snapshot
  /// fixtures).
  pub fn disassemble(&self) -> String {
    let mut out = String::new();
    self.disassemble_into(&mut out, 0);
    out
  }

  /// Structural equality over exactly the fields the wire image carries —
  /// `visibility`, `kind`, and `frame_size` have no encoded slot (see the
  /// struct doc above), so a round trip through [`crate::encode`]/
  /// [`crate::decode`] can't be expected to preserve them and `wire_eq`
  /// skips them rather than asserting on values the format never wrote.
  pub fn wire_eq(&self, other: &Cco) -> bool {
    self.name == other.name
      && self.file == other.file
      && self.start_line == other.start_line
      && self.argument_count == other.argument_count
      && self.required_args == other.required_args
      && self.rest_argument == other.rest_argument
      && self.locals == other.locals
      && self.instructions == other.instructions
      && self.integer_pool == other.integer_pool
      && self.float_pool == other.float_pool
      && self.string_pool == other.string_pool
      && self.children.len() == other.children.len()
      && self.children.iter().zip(&other.children).all(|(a, b)| a.wire_eq(b))
  }

  fn disassemble_into(&self, out: &mut String, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
      "{indent}fn {} ({}/{} args{}):\n",
      self.name,
      self.required_args,
      self.argument_count,
      if self.rest_argument { ", rest" } else { "" }
    ));
    for (i, instr) in self.instructions.iter().enumerate() {
      out.push_str(&format!("{indent}  {i:>4}: {instr}\n"));
    }
    for child in &self.children {
      child.disassemble_into(out, depth + 1);
    }
  }
}
