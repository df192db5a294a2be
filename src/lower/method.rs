//! Method and closure body lowering (spec.md §4.1 "Method definition",
//! "Closure").
//!
//! Both constructs share the same child-CCO shape — allocate a nested
//! builder, register formal parameters as locals, lower the body, insert
//! the implicit return, seal — so that shared machinery lives here as
//! [`lower_routine_body`] and both callers (and [`super::class`], for the
//! class-body CCO) build on it.

use span::LineCol;

use crate::ast::{MethodDef, Param, RoutineKind, Stmt, Visibility};
use crate::cco::builder::CcoBuilder;
use crate::cco::instr::Opcode;
use crate::cco::operand::ChildIdx;
use crate::cco::register::Register;
use crate::error::{fault, Result};
use crate::options::Options;

use super::expr::emit_get_self;
use super::stmt::lower_body;
use super::PROTOTYPE_ATTR_NAME;

/// Build a nested routine's CCO, register it in the parent's child pool,
/// and return its index. `params` may be empty (the class-body CCO has
/// none).
pub(crate) fn lower_routine_body(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  file: String,
  name: String,
  at: LineCol,
  visibility: Visibility,
  kind: RoutineKind,
  params: &[Param],
  body: &[Stmt],
) -> Result<ChildIdx> {
  b.begin_child(name, file, at.line, visibility, kind);

  let mut required = 0;
  let mut total = 0;
  let mut rest_argument = false;
  for param in params {
    b.set_local(param.name.name.clone());
    total += 1;
    if param.rest {
      rest_argument = true;
    } else {
      required += 1;
    }
  }
  b.set_arity(required, total, rest_argument);

  // Each nested routine starts with no enclosing loop: `break`/`next`
  // cannot reach through a method, closure, or class-body boundary.
  let mut loop_stack = Vec::new();
  lower_body(b, options, depth, &mut loop_stack, body)?;
  insert_implicit_return(b, kind, at)?;

  let sealed = b.end_child()?;
  Ok(b.add_child(sealed))
}

/// If the last instruction emitted isn't already a terminator, append
/// `return last_instruction.result_register`. A last instruction with no
/// result register is a compiler fault (spec.md §4.1 "Method definition",
/// §7 kind 3). A body with no instructions at all has no "last
/// instruction" to consult in the first place — spec.md §8's boundary
/// behavior still requires exactly one terminator out of it, so that case
/// synthesizes `set_nil; return` rather than faulting.
///
/// A class body is exempt from the "no result register" fault: spec.md
/// §4.1's scenario 5 (`class C { def m { 10 } }`) runs its class body for
/// side effects via `run_literal_code`, and routinely ends in a
/// `def_literal_method` — a real instruction with no result register to
/// return, not a lowering mistake. Only the empty-body case still forces a
/// terminator for a class body, matching the boundary behavior's explicit
/// "one child CCO of kind `:class` with exactly one terminator."
fn insert_implicit_return(b: &mut CcoBuilder, kind: RoutineKind, at: LineCol) -> Result<()> {
  let last = match b.last_instruction() {
    Some(instr) => instr,
    None => {
      let dst = b.alloc_register();
      b.push(Opcode::SetNil { dst }, at);
      b.push(Opcode::Return { value: dst }, at);
      return Ok(());
    }
  };
  if last.opcode.is_terminator() {
    return Ok(());
  }
  if kind == RoutineKind::Class {
    return Ok(());
  }
  match last.opcode.result_register() {
    Some(value) => {
      b.push(Opcode::Return { value }, at);
      Ok(())
    }
    None => fault!(at, "implicit return point has no result register"),
  }
}

pub(crate) fn lower_method_stmt(b: &mut CcoBuilder, options: &Options, depth: u32, method_def: &MethodDef) -> Result<()> {
  let at = LineCol {
    line: method_def.line,
    column: method_def.column,
  };
  let file = b.file().to_string();
  let method = lower_routine_body(
    b,
    options,
    depth,
    file,
    method_def.name.name.clone(),
    at,
    method_def.visibility,
    RoutineKind::Method,
    &method_def.params,
    &method_def.body,
  )?;

  let name = b.add_string(method_def.name.name.clone());
  let recv = receiver_for_method_def(b, at);
  b.push(Opcode::DefLiteralMethod { recv, name, method }, at);
  Ok(())
}

/// Method bodies lowered at class-body scope define onto the class's
/// prototype rather than `self` directly (spec.md §4.1 "Method
/// definition": "if kind is `:class`, obtain the class's prototype via two
/// instructions reading the class's prototype attribute").
fn receiver_for_method_def(b: &mut CcoBuilder, at: LineCol) -> Register {
  if b.kind() == RoutineKind::Class {
    let self_reg = emit_get_self(b, at);
    let name = b.add_string(PROTOTYPE_ATTR_NAME);
    let dst = b.alloc_register();
    b.push(
      Opcode::GetLiteralAttr {
        dst,
        recv: self_reg,
        name,
      },
      at,
    );
    dst
  } else {
    emit_get_self(b, at)
  }
}

pub(crate) fn lower_closure(b: &mut CcoBuilder, options: &Options, depth: u32, method_def: &MethodDef) -> Result<Register> {
  let at = LineCol {
    line: method_def.line,
    column: method_def.column,
  };
  let file = b.file().to_string();
  let name = format!("<closure@{}:{}>", at.line, at.column);
  let code = lower_routine_body(
    b,
    options,
    depth,
    file,
    name,
    at,
    Visibility::Private,
    RoutineKind::Closure,
    &method_def.params,
    &method_def.body,
  )?;

  let dst = b.alloc_register();
  b.push(Opcode::SetCompiledCode { dst, code }, at);
  Ok(dst)
}
