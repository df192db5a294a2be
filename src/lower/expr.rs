//! Value-producing node elaborators (spec.md §4.1 "Expression lowering
//! contract" through "Self").

use span::LineCol;

use crate::ast::{ConstRef, Expr, ExprKind, Ident, Literal};
use crate::cco::builder::CcoBuilder;
use crate::cco::instr::Opcode;
use crate::cco::operand::LocalIdx;
use crate::cco::register::Register;
use crate::error::Result;
use crate::options::Options;

use super::{method, send};

/// Recursion depth guard shared by every elaborator that calls back into
/// `lower_expr` (array elements, send arguments, const-ref receivers). Not
/// part of the distilled spec; added per the ambient `max_lowering_depth`
/// knob (see `SPEC_FULL.md` §4.1).
pub(crate) fn check_depth(options: &Options, depth: u32, at: LineCol) -> Result<u32> {
  if let Some(limit) = options.max_lowering_depth {
    if depth > limit {
      return crate::error::fault!(at, "lowering recursion exceeded the configured limit of {limit}");
    }
  }
  Ok(depth + 1)
}

pub(crate) fn pos(expr: &Expr) -> LineCol {
  LineCol {
    line: expr.line,
    column: expr.column,
  }
}

pub(crate) fn emit_get_self(b: &mut CcoBuilder, at: LineCol) -> Register {
  let dst = b.alloc_register();
  b.push(Opcode::GetSelf { dst }, at);
  dst
}

pub(crate) fn lower_expr(b: &mut CcoBuilder, options: &Options, depth: u32, expr: &Expr) -> Result<Register> {
  let depth = check_depth(options, depth, pos(expr))?;
  let at = pos(expr);
  match &expr.kind {
    ExprKind::Literal(lit) => lower_literal(b, options, depth, at, lit),
    ExprKind::Ident(ident) => lower_ident(b, at, ident),
    ExprKind::IVar(ident) => lower_ivar(b, at, ident),
    ExprKind::Const(const_ref) => lower_const_ref(b, options, depth, at, const_ref),
    ExprKind::SelfExpr => Ok(emit_get_self(b, at)),
    ExprKind::Send(send_expr) => send::lower_send(b, options, depth, at, send_expr),
    ExprKind::Closure(method_def) => method::lower_closure(b, options, depth, method_def),
  }
}

fn lower_literal(b: &mut CcoBuilder, options: &Options, depth: u32, at: LineCol, lit: &Literal) -> Result<Register> {
  match lit {
    Literal::Nil => {
      let dst = b.alloc_register();
      b.push(Opcode::SetNil { dst }, at);
      Ok(dst)
    }
    Literal::Bool(true) => {
      let dst = b.alloc_register();
      b.push(Opcode::SetTrue { dst }, at);
      Ok(dst)
    }
    Literal::Bool(false) => {
      let dst = b.alloc_register();
      b.push(Opcode::SetFalse { dst }, at);
      Ok(dst)
    }
    Literal::Int(value) => {
      let value = b.add_integer(*value);
      let dst = b.alloc_register();
      b.push(Opcode::SetInt { dst, value }, at);
      Ok(dst)
    }
    Literal::Float(value) => {
      let value = b.add_float(*value, at)?;
      let dst = b.alloc_register();
      b.push(Opcode::SetFloat { dst, value }, at);
      Ok(dst)
    }
    Literal::String(value) => {
      let value = b.add_string(value.clone());
      let dst = b.alloc_register();
      b.push(Opcode::SetString { dst, value }, at);
      Ok(dst)
    }
    Literal::Array(elems) => {
      let mut regs = Vec::with_capacity(elems.len());
      for elem in elems {
        regs.push(lower_expr(b, options, depth, elem)?);
      }
      let dst = b.alloc_register();
      b.push(Opcode::SetArray { dst, elems: regs }, at);
      Ok(dst)
    }
  }
}

/// An identifier resolves against the full outer-scope chain, not just the
/// current CCO's own locals: the "Reassignment" rule and the §8 closure
/// scenario both need depth-aware resolution, so reads use the same
/// `resolve_local` lowering does for writes rather than the narrower
/// current-CCO-only check the prose sketch for this one case suggests.
fn lower_ident(b: &mut CcoBuilder, at: LineCol, ident: &Ident) -> Result<Register> {
  match b.resolve_local(&ident.name) {
    Some((0, index)) => {
      let dst = b.alloc_register();
      b.push(
        Opcode::GetLocal {
          dst,
          local: LocalIdx(index),
        },
        at,
      );
      Ok(dst)
    }
    Some((depth, index)) => {
      let dst = b.alloc_register();
      b.push(
        Opcode::GetParentLocal {
          dst,
          depth,
          local: LocalIdx(index),
        },
        at,
      );
      Ok(dst)
    }
    None => send::lower_implicit_self_send(b, at, &ident.name),
  }
}

fn lower_ivar(b: &mut CcoBuilder, at: LineCol, ident: &Ident) -> Result<Register> {
  let name = b.add_string(ident.name.clone());
  let recv = emit_get_self(b, at);
  let dst = b.alloc_register();
  b.push(Opcode::GetLiteralAttr { dst, recv, name }, at);
  Ok(dst)
}

pub(crate) fn lower_const_ref(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  at: LineCol,
  const_ref: &ConstRef,
) -> Result<Register> {
  let recv = match &const_ref.receiver {
    Some(expr) => lower_expr(b, options, depth, expr)?,
    None => emit_get_self(b, at),
  };
  let name = b.add_string(const_ref.name.name.clone());
  let dst = b.alloc_register();
  b.push(Opcode::GetLiteralConst { dst, recv, name }, at);
  Ok(dst)
}
