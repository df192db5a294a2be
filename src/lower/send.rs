//! Message-send lowering (spec.md §4.1 "Message send").

use span::LineCol;

use crate::ast::Send;
use crate::cco::builder::CcoBuilder;
use crate::cco::instr::Opcode;
use crate::cco::register::Register;
use crate::error::Result;
use crate::options::Options;

use super::expr::{emit_get_self, lower_expr};

pub(crate) fn lower_send(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  at: LineCol,
  send: &Send,
) -> Result<Register> {
  let recv = match &send.receiver {
    Some(expr) => lower_expr(b, options, depth, expr)?,
    None => emit_get_self(b, at),
  };
  let name = b.add_string(send.name.name.clone());

  let mut rest = false;
  let mut args = Vec::with_capacity(send.args.len());
  for arg in &send.args {
    args.push(lower_expr(b, options, depth, &arg.value)?);
    if arg.rest {
      rest = true;
    }
  }

  let dst = b.alloc_register();
  b.push(
    Opcode::SendLiteral {
      dst,
      recv,
      name,
      rest,
      args,
    },
    at,
  );
  Ok(dst)
}

/// A bare identifier that isn't a local is a zero-argument message send on
/// the implicit `self` (spec.md §4.1 "Identifier reference").
pub(crate) fn lower_implicit_self_send(b: &mut CcoBuilder, at: LineCol, name: &str) -> Result<Register> {
  let recv = emit_get_self(b, at);
  let name = b.add_string(name.to_string());
  let dst = b.alloc_register();
  b.push(
    Opcode::SendLiteral {
      dst,
      recv,
      name,
      rest: false,
      args: Vec::new(),
    },
    at,
  );
  Ok(dst)
}
