//! Statement and control-flow lowering.
//!
//! Only literal, identifier/const/self, `let`, reassignment, method/class
//! definition, message send, and return have operational lowering rules in
//! the distilled spec (spec.md §4.1). `if`/`while`/`loop`/`break`/`next`
//! are named in the AST contract (spec.md §6) and clearly the reason the
//! label/fixup protocol (§4.1 "Label protocol") exists, but the prose never
//! gives them elaborators — so the branch shapes below are this crate's
//! own design, built the same way the teacher crate shapes its own
//! `current_loop: Option<Loop>` stack in `src/emit.rs` (a `{start, end}`
//! label pair pushed on loop entry, popped on exit; `break` jumps to `end`,
//! `next` jumps to `start`).

use span::LineCol;

use crate::ast::{AssignTarget, LetTarget, Stmt, StmtKind};
use crate::cco::builder::CcoBuilder;
use crate::cco::instr::Opcode;
use crate::cco::label::{BranchTarget, Label};
use crate::error::{fail, Result};
use crate::options::Options;

use super::class::lower_class;
use super::expr::{emit_get_self, lower_expr};
use super::method::lower_method_stmt;

/// The enclosing loop's continue/break targets, pushed on loop entry and
/// popped on exit.
pub(crate) struct LoopLabels {
  start: Label,
  end: Label,
}

pub(crate) fn lower_body(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  loop_stack: &mut Vec<LoopLabels>,
  stmts: &[Stmt],
) -> Result<()> {
  for stmt in stmts {
    lower_stmt(b, options, depth, loop_stack, stmt)?;
  }
  Ok(())
}

fn lower_stmt(b: &mut CcoBuilder, options: &Options, depth: u32, loop_stack: &mut Vec<LoopLabels>, stmt: &Stmt) -> Result<()> {
  let at = LineCol {
    line: stmt.line,
    column: stmt.column,
  };
  match &stmt.kind {
    StmtKind::Let { target, value } => lower_let(b, options, depth, at, target, value),
    StmtKind::Assign { target, value } => lower_assign(b, options, depth, at, target, value),
    StmtKind::Method(method_def) => lower_method_stmt(b, options, depth, method_def),
    StmtKind::Class(class_def) => lower_class(b, options, depth, class_def),
    StmtKind::Return(expr) => {
      let value = lower_expr(b, options, depth, expr)?;
      b.push(Opcode::Return { value }, at);
      Ok(())
    }
    StmtKind::If { cond, then, else_ } => lower_if(b, options, depth, loop_stack, at, cond, then, else_),
    StmtKind::While { cond, body } => lower_while(b, options, depth, loop_stack, at, cond, body),
    StmtKind::Loop { body } => lower_loop(b, options, depth, loop_stack, at, body),
    StmtKind::Break => match loop_stack.last() {
      Some(ctx) => {
        b.push(Opcode::Goto { target: BranchTarget::Label(ctx.end) }, at);
        Ok(())
      }
      None => fail!(at, "`break` outside of a loop"),
    },
    StmtKind::Next => match loop_stack.last() {
      Some(ctx) => {
        b.push(Opcode::Goto { target: BranchTarget::Label(ctx.start) }, at);
        Ok(())
      }
      None => fail!(at, "`next` outside of a loop"),
    },
    StmtKind::Expr(expr) => {
      lower_expr(b, options, depth, expr)?;
      Ok(())
    }
  }
}

fn lower_let(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  at: LineCol,
  target: &LetTarget,
  value: &crate::ast::Expr,
) -> Result<()> {
  match target {
    LetTarget::Ident(ident) => {
      let value = lower_expr(b, options, depth, value)?;
      let local = b.set_local(ident.name.clone());
      b.push(Opcode::SetLocal { local, value }, at);
      Ok(())
    }
    LetTarget::Const(const_ref) => {
      let value = lower_expr(b, options, depth, value)?;
      let name = b.add_string(const_ref.name.name.clone());
      let recv = emit_get_self(b, at);
      b.push(Opcode::SetLiteralConst { recv, name, value }, at);
      Ok(())
    }
    LetTarget::IVar(ident) => {
      let value = lower_expr(b, options, depth, value)?;
      let name = b.add_string(ident.name.clone());
      let recv = emit_get_self(b, at);
      b.push(Opcode::SetLiteralAttr { recv, name, value }, at);
      Ok(())
    }
  }
}

/// Reassignment of a local must resolve through the full outer-scope
/// chain; reassigning an undefined local is a compile-time failure
/// (spec.md §4.1 "Reassignment of a local").
fn lower_assign(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  at: LineCol,
  target: &AssignTarget,
  value: &crate::ast::Expr,
) -> Result<()> {
  match target {
    AssignTarget::Ident(ident) => {
      let Some((hop, local)) = b.resolve_local(&ident.name) else {
        fail!(at, "reassignment of undefined local `{}`", ident.name);
      };
      let value = lower_expr(b, options, depth, value)?;
      if hop == 0 {
        b.push(
          Opcode::SetLocal {
            local: crate::cco::operand::LocalIdx(local),
            value,
          },
          at,
        );
      } else {
        b.push(
          Opcode::SetParentLocal {
            depth: hop,
            local: crate::cco::operand::LocalIdx(local),
            value,
          },
          at,
        );
      }
      Ok(())
    }
    AssignTarget::Const(const_ref) => {
      let value = lower_expr(b, options, depth, value)?;
      let name = b.add_string(const_ref.name.name.clone());
      let recv = emit_get_self(b, at);
      b.push(Opcode::SetLiteralConst { recv, name, value }, at);
      Ok(())
    }
    AssignTarget::IVar(ident) => {
      let value = lower_expr(b, options, depth, value)?;
      let name = b.add_string(ident.name.clone());
      let recv = emit_get_self(b, at);
      b.push(Opcode::SetLiteralAttr { recv, name, value }, at);
      Ok(())
    }
  }
}

fn lower_if(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  loop_stack: &mut Vec<LoopLabels>,
  at: LineCol,
  cond: &crate::ast::Expr,
  then: &[Stmt],
  else_: &[Stmt],
) -> Result<()> {
  let cond_reg = lower_expr(b, options, depth, cond)?;
  let else_label = b.label();
  let end_label = b.label();

  b.push(
    Opcode::GotoIfFalse {
      cond: cond_reg,
      target: BranchTarget::Label(else_label),
    },
    at,
  );
  lower_body(b, options, depth, loop_stack, then)?;
  b.push(Opcode::Goto { target: BranchTarget::Label(end_label) }, at);

  b.mark_label(else_label, at)?;
  lower_body(b, options, depth, loop_stack, else_)?;

  b.mark_label(end_label, at)?;
  Ok(())
}

fn lower_while(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  loop_stack: &mut Vec<LoopLabels>,
  at: LineCol,
  cond: &crate::ast::Expr,
  body: &[Stmt],
) -> Result<()> {
  let start = b.label();
  let end = b.label();

  b.mark_label(start, at)?;
  let cond_reg = lower_expr(b, options, depth, cond)?;
  b.push(
    Opcode::GotoIfFalse {
      cond: cond_reg,
      target: BranchTarget::Label(end),
    },
    at,
  );

  loop_stack.push(LoopLabels { start, end });
  let result = lower_body(b, options, depth, loop_stack, body);
  loop_stack.pop();
  result?;

  b.push(Opcode::Goto { target: BranchTarget::Label(start) }, at);
  b.mark_label(end, at)?;
  Ok(())
}

fn lower_loop(
  b: &mut CcoBuilder,
  options: &Options,
  depth: u32,
  loop_stack: &mut Vec<LoopLabels>,
  at: LineCol,
  body: &[Stmt],
) -> Result<()> {
  let start = b.label();
  let end = b.label();

  b.mark_label(start, at)?;
  loop_stack.push(LoopLabels { start, end });
  let result = lower_body(b, options, depth, loop_stack, body);
  loop_stack.pop();
  result?;

  b.push(Opcode::Goto { target: BranchTarget::Label(start) }, at);
  b.mark_label(end, at)?;
  Ok(())
}
