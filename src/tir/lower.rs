//! Building a [`super::Stream`] directly from the AST.
//!
//! This mirrors [`crate::lower`]'s shape (a per-routine builder, nested via
//! a parent pointer for `resolve_local`) but is an entirely independent
//! construction: TIR carries literal values inline rather than through
//! pool indices, and has no label/fixup protocol of its own — branches
//! target instruction-stream-relative block indices directly, backpatched
//! the same way [`crate::cco::builder::CcoBuilder`]'s own label fixups are
//! (`push` returns the index it just wrote, and [`TirBuilder::patch_block`]
//! overwrites a previously-emitted branch's target once it's known), just
//! without a separate [`crate::cco::label::Label`] handle type — nothing
//! downstream of TIR needs `label()`'s opaque-handle indirection, since a
//! flat `Stream` never reorders or drops instructions after they're pushed.

use crate::ast::{Expr, ExprKind, Literal, Module, Send, Stmt, StmtKind};
use span::LineCol;

use super::{Instruction, Kind, Stream, TirRegister};

/// The enclosing loop's continue/break targets, pushed on loop entry and
/// popped on exit — the TIR-side counterpart of `lower::stmt::LoopLabels`.
/// `start` is known immediately (it's the index of the first instruction
/// of the loop, usually the condition check); `break_fixups` collects the
/// indices of `break`'s `Goto`s, backpatched to the real exit index once
/// the loop body has been fully lowered.
struct TirLoop {
  start: u32,
  break_fixups: Vec<usize>,
}

struct TirBuilder {
  next_register: u32,
  locals: Vec<String>,
  stream: Stream,
  children: Vec<Routine>,
  parent: Option<Box<TirBuilder>>,
  loop_stack: Vec<TirLoop>,
}

impl TirBuilder {
  fn new() -> Self {
    Self {
      next_register: 0,
      locals: Vec::new(),
      stream: Stream::new(),
      children: Vec::new(),
      parent: None,
      loop_stack: Vec::new(),
    }
  }

  fn alloc(&mut self) -> TirRegister {
    let r = TirRegister(self.next_register);
    self.next_register += 1;
    r
  }

  /// The index the current instruction stream has reached — the block
  /// index a branch emitted right now would need to jump to in order to
  /// land on the *next* instruction.
  fn here(&self) -> u32 {
    self.stream.instructions.len() as u32
  }

  /// Push an instruction and return its index in the stream, so a caller
  /// emitting a branch can later backpatch its target via
  /// [`Self::patch_block`].
  fn push(&mut self, kind: Kind, result: Option<TirRegister>, at: LineCol) -> usize {
    self.stream.push(Instruction::new(kind, result, at));
    self.stream.instructions.len() - 1
  }

  /// Overwrite the block-index operand of a previously-pushed `Goto`/
  /// `GotoIfTrue`/`GotoIfFalse` at `index`. Panics if `index` isn't one of
  /// those three kinds — a compiler fault, since only this module ever
  /// calls it and only ever on a branch it just pushed itself.
  fn patch_block(&mut self, index: usize, target: u32) {
    match &mut self.stream.instructions[index].kind {
      Kind::Goto { block } => *block = target,
      Kind::GotoIfTrue { block, .. } => *block = target,
      Kind::GotoIfFalse { block, .. } => *block = target,
      other => unreachable!("patch_block called on a non-branch instruction: {other:?}"),
    }
  }

  fn add_local(&mut self, name: &str) -> u32 {
    if let Some(index) = self.locals.iter().position(|n| n == name) {
      return index as u32;
    }
    self.locals.push(name.to_string());
    (self.locals.len() - 1) as u32
  }

  fn resolve_local(&self, name: &str) -> Option<(u32, u32)> {
    self.resolve_at(name, 0)
  }

  fn resolve_at(&self, name: &str, depth: u32) -> Option<(u32, u32)> {
    if let Some(index) = self.locals.iter().position(|n| n == name) {
      return Some((depth, index as u32));
    }
    self.parent.as_ref()?.resolve_at(name, depth + 1)
  }
}

/// One routine's TIR: its own instruction stream plus any nested routines
/// (methods, closures, class bodies) it contains.
#[derive(Debug, Default)]
pub struct Routine {
  pub name: String,
  pub params: Vec<String>,
  pub body: Stream,
  pub children: Vec<Routine>,
}

pub fn lower_module(module: &Module) -> Routine {
  let mut b = TirBuilder::new();
  lower_stmts(&mut b, &module.body);
  Routine {
    name: "<module>".to_string(),
    params: Vec::new(),
    body: b.stream,
    children: b.children,
  }
}

fn lower_stmts(b: &mut TirBuilder, stmts: &[Stmt]) {
  for stmt in stmts {
    lower_stmt(b, stmt);
  }
}

fn at(line: u32, column: u32) -> LineCol {
  LineCol { line, column }
}

fn lower_stmt(b: &mut TirBuilder, stmt: &Stmt) {
  let pos = at(stmt.line, stmt.column);
  match &stmt.kind {
    StmtKind::Let { target, value } => {
      let v = lower_expr(b, value);
      if let crate::ast::LetTarget::Ident(ident) = target {
        let index = b.add_local(&ident.name);
        b.push(Kind::SetLocal { index, value: v }, None, pos);
      }
    }
    StmtKind::Assign { target, value } => {
      let v = lower_expr(b, value);
      if let crate::ast::AssignTarget::Ident(ident) = target {
        if let Some((depth, index)) = b.resolve_local(&ident.name) {
          let kind = if depth == 0 {
            Kind::SetLocal { index, value: v }
          } else {
            Kind::SetParentLocal { depth, index, value: v }
          };
          b.push(kind, None, pos);
        }
      }
    }
    StmtKind::Return(expr) => {
      let v = lower_expr(b, expr);
      b.push(Kind::Return { value: v }, None, pos);
    }
    StmtKind::Expr(expr) => {
      lower_expr(b, expr);
    }
    StmtKind::If { cond, then, else_ } => {
      // Two-armed branch: `GotoIfFalse` skips straight to `else_`'s first
      // instruction (or to the join point, if there's no `else_`); the
      // `then` arm, once it falls off its own end, jumps past `else_` to
      // the same join point. Both targets are real instruction indices,
      // backpatched once they're known.
      let c = lower_expr(b, cond);
      let cond_jump = b.push(Kind::GotoIfFalse { condition: c, block: 0 }, None, pos);
      lower_stmts(b, then);
      if else_.is_empty() {
        b.patch_block(cond_jump, b.here());
      } else {
        let skip_else = b.push(Kind::Goto { block: 0 }, None, pos);
        b.patch_block(cond_jump, b.here());
        lower_stmts(b, else_);
        b.patch_block(skip_else, b.here());
      }
    }
    StmtKind::While { cond, body } => {
      // `start` is the condition re-check, re-entered by both `next` and
      // the implicit loop-back edge at the bottom of the body; `exit_jump`
      // is backpatched to the real post-loop index once the body (and any
      // `break`s inside it) have been lowered.
      let start = b.here();
      let c = lower_expr(b, cond);
      let exit_jump = b.push(Kind::GotoIfFalse { condition: c, block: 0 }, None, pos);
      b.loop_stack.push(TirLoop { start, break_fixups: Vec::new() });
      lower_stmts(b, body);
      let ctx = b.loop_stack.pop().expect("pushed above");
      b.push(Kind::Goto { block: start }, None, pos);
      let after = b.here();
      b.patch_block(exit_jump, after);
      for break_jump in ctx.break_fixups {
        b.patch_block(break_jump, after);
      }
    }
    StmtKind::Loop { body } => {
      let start = b.here();
      b.loop_stack.push(TirLoop { start, break_fixups: Vec::new() });
      lower_stmts(b, body);
      let ctx = b.loop_stack.pop().expect("pushed above");
      b.push(Kind::Goto { block: start }, None, pos);
      let after = b.here();
      for break_jump in ctx.break_fixups {
        b.patch_block(break_jump, after);
      }
    }
    StmtKind::Break => {
      if b.loop_stack.last().is_some() {
        let jump = b.push(Kind::Goto { block: 0 }, None, pos);
        b.loop_stack.last_mut().expect("checked above").break_fixups.push(jump);
      }
    }
    StmtKind::Next => {
      if let Some(ctx) = b.loop_stack.last() {
        let start = ctx.start;
        b.push(Kind::Goto { block: start }, None, pos);
      }
    }
    StmtKind::Method(method) => lower_routine(b, &method.name.name, &method.params, &method.body),
    StmtKind::Class(class) => lower_routine(b, &class.name.name.name, &[], &class.body),
  }
}

/// Lower a nested method/closure/class body into its own child [`Routine`],
/// appended to `b`'s children. The child starts with an empty `parent`
/// chain rather than pointing back at `b`: TIR is consulted by the type
/// checker for per-routine shape, not for the cross-routine capture
/// resolution CCO lowering already owns, so a closure's free-variable
/// reads show up here as unresolved locals rather than `GetParentLocal`.
fn lower_routine(b: &mut TirBuilder, name: &str, params: &[crate::ast::Param], body: &[Stmt]) {
  let mut child = TirBuilder::new();
  for p in params {
    child.add_local(&p.name.name);
  }
  lower_stmts(&mut child, body);
  b.children.push(Routine {
    name: name.to_string(),
    params: params.iter().map(|p| p.name.name.clone()).collect(),
    body: child.stream,
    children: child.children,
  });
}

fn lower_expr(b: &mut TirBuilder, expr: &Expr) -> TirRegister {
  let pos = at(expr.line, expr.column);
  match &expr.kind {
    ExprKind::Literal(Literal::Int(v)) => {
      let r = b.alloc();
      b.push(Kind::SetInteger { value: *v }, Some(r), pos);
      r
    }
    ExprKind::Literal(Literal::Float(v)) => {
      let r = b.alloc();
      b.push(Kind::SetFloat { value: *v }, Some(r), pos);
      r
    }
    ExprKind::Literal(Literal::String(v)) => {
      let r = b.alloc();
      b.push(Kind::SetString { value: v.clone() }, Some(r), pos);
      r
    }
    ExprKind::Literal(Literal::Bool(true)) => {
      let r = b.alloc();
      b.push(Kind::GetTrue, Some(r), pos);
      r
    }
    ExprKind::Literal(Literal::Bool(false)) => {
      let r = b.alloc();
      b.push(Kind::GetFalse, Some(r), pos);
      r
    }
    ExprKind::Literal(Literal::Nil) => {
      let r = b.alloc();
      b.push(Kind::SetObject { class: None }, Some(r), pos);
      r
    }
    ExprKind::Literal(Literal::Array(elems)) => {
      let values = elems.iter().map(|e| lower_expr(b, e)).collect();
      let r = b.alloc();
      b.push(Kind::SetArray { values }, Some(r), pos);
      r
    }
    ExprKind::Ident(ident) => {
      if let Some((depth, index)) = b.resolve_local(&ident.name) {
        let r = b.alloc();
        let kind = if depth == 0 {
          Kind::GetLocal { index }
        } else {
          Kind::GetParentLocal { depth, index }
        };
        b.push(kind, Some(r), pos);
        r
      } else {
        lower_send_like(b, pos, None, &ident.name, &[])
      }
    }
    ExprKind::IVar(ident) => {
      let self_reg = lower_self(b, pos);
      let r = b.alloc();
      b.push(
        Kind::GetAttribute {
          receiver: self_reg,
          name: ident.name.clone(),
        },
        Some(r),
        pos,
      );
      r
    }
    ExprKind::Const(const_ref) => {
      let receiver = match &const_ref.receiver {
        Some(e) => lower_expr(b, e),
        None => lower_self(b, pos),
      };
      let r = b.alloc();
      b.push(
        Kind::GetAttribute {
          receiver,
          name: const_ref.name.name.clone(),
        },
        Some(r),
        pos,
      );
      r
    }
    ExprKind::SelfExpr => lower_self(b, pos),
    ExprKind::Send(send) => lower_send(b, pos, send),
    ExprKind::Closure(method) => {
      lower_routine(b, "<closure>", &method.params, &method.body);
      let r = b.alloc();
      b.push(Kind::SetObject { class: None }, Some(r), pos);
      r
    }
  }
}

fn lower_self(b: &mut TirBuilder, pos: LineCol) -> TirRegister {
  let r = b.alloc();
  b.push(Kind::GetToplevel, Some(r), pos);
  r
}

fn lower_send(b: &mut TirBuilder, pos: LineCol, send: &Send) -> TirRegister {
  let receiver = match &send.receiver {
    Some(e) => Some(lower_expr(b, e)),
    None => None,
  };
  let args: Vec<TirRegister> = send.args.iter().map(|a| lower_expr(b, &a.value)).collect();
  lower_send_like(b, pos, receiver, &send.name.name, &args)
}

fn lower_send_like(b: &mut TirBuilder, pos: LineCol, receiver: Option<TirRegister>, name: &str, args: &[TirRegister]) -> TirRegister {
  let receiver = receiver.unwrap_or_else(|| lower_self(b, pos));
  let r = b.alloc();
  b.push(
    Kind::SendObjectMessage {
      receiver,
      name: name.to_string(),
      arguments: args.to_vec(),
    },
    Some(r),
    pos,
  );
  r
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{AssignTarget, Ident, LetTarget};

  fn stmt(kind: StmtKind) -> Stmt {
    Stmt { kind, line: 1, column: 1 }
  }

  fn int(v: i64) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Int(v)), 1, 1)
  }

  fn ident(name: &str) -> Ident {
    Ident::new(name, 1, 1)
  }

  #[test]
  fn let_binding_records_a_local_and_emits_set_local() {
    let module = Module::new(vec![stmt(StmtKind::Let {
      target: LetTarget::Ident(ident("x")),
      value: Box::new(int(1)),
    })]);
    let routine = lower_module(&module);
    assert_eq!(routine.body.instructions.len(), 2); // SetInteger, SetLocal
    assert!(matches!(routine.body.instructions[1].kind, Kind::SetLocal { index: 0, .. }));
  }

  #[test]
  fn reassignment_at_depth_zero_uses_set_local_not_set_parent_local() {
    let module = Module::new(vec![
      stmt(StmtKind::Let {
        target: LetTarget::Ident(ident("x")),
        value: Box::new(int(1)),
      }),
      stmt(StmtKind::Assign {
        target: AssignTarget::Ident(ident("x")),
        value: Box::new(int(2)),
      }),
    ]);
    let routine = lower_module(&module);
    let reassign = &routine.body.instructions[3]; // SetInteger(1), SetLocal, SetInteger(2), SetLocal
    assert!(matches!(reassign.kind, Kind::SetLocal { .. }));
  }

  #[test]
  fn nested_method_becomes_a_child_routine_with_its_own_stream() {
    use crate::ast::{MethodDef, RoutineKind, Visibility};
    let module = Module::new(vec![stmt(StmtKind::Method(MethodDef {
      name: ident("m"),
      params: Vec::new(),
      body: vec![stmt(StmtKind::Return(Box::new(int(10))))],
      visibility: Visibility::Public,
      kind: RoutineKind::Method,
      line: 1,
      column: 1,
    }))]);
    let routine = lower_module(&module);
    assert_eq!(routine.children.len(), 1);
    assert_eq!(routine.children[0].name, "m");
    assert!(matches!(routine.children[0].body.instructions.last().unwrap().kind, Kind::Return { .. }));
  }

  #[test]
  fn closure_reads_an_enclosing_local_as_an_unresolved_local_reference() {
    use crate::ast::{ExprKind as EK, MethodDef, RoutineKind, Visibility};
    let module = Module::new(vec![
      stmt(StmtKind::Let {
        target: LetTarget::Ident(ident("a")),
        value: Box::new(int(1)),
      }),
      stmt(StmtKind::Expr(Box::new(Expr::new(
        EK::Closure(MethodDef {
          name: ident("<closure>"),
          params: Vec::new(),
          body: vec![stmt(StmtKind::Return(Box::new(Expr::new(EK::Ident(ident("a")), 1, 1))))],
          visibility: Visibility::Private,
          kind: RoutineKind::Closure,
          line: 1,
          column: 1,
        }),
        1,
        1,
      )))),
    ]);
    let routine = lower_module(&module);
    assert_eq!(routine.children.len(), 1);
    // The closure's own `TirBuilder` starts with an empty parent chain (see
    // `lower_routine`'s doc comment), so a free variable surfaces as a
    // zero-arg send on self rather than a resolved local read.
    assert!(matches!(
      routine.children[0].body.instructions[0].kind,
      Kind::SendObjectMessage { .. }
    ));
  }

  #[test]
  fn if_without_else_patches_goto_if_false_to_the_post_if_index() {
    let module = Module::new(vec![stmt(StmtKind::If {
      cond: Box::new(int(1)),
      then: vec![stmt(StmtKind::Expr(Box::new(int(2))))],
      else_: Vec::new(),
    })]);
    let routine = lower_module(&module);
    // [0] SetInteger(1), [1] GotoIfFalse, [2] SetInteger(2)
    assert_eq!(routine.body.instructions.len(), 3);
    assert!(matches!(routine.body.instructions[1].kind, Kind::GotoIfFalse { block: 3, .. }));
  }

  #[test]
  fn if_with_else_patches_both_the_skip_and_the_join() {
    let module = Module::new(vec![stmt(StmtKind::If {
      cond: Box::new(int(1)),
      then: vec![stmt(StmtKind::Expr(Box::new(int(2))))],
      else_: vec![stmt(StmtKind::Expr(Box::new(int(3))))],
    })]);
    let routine = lower_module(&module);
    // [0] SetInteger(1), [1] GotoIfFalse, [2] SetInteger(2), [3] Goto,
    // [4] SetInteger(3)
    assert_eq!(routine.body.instructions.len(), 5);
    assert!(matches!(routine.body.instructions[1].kind, Kind::GotoIfFalse { block: 3, .. }));
    assert!(matches!(routine.body.instructions[3].kind, Kind::Goto { block: 5 }));
  }

  #[test]
  fn while_loop_backpatches_exit_and_loops_back_to_the_condition() {
    let module = Module::new(vec![stmt(StmtKind::While {
      cond: Box::new(int(1)),
      body: vec![stmt(StmtKind::Expr(Box::new(int(2))))],
    })]);
    let routine = lower_module(&module);
    // [0] SetInteger(1) (the condition, re-entered on loop-back),
    // [1] GotoIfFalse, [2] SetInteger(2), [3] Goto(back to 0)
    assert_eq!(routine.body.instructions.len(), 4);
    assert!(matches!(routine.body.instructions[1].kind, Kind::GotoIfFalse { block: 4, .. }));
    assert!(matches!(routine.body.instructions[3].kind, Kind::Goto { block: 0 }));
  }

  #[test]
  fn break_inside_a_loop_jumps_past_the_loop_back_edge() {
    let module = Module::new(vec![stmt(StmtKind::Loop {
      body: vec![stmt(StmtKind::Break)],
    })]);
    let routine = lower_module(&module);
    // [0] Goto(break, patched to after the loop-back Goto), [1] Goto(back to 0)
    assert_eq!(routine.body.instructions.len(), 2);
    assert!(matches!(routine.body.instructions[0].kind, Kind::Goto { block: 2 }));
    assert!(matches!(routine.body.instructions[1].kind, Kind::Goto { block: 0 }));
  }

  #[test]
  fn next_inside_a_loop_jumps_straight_back_to_the_loop_start() {
    let module = Module::new(vec![stmt(StmtKind::While {
      cond: Box::new(int(1)),
      body: vec![stmt(StmtKind::Next)],
    })]);
    let routine = lower_module(&module);
    // [0] SetInteger(1), [1] GotoIfFalse, [2] Goto(next, back to 0),
    // [3] Goto(loop-back, also to 0)
    assert_eq!(routine.body.instructions.len(), 4);
    assert!(matches!(routine.body.instructions[2].kind, Kind::Goto { block: 0 }));
    assert!(matches!(routine.body.instructions[3].kind, Kind::Goto { block: 0 }));
  }
}
