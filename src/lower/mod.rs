//! AST → CCO lowering (spec.md §4.1).
//!
//! One [`crate::cco::builder::CcoBuilder`] is active per routine; nested
//! routines are entered and left via `begin_child`/`end_child`
//! (spec.md §4.2). Lowering is a single left-to-right recursion over the
//! AST and allocates no new CCO except at the scope-creating constructs:
//! method, closure, class body.
//!
//! Module split mirrors the node families the distilled spec gives
//! elaborators for: [`expr`] (value-producing nodes), [`stmt`] (statements
//! and control flow), [`method`] (method/closure bodies, shared by both),
//! [`class`] (the six-step class-definition protocol), [`send`] (message
//! sends, also reached from the identifier-reference fallback).

pub mod class;
pub mod expr;
pub mod method;
pub mod send;
pub mod stmt;

use diag::Diagnostic;
use span::LineCol;
use tracing::debug;

use crate::ast::{Module, RoutineKind, Visibility};
use crate::cco::builder::CcoBuilder;
use crate::cco::Cco;
use crate::options::Options;

/// The string interned for the ambient `Object` lookup a class definition
/// falls back to when no explicit parent is given (spec.md §4.1 "Class
/// definition", step 2).
pub(crate) const OBJECT_CONST_NAME: &str = "Object";
/// The attribute a class-body method definition reads off `self` to reach
/// the class's prototype (spec.md §4.1 "Method definition": "if kind is
/// `:class`, obtain the class's prototype via two instructions reading the
/// class's prototype attribute").
pub(crate) const PROTOTYPE_ATTR_NAME: &str = "prototype";
/// The runtime factory class definitions call to materialize a new class
/// object (spec.md §4.1 "Class definition", step 4: `core::class::Class.new`).
pub(crate) const CLASS_FACTORY_CONST_NAME: &str = "Class";
pub(crate) const CLASS_FACTORY_METHOD_NAME: &str = "new";

/// Lower one module's top-level statements into a sealed root CCO.
///
/// The AST contract (spec.md §6) carries no separate source-filename
/// field, so `name` is used for both the root CCO's `name` and `file`;
/// every descendant CCO inherits the same `file` unchanged.
///
/// Unlike a method or closure body, the module root is not itself invoked
/// as a routine by anything (spec.md §4.1 scopes implicit-return insertion
/// to "Method definition"), so no implicit return is appended here.
pub fn lower_module(
  module: &Module,
  name: impl Into<String>,
  options: &Options,
) -> std::result::Result<Cco, Vec<Diagnostic>> {
  let name = name.into();
  debug!(module = %name, statements = module.body.len(), "lower_module");
  let mut builder = CcoBuilder::new(name.clone(), name, 1, Visibility::Public, RoutineKind::Module);

  let mut loop_stack = Vec::new();
  if let Err(e) = stmt::lower_body(&mut builder, options, 0, &mut loop_stack, &module.body) {
    return Err(vec![e.diagnostic().clone()]);
  }

  builder.seal().map_err(|e| vec![e.diagnostic().clone()])
}

pub(crate) fn pos_of(line: u32, column: u32) -> LineCol {
  LineCol { line, column }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::*;
  use crate::cco::instr::Opcode;

  fn ident(name: &str) -> Ident {
    Ident::new(name, 1, 1)
  }

  fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, 1, 1)
  }

  fn stmt(kind: StmtKind) -> Stmt {
    Stmt { kind, line: 1, column: 1 }
  }

  fn int(v: i64) -> Expr {
    expr(ExprKind::Literal(Literal::Int(v)))
  }

  fn compile(stmts: Vec<Stmt>) -> Cco {
    lower_module(&Module::new(stmts), "<test>", &Options::default()).unwrap()
  }

  /// Scenario 1 (spec.md §8): `let x = 10`.
  #[test]
  fn let_binding_emits_set_int_then_set_local() {
    let cco = compile(vec![
      stmt(StmtKind::Let {
        target: LetTarget::Ident(ident("x")),
        value: Box::new(int(10)),
      }),
      stmt(StmtKind::Return(Box::new(expr(ExprKind::Ident(ident("x")))))),
    ]);

    assert_eq!(cco.integer_pool, vec![10]);
    assert_eq!(cco.locals, vec!["x".to_string()]);
    assert!(matches!(cco.instructions[0].opcode, Opcode::SetInt { .. }));
    assert!(matches!(cco.instructions[1].opcode, Opcode::SetLocal { .. }));
  }

  /// Scenario 2: `[10, 20]`.
  #[test]
  fn array_literal_emits_elements_then_set_array() {
    let cco = compile(vec![stmt(StmtKind::Return(Box::new(expr(ExprKind::Literal(
      Literal::Array(vec![int(10), int(20)]),
    )))))]);

    assert_eq!(cco.integer_pool, vec![10, 20]);
    match &cco.instructions[2].opcode {
      Opcode::SetArray { elems, .. } => assert_eq!(elems.len(), 2),
      other => panic!("expected set_array, got {other:?}"),
    }
  }

  /// Scenario 3: `foo(10)` where `foo` is not a local.
  #[test]
  fn call_to_undefined_local_lowers_as_implicit_self_send() {
    let cco = compile(vec![stmt(StmtKind::Return(Box::new(expr(ExprKind::Send(Send {
      receiver: None,
      name: ident("foo"),
      args: vec![Arg { value: int(10), rest: false }],
    })))))]);

    assert!(matches!(cco.instructions[0].opcode, Opcode::GetSelf { .. }));
    assert!(matches!(cco.instructions[1].opcode, Opcode::SetInt { .. }));
    match &cco.instructions[2].opcode {
      Opcode::SendLiteral { name, rest, args, .. } => {
        assert_eq!(cco.string_pool[name.0 as usize], "foo");
        assert!(!rest);
        assert_eq!(args.len(), 1);
      }
      other => panic!("expected send_literal, got {other:?}"),
    }
  }

  /// Scenario 4: `@x`.
  #[test]
  fn ivar_read_emits_get_self_then_get_literal_attr() {
    let cco = compile(vec![stmt(StmtKind::Return(Box::new(expr(ExprKind::IVar(ident("x"))))))]);

    assert!(matches!(cco.instructions[0].opcode, Opcode::GetSelf { .. }));
    match &cco.instructions[1].opcode {
      Opcode::GetLiteralAttr { name, .. } => assert_eq!(cco.string_pool[name.0 as usize], "x"),
      other => panic!("expected get_literal_attr, got {other:?}"),
    }
  }

  /// Scenario 5: `class C { def m { 10 } }`.
  #[test]
  fn class_definition_produces_a_class_body_child_with_a_method_child() {
    let cco = compile(vec![stmt(StmtKind::Class(ClassDef {
      name: ConstRef { receiver: None, name: ident("C") },
      parent: None,
      body: vec![stmt(StmtKind::Method(MethodDef {
        name: ident("m"),
        params: Vec::new(),
        body: vec![stmt(StmtKind::Return(Box::new(int(10))))],
        visibility: Visibility::Public,
        kind: RoutineKind::Method,
        line: 1,
        column: 1,
      }))],
      line: 1,
      column: 1,
    }))]);

    assert!(cco.instructions.iter().any(|i| i.opcode.is_branch()));
    assert_eq!(cco.children.len(), 1, "the class body is the only direct child of the module");
    let class_body = &cco.children[0];
    assert_eq!(class_body.kind, RoutineKind::Class);
    assert_eq!(class_body.children.len(), 1, "the method m is the class body's only child");
    let method_cco = &class_body.children[0];
    assert_eq!(method_cco.integer_pool, vec![10]);
    assert!(matches!(method_cco.instructions.last().unwrap().opcode, Opcode::Return { .. }));
  }

  /// Scenario 6: a closure over a parent local.
  #[test]
  fn closure_over_enclosing_local_emits_get_parent_local_at_depth_one() {
    let cco = compile(vec![
      stmt(StmtKind::Let {
        target: LetTarget::Ident(ident("a")),
        value: Box::new(int(1)),
      }),
      stmt(StmtKind::Return(Box::new(expr(ExprKind::Closure(MethodDef {
        name: ident("<closure>"),
        params: Vec::new(),
        body: vec![stmt(StmtKind::Return(Box::new(expr(ExprKind::Ident(ident("a"))))))],
        visibility: Visibility::Private,
        kind: RoutineKind::Closure,
        line: 1,
        column: 1,
      }))))),
    ]);

    assert_eq!(cco.children.len(), 1);
    let closure = &cco.children[0];
    assert_eq!(closure.kind, RoutineKind::Closure);
    match &closure.instructions[0].opcode {
      Opcode::GetParentLocal { depth, .. } => assert_eq!(*depth, 1),
      other => panic!("expected get_parent_local, got {other:?}"),
    }
  }

  /// Boundary behavior (spec.md §8): an empty class body still ends in
  /// exactly one terminator.
  #[test]
  fn empty_class_body_has_exactly_one_terminator() {
    let cco = compile(vec![stmt(StmtKind::Class(ClassDef {
      name: ConstRef { receiver: None, name: ident("Empty") },
      parent: None,
      body: Vec::new(),
      line: 1,
      column: 1,
    }))]);

    let class_body = &cco.children[0];
    let terminators = class_body.instructions.iter().filter(|i| i.opcode.is_terminator()).count();
    assert_eq!(terminators, 1);
  }

  /// Boundary behavior: an empty array literal emits `set_array dst, 0`.
  #[test]
  fn empty_array_literal_emits_zero_arity_set_array() {
    let cco = compile(vec![stmt(StmtKind::Return(Box::new(expr(ExprKind::Literal(
      Literal::Array(Vec::new()),
    )))))]);

    match &cco.instructions[0].opcode {
      Opcode::SetArray { elems, .. } => assert!(elems.is_empty()),
      other => panic!("expected set_array, got {other:?}"),
    }
  }

  /// Boundary behavior: a bare `self` reference at top level emits
  /// `get_self` with no preceding literal pool growth.
  #[test]
  fn self_reference_at_top_level_grows_no_literal_pool() {
    let cco = compile(vec![stmt(StmtKind::Return(Box::new(expr(ExprKind::SelfExpr))))]);

    assert!(matches!(cco.instructions[0].opcode, Opcode::GetSelf { .. }));
    assert!(cco.integer_pool.is_empty());
    assert!(cco.float_pool.is_empty());
    assert!(cco.string_pool.is_empty());
  }

  /// Reassignment at depth 0 emits exactly one `set_local`.
  #[test]
  fn reassignment_at_depth_zero_emits_one_set_local() {
    let cco = compile(vec![
      stmt(StmtKind::Let {
        target: LetTarget::Ident(ident("x")),
        value: Box::new(int(1)),
      }),
      stmt(StmtKind::Assign {
        target: AssignTarget::Ident(ident("x")),
        value: Box::new(int(2)),
      }),
      stmt(StmtKind::Return(Box::new(expr(ExprKind::Ident(ident("x")))))),
    ]);

    let set_locals = cco
      .instructions
      .iter()
      .filter(|i| matches!(i.opcode, Opcode::SetLocal { .. }))
      .count();
    assert_eq!(set_locals, 2, "one from the `let`, one from the reassignment");
  }

  /// Reassigning an undefined local is a source error, not a panic.
  #[test]
  fn reassigning_an_undefined_local_is_a_source_error() {
    let module = Module::new(vec![stmt(StmtKind::Assign {
      target: AssignTarget::Ident(ident("undefined")),
      value: Box::new(int(1)),
    })]);
    let result = lower_module(&module, "<test>", &Options::default());
    assert!(result.is_err());
  }

  /// Determinism: lowering the same AST twice yields identical instruction
  /// sequences and pools (spec.md §8 "Universal invariants").
  #[test]
  fn lowering_is_deterministic() {
    let make = || {
      vec![
        stmt(StmtKind::Let {
          target: LetTarget::Ident(ident("x")),
          value: Box::new(int(42)),
        }),
        stmt(StmtKind::Return(Box::new(expr(ExprKind::Ident(ident("x")))))),
      ]
    };
    let a = compile(make());
    let b = compile(make());
    assert!(a.wire_eq(&b));
  }
}
