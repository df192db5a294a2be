//! The inbound AST contract (spec.md §6).
//!
//! The distilled spec describes the AST boundary abstractly: every node
//! exposes a `type` tag, a `children` sequence, and a `line`/`column`
//! position. Since no external parser crate ships in this workspace, that
//! abstract contract is realized here as a concrete, idiomatically-typed
//! tree — struct-per-node-kind, the same way the teacher crate's own
//! `syntax::ast` module is typed rather than a dynamic tree. `NodeKind`
//! (via each node's own enum variant) stands in for `type`, each struct's
//! fields stand in for `children`, and `line`/`column` are carried
//! directly on every node that lowering can be asked to process.
//!
//! Only the node kinds spec.md §4.1 gives an operational lowering for are
//! modeled in depth here, plus the control-flow kinds (`if`/`while`/
//! `loop`/`break`/`next`) that the label/fixup protocol (§4.1 "Label
//! protocol") clearly exists to support — leaving that protocol with no
//! caller would be a conspicuous gap in an otherwise complete compiler.
//! Node kinds spec.md §6 lists but never gives lowering rules for
//! (`import`, `match`, `try`, `type`, `block`-as-a-standalone-declaration)
//! are intentionally not modeled: module loading policy is explicitly out
//! of scope (§1), and the rest have no specified semantics to implement
//! against.

/// One module: a flat, ordered list of top-level statements.
#[derive(Debug, Clone)]
pub struct Module {
  pub body: Vec<Stmt>,
}

impl Module {
  pub fn new(body: Vec<Stmt>) -> Self {
    Self { body }
  }
}

/// A statement. Most of the language is expression-shaped; the few
/// genuinely statement-only forms (bindings, reassignment, definitions,
/// control flow, return) live here.
#[derive(Debug, Clone)]
pub struct Stmt {
  pub kind: StmtKind,
  pub line: u32,
  pub column: u32,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
  /// `let name = value`
  Let { target: LetTarget, value: Box<Expr> },
  /// `target = value`, where `target` is anything assignable.
  Assign { target: AssignTarget, value: Box<Expr> },
  /// `def name(params) { body }` — a method on the implicit self, or (at
  /// class-body scope) on the class being defined.
  Method(MethodDef),
  /// `class Name [< Parent] { body }`
  Class(ClassDef),
  /// `return value`
  Return(Box<Expr>),
  /// `if cond { then } [else { else_ }]`
  If {
    cond: Box<Expr>,
    then: Vec<Stmt>,
    else_: Vec<Stmt>,
  },
  /// `while cond { body }`
  While { cond: Box<Expr>, body: Vec<Stmt> },
  /// `loop { body }`
  Loop { body: Vec<Stmt> },
  Break,
  Next,
  /// An expression evaluated for its side effects; its result register is
  /// discarded by the encoder.
  Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum LetTarget {
  Ident(Ident),
  Const(ConstRef),
  IVar(Ident),
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
  Ident(Ident),
  Const(ConstRef),
  IVar(Ident),
}

#[derive(Debug, Clone)]
pub struct MethodDef {
  pub name: Ident,
  pub params: Vec<Param>,
  pub body: Vec<Stmt>,
  pub visibility: Visibility,
  pub kind: RoutineKind,
  pub line: u32,
  pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  Public,
  Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
  Module,
  Method,
  Closure,
  Class,
}

#[derive(Debug, Clone)]
pub struct Param {
  pub name: Ident,
  /// Set on at most one trailing parameter; collects remaining call-site
  /// arguments into a list (spec.md glossary: "Rest argument").
  pub rest: bool,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
  pub name: ConstRef,
  pub parent: Option<ConstRef>,
  pub body: Vec<Stmt>,
  pub line: u32,
  pub column: u32,
}

/// A constant reference, optionally qualified by an explicit receiver
/// (`recv.Foo` vs. bare `Foo`).
#[derive(Debug, Clone)]
pub struct ConstRef {
  pub receiver: Option<Box<Expr>>,
  pub name: Ident,
}

#[derive(Debug, Clone)]
pub struct Ident {
  pub name: String,
  pub line: u32,
  pub column: u32,
}

impl Ident {
  pub fn new(name: impl Into<String>, line: u32, column: u32) -> Self {
    Self {
      name: name.into(),
      line,
      column,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Expr {
  pub kind: ExprKind,
  pub line: u32,
  pub column: u32,
}

impl Expr {
  pub fn new(kind: ExprKind, line: u32, column: u32) -> Self {
    Self { kind, line, column }
  }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
  Literal(Literal),
  Ident(Ident),
  IVar(Ident),
  Const(ConstRef),
  SelfExpr,
  Send(Send),
  Closure(MethodDef),
}

#[derive(Debug, Clone)]
pub enum Literal {
  Nil,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  Array(Vec<Expr>),
}

/// `recv.name(a0, …, aN, *rest?)`, or an implicit-self zero-argument send
/// produced when an identifier isn't a local (spec.md §4.1 "Identifier
/// reference").
#[derive(Debug, Clone)]
pub struct Send {
  pub receiver: Option<Box<Expr>>,
  pub name: Ident,
  pub args: Vec<Arg>,
}

#[derive(Debug, Clone)]
pub struct Arg {
  pub value: Expr,
  pub rest: bool,
}
