//! Small typed operand indices, so an instruction's argument list can't
//! confuse a constant-pool index for a child-CCO index at the type level.
//! Grounded in the teacher crate's real opcode module, which does the same
//! thing with its own `op::Const`/`op::Reg`/`op::Upvalue` wrapper types
//! (`examples/other_examples/d46cbf8b_jprochazk-hebi__src-op-mod.rs.rs`).

/// Index into a CCO's integer, float, or string pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstIdx(pub u32);

/// Index into a CCO's local-variable table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalIdx(pub u32);

/// Index into a CCO's child-CCO pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildIdx(pub u32);

impl std::fmt::Display for ConstIdx {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "c{}", self.0)
  }
}
impl std::fmt::Display for LocalIdx {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "l{}", self.0)
  }
}
impl std::fmt::Display for ChildIdx {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "f{}", self.0)
  }
}
