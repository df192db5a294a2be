//! The callable type (spec.md §4.4 "Block type").

use super::{SymbolTable, Type};

/// A method or closure signature. The first argument is always the
/// implicit self (spec.md §4.4: "The first argument is always the
/// implicit self").
#[derive(Clone, Debug)]
pub struct Block {
  pub arguments: SymbolTable,
  pub rest_argument: bool,
  pub type_parameters: Vec<String>,
  pub throws: Option<Type>,
  pub returns: Type,
  pub required_arguments_count: u32,
}

impl Block {
  /// Per-position compatibility of argument types (excluding the implicit
  /// self) combined with equality of type parameters, `rest_argument`,
  /// `throws`, and `returns` (spec.md §4.4 "Block type").
  pub fn implementation_of(&self, other: &Block, compatible: impl Fn(&Type, &Type) -> bool) -> bool {
    if self.rest_argument != other.rest_argument {
      return false;
    }
    if self.type_parameters != other.type_parameters {
      return false;
    }
    if !throws_match(&self.throws, &other.throws, &compatible) {
      return false;
    }
    if !compatible(&self.returns, &other.returns) {
      return false;
    }

    let self_args: Vec<&Type> = self.arguments.names().skip(1).filter_map(|n| self.arguments.get(n)).map(|s| &s.value).collect();
    let other_args: Vec<&Type> = other
      .arguments
      .names()
      .skip(1)
      .filter_map(|n| other.arguments.get(n))
      .map(|s| &s.value)
      .collect();

    if self_args.len() != other_args.len() {
      return false;
    }
    self_args.iter().zip(other_args.iter()).all(|(a, b)| compatible(a, b))
  }
}

fn throws_match(a: &Option<Type>, b: &Option<Type>, compatible: &impl Fn(&Type, &Type) -> bool) -> bool {
  match (a, b) {
    (None, None) => true,
    (Some(a), Some(b)) => compatible(a, b),
    _ => false,
  }
}
