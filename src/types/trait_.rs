//! Traits (spec.md §4.4 "Traits").

use super::{GenericTypeOperations, SymbolTable, Type, TypeParameterTable};

#[derive(Clone, Debug)]
pub struct Trait {
  pub name: String,
  pub required_methods: Vec<String>,
  pub required_traits: Vec<Type>,
  /// Default method implementations the trait supplies directly.
  pub attributes: SymbolTable,
  pub type_parameters: TypeParameterTable,
}

impl Trait {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      required_methods: Vec::new(),
      required_traits: Vec::new(),
      attributes: SymbolTable::new(),
      type_parameters: TypeParameterTable::new(),
    }
  }

  /// The transitive closure over `required_traits` (spec.md §4.4:
  /// "`implements_trait?(X)` is the transitive closure over
  /// `required_traits`").
  pub fn implements_trait(&self, name: &str) -> bool {
    if self.name == name {
      return true;
    }
    self.required_traits.iter().any(|t| match t {
      Type::Trait(required) => required.name == name || required.implements_trait(name),
      _ => false,
    })
  }

  /// Compatible if `other` has equal `required_traits`/`required_methods`
  /// sets, or if `self` is a subtrait whose requirements encompass
  /// `other`'s (spec.md §4.4 "Traits").
  pub fn compatible_with(&self, other: &Trait) -> bool {
    if self.name == other.name {
      return true;
    }
    let same_methods = {
      let mut a = self.required_methods.clone();
      let mut b = other.required_methods.clone();
      a.sort();
      b.sort();
      a == b
    };
    let subsumes = other
      .required_methods
      .iter()
      .all(|m| self.required_methods.contains(m));
    same_methods || (subsumes && self.implements_trait(&other.name))
  }
}

impl GenericTypeOperations for Trait {
  fn type_parameters(&self) -> &TypeParameterTable {
    &self.type_parameters
  }

  fn type_parameters_mut(&mut self) -> &mut TypeParameterTable {
    &mut self.type_parameters
  }

  fn type_parameter_names(&self) -> Vec<String> {
    self.type_parameters.names().map(str::to_string).collect()
  }
}
