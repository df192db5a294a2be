//! Prototype-chain object types (spec.md §4.4 "Prototype lookup").

use super::{GenericTypeOperations, Symbol, SymbolTable, Type, TypeParameterTable};

/// An object type: a name, an optional prototype (parent in the chain),
/// its own attributes and methods, and a type-parameter table for
/// generics.
#[derive(Clone, Debug)]
pub struct Object {
  pub name: String,
  pub prototype: Option<Box<Type>>,
  pub attributes: SymbolTable,
  pub methods: SymbolTable,
  pub type_parameters: TypeParameterTable,
  /// Traits this object has declared itself to implement. Compatibility
  /// against a trait target checks this list (by name) plus, recursively,
  /// the required-trait closure of each entry (spec.md §4.4
  /// "Compatibility": "`B` is a trait and `A` implements `B`").
  pub implemented_traits: Vec<String>,
}

impl Object {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      prototype: None,
      attributes: SymbolTable::new(),
      methods: SymbolTable::new(),
      type_parameters: TypeParameterTable::new(),
      implemented_traits: Vec::new(),
    }
  }

  /// Checks the required-method implementation by name as well as the
  /// declared trait list (spec.md §4.4 "Compatibility").
  pub fn implements(&self, trait_: &super::Trait) -> bool {
    if self.implemented_traits.iter().any(|t| t == &trait_.name) {
      return true;
    }
    trait_.required_methods.iter().all(|m| !self.lookup_method(m).is_null())
  }

  pub fn with_prototype(mut self, prototype: Type) -> Self {
    self.prototype = Some(Box::new(prototype));
    self
  }

  /// Walk the prototype chain, returning the first hit; a miss returns
  /// the null symbol for `name` (spec.md §4.4 "Prototype lookup").
  pub fn lookup_attribute(&self, name: &str) -> Symbol {
    if let Some(symbol) = self.attributes.get(name) {
      return symbol.clone();
    }
    if let Some(Type::Object(parent)) = self.prototype.as_deref() {
      return parent.lookup_attribute(name);
    }
    Symbol::null(name)
  }

  /// `lookup_method` is `lookup_attribute` lifted to methods, sharing the
  /// same traversal (spec.md §4.4).
  pub fn lookup_method(&self, name: &str) -> Symbol {
    if let Some(symbol) = self.methods.get(name) {
      return symbol.clone();
    }
    if let Some(Type::Object(parent)) = self.prototype.as_deref() {
      return parent.lookup_method(name);
    }
    Symbol::null(name)
  }
}

impl GenericTypeOperations for Object {
  fn type_parameters(&self) -> &TypeParameterTable {
    &self.type_parameters
  }

  fn type_parameters_mut(&mut self) -> &mut TypeParameterTable {
    &mut self.type_parameters
  }

  fn type_parameter_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.type_parameters.names().map(str::to_string).collect();
    if let Some(Type::Object(parent)) = self.prototype.as_deref() {
      let mut parent_names = parent.type_parameter_names();
      parent_names.extend(names);
      names = parent_names;
    }
    names
  }
}
