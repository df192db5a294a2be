//! Generics (spec.md §4.4 "Generics").

use indexmap::IndexMap;

use super::Type;

/// An ordered map from type-parameter name to its concrete instance at a
/// particular use site, with positional access (spec.md §4.4:
/// "`TypeParameterTable` is an ordered map with positional access (`[0]`,
/// `[1]`, …) and both positional and by-name instantiation").
#[derive(Clone, Debug, Default)]
pub struct TypeParameterTable {
  parameters: IndexMap<String, Option<Type>>,
}

impl TypeParameterTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn define(&mut self, name: impl Into<String>) {
    self.parameters.entry(name.into()).or_insert(None);
  }

  pub fn instantiate_by_name(&mut self, name: &str, instance: Type) -> bool {
    match self.parameters.get_mut(name) {
      Some(slot) => {
        *slot = Some(instance);
        true
      }
      None => false,
    }
  }

  pub fn instantiate_positional(&mut self, index: usize, instance: Type) -> bool {
    match self.parameters.get_index_mut(index) {
      Some((_, slot)) => {
        *slot = Some(instance);
        true
      }
      None => false,
    }
  }

  pub fn get(&self, index: usize) -> Option<(&str, Option<&Type>)> {
    self.parameters.get_index(index).map(|(name, instance)| (name.as_str(), instance.as_ref()))
  }

  pub fn lookup(&self, name: &str) -> Option<Option<&Type>> {
    self.parameters.get(name).map(|instance| instance.as_ref())
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.parameters.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.parameters.len()
  }

  pub fn is_empty(&self) -> bool {
    self.parameters.is_empty()
  }
}

/// Shared capability set for types that can carry type parameters
/// (spec.md §4.4 "Generics": `define_type_parameter`, `init_type_parameter`,
/// `type_parameter_names`, `lookup_type_parameter_instance`,
/// `lookup_type_parameter`).
pub trait GenericTypeOperations {
  fn type_parameters(&self) -> &TypeParameterTable;
  fn type_parameters_mut(&mut self) -> &mut TypeParameterTable;

  /// Type-parameter names, walking the prototype chain where the
  /// implementor has one (spec.md §4.4).
  fn type_parameter_names(&self) -> Vec<String>;

  fn define_type_parameter(&mut self, name: impl Into<String>) {
    self.type_parameters_mut().define(name);
  }

  fn init_type_parameter(&mut self, name: &str, instance: Type) -> bool {
    self.type_parameters_mut().instantiate_by_name(name, instance)
  }

  fn lookup_type_parameter(&self, name: &str) -> bool {
    self.type_parameters().lookup(name).is_some()
  }

  fn lookup_type_parameter_instance(&self, name: &str) -> Option<&Type> {
    self.type_parameters().lookup(name).flatten()
  }

  /// The printed name: parameter names, or their instances where present,
  /// joined with commas (spec.md §4.4).
  fn generic_display_name(&self, base: &str) -> String {
    let params = self.type_parameters();
    if params.is_empty() {
      return base.to_string();
    }
    let parts: Vec<String> = (0..params.len())
      .filter_map(|i| params.get(i))
      .map(|(name, instance)| match instance {
        Some(t) => t.display_name(),
        None => name.to_string(),
      })
      .collect();
    format!("{base}[{}]", parts.join(", "))
  }
}
