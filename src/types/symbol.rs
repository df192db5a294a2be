//! The symbol table (spec.md §3 "Symbol table", §4.4 "Prototype lookup").

use indexmap::IndexMap;

use super::Type;

/// A name bound inside a prototype: its declared type and whether it was
/// ever actually defined, as opposed to synthesized as a not-found
/// placeholder.
#[derive(Clone, Debug)]
pub struct Symbol {
  pub name: String,
  pub value: Type,
}

impl Symbol {
  pub fn new(name: impl Into<String>, value: Type) -> Self {
    Self { name: name.into(), value }
  }

  /// The sentinel every `lookup_attribute`/`lookup_method` miss resolves
  /// to (spec.md §4.4: "if nothing hits, returns the null symbol for
  /// `name`"). Carries `Type::Void` since nothing should be inferred from
  /// an absent symbol, and is never itself inserted into a `SymbolTable`.
  pub fn null(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: Type::Void,
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self.value, Type::Void)
  }
}

/// Ordered name → symbol mapping (spec.md §3: "Symbol table. Ordered
/// name→symbol mapping").
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn define(&mut self, symbol: Symbol) {
    self.symbols.insert(symbol.name.clone(), symbol);
  }

  pub fn get(&self, name: &str) -> Option<&Symbol> {
    self.symbols.get(name)
  }

  pub fn get_index(&self, index: usize) -> Option<&Symbol> {
    self.symbols.get_index(index).map(|(_, s)| s)
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.symbols.keys().map(String::as_str)
  }
}
