//! The local-variable table (spec.md §3 "Local-variable table").
//!
//! An ordered, de-duplicated mapping from local name to a dense index
//! inside one CCO. Cross-CCO resolution (`resolve_local`, which walks the
//! outer-scope chain) lives on [`crate::cco::builder::CcoBuilder`] since it
//! needs more than one table at a time; this type only owns the single
//! table for one routine.

use indexmap::IndexSet;

#[derive(Debug, Default)]
pub struct LocalTable {
  names: IndexSet<String>,
}

impl LocalTable {
  pub fn new() -> Self {
    Self {
      names: IndexSet::new(),
    }
  }

  /// Register `name`, returning its dense index. Re-adding an existing
  /// name (e.g. shadowing via a second `let` of the same name) returns the
  /// same index it already had — callers that need true shadowing
  /// semantics (a fresh slot per `let`) should mangle the name first; this
  /// core treats re-`let` of an existing name as re-use, matching the
  /// teacher crate's own comment in `src/emit.rs`: "TODO: remove variables
  /// at the end of a block" — scoped shadowing is not implemented here.
  pub fn add(&mut self, name: impl Into<String>) -> u32 {
    let (index, _) = self.names.insert_full(name.into());
    index as u32
  }

  pub fn include(&self, name: &str) -> bool {
    self.names.contains(name)
  }

  pub fn index_of(&self, name: &str) -> Option<u32> {
    self.names.get_index_of(name).map(|i| i as u32)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn into_vec(self) -> Vec<String> {
    self.names.into_iter().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_is_stable_and_deduplicated() {
    let mut locals = LocalTable::new();
    assert_eq!(locals.add("x"), 0);
    assert_eq!(locals.add("y"), 1);
    assert_eq!(locals.add("x"), 0);
    assert!(locals.include("x"));
    assert!(!locals.include("z"));
  }
}
