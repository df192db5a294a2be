//! Literal pools (spec.md §3 "Literal pool").
//!
//! Each CCO owns four ordered pools — integers, floats, strings, and child
//! CCOs. The first three are de-duplicated by structural equality; the
//! child-CCO pool is explicitly not (spec.md §3 invariants). Grounded in
//! the teacher crate's use of `indexmap::IndexSet` for exactly this
//! "ordered, de-duplicated, stable index" shape (`src/emit.rs`'s
//! `module.vars: IndexSet<Ptr<object::String>>`).

use indexmap::IndexSet;

/// An ordered, de-duplicated pool of primitive values. `add` returns the
/// same index for structurally-equal values, in first-insertion order.
#[derive(Debug, Default)]
pub struct Pool<T: std::hash::Hash + Eq> {
  values: IndexSet<T>,
}

impl<T: std::hash::Hash + Eq> Pool<T> {
  pub fn new() -> Self {
    Self {
      values: IndexSet::new(),
    }
  }

  pub fn add(&mut self, value: T) -> u32 {
    let (index, _) = self.values.insert_full(value);
    index as u32
  }

  pub fn get(&self, index: u32) -> Option<&T> {
    self.values.get_index(index as usize)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.values.iter()
  }

  pub fn into_vec(self) -> Vec<T> {
    self.values.into_iter().collect()
  }
}

/// A finite, non-NaN `f64`, usable as a pool key. Grounded in the teacher
/// crate's own `value::constant::NonNaNFloat`, used the same way in
/// `src/emit/expr.rs` to intern float literals.
#[derive(Clone, Copy, Debug)]
pub struct PoolFloat(f64);

impl PoolFloat {
  pub fn new(value: f64) -> Option<Self> {
    if value.is_nan() {
      None
    } else {
      Some(Self(value))
    }
  }

  pub fn get(&self) -> f64 {
    self.0
  }
}

impl PartialEq for PoolFloat {
  fn eq(&self, other: &Self) -> bool {
    self.0.to_bits() == other.0.to_bits()
  }
}
impl Eq for PoolFloat {}

impl std::hash::Hash for PoolFloat {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.0.to_bits().hash(state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_deduplicates_and_is_stable() {
    let mut pool: Pool<i64> = Pool::new();
    assert_eq!(pool.add(10), 0);
    assert_eq!(pool.add(20), 1);
    assert_eq!(pool.add(10), 0);
    assert_eq!(pool.len(), 2);
  }

  #[test]
  fn float_pool_dedups_by_bit_pattern() {
    let mut pool: Pool<PoolFloat> = Pool::new();
    let a = PoolFloat::new(1.5).unwrap();
    let b = PoolFloat::new(1.5).unwrap();
    assert_eq!(pool.add(a), pool.add(b));
  }
}
