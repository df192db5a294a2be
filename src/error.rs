//! Crate-local error type.
//!
//! Grounded in the teacher crate's own error style (`src/lib.rs`'s
//! `ModuleLoadError`/`EvalError`, `object/list.rs`'s `fail!`/`error!`
//! macros): a hand-rolled enum implementing `Display` + `std::error::Error`,
//! no `thiserror`. [`Error`] distinguishes the two fatal shapes spec.md §7
//! describes for the compiler itself — `Source` (kind 1/2, a user-facing
//! [`Diagnostic`]) and `Fault` (kind 3, an invariant the compiler itself
//! broke) — while ordinary user-source errors encountered during lowering
//! are collected as plain `Diagnostic`s rather than propagated through
//! `Result`, since a real compiler reports as many as it safely can (see
//! [`crate::lower::lower_module`]).

use std::fmt;

pub use diag::Diagnostic;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
  /// A user source error surfaced as a single, unrecoverable diagnostic
  /// (e.g. the constant pool overflowing its index width).
  Source(Diagnostic),
  /// A compiler fault: an invariant the compiler itself is supposed to
  /// uphold was violated (unmarked label, implicit-return point with no
  /// result register, re-marking a label). Never caused by user input.
  Fault(Diagnostic),
}

impl Error {
  pub fn is_fault(&self) -> bool {
    matches!(self, Error::Fault(_))
  }

  pub fn diagnostic(&self) -> &Diagnostic {
    match self {
      Error::Source(d) | Error::Fault(d) => d,
    }
  }

  pub fn report(&self, source: &str) -> String {
    self.diagnostic().report(source)
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self.diagnostic(), f)
  }
}

impl std::error::Error for Error {}

impl From<Diagnostic> for Error {
  fn from(value: Diagnostic) -> Self {
    if value.is_fault() {
      Error::Fault(value)
    } else {
      Error::Source(value)
    }
  }
}

/// Construct and return an `Err(Error::Source(..))` from a format string
/// and a `LineCol`. Mirrors the teacher crate's `hebi::fail!`.
macro_rules! fail {
  ($at:expr, $($arg:tt)*) => {
    return Err($crate::error::Error::Source(
      diag::Diagnostic::error(format!($($arg)*), $at),
    ))
  };
}

/// Construct and return an `Err(Error::Fault(..))` from a format string and
/// a `LineCol`. Used exclusively for invariant violations the compiler
/// itself is responsible for, never for user input.
macro_rules! fault {
  ($at:expr, $($arg:tt)*) => {
    return Err($crate::error::Error::Fault(
      diag::Diagnostic::fault(format!($($arg)*), $at),
    ))
  };
}

pub(crate) use fail;
pub(crate) use fault;
