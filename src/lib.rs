//! Core of a bootstrap bytecode compiler for a small, dynamically-typed,
//! object-oriented language.
//!
//! This crate consumes a parsed AST (see [`ast`]) and produces a binary
//! bytecode image (see [`encode`]) suitable for execution by a
//! register-based virtual machine. The VM itself, lexing/parsing, and the
//! driver/CLI are all external collaborators and out of scope here — see
//! the module list below for the three subsystems this crate actually
//! owns: lowering (§4.1), the typed intermediate representation (§4.3),
//! and the type model (§4.4).
//!
//! Dependency order, leaves first: [`types`] → [`cco`] → [`lower`] →
//! [`encode`]. [`tir`] and [`typeck`] sit alongside lowering and are
//! consulted during elaboration rather than feeding the encoder directly.

pub mod ast;
pub mod cco;
pub mod decode;
pub mod encode;
pub mod error;
pub mod lower;
pub mod options;
pub mod tir;
pub mod typeck;
pub mod types;

pub use diag::{Diagnostic, Severity};
pub use error::{Error, Result};
pub use options::Options;
pub use span::LineCol;

/// Compile one module's AST to a sealed root [`cco::Cco`], or the list of
/// user-facing diagnostics collected along the way.
///
/// This is the top-level entry point a driver calls: lexing/parsing
/// happens before this function runs, and serialization to an image
/// happens after, via [`encode::encode_image`].
pub fn compile_module(
  module: &ast::Module,
  name: impl Into<String>,
  options: &Options,
) -> std::result::Result<cco::Cco, Vec<Diagnostic>> {
  lower::lower_module(module, name, options)
}
