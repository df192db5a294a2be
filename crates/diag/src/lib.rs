//! Diagnostic values and source-annotated rendering.
//!
//! Mirrors the `.report(input)` convention used throughout the teacher
//! crate's own error types (e.g. `syntax::Error::report`) — a diagnostic
//! carries only a location and a message; rendering against the source text
//! is a separate, explicit step so callers can defer it (or skip it
//! entirely when only the machine-readable location/message pair is
//! needed). Locations are `line:column` pairs rather than byte spans:
//! that's what lowering actually has on hand, since it reads positions off
//! the AST contract (`line`, `column` accessors), not off raw source text.

use std::fmt;

use span::{LineCol, SourceMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
  /// A user source error (spec.md §7 kind 1/2): reassigning an undefined
  /// local, an overflowing literal, an unresolved type constraint.
  Error,
  /// A compiler fault (spec.md §7 kind 3): an invariant the compiler itself
  /// is supposed to uphold was violated.
  Fault,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Error => write!(f, "error"),
      Severity::Fault => write!(f, "compiler fault"),
    }
  }
}

/// One diagnostic: a message anchored to a source location, with an
/// optional list of secondary notes.
#[derive(Clone, Debug)]
pub struct Diagnostic {
  pub severity: Severity,
  pub message: String,
  pub at: LineCol,
  pub notes: Vec<String>,
}

impl Diagnostic {
  pub fn error(message: impl Into<String>, at: LineCol) -> Self {
    Self {
      severity: Severity::Error,
      message: message.into(),
      at,
      notes: Vec::new(),
    }
  }

  pub fn fault(message: impl Into<String>, at: LineCol) -> Self {
    Self {
      severity: Severity::Fault,
      message: message.into(),
      at,
      notes: Vec::new(),
    }
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.notes.push(note.into());
    self
  }

  pub fn is_fault(&self) -> bool {
    self.severity == Severity::Fault
  }

  /// Render this diagnostic against `source`, including the `line:column`
  /// locator and the offending source line.
  pub fn report(&self, source: &str) -> String {
    let map = SourceMap::new(source);
    let mut out = format!("{}: {} (at {})\n", self.severity, self.message, self.at);
    out += &format!("  | {}\n", map.line_text_at_line(self.at.line));
    for note in &self.notes {
      out += &format!("  = note: {note}\n");
    }
    out
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {} (at {})", self.severity, self.message, self.at)
  }
}

impl std::error::Error for Diagnostic {}

/// Render a batch of diagnostics, one after another.
pub fn report_all(diagnostics: &[Diagnostic], source: &str) -> String {
  diagnostics.iter().map(|d| d.report(source)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn report_includes_locator_and_line() {
    let source = "let x = 1\nreassign x = 2\n";
    let diag = Diagnostic::error("undefined local `x`", LineCol { line: 2, column: 1 });
    let report = diag.report(source);
    assert!(report.contains("at 2:1"));
    assert!(report.contains("reassign x = 2"));
  }
}
