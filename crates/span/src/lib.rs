//! Source positions.
//!
//! A [`Span`] is a half-open byte range into one source file. It is cheap to
//! copy and carries no reference to the source text itself — callers resolve
//! it against a [`SourceMap`] only when they need to render a line/column
//! pair, e.g. when building a diagnostic.

use std::fmt;
use std::ops::Range;

/// A half-open `[start, end)` byte range into a single source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
  pub start: u32,
  pub end: u32,
}

impl Span {
  pub fn new(start: u32, end: u32) -> Self {
    debug_assert!(start <= end, "span start {start} is after end {end}");
    Self { start, end }
  }

  /// A zero-width span at a single byte offset.
  pub fn point(at: u32) -> Self {
    Self::new(at, at)
  }

  pub fn len(&self) -> u32 {
    self.end - self.start
  }

  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  /// The smallest span covering both `self` and `other`.
  pub fn to(&self, other: Span) -> Span {
    Span::new(self.start.min(other.start), self.end.max(other.end))
  }
}

impl From<Range<u32>> for Span {
  fn from(value: Range<u32>) -> Self {
    Span::new(value.start, value.end)
  }
}

impl fmt::Debug for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

/// 1-indexed line/column position, as used by the AST boundary contract
/// (line/column accessors) and by rendered diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineCol {
  pub line: u32,
  pub column: u32,
}

impl fmt::Display for LineCol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// Maps byte offsets in one source file to 1-indexed line/column pairs.
///
/// Built once per file from the raw source text; every subsequent lookup is
/// a binary search over cached line-start offsets.
pub struct SourceMap<'src> {
  source: &'src str,
  line_starts: Vec<u32>,
}

impl<'src> SourceMap<'src> {
  pub fn new(source: &'src str) -> Self {
    let mut line_starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
      if b == b'\n' {
        line_starts.push((i + 1) as u32);
      }
    }
    Self { source, line_starts }
  }

  pub fn source(&self) -> &'src str {
    self.source
  }

  /// Resolve a byte offset to a 1-indexed line/column pair.
  pub fn line_col(&self, offset: u32) -> LineCol {
    let line = match self.line_starts.binary_search(&offset) {
      Ok(exact) => exact,
      Err(insert_at) => insert_at - 1,
    };
    let column = offset - self.line_starts[line] + 1;
    LineCol {
      line: line as u32 + 1,
      column,
    }
  }

  /// The full text of the line containing `offset`, without its trailing
  /// newline. Used to render the source-context line under a diagnostic.
  pub fn line_text(&self, offset: u32) -> &'src str {
    let line = match self.line_starts.binary_search(&offset) {
      Ok(exact) => exact,
      Err(insert_at) => insert_at - 1,
    };
    self.line_text_at_line(line as u32 + 1)
  }

  /// The full text of the given 1-indexed line, without its trailing
  /// newline. Used by diagnostics, which only carry a `line`/`column` pair
  /// (not a byte offset) per the AST's position contract.
  pub fn line_text_at_line(&self, line: u32) -> &'src str {
    let line = (line as usize).saturating_sub(1).min(self.line_starts.len() - 1);
    let start = self.line_starts[line] as usize;
    let end = self
      .line_starts
      .get(line + 1)
      .map(|&n| n as usize - 1)
      .unwrap_or(self.source.len());
    self.source[start..end].trim_end_matches('\r')
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn span_to_covers_both() {
    let a = Span::new(4, 8);
    let b = Span::new(2, 5);
    assert_eq!(a.to(b), Span::new(2, 8));
  }

  #[test]
  fn line_col_first_line() {
    let map = SourceMap::new("abc\ndef\n");
    assert_eq!(map.line_col(0), LineCol { line: 1, column: 1 });
    assert_eq!(map.line_col(2), LineCol { line: 1, column: 3 });
  }

  #[test]
  fn line_col_second_line() {
    let map = SourceMap::new("abc\ndef\n");
    assert_eq!(map.line_col(4), LineCol { line: 2, column: 1 });
    assert_eq!(map.line_text(5), "def");
  }
}
