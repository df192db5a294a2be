//! The decoder: reconstructs a [`Cco`] tree from an encoded image.
//!
//! Exists purely so the round-trip laws spec.md §8 states ("Encode ∘
//! Decode on any CCO tree is the identity on all observable fields") are
//! checkable properties rather than aspirational prose — this crate is the
//! only consumer of its own encoded output, since the real VM that would
//! otherwise read an image back is out of scope (spec.md §1). Mirrors
//! [`crate::encode`]'s field order exactly; a cursor over the byte slice
//! plays the same role `bits::Cursor` plays in the sibling retrieval
//! `messense-llvm-bitcode-rs`, just at whole-byte rather than sub-byte
//! granularity.

use std::fmt;

use span::LineCol;
use tracing::debug;

use crate::ast::{RoutineKind, Visibility};
use crate::cco::instr::{Instr, Opcode};
use crate::cco::label::BranchTarget;
use crate::cco::operand::{ChildIdx, ConstIdx, LocalIdx};
use crate::cco::register::Register;
use crate::cco::Cco;
use crate::options::Options;

use super::encode::SIGNATURE;

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Hand-rolled, no `thiserror`, matching this crate's own [`crate::error`]
/// style — but deliberately its own type rather than [`crate::Error`]:
/// a malformed byte stream has no AST source position to anchor a
/// [`diag::Diagnostic`] to, so these failures are plain values instead.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
  UnexpectedEof,
  BadSignature([u8; 4]),
  UnsupportedVersion(u8),
  InvalidUtf8,
  UnknownOpcode(u16),
}

impl fmt::Display for DecodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DecodeError::UnexpectedEof => write!(f, "unexpected end of image"),
      DecodeError::BadSignature(sig) => write!(f, "bad image signature: {sig:?}"),
      DecodeError::UnsupportedVersion(v) => write!(f, "unsupported image version: {v}"),
      DecodeError::InvalidUtf8 => write!(f, "string pool entry is not valid UTF-8"),
      DecodeError::UnknownOpcode(id) => write!(f, "unknown opcode tag: {id}"),
    }
  }
}

impl std::error::Error for DecodeError {}

/// Decode a full image, refusing anything whose version byte isn't the
/// one this decoder understands (spec.md §6: "a reader must refuse
/// unrecognized versions").
pub fn decode_image(bytes: &[u8]) -> Result<Cco> {
  debug!(bytes = bytes.len(), "decode_image");
  let mut cur = Cursor::new(bytes);
  let mut sig = [0u8; 4];
  sig.copy_from_slice(cur.take(4)?);
  if sig != SIGNATURE {
    return Err(DecodeError::BadSignature(sig));
  }
  let version = cur.u8()?;
  if version != Options::CURRENT_IMAGE_VERSION {
    return Err(DecodeError::UnsupportedVersion(version));
  }
  decode_cco(&mut cur)
}

fn decode_cco(cur: &mut Cursor) -> Result<Cco> {
  let name = cur.string()?;
  let file = cur.string()?;
  let start_line = cur.u32()?;
  let argument_count = cur.i32()? as u32;
  let required_args = cur.u32()?;
  let rest_argument = cur.bool()?;
  let locals = cur.array(Cursor::string)?;
  let instructions = cur.array(decode_instr)?;
  let integer_pool = cur.array(Cursor::i64)?;
  let float_pool = cur.array(Cursor::f64)?;
  let string_pool = cur.array(Cursor::string)?;
  let children = cur.array(decode_cco)?;

  Ok(Cco {
    name,
    file,
    start_line,
    // `visibility`, `kind`, and `frame_size` have no slot in the wire
    // format (spec.md §4.5 "CCO layout" lists neither); they're
    // compile-time metadata lowering and diagnostics consult, not part of
    // what the encoder/decoder round-trips (see `DESIGN.md`). A decoded
    // CCO gets the most permissive stand-ins; a caller that needs the
    // real values should keep the pre-encode `Cco` around instead.
    visibility: Visibility::Public,
    kind: RoutineKind::Module,
    argument_count,
    required_args,
    rest_argument,
    frame_size: 0,
    locals,
    instructions,
    integer_pool,
    float_pool,
    string_pool,
    children,
  })
}

fn decode_instr(cur: &mut Cursor) -> Result<Instr> {
  let id = cur.u16()?;
  let raw_args = cur.array(Cursor::u32)?;
  let line = cur.u32()?;
  let column = cur.u32()?;
  let opcode = decode_opcode(id, &raw_args)?;
  Ok(Instr {
    opcode,
    at: LineCol { line, column },
  })
}

fn decode_opcode(id: u16, raw: &[u32]) -> Result<Opcode> {
  let mut args = Args::new(raw);
  Ok(match id {
    0 => Opcode::SetInt {
      dst: Register(args.next()?),
      value: ConstIdx(args.next()?),
    },
    1 => Opcode::SetFloat {
      dst: Register(args.next()?),
      value: ConstIdx(args.next()?),
    },
    2 => Opcode::SetString {
      dst: Register(args.next()?),
      value: ConstIdx(args.next()?),
    },
    3 => Opcode::SetNil { dst: Register(args.next()?) },
    4 => Opcode::SetTrue { dst: Register(args.next()?) },
    5 => Opcode::SetFalse { dst: Register(args.next()?) },
    6 => {
      let dst = Register(args.next()?);
      let n = args.next()? as usize;
      let elems = args.rest(n)?.iter().map(|&r| Register(r)).collect();
      Opcode::SetArray { dst, elems }
    }
    7 => Opcode::GetLocal {
      dst: Register(args.next()?),
      local: LocalIdx(args.next()?),
    },
    8 => Opcode::SetLocal {
      local: LocalIdx(args.next()?),
      value: Register(args.next()?),
    },
    9 => Opcode::GetParentLocal {
      dst: Register(args.next()?),
      depth: args.next()?,
      local: LocalIdx(args.next()?),
    },
    10 => Opcode::SetParentLocal {
      depth: args.next()?,
      local: LocalIdx(args.next()?),
      value: Register(args.next()?),
    },
    11 => Opcode::GetSelf { dst: Register(args.next()?) },
    12 => Opcode::GetLiteralAttr {
      dst: Register(args.next()?),
      recv: Register(args.next()?),
      name: ConstIdx(args.next()?),
    },
    13 => Opcode::SetLiteralAttr {
      recv: Register(args.next()?),
      name: ConstIdx(args.next()?),
      value: Register(args.next()?),
    },
    14 => Opcode::GetLiteralConst {
      dst: Register(args.next()?),
      recv: Register(args.next()?),
      name: ConstIdx(args.next()?),
    },
    15 => Opcode::SetLiteralConst {
      recv: Register(args.next()?),
      name: ConstIdx(args.next()?),
      value: Register(args.next()?),
    },
    16 => Opcode::LiteralConstExists {
      dst: Register(args.next()?),
      recv: Register(args.next()?),
      name: ConstIdx(args.next()?),
    },
    17 => Opcode::DefLiteralMethod {
      recv: Register(args.next()?),
      name: ConstIdx(args.next()?),
      method: ChildIdx(args.next()?),
    },
    18 => Opcode::SetCompiledCode {
      dst: Register(args.next()?),
      code: ChildIdx(args.next()?),
    },
    19 => Opcode::RunLiteralCode {
      recv: Register(args.next()?),
      code: ChildIdx(args.next()?),
    },
    20 => {
      let dst = Register(args.next()?);
      let recv = Register(args.next()?);
      let name = ConstIdx(args.next()?);
      let rest = args.next()? != 0;
      let n = args.next()? as usize;
      let call_args = args.rest(n)?.iter().map(|&r| Register(r)).collect();
      Opcode::SendLiteral {
        dst,
        recv,
        name,
        rest,
        args: call_args,
      }
    }
    21 => Opcode::Return { value: Register(args.next()?) },
    22 => Opcode::Goto {
      target: BranchTarget::Resolved(args.next()?),
    },
    23 => Opcode::GotoIfTrue {
      cond: Register(args.next()?),
      target: BranchTarget::Resolved(args.next()?),
    },
    24 => Opcode::GotoIfFalse {
      cond: Register(args.next()?),
      target: BranchTarget::Resolved(args.next()?),
    },
    other => return Err(DecodeError::UnknownOpcode(other)),
  })
}

/// A cursor over one instruction's already-length-stripped `u32` operand
/// list, so each opcode's decode arm reads its own fields by simple
/// position rather than juggling raw slice indices.
struct Args<'a> {
  items: &'a [u32],
  pos: usize,
}

impl<'a> Args<'a> {
  fn new(items: &'a [u32]) -> Self {
    Self { items, pos: 0 }
  }

  fn next(&mut self) -> Result<u32> {
    let v = *self.items.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
    self.pos += 1;
    Ok(v)
  }

  fn rest(&mut self, n: usize) -> Result<&'a [u32]> {
    let end = self.pos + n;
    let slice = self.items.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
    self.pos = end;
    Ok(slice)
  }
}

/// A cursor over the whole byte image, one primitive encoding at a time
/// (spec.md §4.5 "Primitive encodings").
struct Cursor<'a> {
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> Cursor<'a> {
  fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, pos: 0 }
  }

  fn take(&mut self, n: usize) -> Result<&'a [u8]> {
    let end = self.pos + n;
    let slice = self.bytes.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
    self.pos = end;
    Ok(slice)
  }

  fn u8(&mut self) -> Result<u8> {
    Ok(self.take(1)?[0])
  }

  fn u16(&mut self) -> Result<u16> {
    Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
  }

  fn u32(&mut self) -> Result<u32> {
    Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
  }

  fn u64(&mut self) -> Result<u64> {
    Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
  }

  fn i32(&mut self) -> Result<i32> {
    Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
  }

  fn i64(&mut self) -> Result<i64> {
    Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
  }

  fn f64(&mut self) -> Result<f64> {
    Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
  }

  fn bool(&mut self) -> Result<bool> {
    Ok(self.u8()? != 0)
  }

  fn string(&mut self) -> Result<String> {
    let len = self.u64()? as usize;
    let bytes = self.take(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
  }

  fn array<T>(&mut self, mut f: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
    let len = self.u64()? as usize;
    let mut items = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
      items.push(f(self)?);
    }
    Ok(items)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{RoutineKind, Visibility};
  use crate::cco::builder::CcoBuilder;
  use crate::cco::instr::Opcode;
  use crate::cco::label::BranchTarget;
  use crate::encode::encode_image;
  use span::LineCol;

  fn pos() -> LineCol {
    LineCol { line: 1, column: 1 }
  }

  /// Scenario 1 from spec.md §8: `let x = 10`.
  #[test]
  fn round_trips_integer_let() {
    let mut b = CcoBuilder::new("<module>", "t.rb", 1, Visibility::Public, RoutineKind::Module);
    let value = b.alloc_register();
    let lit = b.add_integer(10);
    b.push(Opcode::SetInt { dst: value, value: lit }, pos());
    let local = b.set_local("x");
    b.push(
      Opcode::SetLocal {
        local,
        value,
      },
      pos(),
    );
    b.push(Opcode::Return { value }, pos());
    let cco = b.seal().unwrap();

    let image = encode_image(&cco, &Options::default());
    let decoded = decode_image(&image).unwrap();

    assert!(cco.wire_eq(&decoded));
    assert_eq!(decoded.integer_pool, vec![10]);
    assert_eq!(decoded.locals, vec!["x".to_string()]);
  }

  #[test]
  fn round_trips_nested_children_and_branches() {
    let mut b = CcoBuilder::new("<module>", "t.rb", 1, Visibility::Public, RoutineKind::Module);
    let cond = b.alloc_register();
    b.push(Opcode::SetTrue { dst: cond }, pos());
    let else_label = b.label();
    let end_label = b.label();
    b.push(
      Opcode::GotoIfFalse {
        cond,
        target: BranchTarget::Label(else_label),
      },
      pos(),
    );
    let r = b.alloc_register();
    b.push(Opcode::SetNil { dst: r }, pos());
    b.push(
      Opcode::Goto {
        target: BranchTarget::Label(end_label),
      },
      pos(),
    );
    b.mark_label(else_label, pos()).unwrap();
    b.push(Opcode::SetNil { dst: r }, pos());
    b.mark_label(end_label, pos()).unwrap();
    b.push(Opcode::Return { value: r }, pos());

    b.begin_child("m", "t.rb", 2, Visibility::Public, RoutineKind::Method);
    let inner = b.alloc_register();
    b.push(Opcode::SetNil { dst: inner }, pos());
    b.push(Opcode::Return { value: inner }, pos());
    let child = b.end_child().unwrap();
    b.add_child(child);

    let cco = b.seal().unwrap();
    let image = encode_image(&cco, &Options::default());
    let decoded = decode_image(&image).unwrap();

    assert!(cco.wire_eq(&decoded));
    assert_eq!(decoded.children.len(), 1);
  }

  #[test]
  fn string_pool_add_then_get_round_trips_byte_identical() {
    let mut b = CcoBuilder::new("<module>", "t.rb", 1, Visibility::Public, RoutineKind::Module);
    let dst = b.alloc_register();
    let idx = b.add_string("héllo, wörld");
    b.push(Opcode::SetString { dst, value: idx }, pos());
    b.push(Opcode::Return { value: dst }, pos());
    let cco = b.seal().unwrap();

    let image = encode_image(&cco, &Options::default());
    let decoded = decode_image(&image).unwrap();
    assert_eq!(decoded.string_pool[idx.0 as usize], "héllo, wörld");
  }

  #[test]
  fn rejects_bad_signature() {
    let bytes = [0u8; 8];
    assert_eq!(decode_image(&bytes), Err(DecodeError::BadSignature([0, 0, 0, 0])));
  }

  #[test]
  fn rejects_unsupported_version() {
    let mut bytes = SIGNATURE.to_vec();
    bytes.push(255);
    assert_eq!(decode_image(&bytes), Err(DecodeError::UnsupportedVersion(255)));
  }

  #[test]
  fn truncated_image_is_an_eof_error_not_a_panic() {
    let mut b = CcoBuilder::new("<module>", "t.rb", 1, Visibility::Public, RoutineKind::Module);
    let r = b.alloc_register();
    b.push(Opcode::SetNil { dst: r }, pos());
    b.push(Opcode::Return { value: r }, pos());
    let cco = b.seal().unwrap();
    let image = encode_image(&cco, &Options::default());

    for cut in [image.len() - 1, 5, 0] {
      assert!(decode_image(&image[..cut]).is_err());
    }
  }
}
