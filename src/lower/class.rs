//! Class-definition lowering (spec.md §4.1 "Class definition").
//!
//! A class is lowered as code that runs at load time to build or reopen
//! the class object, followed by a nested CCO for the class body that runs
//! against the class as receiver. The six-step protocol is implemented
//! directly in [`lower_class`] in the order the prose gives it.

use span::LineCol;

use crate::ast::{ClassDef, RoutineKind, Visibility};
use crate::cco::builder::CcoBuilder;
use crate::cco::instr::Opcode;
use crate::cco::label::BranchTarget;
use crate::error::Result;
use crate::options::Options;

use super::expr::{emit_get_self, lower_const_ref};
use super::method::lower_routine_body;
use super::{CLASS_FACTORY_CONST_NAME, CLASS_FACTORY_METHOD_NAME, OBJECT_CONST_NAME};

pub(crate) fn lower_class(b: &mut CcoBuilder, options: &Options, depth: u32, class_def: &ClassDef) -> Result<()> {
  let at = LineCol {
    line: class_def.line,
    column: class_def.column,
  };

  // 1. Name-target register.
  let name_target = match &class_def.name.receiver {
    Some(expr) => super::expr::lower_expr(b, options, depth, expr)?,
    None => emit_get_self(b, at),
  };
  let class_name = b.add_string(class_def.name.name.name.clone());

  // 2. Parent-class register.
  let parent_reg = match &class_def.parent {
    Some(parent) => lower_const_ref(b, options, depth, at, parent)?,
    None => {
      let self_reg = emit_get_self(b, at);
      let object_name = b.add_string(OBJECT_CONST_NAME);
      let dst = b.alloc_register();
      b.push(
        Opcode::GetLiteralConst {
          dst,
          recv: self_reg,
          name: object_name,
        },
        at,
      );
      dst
    }
  };

  // 3. Skip (re)initialization when the constant already exists.
  let exists = b.alloc_register();
  b.push(
    Opcode::LiteralConstExists {
      dst: exists,
      recv: name_target,
      name: class_name,
    },
    at,
  );
  let fwd = b.label();
  b.push(
    Opcode::GotoIfTrue {
      cond: exists,
      target: BranchTarget::Label(fwd),
    },
    at,
  );

  // 4. Materialize a new class object via the runtime factory and bind it.
  let factory_name = b.add_string(CLASS_FACTORY_CONST_NAME);
  let factory_self = emit_get_self(b, at);
  let factory_reg = b.alloc_register();
  b.push(
    Opcode::GetLiteralConst {
      dst: factory_reg,
      recv: factory_self,
      name: factory_name,
    },
    at,
  );
  let reopen_flag = b.alloc_register();
  b.push(Opcode::SetTrue { dst: reopen_flag }, at);
  let new_name = b.add_string(CLASS_FACTORY_METHOD_NAME);
  let new_class = b.alloc_register();
  b.push(
    Opcode::SendLiteral {
      dst: new_class,
      recv: factory_reg,
      name: new_name,
      rest: false,
      args: vec![parent_reg, reopen_flag],
    },
    at,
  );
  b.push(
    Opcode::SetLiteralConst {
      recv: name_target,
      name: class_name,
      value: new_class,
    },
    at,
  );

  // 5. Merge point: leave the (possibly pre-existing) class in a register.
  b.mark_label(fwd, at)?;
  let class_reg = b.alloc_register();
  b.push(
    Opcode::GetLiteralConst {
      dst: class_reg,
      recv: name_target,
      name: class_name,
    },
    at,
  );

  // 6. Lower the class body into its own CCO and run it against the class.
  let file = b.file().to_string();
  let body_code = lower_routine_body(
    b,
    options,
    depth,
    file,
    class_def.name.name.name.clone(),
    at,
    Visibility::Public,
    RoutineKind::Class,
    &[],
    &class_def.body,
  )?;
  b.push(
    Opcode::RunLiteralCode {
      recv: class_reg,
      code: body_code,
    },
    at,
  );

  Ok(())
}
