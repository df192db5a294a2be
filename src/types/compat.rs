//! Compatibility rules (spec.md §4.4 "Compatibility").

use super::Type;

/// `type_compatible?(A, B)`: true if `A == B`, `B` is `Dynamic`, `B` is a
/// trait `A` implements, `B` is `Optional(T)` and `A` is compatible with
/// `T`, or walking `A`'s prototype chain yields a prototype compatible
/// with `B` (spec.md §4.4).
pub fn type_compatible(a: &Type, b: &Type) -> bool {
  compatible(a, b, false)
}

/// Same as [`type_compatible`] except `Dynamic` does not match
/// (spec.md §4.4: "`strict_type_compatible?` is the same except `Dynamic`
/// does not match").
pub fn strict_type_compatible(a: &Type, b: &Type) -> bool {
  compatible(a, b, true)
}

fn compatible(a: &Type, b: &Type, strict: bool) -> bool {
  if same_type(a, b) {
    return true;
  }

  if !strict {
    if let Type::Dynamic = b {
      return true;
    }
    // `Dynamic` is universally compatible in one direction (spec.md §4.4
    // "Dynamic"), but never strictly compatible with non-`Dynamic`
    // targets except itself.
    if let Type::Dynamic = a {
      return true;
    }
  }

  if let Type::Void = b {
    return true;
  }

  if let Type::SelfType = a {
    if strict {
      return matches!(b, Type::SelfType) || is_self_type_target(b);
    }
  }

  if let Type::Trait(trait_b) = b {
    if implements_trait(a, trait_b) {
      return true;
    }
  }

  if let Type::Optional(inner) = b {
    if compatible(a, inner, strict) {
      return true;
    }
  }

  if let Type::Constraint(constraint) = a {
    if let Some(inferred) = constraint.inferred.borrow().as_ref() {
      if constraint.is_resolved() {
        return compatible(inferred, b, strict);
      }
    }
    return matches!(b, Type::TypeParameter(_) | Type::Trait(_) | Type::Dynamic);
  }

  if let Some(prototype) = prototype_of(a) {
    return compatible(prototype, b, strict);
  }

  false
}

fn same_type(a: &Type, b: &Type) -> bool {
  a.display_name() == b.display_name() && std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn is_self_type_target(b: &Type) -> bool {
  b.is_self_type()
}

fn implements_trait(a: &Type, target: &super::Trait) -> bool {
  match a {
    Type::Trait(t) => t.implements_trait(&target.name),
    Type::Object(o) => o.implements(target),
    _ => false,
  }
}

fn prototype_of(a: &Type) -> Option<&Type> {
  match a {
    Type::Object(o) => o.prototype.as_deref(),
    Type::Optional(inner) => Some(inner),
    _ => None,
  }
}
