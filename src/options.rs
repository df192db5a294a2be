//! Compiler-wide configuration.
//!
//! Deliberately tiny: the driver/CLI, package/module loading policy, and
//! filesystem layout are all out of scope (spec.md §1), so the only knobs
//! that belong here are the ones the core itself branches on.

/// Configuration threaded through [`crate::lower::lower_module`] and
/// [`crate::encode::encode_image`].
#[derive(Clone, Debug)]
pub struct Options {
  /// The image format version byte written by the encoder (spec.md §4.5).
  /// A reader must refuse an image whose version it doesn't recognize;
  /// bumping this is the one contract-breaking change to the format.
  pub image_version: u8,

  /// Maximum AST recursion depth lowering will tolerate before raising a
  /// compiler fault, or `None` to lower without a limit. Mirrors the
  /// teacher crate's real `check-recursion-limit` Cargo feature, but
  /// expressed as a runtime knob rather than a compile-time one, since a
  /// driver embedding this crate may want to vary it per source unit (e.g.
  /// relaxing it for trusted, generated code).
  pub max_lowering_depth: Option<u32>,
}

impl Options {
  pub const CURRENT_IMAGE_VERSION: u8 = 1;

  pub fn new() -> Self {
    Self::default()
  }
}

impl Default for Options {
  fn default() -> Self {
    Self {
      image_version: Self::CURRENT_IMAGE_VERSION,
      max_lowering_depth: if cfg!(feature = "check-recursion-limit") {
        Some(512)
      } else {
        None
      },
    }
  }
}
