//! Pen: a reference-counted styling object consulted during rendering.
//!
//! The windowing core never interprets pen contents; it only owns the
//! reference (setting a new pen on a window releases the old one) and, for
//! scrolling, copies attributes between pens. Styling itself belongs to
//! whatever renders glyphs, which is out of this crate's scope.

use crossterm::style::{Attributes, Color};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenAttrs {
  pub foreground: Option<Color>,
  pub background: Option<Color>,
  pub attributes: Attributes,
}

impl Default for PenAttrs {
  fn default() -> Self {
    PenAttrs {
      foreground: None,
      background: None,
      attributes: Attributes::default(),
    }
  }
}

/// A cheaply-cloned, reference-counted handle to a pen. Cloning shares the
/// same underlying style; windows hold one of these rather than owning
/// styling state directly.
#[derive(Debug, Clone)]
pub struct Pen {
  inner: Rc<RefCell<PenAttrs>>,
}

impl Pen {
  pub fn new() -> Self {
    Pen {
      inner: Rc::new(RefCell::new(PenAttrs::default())),
    }
  }

  pub fn with_attrs(attrs: PenAttrs) -> Self {
    Pen {
      inner: Rc::new(RefCell::new(attrs)),
    }
  }

  pub fn get(&self) -> PenAttrs {
    *self.inner.borrow()
  }

  pub fn set_foreground(&self, color: Color) {
    self.inner.borrow_mut().foreground = Some(color);
  }

  pub fn set_background(&self, color: Color) {
    self.inner.borrow_mut().background = Some(color);
  }

  /// Copies attributes from `other` into `self`, matching the C API's
  /// `tickit_pen_copy(dest, src, only_if_unset)` used by the scroll helper
  /// to accumulate an effective background pen while walking up the
  /// ancestor chain. When `only_bg` is set, only the background is copied.
  pub fn copy_from(&self, other: &Pen, only_bg: bool) {
    let src = other.get();
    let mut dst = self.inner.borrow_mut();
    if only_bg {
      dst.background = src.background;
    } else {
      *dst = src;
    }
  }

  pub fn ptr_eq(&self, other: &Pen) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }
}

impl Default for Pen {
  fn default() -> Self {
    Pen::new()
  }
}
