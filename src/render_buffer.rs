//! The render buffer passed to expose handlers.
//!
//! Actually drawing glyphs is out of scope here: a real render buffer in an
//! application built on this crate would own a cell grid and a diffing
//! shader the way [`crate::root::Root`]'s neighbours do. What the windowing
//! core itself is responsible for is the clipping contract -- a handler
//! only ever sees, and only ever addresses coordinates within, the region
//! the exposure pass carved out for it. This type tracks that contract: a
//! clip rectangle, a translation offset into window-local coordinates, and
//! a save/restore stack so nested exposure (a window's own expose, then its
//! children's) can restore outer state cheaply.
//!
//! Callers obtain one only as `&mut RenderBuffer` inside an
//! [`crate::event::Event::Expose`]; the root constructs it per-flush, and
//! once every damaged rect has been exposed into it, hands it to
//! [`crate::term::Terminal::flush_to_term`] before dropping it.

use crate::pen::Pen;
use crate::rect::Rect;

#[derive(Clone)]
struct SavedState {
  clip: Rect,
  translate: (i32, i32),
  pen: Option<Pen>,
}

/// A clippable, translatable drawing surface handed to expose hooks.
pub struct RenderBuffer {
  size: Rect,
  clip: Rect,
  translate: (i32, i32),
  pen: Option<Pen>,
  stack: Vec<SavedState>,
  /// Rectangles (in buffer-absolute coordinates) that handlers should treat
  /// as already painted by someone else and skip re-touching.
  masked: Vec<Rect>,
}

impl RenderBuffer {
  pub fn new(lines: i32, cols: i32) -> Self {
    let full = Rect::new(0, 0, lines, cols);
    RenderBuffer {
      size: full,
      clip: full,
      translate: (0, 0),
      pen: None,
      stack: Vec::new(),
      masked: Vec::new(),
    }
  }

  pub fn size(&self) -> Rect {
    self.size
  }

  /// The current clip rectangle, in buffer-absolute coordinates.
  pub fn clip_rect(&self) -> Rect {
    self.clip
  }

  pub fn current_pen(&self) -> Option<&Pen> {
    self.pen.as_ref()
  }

  pub fn setpen(&mut self, pen: Pen) {
    self.pen = Some(pen);
  }

  /// Pushes the current clip/translate/pen state so it can be restored with
  /// [`RenderBuffer::restore`]. Mirrors the reference implementation's
  /// save/restore pair, used to scope a window's drawing to its own
  /// sub-region before recursing into children.
  pub fn save(&mut self) {
    self.stack.push(SavedState {
      clip: self.clip,
      translate: self.translate,
      pen: self.pen.clone(),
    });
  }

  /// Pops back to the state at the matching [`RenderBuffer::save`]. A
  /// restore with no matching save is a no-op rather than a panic, since an
  /// expose handler misbehaving shouldn't be able to corrupt its siblings'
  /// view of the buffer.
  pub fn restore(&mut self) {
    if let Some(state) = self.stack.pop() {
      self.clip = state.clip;
      self.translate = state.translate;
      self.pen = state.pen;
    }
  }

  /// Intersects the current clip with `rect` (given in the buffer's current
  /// coordinate space, i.e. already translated). Further drawing and
  /// further nested clips cannot escape the narrower region.
  pub fn clip(&mut self, rect: Rect) {
    let absolute = rect.translated(self.translate.0, self.translate.1);
    self.clip = match self.clip.intersect(&absolute) {
      Some(r) => r,
      None => Rect::zero(),
    };
  }

  /// Shifts the origin used by future [`RenderBuffer::clip`] calls and by
  /// callers translating their own coordinates, without touching the
  /// already-absolute current clip rectangle.
  pub fn translate(&mut self, down: i32, right: i32) {
    self.translate = (self.translate.0 + down, self.translate.1 + right);
  }

  /// Marks `rect` (buffer-absolute) as externally painted, so a later
  /// exposure pass over an overlapping region can skip it.
  pub fn mask(&mut self, rect: Rect) {
    self.masked.push(rect);
  }

  pub fn is_masked(&self, pos: (i32, i32)) -> bool {
    self
      .masked
      .iter()
      .any(|r| r.contains_pos(pos.0, pos.1))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn save_restore_round_trips_clip() {
    let mut rb = RenderBuffer::new(24, 80);
    let original = rb.clip_rect();
    rb.save();
    rb.clip(Rect::new(2, 2, 4, 4));
    assert_ne!(rb.clip_rect(), original);
    rb.restore();
    assert_eq!(rb.clip_rect(), original);
  }

  #[test]
  fn restore_without_save_is_noop() {
    let mut rb = RenderBuffer::new(24, 80);
    let before = rb.clip_rect();
    rb.restore();
    assert_eq!(rb.clip_rect(), before);
  }

  #[test]
  fn clip_outside_current_region_becomes_empty() {
    let mut rb = RenderBuffer::new(24, 80);
    rb.clip(Rect::new(0, 0, 5, 5));
    rb.clip(Rect::new(10, 10, 5, 5));
    assert!(rb.clip_rect().is_empty());
  }

  #[test]
  fn mask_marks_region_as_painted() {
    let mut rb = RenderBuffer::new(24, 80);
    rb.mask(Rect::new(0, 0, 3, 3));
    assert!(rb.is_masked((1, 1)));
    assert!(!rb.is_masked((5, 5)));
  }
}
