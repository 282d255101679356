//! Rectangle primitives and rectangle-set algebra.
//!
//! The windowing core treats these as mathematical utilities: plain value
//! types with no behaviour tied to windows, terminals or rendering. They are
//! built on [`geo::Rect`] the same way the rest of this crate's coordinate
//! system is, so a caller embedding this crate alongside other `geo`-based
//! geometry gets a compatible representation for free.

use geo::Rect as GeoRect;
use smallvec::SmallVec;
use std::cmp;

/// A window-local or root-local rectangle, in `(top, left, lines, cols)`
/// terms rather than `geo`'s native min/max corners -- this is the
/// vocabulary the rest of the windowing protocol (and the terminal it talks
/// to) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
  pub top: i32,
  pub left: i32,
  pub lines: i32,
  pub cols: i32,
}

impl Rect {
  pub fn new(top: i32, left: i32, lines: i32, cols: i32) -> Self {
    Rect { top, left, lines, cols }
  }

  pub fn zero() -> Self {
    Rect::new(0, 0, 0, 0)
  }

  pub fn bottom(&self) -> i32 {
    self.top + self.lines
  }

  pub fn right(&self) -> i32 {
    self.left + self.cols
  }

  pub fn is_empty(&self) -> bool {
    self.lines <= 0 || self.cols <= 0
  }

  pub fn contains_pos(&self, line: i32, col: i32) -> bool {
    line >= self.top && line < self.bottom() && col >= self.left && col < self.right()
  }

  /// Whether `other` lies entirely within `self`.
  pub fn contains_rect(&self, other: &Rect) -> bool {
    other.top >= self.top
      && other.left >= self.left
      && other.bottom() <= self.bottom()
      && other.right() <= self.right()
  }

  pub fn translated(&self, dy: i32, dx: i32) -> Rect {
    Rect::new(self.top + dy, self.left + dx, self.lines, self.cols)
  }

  /// Intersection of two rectangles, or `None` if they don't overlap.
  pub fn intersect(&self, other: &Rect) -> Option<Rect> {
    let top = cmp::max(self.top, other.top);
    let left = cmp::max(self.left, other.left);
    let bottom = cmp::min(self.bottom(), other.bottom());
    let right = cmp::min(self.right(), other.right());
    if bottom <= top || right <= left {
      return None;
    }
    Some(Rect::new(top, left, bottom - top, right - left))
  }

  /// Splits `self` into the (up to 4) pieces that remain after removing the
  /// part that overlaps `other`. Returns an empty set if `other` covers all
  /// of `self`, or `[self]` unchanged if there's no overlap.
  pub fn subtract(&self, other: &Rect) -> SmallVec<[Rect; 4]> {
    let mut out = SmallVec::new();
    let overlap = match self.intersect(other) {
      Some(o) => o,
      None => {
        out.push(*self);
        return out;
      }
    };

    // Above the overlap.
    if overlap.top > self.top {
      out.push(Rect::new(self.top, self.left, overlap.top - self.top, self.cols));
    }
    // Below the overlap.
    if overlap.bottom() < self.bottom() {
      out.push(Rect::new(
        overlap.bottom(),
        self.left,
        self.bottom() - overlap.bottom(),
        self.cols,
      ));
    }
    // Left of the overlap, constrained to the overlap's rows.
    if overlap.left > self.left {
      out.push(Rect::new(overlap.top, self.left, overlap.lines, overlap.left - self.left));
    }
    // Right of the overlap, constrained to the overlap's rows.
    if overlap.right() < self.right() {
      out.push(Rect::new(
        overlap.top,
        overlap.right(),
        overlap.lines,
        self.right() - overlap.right(),
      ));
    }
    out
  }

  /// Round-trip through [`geo::Rect`], for interop with `geo`-based geometry
  /// elsewhere in a caller's application.
  pub fn to_geo(self) -> GeoRect<i32> {
    GeoRect::new(
      geo::coord! {x: self.left, y: self.top},
      geo::coord! {x: self.right(), y: self.bottom()},
    )
  }

  pub fn from_geo(r: GeoRect<i32>) -> Self {
    let min = r.min();
    let max = r.max();
    Rect::new(min.y, min.x, max.y - min.y, max.x - min.x)
  }
}

/// A set of non-overlapping rectangles, maintained as a union. Used to
/// accumulate damage in root-local coordinates.
#[derive(Debug, Clone, Default)]
pub struct RectSet {
  rects: Vec<Rect>,
}

impl RectSet {
  pub fn new() -> Self {
    RectSet { rects: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.rects.is_empty()
  }

  pub fn clear(&mut self) {
    self.rects.clear();
  }

  pub fn rects(&self) -> &[Rect] {
    &self.rects
  }

  pub fn take_rects(&mut self) -> Vec<Rect> {
    std::mem::take(&mut self.rects)
  }

  /// Whether the set, as a union, already covers `rect` entirely.
  pub fn contains(&self, rect: &Rect) -> bool {
    self.rects.iter().any(|r| r.contains_rect(rect))
  }

  /// Adds `rect` to the set. Rectangles already covering it are left alone;
  /// this does not attempt full union simplification, matching the
  /// reference implementation's append-and-coalesce-on-`contains` approach.
  pub fn add(&mut self, rect: Rect) {
    if rect.is_empty() || self.contains(&rect) {
      return;
    }
    self.rects.retain(|r| !rect.contains_rect(r));
    self.rects.push(rect);
  }

  /// Removes the portion of every stored rectangle that overlaps `rect`.
  pub fn subtract(&mut self, rect: &Rect) {
    let mut next = Vec::with_capacity(self.rects.len());
    for r in self.rects.drain(..) {
      next.extend(r.subtract(rect));
    }
    self.rects = next;
  }

  pub fn translate(&mut self, dy: i32, dx: i32) {
    for r in self.rects.iter_mut() {
      *r = r.translated(dy, dx);
    }
  }
}

impl FromIterator<Rect> for RectSet {
  fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
    let mut set = RectSet::new();
    for r in iter {
      set.add(r);
    }
    set
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn geometry1() {
    let r = Rect::new(3, 10, 4, 20);
    assert_eq!(r.bottom(), 7);
    assert_eq!(r.right(), 30);
  }

  #[test]
  fn intersect1() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(5, 5, 10, 10);
    let i = a.intersect(&b).unwrap();
    assert_eq!(i, Rect::new(5, 5, 5, 5));
  }

  #[test]
  fn intersect_none() {
    let a = Rect::new(0, 0, 5, 5);
    let b = Rect::new(10, 10, 5, 5);
    assert!(a.intersect(&b).is_none());
  }

  #[test]
  fn subtract_full_overlap() {
    let a = Rect::new(0, 0, 10, 10);
    let pieces = a.subtract(&a);
    assert!(pieces.is_empty());
  }

  #[test]
  fn subtract_disjoint() {
    let a = Rect::new(0, 0, 5, 5);
    let b = Rect::new(10, 10, 5, 5);
    let pieces = a.subtract(&b);
    assert_eq!(pieces.as_slice(), &[a]);
  }

  #[test]
  fn subtract_middle_strip() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(3, 3, 4, 4);
    let pieces = a.subtract(&b);
    // top, bottom, left, right strips
    assert_eq!(pieces.len(), 4);
    let total: i32 = pieces.iter().map(|r| r.lines * r.cols).sum();
    assert_eq!(total, 10 * 10 - 4 * 4);
  }

  #[test]
  fn rectset_idempotent_add() {
    let mut set = RectSet::new();
    let r = Rect::new(0, 0, 25, 80);
    set.add(r);
    assert!(set.contains(&r));
    set.add(r);
    assert_eq!(set.rects().len(), 1);
  }

  #[test]
  fn rectset_add_drops_subsumed() {
    let mut set = RectSet::new();
    set.add(Rect::new(0, 0, 2, 2));
    set.add(Rect::new(0, 0, 10, 10));
    assert_eq!(set.rects().len(), 1);
  }

  #[test]
  fn rectset_subtract_splits() {
    let mut set = RectSet::new();
    set.add(Rect::new(0, 0, 10, 10));
    set.subtract(&Rect::new(3, 3, 2, 2));
    assert_eq!(set.rects().len(), 4);
  }

  #[test]
  fn rectset_translate() {
    let mut set = RectSet::new();
    set.add(Rect::new(0, 0, 2, 2));
    set.translate(3, 4);
    assert_eq!(set.rects()[0], Rect::new(3, 4, 2, 2));
  }
}
