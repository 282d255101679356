//! The window node: a rectangular region in the tree, its geometry, pen,
//! cursor state and hook list.

use crate::hook::HookList;
use crate::pen::Pen;
use crate::rect::Rect;
use crate::term::CursorShape;
use std::sync::atomic::{AtomicI32, Ordering};

/// Opaque handle to a window. Windows live in a [`crate::root::Root`]'s
/// arena; this id is how callers and the tree itself refer to them instead
/// of holding a pointer or reference, which sidesteps the aliasing that a
/// parent/child/sibling-linked tree of owned pointers would otherwise
/// require `unsafe` for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(i32);

impl WindowId {
  /// Constructs a handle from a raw id. Only meaningful for ids actually
  /// returned by a [`crate::root::Root`]; exposed for tests that need a
  /// throwaway value to pass as an event's nominal "owner".
  pub fn from_raw(id: i32) -> Self {
    WindowId(id)
  }
}

/// Next unique window id.
pub(crate) fn next_window_id() -> WindowId {
  static VALUE: AtomicI32 = AtomicI32::new(1);
  WindowId(VALUE.fetch_add(1, Ordering::Relaxed))
}

bitflags::bitflags! {
  /// Flags passed to [`crate::root::Root::new_window`].
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct WindowFlags: u32 {
    /// Reinterpret `rect` in root coordinates and reparent to the root,
    /// rather than the window passed as `parent`.
    const ROOT_PARENT  = 1 << 0;
    const HIDDEN        = 1 << 1;
    /// Insert at the tail of the parent's child list instead of the head.
    const LOWEST        = 1 << 2;
    const STEAL_INPUT   = 1 << 3;
  }
}

/// Logical cursor location and appearance, in window-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
  pub line: i32,
  pub col: i32,
  pub shape: CursorShape,
  pub visible: bool,
}

impl Default for Cursor {
  fn default() -> Self {
    Cursor {
      line: 0,
      col: 0,
      shape: CursorShape::DefaultUserShape,
      visible: true,
    }
  }
}

/// A node in the window tree. `first_child`/`next` form the child list (no
/// `previous` link, matching the singly-linked shape the reference
/// implementation uses); `parent` is the list's inverse.
pub(crate) struct WindowNode {
  pub parent: Option<WindowId>,
  pub first_child: Option<WindowId>,
  pub next: Option<WindowId>,
  pub focused_child: Option<WindowId>,
  pub pen: Option<Pen>,
  pub rect: Rect,
  pub cursor: Cursor,
  pub is_visible: bool,
  pub is_focused: bool,
  pub steal_input: bool,
  pub focus_child_notify: bool,
  pub hooks: HookList,
}

impl WindowNode {
  pub fn new(parent: Option<WindowId>, rect: Rect) -> Self {
    WindowNode {
      parent,
      first_child: None,
      next: None,
      focused_child: None,
      pen: None,
      rect,
      cursor: Cursor::default(),
      is_visible: true,
      is_focused: false,
      steal_input: false,
      focus_child_notify: false,
      hooks: HookList::new(),
    }
  }
}
