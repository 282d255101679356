//! The root window: owns the tree arena, the terminal, damage tracking,
//! deferred hierarchy changes and input routing.
//!
//! Every other window in a tree is reached only through a [`Root`]. Unlike
//! the reference implementation, where any window and the one true root
//! share a struct (`TickitWindow` embeds as the first field of
//! `TickitRootWindow`), root-only state here -- the terminal, damage set,
//! deferred hierarchy queue, drag tracking -- lives directly on `Root`
//! rather than being reachable by walking up from an arbitrary window and
//! reinterpreting it. `WindowId`s still form a tree purely through
//! `parent`/`first_child`/`next` links stored in the arena.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::err::{CoreError, CoreResult};
use crate::event::{
  Event, EventMask, FocusDirection, FocusInfo, GeomChangeInfo, KeyEventInfo, MouseEventInfo,
  MouseEventType,
};
use crate::hook::{BindFlags, HookId};
use crate::pen::Pen;
use crate::prelude::HashMap;
use crate::rect::{Rect, RectSet};
use crate::render_buffer::RenderBuffer;
use crate::term::{CursorShape, EventId, Terminal, TermEventMask};
use crate::window::{next_window_id, Cursor, WindowFlags, WindowId, WindowNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HierarchyChangeKind {
  InsertFirst,
  InsertLast,
  Remove,
  Raise,
  RaiseFront,
  Lower,
  LowerBack,
}

struct HierarchyChange {
  kind: HierarchyChangeKind,
  parent: WindowId,
  win: WindowId,
}

/// The windowing core's entry point: an arena of [`WindowNode`]s rooted at
/// one window that owns the terminal.
pub struct Root<T: Terminal> {
  term: T,
  nodes: HashMap<WindowId, WindowNode>,
  root_id: WindowId,

  damage: RectSet,
  hierarchy_changes: VecDeque<HierarchyChange>,
  needs_expose: bool,
  needs_restore: bool,
  needs_later_processing: bool,

  event_id: Option<EventId>,

  mouse_dragging: bool,
  mouse_last_button: Option<u8>,
  mouse_last_pos: Option<(i32, i32)>,
  drag_source_window: Option<WindowId>,
}

impl<T: Terminal> Root<T> {
  /// Builds a root window sized to the terminal's current dimensions and
  /// subscribes to its resize/key/mouse events. Mirrors
  /// `tickit_window_new_root`'s `Option`-on-exhaustion signature, though in
  /// practice the arena allocation this performs doesn't fail the way the
  /// original's `malloc` could.
  pub fn new_root(mut term: T) -> Option<Self> {
    let (lines, cols) = term.get_size();
    let root_id = next_window_id();

    let mut nodes = HashMap::default();
    nodes.insert(root_id, WindowNode::new(None, Rect::new(0, 0, lines, cols)));

    let event_id = term.bind_event(TermEventMask::RESIZE | TermEventMask::KEY | TermEventMask::MOUSE);

    let mut root = Root {
      term,
      nodes,
      root_id,
      damage: RectSet::new(),
      hierarchy_changes: VecDeque::new(),
      needs_expose: false,
      needs_restore: false,
      needs_later_processing: false,
      event_id: Some(event_id),
      mouse_dragging: false,
      mouse_last_button: None,
      mouse_last_pos: None,
      drag_source_window: None,
    };

    root.expose(root_id, None);
    Some(root)
  }

  pub fn root_id(&self) -> WindowId {
    self.root_id
  }

  pub fn terminal(&self) -> &T {
    &self.term
  }

  pub fn terminal_mut(&mut self) -> &mut T {
    &mut self.term
  }

  /// Creates a child window under `parent`. If `flags` includes
  /// [`WindowFlags::ROOT_PARENT`], `rect` is reinterpreted in root
  /// coordinates and the window is reparented all the way up to the root
  /// before insertion.
  pub fn new_window(&mut self, parent: WindowId, rect: Rect, flags: WindowFlags) -> CoreResult<WindowId> {
    if !self.nodes.contains_key(&parent) {
      trace!("new_window referenced unknown parent {:?}", parent);
      return Err(CoreError::UnknownWindow(parent));
    }

    let mut rect = rect;
    let mut parent = parent;
    if flags.contains(WindowFlags::ROOT_PARENT) {
      loop {
        let (prect, grandparent) = match self.nodes.get(&parent) {
          Some(n) => (n.rect, n.parent),
          None => break,
        };
        match grandparent {
          Some(gp) => {
            rect = rect.translated(prect.top, prect.left);
            parent = gp;
          }
          None => break,
        }
      }
    }

    let id = next_window_id();
    let mut node = WindowNode::new(Some(parent), rect);
    if flags.contains(WindowFlags::HIDDEN) {
      node.is_visible = false;
    }
    if flags.contains(WindowFlags::STEAL_INPUT) {
      node.steal_input = true;
    }
    self.nodes.insert(id, node);

    let kind = if flags.contains(WindowFlags::LOWEST) {
      HierarchyChangeKind::InsertLast
    } else {
      HierarchyChangeKind::InsertFirst
    };
    self.do_hierarchy_change(kind, parent, id);

    Ok(id)
  }

  /// Tears down `win` and its whole subtree: fires destroy notifications
  /// depth-first, unlinks from the parent, and (for the root) releases the
  /// terminal subscription.
  pub fn destroy(&mut self, win: WindowId) {
    let (first_child, parent) = match self.nodes.get(&win) {
      Some(n) => (n.first_child, n.parent),
      None => return,
    };

    if self.is_focused(win) {
      debug!("Destroying focused window {:?}", win);
    }

    if let Some(node) = self.nodes.get_mut(&win) {
      node.hooks.unbind_and_destroy(win);
    }

    let mut child = first_child;
    while let Some(c) = child {
      let next = self.nodes.get(&c).and_then(|n| n.next);
      self.destroy(c);
      child = next;
    }

    self.purge_hierarchy_changes(win);

    if let Some(p) = parent {
      self.do_hierarchy_change(HierarchyChangeKind::Remove, p, win);
    } else {
      self.damage.clear();
      if let Some(id) = self.event_id.take() {
        self.term.unbind_event_id(id);
      }
    }

    self.nodes.remove(&win);
  }

  // Z-order {

  /// Requests `win` be moved one step toward the front of its parent's
  /// child list. A no-op on the root, and applied only at the next
  /// [`Root::flush`].
  pub fn raise(&mut self, win: WindowId) {
    self.request_hierarchy_change(HierarchyChangeKind::Raise, win);
  }

  pub fn raise_to_front(&mut self, win: WindowId) {
    self.request_hierarchy_change(HierarchyChangeKind::RaiseFront, win);
  }

  pub fn lower(&mut self, win: WindowId) {
    self.request_hierarchy_change(HierarchyChangeKind::Lower, win);
  }

  pub fn lower_to_back(&mut self, win: WindowId) {
    self.request_hierarchy_change(HierarchyChangeKind::LowerBack, win);
  }

  fn request_hierarchy_change(&mut self, kind: HierarchyChangeKind, win: WindowId) {
    let parent = match self.nodes.get(&win).and_then(|n| n.parent) {
      Some(p) => p,
      None => return,
    };
    self.hierarchy_changes.push_back(HierarchyChange { kind, parent, win });
    self.needs_later_processing = true;
  }

  fn purge_hierarchy_changes(&mut self, win: WindowId) {
    self.hierarchy_changes.retain(|c| c.parent != win && c.win != win);
  }

  fn do_hierarchy_change(&mut self, kind: HierarchyChangeKind, parent: WindowId, win: WindowId) {
    match kind {
      HierarchyChangeKind::InsertFirst => self.hierarchy_insert_first(parent, win),
      HierarchyChangeKind::InsertLast => self.hierarchy_insert_last(parent, win),
      HierarchyChangeKind::Remove => {
        self.hierarchy_remove(parent, win);
        if let Some(p) = self.nodes.get_mut(&parent) {
          if p.focused_child == Some(win) {
            p.focused_child = None;
          }
        }
      }
      HierarchyChangeKind::Raise => self.hierarchy_raise(parent, win),
      HierarchyChangeKind::RaiseFront => {
        self.hierarchy_remove(parent, win);
        self.hierarchy_insert_first(parent, win);
      }
      HierarchyChangeKind::Lower => self.hierarchy_lower(parent, win),
      HierarchyChangeKind::LowerBack => {
        self.hierarchy_remove(parent, win);
        self.hierarchy_insert_last(parent, win);
      }
    }

    if let Some(rect) = self.nodes.get(&win).map(|n| n.rect) {
      self.expose(parent, Some(rect));
    }
  }

  fn hierarchy_insert_first(&mut self, parent: WindowId, win: WindowId) {
    let old_first = self.nodes.get(&parent).and_then(|n| n.first_child);
    if let Some(node) = self.nodes.get_mut(&win) {
      node.next = old_first;
    }
    if let Some(p) = self.nodes.get_mut(&parent) {
      p.first_child = Some(win);
    }
  }

  fn hierarchy_insert_last(&mut self, parent: WindowId, win: WindowId) {
    let first = self.nodes.get(&parent).and_then(|n| n.first_child);
    match first {
      None => {
        if let Some(p) = self.nodes.get_mut(&parent) {
          p.first_child = Some(win);
        }
      }
      Some(mut last) => {
        while let Some(next) = self.nodes.get(&last).and_then(|n| n.next) {
          last = next;
        }
        if let Some(node) = self.nodes.get_mut(&last) {
          node.next = Some(win);
        }
      }
    }
    if let Some(node) = self.nodes.get_mut(&win) {
      node.next = None;
    }
  }

  /// Unlinks `win` from `parent`'s child list, wherever it is.
  fn hierarchy_remove(&mut self, parent: WindowId, win: WindowId) {
    let first = self.nodes.get(&parent).and_then(|n| n.first_child);
    if first == Some(win) {
      let next = self.nodes.get(&win).and_then(|n| n.next);
      if let Some(p) = self.nodes.get_mut(&parent) {
        p.first_child = next;
      }
    } else {
      let mut cur = first;
      while let Some(c) = cur {
        let next = self.nodes.get(&c).and_then(|n| n.next);
        if next == Some(win) {
          let win_next = self.nodes.get(&win).and_then(|n| n.next);
          if let Some(node) = self.nodes.get_mut(&c) {
            node.next = win_next;
          }
          break;
        }
        cur = next;
      }
    }
    if let Some(node) = self.nodes.get_mut(&win) {
      node.next = None;
    }
  }

  /// Swaps `win` with its immediate predecessor in the child list. If `win`
  /// is not actually a child of `parent` (can't happen through the public
  /// API, since `raise` only ever queues a change for a window whose parent
  /// it just read), this is a silent no-op rather than the dead
  /// `if(!prevp)` branch the reference implementation carries.
  fn hierarchy_raise(&mut self, parent: WindowId, win: WindowId) {
    let first = self.nodes.get(&parent).and_then(|n| n.first_child);
    if first == Some(win) {
      return;
    }

    let mut holder: Option<WindowId> = None;
    let mut cur = first;
    let prev = loop {
      let c = match cur {
        Some(c) => c,
        None => {
          warn!("Hierarchy change referenced {:?} which is not a child of {:?}", win, parent);
          return;
        }
      };
      let next = self.nodes.get(&c).and_then(|n| n.next);
      if next == Some(win) {
        break c;
      }
      holder = Some(c);
      cur = next;
    };

    let after = self.nodes.get(&win).and_then(|n| n.next);
    if let Some(node) = self.nodes.get_mut(&win) {
      node.next = Some(prev);
    }
    if let Some(node) = self.nodes.get_mut(&prev) {
      node.next = after;
    }
    match holder {
      Some(h) => {
        if let Some(node) = self.nodes.get_mut(&h) {
          node.next = Some(win);
        }
      }
      None => {
        if let Some(p) = self.nodes.get_mut(&parent) {
          p.first_child = Some(win);
        }
      }
    }
  }

  /// Swaps `win` with its immediate successor in the child list.
  fn hierarchy_lower(&mut self, parent: WindowId, win: WindowId) {
    let first = self.nodes.get(&parent).and_then(|n| n.first_child);
    let holder = if first == Some(win) {
      None
    } else {
      let mut cur = first;
      let mut found = None;
      while let Some(c) = cur {
        let next = self.nodes.get(&c).and_then(|n| n.next);
        if next == Some(win) {
          found = Some(c);
          break;
        }
        cur = next;
      }
      match found {
        Some(h) => Some(h),
        None => {
          warn!("Hierarchy change referenced {:?} which is not a child of {:?}", win, parent);
          return;
        }
      }
    };

    let after = match self.nodes.get(&win).and_then(|n| n.next) {
      Some(a) => a,
      None => return,
    };

    let after_next = self.nodes.get(&after).and_then(|n| n.next);
    if let Some(node) = self.nodes.get_mut(&win) {
      node.next = after_next;
    }
    if let Some(node) = self.nodes.get_mut(&after) {
      node.next = Some(win);
    }
    match holder {
      Some(h) => {
        if let Some(node) = self.nodes.get_mut(&h) {
          node.next = Some(after);
        }
      }
      None => {
        if let Some(p) = self.nodes.get_mut(&parent) {
          p.first_child = Some(after);
        }
      }
    }
  }

  // Z-order }

  // Visibility {

  pub fn show(&mut self, win: WindowId) {
    let parent = match self.nodes.get(&win) {
      Some(n) => n.parent,
      None => return,
    };
    if let Some(node) = self.nodes.get_mut(&win) {
      node.is_visible = true;
    }
    if let Some(p) = parent {
      let p_has_focused_child = self.nodes.get(&p).map(|n| n.focused_child.is_some()).unwrap_or(false);
      let win_carries_focus = self
        .nodes
        .get(&win)
        .map(|n| n.focused_child.is_some() || n.is_focused)
        .unwrap_or(false);
      if !p_has_focused_child && win_carries_focus {
        if let Some(pn) = self.nodes.get_mut(&p) {
          pn.focused_child = Some(win);
        }
      }
    }
    self.expose(win, None);
  }

  pub fn hide(&mut self, win: WindowId) {
    let parent = match self.nodes.get(&win) {
      Some(n) => n.parent,
      None => return,
    };
    if let Some(node) = self.nodes.get_mut(&win) {
      node.is_visible = false;
    }
    if let Some(p) = parent {
      let was_focused_child = self.nodes.get(&p).map(|n| n.focused_child == Some(win)).unwrap_or(false);
      if was_focused_child {
        if let Some(pn) = self.nodes.get_mut(&p) {
          pn.focused_child = None;
        }
      }
      if let Some(rect) = self.nodes.get(&win).map(|n| n.rect) {
        self.expose(p, Some(rect));
      }
    }
  }

  pub fn is_visible(&self, win: WindowId) -> bool {
    self.nodes.get(&win).map(|n| n.is_visible).unwrap_or(false)
  }

  // Visibility }

  // Geometry {

  pub fn get_geometry(&self, win: WindowId) -> Rect {
    self.nodes.get(&win).map(|n| n.rect).unwrap_or_else(Rect::zero)
  }

  pub fn get_abs_geometry(&self, win: WindowId) -> Rect {
    let mut geom = match self.nodes.get(&win) {
      Some(n) => n.rect,
      None => return Rect::zero(),
    };
    let mut cur = self.nodes.get(&win).and_then(|n| n.parent);
    while let Some(p) = cur {
      let prect = match self.nodes.get(&p) {
        Some(n) => n.rect,
        None => break,
      };
      geom = geom.translated(prect.top, prect.left);
      cur = self.nodes.get(&p).and_then(|n| n.parent);
    }
    geom
  }

  pub fn bottom(&self, win: WindowId) -> i32 {
    self.get_geometry(win).bottom()
  }

  pub fn right(&self, win: WindowId) -> i32 {
    self.get_geometry(win).right()
  }

  pub fn resize(&mut self, win: WindowId, lines: i32, cols: i32) {
    let r = self.get_geometry(win);
    self.set_geometry(win, Rect::new(r.top, r.left, lines, cols));
  }

  pub fn reposition(&mut self, win: WindowId, top: i32, left: i32) {
    let r = self.get_geometry(win);
    self.set_geometry(win, Rect::new(top, left, r.lines, r.cols));
    if self.is_focused(win) {
      self.request_restore();
    }
  }

  pub fn set_geometry(&mut self, win: WindowId, geom: Rect) {
    let old = match self.nodes.get(&win) {
      Some(n) => n.rect,
      None => return,
    };
    if old == geom {
      return;
    }
    if let Some(node) = self.nodes.get_mut(&win) {
      node.rect = geom;
    }
    let event = Event::GeomChange(GeomChangeInfo { rect: geom, oldrect: old });
    if let Some(node) = self.nodes.get_mut(&win) {
      node.hooks.run_event(win, &event);
    }
  }

  // Geometry }

  // Pen {

  pub fn get_pen(&self, win: WindowId) -> CoreResult<Option<Pen>> {
    self
      .nodes
      .get(&win)
      .map(|n| n.pen.clone())
      .ok_or(CoreError::UnknownWindow(win))
  }

  pub fn set_pen(&mut self, win: WindowId, pen: Option<Pen>) -> CoreResult<()> {
    let node = self.nodes.get_mut(&win).ok_or(CoreError::UnknownWindow(win))?;
    node.pen = pen;
    Ok(())
  }

  // Pen }

  // Exposure / rendering {

  /// Marks `rect` (window-local, or the whole window if `None`) as needing
  /// repaint. Exposure bubbles up through ancestors in their own
  /// coordinates until it reaches the root, where it accumulates into the
  /// damage set that the next [`Root::flush`] will repaint.
  pub fn expose(&mut self, win: WindowId, rect: Option<Rect>) {
    let (lines, cols, is_visible, parent, top, left) = match self.nodes.get(&win) {
      Some(n) => (n.rect.lines, n.rect.cols, n.is_visible, n.parent, n.rect.top, n.rect.left),
      None => return,
    };

    let selfrect = Rect::new(0, 0, lines, cols);
    let damaged = match rect {
      Some(r) => match selfrect.intersect(&r) {
        Some(d) => d,
        None => return,
      },
      None => selfrect,
    };

    if !is_visible {
      return;
    }

    if let Some(p) = parent {
      self.expose(p, Some(damaged.translated(top, left)));
      return;
    }

    if self.damage.contains(&damaged) {
      return;
    }
    self.damage.add(damaged);
    self.needs_expose = true;
    self.needs_later_processing = true;
  }

  fn do_expose(&mut self, win: WindowId, rect: Rect, rb: &mut RenderBuffer) {
    let pen = self.nodes.get(&win).and_then(|n| n.pen.clone());
    if let Some(pen) = pen {
      rb.setpen(pen);
    }

    let mut child = self.nodes.get(&win).and_then(|n| n.first_child);
    while let Some(c) = child {
      let (c_rect, c_visible, c_next) = match self.nodes.get(&c) {
        Some(n) => (n.rect, n.is_visible, n.next),
        None => break,
      };

      if c_visible {
        if let Some(exposed) = rect.intersect(&c_rect) {
          rb.save();
          rb.clip(exposed);
          rb.translate(c_rect.top, c_rect.left);
          let child_local = exposed.translated(-c_rect.top, -c_rect.left);
          self.do_expose(c, child_local, rb);
          rb.restore();
        }
        rb.mask(c_rect);
      }

      child = c_next;
    }

    let event = Event::Expose { rect, rb };
    if let Some(node) = self.nodes.get_mut(&win) {
      node.hooks.run_event(win, &event);
    }
  }

  fn cell_visible(&self, win: WindowId, line: i32, col: i32) -> bool {
    let mut prev: Option<WindowId> = None;
    let mut cur = Some(win);
    let mut line = line;
    let mut col = col;

    while let Some(w) = cur {
      let node = match self.nodes.get(&w) {
        Some(n) => n,
        None => return false,
      };
      if line < 0 || line >= node.rect.lines || col < 0 || col >= node.rect.cols {
        return false;
      }

      let mut child = node.first_child;
      while let Some(c) = child {
        if prev == Some(c) {
          break;
        }
        let cnode = match self.nodes.get(&c) {
          Some(n) => n,
          None => break,
        };
        if cnode.is_visible
          && line >= cnode.rect.top
          && line < cnode.rect.top + cnode.rect.lines
          && col >= cnode.rect.left
          && col < cnode.rect.left + cnode.rect.cols
        {
          return false;
        }
        child = cnode.next;
      }

      line += node.rect.top;
      col += node.rect.left;
      prev = Some(w);
      cur = node.parent;
    }

    true
  }

  fn do_restore(&mut self) {
    let mut win = self.root_id;
    loop {
      let (is_visible, focused_child) = match self.nodes.get(&win) {
        Some(n) => (n.is_visible, n.focused_child),
        None => break,
      };
      if !is_visible {
        break;
      }
      match focused_child {
        Some(fc) => win = fc,
        None => break,
      }
    }

    let (is_focused, cursor) = match self.nodes.get(&win) {
      Some(n) => (n.is_focused, n.cursor),
      None => (false, Cursor::default()),
    };

    let show = is_focused && cursor.visible && self.cell_visible(win, cursor.line, cursor.col);

    if show {
      let abs = self.get_abs_geometry(win);
      self.term.set_cursor_visible(true);
      self.term.goto(cursor.line + abs.top, cursor.col + abs.left);
      self.term.set_cursor_shape(cursor.shape);
    } else {
      self.term.set_cursor_visible(false);
    }

    self.term.flush();
  }

  fn request_restore(&mut self) {
    self.needs_restore = true;
    self.needs_later_processing = true;
  }

  /// Applies deferred hierarchy changes, repaints accumulated damage, and
  /// restores the cursor, in that order -- exactly once per call, and only
  /// if something is actually pending. The owning application is expected
  /// to call this once per tick of its own event loop.
  pub fn flush(&mut self) {
    if !self.needs_later_processing {
      return;
    }
    self.needs_later_processing = false;

    while let Some(change) = self.hierarchy_changes.pop_front() {
      self.do_hierarchy_change(change.kind, change.parent, change.win);
    }

    if self.needs_expose {
      self.needs_expose = false;

      let root_rect = self.get_geometry(self.root_id);
      let mut rb = RenderBuffer::new(root_rect.lines, root_rect.cols);

      for rect in self.damage.take_rects() {
        rb.save();
        rb.clip(rect);
        self.do_expose(self.root_id, rect, &mut rb);
        rb.restore();
      }

      self.term.flush_to_term(&rb);

      self.needs_restore = true;
    }

    if self.needs_restore {
      self.needs_restore = false;
      self.do_restore();
    }
  }

  // Exposure / rendering }

  // Scrolling {

  pub fn scroll(&mut self, win: WindowId, downward: i32, rightward: i32) -> bool {
    let full = self.get_geometry(win);
    self.scroll_impl(win, Rect::new(0, 0, full.lines, full.cols), downward, rightward, None, true)
  }

  pub fn scroll_with_children(&mut self, win: WindowId, downward: i32, rightward: i32) -> bool {
    let full = self.get_geometry(win);
    self.scroll_impl(win, Rect::new(0, 0, full.lines, full.cols), downward, rightward, None, false)
  }

  pub fn scrollrect(&mut self, win: WindowId, rect: Rect, downward: i32, rightward: i32, pen: Option<&Pen>) -> bool {
    self.scroll_impl(win, rect, downward, rightward, pen, true)
  }

  fn scroll_impl(
    &mut self,
    win: WindowId,
    origrect: Rect,
    downward: i32,
    rightward: i32,
    pen: Option<&Pen>,
    mask_children: bool,
  ) -> bool {
    let win_rect = match self.nodes.get(&win) {
      Some(n) => n.rect,
      None => return false,
    };
    let selfrect = Rect::new(0, 0, win_rect.lines, win_rect.cols);
    let rect = match selfrect.intersect(&origrect) {
      Some(r) => r,
      None => return false,
    };

    let scroll_pen = match pen {
      Some(p) => p.clone(),
      None => Pen::new(),
    };

    let mut visible = RectSet::new();
    visible.add(rect);

    if mask_children {
      let mut child = self.nodes.get(&win).and_then(|n| n.first_child);
      while let Some(c) = child {
        let (c_rect, c_visible, c_next) = match self.nodes.get(&c) {
          Some(n) => (n.rect, n.is_visible, n.next),
          None => break,
        };
        if c_visible {
          visible.subtract(&c_rect);
        }
        child = c_next;
      }
    }

    self.scrollrectset(win, visible, downward, rightward, &scroll_pen)
  }

  /// Walks from `win` up to the root, accumulating the absolute offset and
  /// subtracting occluding siblings from `visible` at each level, then asks
  /// the terminal to scroll whatever's left -- falling back to a plain
  /// re-expose for any piece it can't.
  fn scrollrectset(&mut self, origwin: WindowId, mut visible: RectSet, downward: i32, rightward: i32, pen: &Pen) -> bool {
    let mut win = origwin;
    let mut abs_top = 0;
    let mut abs_left = 0;

    loop {
      let (is_visible, own_pen, parent, rect) = match self.nodes.get(&win) {
        Some(n) => (n.is_visible, n.pen.clone(), n.parent, n.rect),
        None => return false,
      };
      if !is_visible {
        return false;
      }
      if let Some(p) = &own_pen {
        pen.copy_from(p, false);
      }

      let parent = match parent {
        Some(p) => p,
        None => break,
      };

      abs_top += rect.top;
      abs_left += rect.left;
      visible.translate(rect.top, rect.left);

      let mut sib = self.nodes.get(&parent).and_then(|n| n.first_child);
      while let Some(s) = sib {
        if s == win {
          break;
        }
        let (s_visible, s_rect, s_next) = match self.nodes.get(&s) {
          Some(n) => (n.is_visible, n.rect, n.next),
          None => break,
        };
        if s_visible {
          visible.subtract(&s_rect);
        }
        sib = s_next;
      }

      win = parent;
    }

    let rects = visible.take_rects();
    let mut ret = true;
    let mut done_pen = false;

    for rect in rects {
      let origrect = rect.translated(-abs_top, -abs_left);

      if downward.abs() >= rect.lines || rightward.abs() >= rect.cols {
        self.expose(origwin, Some(origrect));
        continue;
      }

      for r in self.damage.take_rects() {
        if r.bottom() < rect.top || r.top > rect.bottom() || r.right() < rect.left || r.left > rect.right() {
          self.damage.add(r);
          continue;
        }

        for outside in r.subtract(&rect) {
          self.damage.add(outside);
        }

        if let Some(inside) = r.intersect(&rect) {
          let shifted = inside.translated(-downward, -rightward);
          if let Some(clipped) = shifted.intersect(&rect) {
            self.damage.add(clipped);
          }
        }
      }

      if !done_pen {
        self.term.setpen(pen);
        done_pen = true;
      }

      if self.term.scrollrect(rect, downward, rightward) {
        if downward > 0 {
          self.expose(
            origwin,
            Some(Rect::new(origrect.top + origrect.lines - downward, origrect.left, downward, rect.cols)),
          );
        } else if downward < 0 {
          self.expose(origwin, Some(Rect::new(origrect.top, origrect.left, -downward, rect.cols)));
        }

        if rightward > 0 {
          self.expose(
            origwin,
            Some(Rect::new(origrect.top, origrect.left + origrect.cols - rightward, rect.lines, rightward)),
          );
        } else if rightward < 0 {
          self.expose(origwin, Some(Rect::new(origrect.top, origrect.left, rect.lines, -rightward)));
        }
      } else {
        warn!("Terminal refused scrollrect {:?} (downward={}, rightward={}), falling back to expose", rect, downward, rightward);
        self.expose(origwin, Some(origrect));
        ret = false;
      }
    }

    ret
  }

  // Scrolling }

  // Cursor {

  pub fn set_cursor_position(&mut self, win: WindowId, line: i32, col: i32) {
    if let Some(node) = self.nodes.get_mut(&win) {
      node.cursor.line = line;
      node.cursor.col = col;
    }
    if self.is_focused(win) {
      self.request_restore();
    }
  }

  pub fn set_cursor_visible(&mut self, win: WindowId, visible: bool) {
    if let Some(node) = self.nodes.get_mut(&win) {
      node.cursor.visible = visible;
    }
    if self.is_focused(win) {
      self.request_restore();
    }
  }

  pub fn set_cursor_shape(&mut self, win: WindowId, shape: CursorShape) {
    if let Some(node) = self.nodes.get_mut(&win) {
      node.cursor.shape = shape;
    }
    if self.is_focused(win) {
      self.request_restore();
    }
  }

  // Cursor }

  // Focus {

  /// Gives `win` keyboard focus, walking up the tree so every ancestor's
  /// `focused_child` points back down the path to it.
  pub fn take_focus(&mut self, win: WindowId) {
    self.focus_gained(win, None);
  }

  fn focus_gained(&mut self, win: WindowId, child: Option<WindowId>) {
    let (focused_child, parent, is_visible) = match self.nodes.get(&win) {
      Some(n) => (n.focused_child, n.parent, n.is_visible),
      None => return,
    };

    if let (Some(fc), Some(c)) = (focused_child, child) {
      if fc != c {
        self.focus_lost(fc);
      }
    }

    if let Some(p) = parent {
      if is_visible {
        self.focus_gained(p, Some(win));
      }
    } else {
      self.request_restore();
    }

    match child {
      None => {
        if let Some(node) = self.nodes.get_mut(&win) {
          node.is_focused = true;
        }
        let event = Event::Focus(FocusInfo { dir: FocusDirection::In, win });
        if let Some(node) = self.nodes.get_mut(&win) {
          node.hooks.run_event(win, &event);
        }
      }
      Some(c) => {
        let notify = self.nodes.get(&win).map(|n| n.focus_child_notify).unwrap_or(false);
        if notify {
          let event = Event::Focus(FocusInfo { dir: FocusDirection::In, win: c });
          if let Some(node) = self.nodes.get_mut(&win) {
            node.hooks.run_event(win, &event);
          }
        }
      }
    }

    if let Some(node) = self.nodes.get_mut(&win) {
      node.focused_child = child;
    }
  }

  fn focus_lost(&mut self, win: WindowId) {
    let focused_child = self.nodes.get(&win).and_then(|n| n.focused_child);
    if let Some(fc) = focused_child {
      self.focus_lost(fc);
      let notify = self.nodes.get(&win).map(|n| n.focus_child_notify).unwrap_or(false);
      if notify {
        let event = Event::Focus(FocusInfo { dir: FocusDirection::Out, win: fc });
        if let Some(node) = self.nodes.get_mut(&win) {
          node.hooks.run_event(win, &event);
        }
      }
    }

    let is_focused = self.nodes.get(&win).map(|n| n.is_focused).unwrap_or(false);
    if is_focused {
      if let Some(node) = self.nodes.get_mut(&win) {
        node.is_focused = false;
      }
      let event = Event::Focus(FocusInfo { dir: FocusDirection::Out, win });
      if let Some(node) = self.nodes.get_mut(&win) {
        node.hooks.run_event(win, &event);
      }
    }
  }

  pub fn is_focused(&self, win: WindowId) -> bool {
    self.nodes.get(&win).map(|n| n.is_focused).unwrap_or(false)
  }

  pub fn set_focus_child_notify(&mut self, win: WindowId, notify: bool) {
    if let Some(node) = self.nodes.get_mut(&win) {
      node.focus_child_notify = notify;
    }
  }

  // Focus }

  // Hooks {

  pub fn bind<F>(&mut self, win: WindowId, mask: EventMask, flags: BindFlags, callback: F) -> CoreResult<HookId>
  where
    F: for<'a> FnMut(WindowId, &Event<'a>) -> bool + 'static,
  {
    let node = self.nodes.get_mut(&win).ok_or(CoreError::UnknownWindow(win))?;
    Ok(node.hooks.bind(mask, flags, callback))
  }

  pub fn unbind(&mut self, win: WindowId, id: HookId) {
    if let Some(node) = self.nodes.get_mut(&win) {
      node.hooks.unbind_by_id(win, id);
    }
  }

  // Hooks }

  // Input routing {

  /// Feeds a terminal resize into the tree: updates the root's geometry and
  /// exposes the newly-visible strips. The owning application calls this
  /// (instead of the core subscribing to the terminal itself) after it
  /// polls a resize out of the terminal -- see the module docs for why.
  pub fn handle_resize(&mut self, lines: i32, cols: i32) {
    let old = self.get_geometry(self.root_id);
    self.resize(self.root_id, lines, cols);

    if lines > old.lines {
      self.expose(self.root_id, Some(Rect::new(old.lines, 0, lines - old.lines, cols)));
    }
    if cols > old.cols {
      self.expose(self.root_id, Some(Rect::new(0, old.cols, old.lines, cols - old.cols)));
    }
  }

  pub fn handle_key(&mut self, info: &KeyEventInfo) {
    self.handle_key_recursive(self.root_id, info);
  }

  fn handle_key_recursive(&mut self, win: WindowId, info: &KeyEventInfo) -> bool {
    let (is_visible, first_child, focused_child) = match self.nodes.get(&win) {
      Some(n) => (n.is_visible, n.first_child, n.focused_child),
      None => return false,
    };
    if !is_visible {
      return false;
    }

    if let Some(fc) = first_child {
      let steals = self.nodes.get(&fc).map(|n| n.steal_input).unwrap_or(false);
      if steals && self.handle_key_recursive(fc, info) {
        return true;
      }
    }

    if let Some(fc) = focused_child {
      if self.handle_key_recursive(fc, info) {
        return true;
      }
    }

    let event = Event::Key(info.clone());
    let consumed = match self.nodes.get_mut(&win) {
      Some(node) => node.hooks.run_event_whilefalse(win, &event),
      None => false,
    };
    if consumed {
      return true;
    }

    // Last-ditch attempt to spread it around other children.
    let mut child = first_child;
    while let Some(c) = child {
      let next = self.nodes.get(&c).and_then(|n| n.next);
      if Some(c) != focused_child && self.handle_key_recursive(c, info) {
        return true;
      }
      child = next;
    }

    false
  }

  /// Routes a mouse event, synthesizing drag-start/drag-drop/drag-stop/
  /// drag-outside notifications around plain press/drag/release the way
  /// the reference terminal-event callback does.
  pub fn handle_mouse(&mut self, info: &MouseEventInfo) {
    match info.kind {
      MouseEventType::Press => {
        self.mouse_last_button = Some(info.button);
        self.mouse_last_pos = Some((info.line, info.col));
      }
      MouseEventType::Drag if !self.mouse_dragging => {
        let (line, col) = self.mouse_last_pos.unwrap_or((info.line, info.col));
        let button = self.mouse_last_button.unwrap_or(info.button);
        let draginfo = MouseEventInfo {
          kind: MouseEventType::DragStart,
          button,
          line,
          col,
          modifiers: info.modifiers,
        };
        self.drag_source_window = self.handle_mouse_recursive(self.root_id, &draginfo);
        self.mouse_dragging = true;
      }
      MouseEventType::Release if self.mouse_dragging => {
        let draginfo = MouseEventInfo { kind: MouseEventType::DragDrop, ..*info };
        self.handle_mouse_recursive(self.root_id, &draginfo);

        if let Some(src) = self.drag_source_window {
          let geom = self.get_abs_geometry(src);
          let stop = MouseEventInfo {
            kind: MouseEventType::DragStop,
            line: info.line - geom.top,
            col: info.col - geom.left,
            ..*info
          };
          self.handle_mouse_recursive(src, &stop);
        }
        self.mouse_dragging = false;
      }
      _ => {}
    }

    let handled = self.handle_mouse_recursive(self.root_id, info);

    if info.kind == MouseEventType::Drag {
      if let Some(src) = self.drag_source_window {
        if handled != Some(src) {
          let geom = self.get_abs_geometry(src);
          let outside = MouseEventInfo {
            kind: MouseEventType::DragOutside,
            line: info.line - geom.top,
            col: info.col - geom.left,
            ..*info
          };
          self.handle_mouse_recursive(src, &outside);
        }
      }
    }
  }

  fn handle_mouse_recursive(&mut self, win: WindowId, info: &MouseEventInfo) -> Option<WindowId> {
    let (is_visible, first_child) = match self.nodes.get(&win) {
      Some(n) => (n.is_visible, n.first_child),
      None => return None,
    };
    if !is_visible {
      return None;
    }

    let mut child = first_child;
    while let Some(c) = child {
      let (c_rect, c_next, c_steal) = match self.nodes.get(&c) {
        Some(n) => (n.rect, n.next, n.steal_input),
        None => break,
      };

      let child_line = info.line - c_rect.top;
      let child_col = info.col - c_rect.left;

      if !c_steal && (child_line < 0 || child_line >= c_rect.lines || child_col < 0 || child_col >= c_rect.cols) {
        child = c_next;
        continue;
      }

      let child_info = MouseEventInfo { line: child_line, col: child_col, ..*info };
      if let Some(handled) = self.handle_mouse_recursive(c, &child_info) {
        return Some(handled);
      }
      child = c_next;
    }

    let event = Event::Mouse(*info);
    let consumed = match self.nodes.get_mut(&win) {
      Some(node) => node.hooks.run_event_whilefalse(win, &event),
      None => false,
    };
    if consumed {
      Some(win)
    } else {
      None
    }
  }

  // Input routing }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::KeyEventType;
  use crate::test::RecordingTerminal;
  use crossterm::event::KeyModifiers;

  fn child_order(root: &Root<RecordingTerminal>, parent: WindowId) -> Vec<WindowId> {
    let mut order = Vec::new();
    let mut cur = root.nodes.get(&parent).and_then(|n| n.first_child);
    while let Some(c) = cur {
      order.push(c);
      cur = root.nodes.get(&c).and_then(|n| n.next);
    }
    order
  }

  #[test]
  fn basic_geometry() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let win = root.new_window(root.root_id(), Rect::new(3, 10, 4, 20), WindowFlags::empty()).unwrap();
    assert_eq!(root.bottom(win), 7);
    assert_eq!(root.right(win), 30);
  }

  #[test]
  fn resize_and_reposition() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let win = root.new_window(root.root_id(), Rect::new(0, 0, 4, 4), WindowFlags::empty()).unwrap();
    root.resize(win, 6, 8);
    assert_eq!(root.get_geometry(win), Rect::new(0, 0, 6, 8));
    root.reposition(win, 2, 3);
    assert_eq!(root.get_geometry(win), Rect::new(2, 3, 6, 8));
  }

  #[test]
  fn nested_abs_geometry() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let child = root.new_window(root.root_id(), Rect::new(2, 2, 10, 10), WindowFlags::empty()).unwrap();
    let grandchild = root.new_window(child, Rect::new(1, 1, 3, 3), WindowFlags::empty()).unwrap();
    assert_eq!(root.get_abs_geometry(grandchild), Rect::new(3, 3, 3, 3));
  }

  #[test]
  fn hidden_flag_then_show() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let win = root.new_window(root.root_id(), Rect::new(0, 0, 4, 4), WindowFlags::HIDDEN).unwrap();
    assert!(!root.is_visible(win));
    root.show(win);
    assert!(root.is_visible(win));
  }

  #[test]
  fn raise_to_front_reorders_children() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let parent = root.root_id();
    let a = root.new_window(parent, Rect::new(0, 0, 2, 2), WindowFlags::empty()).unwrap();
    let b = root.new_window(parent, Rect::new(0, 0, 2, 2), WindowFlags::empty()).unwrap();
    let c = root.new_window(parent, Rect::new(0, 0, 2, 2), WindowFlags::empty()).unwrap();
    // Insertion prepends, so order is currently [c, b, a].
    assert_eq!(child_order(&root, parent), vec![c, b, a]);

    root.raise_to_front(a);
    root.flush();
    assert_eq!(child_order(&root, parent), vec![a, c, b]);
  }

  #[test]
  fn drag_synthesizes_start_and_stop() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let win = root
      .new_window(root.root_id(), Rect::new(0, 0, 10, 10), WindowFlags::empty())
      .unwrap();

    let kinds = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let k = kinds.clone();
    root
      .bind(win, EventMask::MOUSE, BindFlags::empty(), move |_, ev| {
        if let Event::Mouse(info) = ev {
          k.borrow_mut().push(info.kind);
        }
        true
      })
      .unwrap();

    let press = MouseEventInfo { kind: MouseEventType::Press, button: 1, line: 2, col: 2, modifiers: KeyModifiers::NONE };
    root.handle_mouse(&press);

    let drag = MouseEventInfo { kind: MouseEventType::Drag, button: 1, line: 3, col: 3, modifiers: KeyModifiers::NONE };
    root.handle_mouse(&drag);

    let release = MouseEventInfo { kind: MouseEventType::Release, button: 1, line: 3, col: 3, modifiers: KeyModifiers::NONE };
    root.handle_mouse(&release);

    assert_eq!(
      *kinds.borrow(),
      vec![
        MouseEventType::Press,
        MouseEventType::DragStart,
        MouseEventType::Drag,
        MouseEventType::DragDrop,
        MouseEventType::DragStop,
        MouseEventType::Release,
      ]
    );
  }

  #[test]
  fn key_event_falls_back_to_other_children_when_unconsumed() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let parent = root.root_id();
    let a = root.new_window(parent, Rect::new(0, 0, 4, 4), WindowFlags::empty()).unwrap();
    let b = root.new_window(parent, Rect::new(0, 0, 4, 4), WindowFlags::empty()).unwrap();

    let seen = std::rc::Rc::new(std::cell::RefCell::new(false));
    let s = seen.clone();
    root
      .bind(b, EventMask::KEY, BindFlags::empty(), move |_, _| {
        *s.borrow_mut() = true;
        true
      })
      .unwrap();
    let _ = a;

    let info = KeyEventInfo { kind: KeyEventType::Key, text: "x".to_string(), modifiers: KeyModifiers::NONE };
    root.handle_key(&info);
    assert!(*seen.borrow());
  }

  #[test]
  fn destroyed_window_reports_unknown() {
    let mut root = Root::new_root(RecordingTerminal::new(24, 80)).unwrap();
    let win = root.new_window(root.root_id(), Rect::new(0, 0, 4, 4), WindowFlags::empty()).unwrap();
    root.destroy(win);
    assert!(root.get_pen(win).is_err());
  }
}
