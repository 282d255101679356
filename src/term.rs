//! The terminal device capability the core relies on.
//!
//! The terminal itself -- sizing, cursor positioning, scroll regions, pen
//! application, actually flushing bytes -- is an external collaborator.
//! This module only defines the small capability set the root calls
//! through; callers provide a concrete [`Terminal`] (a real one backed by a
//! terminal library, or a double for tests).

use crate::pen::Pen;
use crate::rect::Rect;
use crate::render_buffer::RenderBuffer;

/// Cursor shape, reusing `crossterm`'s enum rather than inventing a
/// parallel one -- the root never interprets these values, it only ever
/// forwards whatever the window last asked for to the terminal.
pub type CursorShape = crossterm::cursor::SetCursorStyle;

bitflags::bitflags! {
  /// Which terminal-level event kinds the root subscribes to.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct TermEventMask: u32 {
    const RESIZE = 1 << 0;
    const KEY    = 1 << 1;
    const MOUSE  = 1 << 2;
  }
}

/// Id returned by [`Terminal::bind_event`], to be handed back to
/// [`Terminal::unbind_event_id`] when the subscriber goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventId(pub i32);

/// The capability set a terminal device must expose to the windowing core.
///
/// Event *delivery* -- feeding a resize/key/mouse event back into the root
/// -- is not part of this trait. `bind_event`/`unbind_event_id` exist so the
/// root can still register and later tear down its interest the way the
/// reference implementation does, but this crate has no safe way to let a
/// terminal hold a callback that mutates the root which owns it. Instead,
/// whatever drives the terminal (a real event loop, or a test) calls
/// [`crate::root::Root::handle_resize`], [`crate::root::Root::handle_key`]
/// or [`crate::root::Root::handle_mouse`] directly.
pub trait Terminal {
  /// `(lines, cols)`.
  fn get_size(&self) -> (i32, i32);

  fn bind_event(&mut self, mask: TermEventMask) -> EventId;

  fn unbind_event_id(&mut self, id: EventId);

  fn set_cursor_visible(&mut self, visible: bool);

  fn set_cursor_shape(&mut self, shape: CursorShape);

  fn goto(&mut self, line: i32, col: i32);

  fn setpen(&mut self, pen: &Pen);

  /// Asks the terminal to move the content of `rect` by `(downward,
  /// rightward)` cells using a hardware scroll region, if it has one.
  /// Returns whether it could.
  fn scrollrect(&mut self, rect: Rect, downward: i32, rightward: i32) -> bool;

  /// Transmits the render buffer an expose pass just painted into. Called
  /// once per [`crate::root::Root::flush`], after every damaged rect has
  /// been exposed into `rb` and before the cursor-restore pass flushes the
  /// terminal. This crate's own [`RenderBuffer`] carries no cell content
  /// (rendering glyphs is out of scope here); the call still exists so a
  /// `Terminal` implementation that pairs this core with a real,
  /// content-bearing render surface has a defined point to hand that
  /// content off, matching the reference implementation's
  /// `flush_to_term(term)`.
  fn flush_to_term(&mut self, rb: &RenderBuffer);

  fn flush(&mut self);
}
