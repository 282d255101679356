//! Events surfaced to application code by the windowing core.

use crate::rect::Rect;
use crate::render_buffer::RenderBuffer;
use crate::window::WindowId;
use crossterm::event::KeyModifiers;

bitflags::bitflags! {
  /// Bitmask of event kinds a hook can subscribe to, and that a fired event
  /// carries as its kind.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct EventMask: u32 {
    const GEOMCHANGE = 1 << 0;
    const EXPOSE      = 1 << 1;
    const FOCUS       = 1 << 2;
    const KEY         = 1 << 3;
    const MOUSE       = 1 << 4;
    const UNBIND      = 1 << 5;
    const DESTROY     = 1 << 6;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
  In,
  Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
  Key,
  Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventType {
  Press,
  Drag,
  Release,
  Wheel,
  DragStart,
  DragDrop,
  DragStop,
  DragOutside,
}

#[derive(Debug, Clone)]
pub struct GeomChangeInfo {
  pub rect: Rect,
  pub oldrect: Rect,
}

#[derive(Debug, Clone, Copy)]
pub struct FocusInfo {
  pub dir: FocusDirection,
  pub win: WindowId,
}

#[derive(Debug, Clone)]
pub struct KeyEventInfo {
  pub kind: KeyEventType,
  pub text: String,
  pub modifiers: KeyModifiers,
}

#[derive(Debug, Clone, Copy)]
pub struct MouseEventInfo {
  pub kind: MouseEventType,
  pub button: u8,
  pub line: i32,
  pub col: i32,
  pub modifiers: KeyModifiers,
}

impl MouseEventInfo {
  pub(crate) fn translated(&self, dy: i32, dx: i32) -> Self {
    MouseEventInfo {
      line: self.line - dy,
      col: self.col - dx,
      ..*self
    }
  }
}

/// A single event delivered to a window's hooks. Carries a mutable
/// reference to the render buffer for the duration of an expose pass, which
/// is why this type (and [`crate::hook::HookList`]'s callback signature) is
/// generic over a lifetime rather than plain `'static`.
pub enum Event<'a> {
  GeomChange(GeomChangeInfo),
  Expose { rect: Rect, rb: &'a mut RenderBuffer },
  Focus(FocusInfo),
  Key(KeyEventInfo),
  Mouse(MouseEventInfo),
  Unbind,
  Destroy,
}

impl Event<'_> {
  pub fn mask(&self) -> EventMask {
    match self {
      Event::GeomChange(_) => EventMask::GEOMCHANGE,
      Event::Expose { .. } => EventMask::EXPOSE,
      Event::Focus(_) => EventMask::FOCUS,
      Event::Key(_) => EventMask::KEY,
      Event::Mouse(_) => EventMask::MOUSE,
      Event::Unbind => EventMask::UNBIND,
      Event::Destroy => EventMask::DESTROY,
    }
  }
}
