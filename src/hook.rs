//! An ordered list of `(event-mask, callback, id)` records.
//!
//! Each window (and the mechanism binding a root to its terminal) owns one
//! of these. Unlike the C original, which pairs a raw function pointer with
//! an opaque `void *data`, callbacks here are closures: whatever state a
//! handler needs, it captures directly, which is both the idiomatic Rust
//! shape and strictly more flexible than a single untyped pointer.

use crate::event::{Event, EventMask};
use crate::window::WindowId;

pub type HookId = i32;

bitflags::bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct BindFlags: u32 {
    /// Insert at the head of the list instead of appending.
    const FIRST = 1 << 0;
  }
}

type Callback = Box<dyn for<'a> FnMut(WindowId, &Event<'a>) -> bool>;

struct HookRecord {
  id: HookId,
  mask: EventMask,
  callback: Callback,
}

/// An ordered list of event subscriptions, fired in insertion order (or
/// reverse insertion order for destroy notifications).
#[derive(Default)]
pub struct HookList {
  hooks: Vec<HookRecord>,
}

impl HookList {
  pub fn new() -> Self {
    HookList { hooks: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.hooks.is_empty()
  }

  fn next_id(&self) -> HookId {
    self.hooks.iter().map(|h| h.id).max().unwrap_or(0) + 1
  }

  /// Binds `callback` to fire whenever an event whose kind intersects
  /// `mask` runs. Returns the id assigned, which is one greater than the
  /// largest id currently in the list (or 1 if the list is empty).
  pub fn bind<F>(&mut self, mask: EventMask, flags: BindFlags, callback: F) -> HookId
  where
    F: for<'a> FnMut(WindowId, &Event<'a>) -> bool + 'static,
  {
    let id = self.next_id();
    let record = HookRecord {
      id,
      mask,
      callback: Box::new(callback),
    };
    if flags.contains(BindFlags::FIRST) {
      self.hooks.insert(0, record);
    } else {
      self.hooks.push(record);
    }
    id
  }

  /// Fires every hook whose mask intersects `event`'s kind, in list order.
  /// Return values are ignored.
  pub fn run_event(&mut self, owner: WindowId, event: &Event<'_>) {
    let mask = event.mask();
    for hook in self.hooks.iter_mut() {
      if hook.mask.intersects(mask) {
        (hook.callback)(owner, event);
      }
    }
  }

  /// Fires hooks in list order, stopping at (and returning) the first
  /// truthy result. Returns `false` if no hook consumed the event.
  pub fn run_event_whilefalse(&mut self, owner: WindowId, event: &Event<'_>) -> bool {
    let mask = event.mask();
    for hook in self.hooks.iter_mut() {
      if hook.mask.intersects(mask) && (hook.callback)(owner, event) {
        return true;
      }
    }
    false
  }

  /// Removes the hook with the given id. If its mask includes `UNBIND`,
  /// the callback fires once more first with an [`Event::Unbind`].
  pub fn unbind_by_id(&mut self, owner: WindowId, id: HookId) {
    if let Some(pos) = self.hooks.iter().position(|h| h.id == id) {
      if self.hooks[pos].mask.contains(EventMask::UNBIND) {
        (self.hooks[pos].callback)(owner, &Event::Unbind);
      }
      self.hooks.remove(pos);
    }
  }

  /// Fires UNBIND|DESTROY notifications in reverse bind order, then drops
  /// every hook. Used when the owning window is destroyed.
  pub fn unbind_and_destroy(&mut self, owner: WindowId) {
    self.hooks.reverse();
    for mut hook in self.hooks.drain(..) {
      if hook.mask.intersects(EventMask::UNBIND | EventMask::DESTROY) {
        (hook.callback)(owner, &Event::Destroy);
      }
    }
  }
}
