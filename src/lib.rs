//! Windowing core for a terminal UI toolkit.
//!
//! This crate owns a tree of rectangular drawing regions ("windows") layered
//! over a single terminal device. It manages z-order, visibility, per-window
//! pens, cursor placement, keyboard focus, input routing (keys and mouse with
//! drag tracking), damage accumulation and batched repaint on [`Root::flush`].
//!
//! Rendering glyphs, terminal I/O and layout are deliberately out of scope:
//! callers provide geometry and implement [`Terminal`](term::Terminal)
//! themselves; this crate only decides *what* needs redrawing and *where*.

pub mod err;
pub mod event;
pub mod hook;
pub mod log;
pub mod pen;
pub mod prelude;
pub mod rect;
pub mod render_buffer;
pub mod root;
pub mod term;
pub mod window;

pub use err::{CoreError, CoreResult};
pub use event::{Event, EventMask, FocusDirection, KeyEventType, MouseEventType};
pub use hook::{BindFlags, HookId, HookList};
pub use pen::Pen;
pub use rect::{Rect, RectSet};
pub use render_buffer::RenderBuffer;
pub use root::Root;
pub use term::{CursorShape, Terminal};
pub use window::{Cursor, WindowFlags, WindowId};
