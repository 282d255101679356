//! Prelude.

// Re-export `ahash`.
pub use ahash::AHashMap as HashMap;
pub use ahash::AHashSet as HashSet;

pub use crate::err::{CoreError, CoreResult};
pub use crate::event::{Event, EventMask};
pub use crate::pen::Pen;
pub use crate::rect::{Rect, RectSet};
pub use crate::window::WindowId;
