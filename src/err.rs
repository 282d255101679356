//! Errors and results.

// anyhow {

/// [`anyhow::Error`]
pub type AnyErr = anyhow::Error;

/// [`anyhow::Result`] with `T` if ok, [`AnyErr`] if error.
pub type AnyResult<T> = anyhow::Result<T>;

// anyhow }

#[derive(Debug, Clone, Copy, thiserror::Error)]
/// Errors the core can report. Most operations described by the windowing
/// protocol are designed to be infallible no-ops on misuse (see each
/// operation's docs, and [`crate::root::Root`]'s module docs for why); this
/// enum only covers the handful of cases where a caller genuinely needs to
/// observe failure, such as passing a [`crate::window::WindowId`] that has
/// already been destroyed.
pub enum CoreError {
  #[error("window {0:?} does not belong to this tree")]
  UnknownWindow(crate::window::WindowId),
}

/// [`std::result::Result`] with `T` if ok, [`CoreError`] if error.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
