//! Operating-system backends for the hook engine.
//!
//! Only Windows provides low-level hooks. Elsewhere [`DefaultBackend`] is
//! [`Unsupported`], which fails to start instead of silently listening to
//! nothing.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::{Hooks, WindowsBackend};
#[cfg(windows)]
pub type DefaultBackend = WindowsBackend;

mod unsupported;
pub use unsupported::Unsupported;
#[cfg(not(windows))]
pub type DefaultBackend = Unsupported;
