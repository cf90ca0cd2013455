//! System-wide keyboard and mouse hooks for Windows, with handler dispatch,
//! event suppression and multi-key hotkey chords.
//!
//! [`HookListener`] installs low-level keyboard and mouse hooks on a dedicated
//! pump thread and passes every key and button transition to registered
//! handlers. A handler that returns `true` stops the event from reaching any
//! other application.
//!
//! [`HotkeyListener`] builds on it to fire callbacks when a chord of keys is
//! held down within a timeout.
//!
//! ```no_run
//! use inputhook::{HookListener, HotkeyListener, KeyEvent};
//!
//! let hook = HookListener::default();
//! hook.on_key_down(|event: &KeyEvent| println!("keydown {}", event.key_name()));
//! hook.start()?;
//!
//! let hotkeys = HotkeyListener::default();
//! hotkeys.register_hotkey("save", ["Lctrl", "S"], || println!("save"))?;
//! hotkeys.start()?;
//! # Ok::<(), inputhook::error::Error>(())
//! ```

pub mod error;
pub mod event;
pub mod hook;
pub mod hotkey;
pub mod keys;
pub mod platform;

pub use error::{Error, Result};
pub use event::{Category, Event, KeyAction, KeyEvent, MouseAction, MouseButton, MouseEvent};
pub use hook::{Backend, Dispatcher, HookListener, Propagation};
pub use hotkey::{ChordMatcher, HotkeyListener};
