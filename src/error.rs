use std::fmt::Display;

use thiserror::Error;

/// Which low-level hook an installation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Keyboard,
    Mouse,
}

impl Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HookKind::Keyboard => "keyboard",
            HookKind::Mouse => "mouse",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown key or button name `{0}`")]
    UnknownKey(String),
    #[error("`{0}` is a mouse button and cannot be part of a hotkey")]
    NotAKeyboardKey(String),
    #[error("hotkey `{0}` has no keys")]
    EmptyChord(String),
    #[error("unknown handler category `{0}` (expected keydown, keyup, mousedown or mouseup)")]
    UnknownCategory(String),
    #[error("failed to register the {kind} hook")]
    HookRegistrationFailed {
        kind: HookKind,
        #[source]
        source: std::io::Error,
    },
    #[error("the hook thread terminated unexpectedly")]
    HookThreadCrashed,
    #[error("failed to spawn the hook thread")]
    ThreadSpawn(#[source] std::io::Error),
    #[error("failed to query the cursor position")]
    CursorPosition(#[source] std::io::Error),
    #[error("low-level input hooks are not supported on this platform")]
    Unsupported,
}

impl Error {
    /// Returns `true` for errors raised synchronously while registering
    /// keys, hotkeys or handlers.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownKey(_)
                | Error::NotAKeyboardKey(_)
                | Error::EmptyChord(_)
                | Error::UnknownCategory(_)
        )
    }

    /// Returns `true` for errors raised by the operating system or the pump thread.
    pub fn is_platform(&self) -> bool {
        !self.is_configuration()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
