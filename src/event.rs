//! Keyboard and mouse events delivered to handlers.
//!
//! Events are built on the pump thread for each intercepted notification and
//! handed to handlers by reference. They are never mutated after construction.

use std::{borrow::Cow, fmt::Display, str::FromStr};

use crate::{
    error::{Error, Result},
    keys,
};

/// Whether a key went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    KeyDown,
    KeyUp,
}

/// Whether a mouse button went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    MouseDown,
    MouseUp,
}

/// The mouse buttons reported by the mouse hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// The first side button, usually "back".
    XButton1,
    /// The second side button, usually "forward".
    XButton2,
}

impl MouseButton {
    /// Returns the vocabulary name of the button, e.g. `MouseLeft`.
    pub fn key_name(&self) -> &'static str {
        match self {
            MouseButton::Left => "MouseLeft",
            MouseButton::Right => "MouseRight",
            MouseButton::Middle => "MouseMiddle",
            MouseButton::XButton1 => "XButton1",
            MouseButton::XButton2 => "XButton2",
        }
    }
}

impl Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MouseButton::Left => "Left",
            MouseButton::Right => "Right",
            MouseButton::Middle => "Middle",
            MouseButton::XButton1 => "XButton1",
            MouseButton::XButton2 => "XButton2",
        };
        write!(f, "{}", s)
    }
}

/// A single key transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    action: KeyAction,
    key_code: u32,
    key_name: Cow<'static, str>,
    scan_code: u32,
    injected: bool,
    extra_info: usize,
}

impl KeyEvent {
    /// Creates an event for a virtual-key code.
    ///
    /// The key name is taken from the vocabulary, or is the decimal code if
    /// the code has no name.
    pub fn new(action: KeyAction, key_code: u32) -> Self {
        let key_name = match keys::name_for(key_code) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(key_code.to_string()),
        };
        Self {
            action,
            key_code,
            key_name,
            scan_code: 0,
            injected: false,
            extra_info: 0,
        }
    }

    pub fn with_scan_code(mut self, scan_code: u32) -> Self {
        self.scan_code = scan_code;
        self
    }

    pub fn with_injected(mut self, injected: bool) -> Self {
        self.injected = injected;
        self
    }

    pub fn with_extra_info(mut self, extra_info: usize) -> Self {
        self.extra_info = extra_info;
        self
    }

    pub fn action(&self) -> KeyAction {
        self.action
    }

    pub fn key_code(&self) -> u32 {
        self.key_code
    }

    /// The canonical key name, or the stringified code for unmapped keys.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn scan_code(&self) -> u32 {
        self.scan_code
    }

    /// Returns `true` if the operating system flagged the event as injected
    /// (e.g. by `SendInput`) rather than produced by a physical device.
    pub fn injected(&self) -> bool {
        self.injected
    }

    /// The caller-defined value attached when the event was injected.
    pub fn extra_info(&self) -> usize {
        self.extra_info
    }

    pub fn is_key_down(&self) -> bool {
        self.action == KeyAction::KeyDown
    }

    pub fn is_key_up(&self) -> bool {
        !self.is_key_down()
    }
}

/// A single mouse button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    action: MouseAction,
    button: MouseButton,
    position: (i32, i32),
    injected: bool,
    extra_info: usize,
}

impl MouseEvent {
    pub fn new(action: MouseAction, button: MouseButton, position: (i32, i32)) -> Self {
        Self {
            action,
            button,
            position,
            injected: false,
            extra_info: 0,
        }
    }

    pub fn with_injected(mut self, injected: bool) -> Self {
        self.injected = injected;
        self
    }

    pub fn with_extra_info(mut self, extra_info: usize) -> Self {
        self.extra_info = extra_info;
        self
    }

    pub fn action(&self) -> MouseAction {
        self.action
    }

    pub fn button(&self) -> MouseButton {
        self.button
    }

    /// Screen coordinates of the cursor when the event occurred.
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn injected(&self) -> bool {
        self.injected
    }

    pub fn extra_info(&self) -> usize {
        self.extra_info
    }
}

/// Any event a handler can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
}

impl Event {
    /// The handler category this event is dispatched to.
    pub fn category(&self) -> Category {
        match self {
            Event::Key(key) => match key.action() {
                KeyAction::KeyDown => Category::KeyDown,
                KeyAction::KeyUp => Category::KeyUp,
            },
            Event::Mouse(mouse) => match mouse.action() {
                MouseAction::MouseDown => Category::MouseDown,
                MouseAction::MouseUp => Category::MouseUp,
            },
        }
    }

    pub fn extra_info(&self) -> usize {
        match self {
            Event::Key(key) => key.extra_info(),
            Event::Mouse(mouse) => mouse.extra_info(),
        }
    }

    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            Event::Key(key) => Some(key),
            Event::Mouse(_) => None,
        }
    }

    pub fn as_mouse(&self) -> Option<&MouseEvent> {
        match self {
            Event::Mouse(mouse) => Some(mouse),
            Event::Key(_) => None,
        }
    }
}

impl From<KeyEvent> for Event {
    fn from(value: KeyEvent) -> Self {
        Event::Key(value)
    }
}

impl From<MouseEvent> for Event {
    fn from(value: MouseEvent) -> Self {
        Event::Mouse(value)
    }
}

/// The closed set of handler categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    KeyDown,
    KeyUp,
    MouseDown,
    MouseUp,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::KeyDown,
        Category::KeyUp,
        Category::MouseDown,
        Category::MouseUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::KeyDown => "keydown",
            Category::KeyUp => "keyup",
            Category::MouseDown => "mousedown",
            Category::MouseUp => "mouseup",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownCategory(s.to_owned()))
    }
}
