//! Symbolic names for keys and mouse buttons and their virtual-key codes.
//!
//! Names are matched case-insensitively and always resolve to one canonical
//! spelling, which is what [`name_for`] returns and what key events carry.

use std::{collections::HashMap, sync::LazyLock};

use crate::error::{Error, Result};

/// Canonical names and their Windows virtual-key codes. Every code appears once.
const KEYS: &[(&str, u32)] = &[
    // mouse buttons
    ("MouseLeft", 0x01),
    ("MouseRight", 0x02),
    ("MouseMiddle", 0x04),
    ("XButton1", 0x05),
    ("XButton2", 0x06),
    // editing and control
    ("Backspace", 0x08),
    ("Tab", 0x09),
    ("Clear", 0x0C),
    ("Enter", 0x0D),
    ("Shift", 0x10),
    ("Ctrl", 0x11),
    ("Alt", 0x12),
    ("Pause", 0x13),
    ("CapsLock", 0x14),
    ("Esc", 0x1B),
    ("Space", 0x20),
    ("PageUp", 0x21),
    ("PageDown", 0x22),
    ("End", 0x23),
    ("Home", 0x24),
    ("Left", 0x25),
    ("Up", 0x26),
    ("Right", 0x27),
    ("Down", 0x28),
    ("Select", 0x29),
    ("PrintScreen", 0x2C),
    ("Insert", 0x2D),
    ("Delete", 0x2E),
    ("Help", 0x2F),
    // digits
    ("0", 0x30),
    ("1", 0x31),
    ("2", 0x32),
    ("3", 0x33),
    ("4", 0x34),
    ("5", 0x35),
    ("6", 0x36),
    ("7", 0x37),
    ("8", 0x38),
    ("9", 0x39),
    // letters
    ("A", 0x41),
    ("B", 0x42),
    ("C", 0x43),
    ("D", 0x44),
    ("E", 0x45),
    ("F", 0x46),
    ("G", 0x47),
    ("H", 0x48),
    ("I", 0x49),
    ("J", 0x4A),
    ("K", 0x4B),
    ("L", 0x4C),
    ("M", 0x4D),
    ("N", 0x4E),
    ("O", 0x4F),
    ("P", 0x50),
    ("Q", 0x51),
    ("R", 0x52),
    ("S", 0x53),
    ("T", 0x54),
    ("U", 0x55),
    ("V", 0x56),
    ("W", 0x57),
    ("X", 0x58),
    ("Y", 0x59),
    ("Z", 0x5A),
    ("Lwin", 0x5B),
    ("Rwin", 0x5C),
    ("Apps", 0x5D),
    ("Sleep", 0x5F),
    // numpad
    ("Num0", 0x60),
    ("Num1", 0x61),
    ("Num2", 0x62),
    ("Num3", 0x63),
    ("Num4", 0x64),
    ("Num5", 0x65),
    ("Num6", 0x66),
    ("Num7", 0x67),
    ("Num8", 0x68),
    ("Num9", 0x69),
    ("Multiply", 0x6A),
    ("Add", 0x6B),
    ("Separator", 0x6C),
    ("Subtract", 0x6D),
    ("Decimal", 0x6E),
    ("Divide", 0x6F),
    // function keys
    ("F1", 0x70),
    ("F2", 0x71),
    ("F3", 0x72),
    ("F4", 0x73),
    ("F5", 0x74),
    ("F6", 0x75),
    ("F7", 0x76),
    ("F8", 0x77),
    ("F9", 0x78),
    ("F10", 0x79),
    ("F11", 0x7A),
    ("F12", 0x7B),
    ("F13", 0x7C),
    ("F14", 0x7D),
    ("F15", 0x7E),
    ("F16", 0x7F),
    ("F17", 0x80),
    ("F18", 0x81),
    ("F19", 0x82),
    ("F20", 0x83),
    ("F21", 0x84),
    ("F22", 0x85),
    ("F23", 0x86),
    ("F24", 0x87),
    ("NumLock", 0x90),
    ("ScrollLock", 0x91),
    // left/right modifiers, as reported by low-level hooks
    ("Lshift", 0xA0),
    ("Rshift", 0xA1),
    ("Lctrl", 0xA2),
    ("Rctrl", 0xA3),
    ("Lalt", 0xA4),
    ("Ralt", 0xA5),
    // browser and media
    ("BrowserBack", 0xA6),
    ("BrowserForward", 0xA7),
    ("VolumeMute", 0xAD),
    ("VolumeDown", 0xAE),
    ("VolumeUp", 0xAF),
    ("MediaNext", 0xB0),
    ("MediaPrev", 0xB1),
    ("MediaStop", 0xB2),
    ("MediaPlayPause", 0xB3),
    // US layout punctuation
    ("Semicolon", 0xBA),
    ("Equal", 0xBB),
    ("Comma", 0xBC),
    ("Minus", 0xBD),
    ("Period", 0xBE),
    ("Slash", 0xBF),
    ("Backquote", 0xC0),
    ("LBracket", 0xDB),
    ("Backslash", 0xDC),
    ("RBracket", 0xDD),
    ("Quote", 0xDE),
];

/// Alternative spellings accepted on lookup, mapped to canonical names.
const ALIASES: &[(&str, &str)] = &[
    ("Escape", "Esc"),
    ("Return", "Enter"),
    ("Del", "Delete"),
    ("Ins", "Insert"),
    ("Control", "Ctrl"),
    ("Lcontrol", "Lctrl"),
    ("Rcontrol", "Rctrl"),
    ("Menu", "Alt"),
    ("Lmenu", "Lalt"),
    ("Rmenu", "Ralt"),
    ("PgUp", "PageUp"),
    ("PgDn", "PageDown"),
    ("Back", "Backspace"),
    ("LButton", "MouseLeft"),
    ("RButton", "MouseRight"),
    ("MButton", "MouseMiddle"),
];

struct Vocabulary {
    by_name: HashMap<String, (&'static str, u32)>,
    by_code: HashMap<u32, &'static str>,
}

static VOCABULARY: LazyLock<Vocabulary> = LazyLock::new(|| {
    let mut by_name = HashMap::with_capacity(KEYS.len() + ALIASES.len());
    let mut by_code = HashMap::with_capacity(KEYS.len());

    for &(name, code) in KEYS {
        by_name.insert(name.to_ascii_lowercase(), (name, code));
        by_code.insert(code, name);
    }
    for &(alias, target) in ALIASES {
        if let Some(&entry) = by_name.get(&target.to_ascii_lowercase()) {
            by_name.insert(alias.to_ascii_lowercase(), entry);
        }
    }

    Vocabulary { by_name, by_code }
});

fn lookup(name: &str) -> Result<(&'static str, u32)> {
    VOCABULARY
        .by_name
        .get(&name.to_ascii_lowercase())
        .copied()
        .ok_or_else(|| Error::UnknownKey(name.to_owned()))
}

/// Returns the virtual-key code for a key or button name.
///
/// Fails with [`Error::UnknownKey`] if the name is not part of the vocabulary.
pub fn code_for(name: &str) -> Result<u32> {
    lookup(name).map(|(_, code)| code)
}

/// Resolves a name or alias to its canonical spelling.
pub fn canonical_name(name: &str) -> Result<&'static str> {
    lookup(name).map(|(canonical, _)| canonical)
}

/// Returns the canonical name for a virtual-key code, if it has one.
pub fn name_for(code: u32) -> Option<&'static str> {
    VOCABULARY.by_code.get(&code).copied()
}

/// The left and right keys that stand in for a generic modifier.
///
/// Low-level hooks only ever report the sided codes, so a chord naming `Ctrl`,
/// `Shift` or `Alt` is held when either side is. `name` must be canonical.
pub fn sides(name: &str) -> Option<[&'static str; 2]> {
    match name {
        "Ctrl" => Some(["Lctrl", "Rctrl"]),
        "Shift" => Some(["Lshift", "Rshift"]),
        "Alt" => Some(["Lalt", "Ralt"]),
        _ => None,
    }
}

/// Returns `true` if `name` resolves to a mouse button.
pub fn is_mouse_button(name: &str) -> bool {
    matches!(code_for(name), Ok(0x01 | 0x02 | 0x04..=0x06))
}

/// Iterates over every canonical name in the vocabulary.
pub fn names() -> impl Iterator<Item = &'static str> {
    KEYS.iter().map(|&(name, _)| name)
}
