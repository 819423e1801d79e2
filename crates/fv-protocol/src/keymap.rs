//! Key-code remap table
//!
//! Operator UIs send positional DOM-style key codes (`ArrowLeft`,
//! `MetaRight`, `CapsLock`). Injection backends want symbolic key
//! names. The mapping is an explicit finite table, matched
//! case-insensitively; codes outside the table fall back to the
//! event's literal `key` value as a typed [`ResolvedKey::Literal`].

/// A key the remap table knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Left,
    Right,
    Up,
    Down,
    Enter,
    Tab,
    Backspace,
    Escape,
    Space,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    CapsLock,
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    /// Platform command modifier (`Meta` on the wire)
    CommandLeft,
    CommandRight,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl NamedKey {
    /// Symbolic name used by injection backends
    pub fn name(&self) -> &'static str {
        match self {
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Enter => "enter",
            NamedKey::Tab => "tab",
            NamedKey::Backspace => "backspace",
            NamedKey::Escape => "esc",
            NamedKey::Space => "space",
            NamedKey::Delete => "delete",
            NamedKey::Insert => "insert",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "page_up",
            NamedKey::PageDown => "page_down",
            NamedKey::CapsLock => "caps_lock",
            NamedKey::ShiftLeft => "shift_l",
            NamedKey::ShiftRight => "shift_r",
            NamedKey::ControlLeft => "ctrl_l",
            NamedKey::ControlRight => "ctrl_r",
            NamedKey::AltLeft => "alt_l",
            NamedKey::AltRight => "alt_r",
            NamedKey::CommandLeft => "cmd_l",
            NamedKey::CommandRight => "cmd_r",
            NamedKey::F1 => "f1",
            NamedKey::F2 => "f2",
            NamedKey::F3 => "f3",
            NamedKey::F4 => "f4",
            NamedKey::F5 => "f5",
            NamedKey::F6 => "f6",
            NamedKey::F7 => "f7",
            NamedKey::F8 => "f8",
            NamedKey::F9 => "f9",
            NamedKey::F10 => "f10",
            NamedKey::F11 => "f11",
            NamedKey::F12 => "f12",
        }
    }
}

/// Result of resolving a key event's `keyCode`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKey {
    /// Key code matched the table
    Named(NamedKey),
    /// Key code unknown; carries the event's literal `key` value
    Literal(String),
}

/// Resolve a key code, falling back to the literal key value.
///
/// Matching is case-insensitive on the code; the literal fallback is
/// passed through unchanged.
pub fn resolve(key_code: &str, key: &str) -> ResolvedKey {
    match lookup(&key_code.to_ascii_lowercase()) {
        Some(named) => ResolvedKey::Named(named),
        None => ResolvedKey::Literal(key.to_string()),
    }
}

fn lookup(code: &str) -> Option<NamedKey> {
    let key = match code {
        "arrowleft" => NamedKey::Left,
        "arrowright" => NamedKey::Right,
        "arrowup" => NamedKey::Up,
        "arrowdown" => NamedKey::Down,
        "enter" => NamedKey::Enter,
        "tab" => NamedKey::Tab,
        "backspace" => NamedKey::Backspace,
        "escape" => NamedKey::Escape,
        "space" => NamedKey::Space,
        "delete" => NamedKey::Delete,
        "insert" => NamedKey::Insert,
        "home" => NamedKey::Home,
        "end" => NamedKey::End,
        "pageup" => NamedKey::PageUp,
        "pagedown" => NamedKey::PageDown,
        "capslock" => NamedKey::CapsLock,
        "shiftleft" => NamedKey::ShiftLeft,
        "shiftright" => NamedKey::ShiftRight,
        "controlleft" => NamedKey::ControlLeft,
        "controlright" => NamedKey::ControlRight,
        "altleft" => NamedKey::AltLeft,
        "altright" => NamedKey::AltRight,
        "metaleft" => NamedKey::CommandLeft,
        "metaright" => NamedKey::CommandRight,
        "f1" => NamedKey::F1,
        "f2" => NamedKey::F2,
        "f3" => NamedKey::F3,
        "f4" => NamedKey::F4,
        "f5" => NamedKey::F5,
        "f6" => NamedKey::F6,
        "f7" => NamedKey::F7,
        "f8" => NamedKey::F8,
        "f9" => NamedKey::F9,
        "f10" => NamedKey::F10,
        "f11" => NamedKey::F11,
        "f12" => NamedKey::F12,
        _ => return None,
    };
    Some(key)
}
