//! Input injection
//!
//! The platform keyboard/mouse handle is a process-wide resource:
//! created once at startup, injected into the dispatcher, never torn
//! down. The agent-side logic here is coordinate scaling and the
//! modifier press/act/release sequence; the actual OS injection sits
//! behind [`InputInjector`]. The default build carries a logging null
//! backend; the `injection` feature adds an `enigo`-based one.

use anyhow::Result;

use fv_protocol::keymap::{self, NamedKey, ResolvedKey};
use fv_protocol::{KeyAction, KeyEvent, Modifier, Point};

/// Platform input backend
pub trait InputInjector: Send + Sync {
    /// Actual display resolution in pixels, used to scale normalized
    /// operator coordinates.
    fn display_size(&self) -> (u32, u32);

    /// Click at absolute pixel coordinates; `secondary` selects the
    /// context button.
    fn mouse_click(&self, x: i32, y: i32, secondary: bool) -> Result<()>;

    /// Press or release one key
    fn key(&self, key: &ResolvedKey, action: KeyAction) -> Result<()>;
}

/// Scale a normalized `[0,1]` point against the display resolution
/// and inject a click.
pub fn apply_mouse_click(injector: &dyn InputInjector, point: Point, secondary: bool) -> Result<()> {
    let (width, height) = injector.display_size();
    let x = (point.x.clamp(0.0, 1.0) * f64::from(width)).round() as i32;
    let y = (point.y.clamp(0.0, 1.0) * f64::from(height)).round() as i32;
    injector.mouse_click(x, y, secondary)
}

/// Resolve the key code and inject the event with its modifiers held:
/// press modifiers, perform the action, release modifiers in reverse
/// order. Unknown modifiers are ignored. Modifier release runs even
/// when the action itself fails.
pub fn apply_key_event(injector: &dyn InputInjector, event: &KeyEvent) -> Result<()> {
    let resolved = keymap::resolve(&event.key_code, &event.key);
    let modifiers: Vec<NamedKey> = event.modifiers.iter().filter_map(modifier_key).collect();

    for modifier in &modifiers {
        injector.key(&ResolvedKey::Named(*modifier), KeyAction::Down)?;
    }

    let result = injector.key(&resolved, event.action);

    for modifier in modifiers.iter().rev() {
        if let Err(e) = injector.key(&ResolvedKey::Named(*modifier), KeyAction::Up) {
            tracing::warn!("Failed to release modifier {:?}: {}", modifier, e);
        }
    }

    result
}

fn modifier_key(modifier: &Modifier) -> Option<NamedKey> {
    match modifier {
        Modifier::Shift => Some(NamedKey::ShiftLeft),
        Modifier::Control => Some(NamedKey::ControlLeft),
        Modifier::Meta => Some(NamedKey::CommandLeft),
        Modifier::Alt => Some(NamedKey::AltLeft),
        Modifier::Unknown => None,
    }
}

/// Backend for headless builds: reports a nominal display and logs
/// events instead of injecting them.
#[derive(Debug, Default)]
pub struct NullInjector;

impl InputInjector for NullInjector {
    fn display_size(&self) -> (u32, u32) {
        (1920, 1080)
    }

    fn mouse_click(&self, x: i32, y: i32, secondary: bool) -> Result<()> {
        tracing::debug!("Dropping mouse click at ({}, {}) secondary={}", x, y, secondary);
        Ok(())
    }

    fn key(&self, key: &ResolvedKey, action: KeyAction) -> Result<()> {
        tracing::debug!("Dropping key event {:?} {:?}", key, action);
        Ok(())
    }
}

#[cfg(feature = "injection")]
pub use enigo_backend::EnigoInjector;

#[cfg(feature = "injection")]
mod enigo_backend {
    use std::sync::Mutex;

    use anyhow::{anyhow, Context, Result};
    use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

    use fv_protocol::keymap::{NamedKey, ResolvedKey};
    use fv_protocol::KeyAction;

    use super::InputInjector;

    /// `enigo`-backed injector. The underlying handle is not thread
    /// safe, so all access is serialized through one mutex.
    pub struct EnigoInjector {
        inner: Mutex<Enigo>,
        display: (u32, u32),
    }

    impl EnigoInjector {
        /// Initialize the process-wide injection handle
        pub fn new() -> Result<Self> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| anyhow!("Input backend init failed: {}", e))?;
            let (width, height) = enigo
                .main_display()
                .map_err(|e| anyhow!("Display size query failed: {}", e))?;
            Ok(Self {
                inner: Mutex::new(enigo),
                display: (width.max(1) as u32, height.max(1) as u32),
            })
        }
    }

    impl InputInjector for EnigoInjector {
        fn display_size(&self) -> (u32, u32) {
            self.display
        }

        fn mouse_click(&self, x: i32, y: i32, secondary: bool) -> Result<()> {
            let mut enigo = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| anyhow!("Mouse move failed: {}", e))?;
            let button = if secondary { Button::Right } else { Button::Left };
            enigo
                .button(button, Direction::Click)
                .map_err(|e| anyhow!("Mouse click failed: {}", e))
        }

        fn key(&self, key: &ResolvedKey, action: KeyAction) -> Result<()> {
            let key = translate(key).context("Untranslatable key")?;
            let direction = match action {
                KeyAction::Down => Direction::Press,
                KeyAction::Up => Direction::Release,
            };
            let mut enigo = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            enigo
                .key(key, direction)
                .map_err(|e| anyhow!("Key injection failed: {}", e))
        }
    }

    fn translate(key: &ResolvedKey) -> Option<Key> {
        let key = match key {
            ResolvedKey::Named(named) => match named {
                NamedKey::Left => Key::LeftArrow,
                NamedKey::Right => Key::RightArrow,
                NamedKey::Up => Key::UpArrow,
                NamedKey::Down => Key::DownArrow,
                NamedKey::Enter => Key::Return,
                NamedKey::Tab => Key::Tab,
                NamedKey::Backspace => Key::Backspace,
                NamedKey::Escape => Key::Escape,
                NamedKey::Space => Key::Space,
                NamedKey::Delete => Key::Delete,
                // Not exposed uniformly across enigo's platforms
                NamedKey::Insert => return None,
                NamedKey::Home => Key::Home,
                NamedKey::End => Key::End,
                NamedKey::PageUp => Key::PageUp,
                NamedKey::PageDown => Key::PageDown,
                NamedKey::CapsLock => Key::CapsLock,
                NamedKey::ShiftLeft | NamedKey::ShiftRight => Key::Shift,
                NamedKey::ControlLeft | NamedKey::ControlRight => Key::Control,
                NamedKey::AltLeft | NamedKey::AltRight => Key::Alt,
                NamedKey::CommandLeft | NamedKey::CommandRight => Key::Meta,
                NamedKey::F1 => Key::F1,
                NamedKey::F2 => Key::F2,
                NamedKey::F3 => Key::F3,
                NamedKey::F4 => Key::F4,
                NamedKey::F5 => Key::F5,
                NamedKey::F6 => Key::F6,
                NamedKey::F7 => Key::F7,
                NamedKey::F8 => Key::F8,
                NamedKey::F9 => Key::F9,
                NamedKey::F10 => Key::F10,
                NamedKey::F11 => Key::F11,
                NamedKey::F12 => Key::F12,
            },
            ResolvedKey::Literal(text) => Key::Unicode(text.chars().next()?),
        };
        Some(key)
    }
}
