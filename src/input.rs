/*
 * Per-frame input snapshots. `InputTracker` samples a key-state predicate
 * once per logic tick and diffs it against the previous sample so controls
 * can react to transitions ("went down this frame") instead of raw levels.
 */
use crate::types::Vector2;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    pub const LBUTTON: VirtualKey = VirtualKey(0x01);
    pub const RBUTTON: VirtualKey = VirtualKey(0x02);
    pub const MBUTTON: VirtualKey = VirtualKey(0x04);
    pub const XBUTTON1: VirtualKey = VirtualKey(0x05);
    pub const XBUTTON2: VirtualKey = VirtualKey(0x06);
    pub const BACK: VirtualKey = VirtualKey(0x08);
    pub const TAB: VirtualKey = VirtualKey(0x09);
    pub const RETURN: VirtualKey = VirtualKey(0x0D);
    pub const SHIFT: VirtualKey = VirtualKey(0x10);
    pub const CONTROL: VirtualKey = VirtualKey(0x11);
    pub const MENU: VirtualKey = VirtualKey(0x12);
    pub const ESCAPE: VirtualKey = VirtualKey(0x1B);
    pub const SPACE: VirtualKey = VirtualKey(0x20);
    pub const INSERT: VirtualKey = VirtualKey(0x2D);
    pub const DELETE: VirtualKey = VirtualKey(0x2E);
    pub const F1: VirtualKey = VirtualKey(0x70);

    pub fn name(self) -> String {
        match self.0 {
            0x01 => "LBUTTON".into(),
            0x02 => "RBUTTON".into(),
            0x04 => "MBUTTON".into(),
            0x05 => "XBUTTON1".into(),
            0x06 => "XBUTTON2".into(),
            0x08 => "BACK".into(),
            0x09 => "TAB".into(),
            0x0D => "RETURN".into(),
            0x10 => "SHIFT".into(),
            0x11 => "CONTROL".into(),
            0x12 => "MENU".into(),
            0x1B => "ESCAPE".into(),
            0x20 => "SPACE".into(),
            0x25 => "LEFT".into(),
            0x26 => "UP".into(),
            0x27 => "RIGHT".into(),
            0x28 => "DOWN".into(),
            0x2D => "INSERT".into(),
            0x2E => "DELETE".into(),
            code @ 0x30..=0x39 | code @ 0x41..=0x5A => char::from(code as u8).to_string(),
            code @ 0x60..=0x69 => format!("NUMPAD{}", code - 0x60),
            code @ 0x70..=0x87 => format!("F{}", code - 0x70 + 1),
            code => format!("VK_{code:#04X}"),
        }
    }

    /// Every code worth polling; mirrors the range `GetAsyncKeyState` accepts.
    pub fn all() -> impl Iterator<Item = VirtualKey> {
        (0x01u16..=0xFE).map(VirtualKey)
    }
}

impl fmt::Debug for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualKey({})", self.name())
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::X1,
        MouseButton::X2,
    ];

    pub fn key(self) -> VirtualKey {
        match self {
            MouseButton::Left => VirtualKey::LBUTTON,
            MouseButton::Right => VirtualKey::RBUTTON,
            MouseButton::Middle => VirtualKey::MBUTTON,
            MouseButton::X1 => VirtualKey::XBUTTON1,
            MouseButton::X2 => VirtualKey::XBUTTON2,
        }
    }
}

/// Input state of one logic frame, passed into every control's `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    held: HashSet<VirtualKey>,
    went_down: Vec<VirtualKey>,
    went_up: Vec<VirtualKey>,
    /// Cursor position in overlay client coordinates.
    pub cursor: Vector2,
}

impl InputSnapshot {
    pub fn is_down(&self, key: VirtualKey) -> bool {
        self.held.contains(&key)
    }

    /// Keys released since the previous frame, in ascending key-code order.
    pub fn keys_that_went_up(&self) -> &[VirtualKey] {
        &self.went_up
    }

    /// Keys pressed since the previous frame, in ascending key-code order.
    pub fn keys_that_went_down(&self) -> &[VirtualKey] {
        &self.went_down
    }

    pub fn key_went_up(&self, key: VirtualKey) -> bool {
        self.went_up.contains(&key)
    }

    pub fn key_went_down(&self, key: VirtualKey) -> bool {
        self.went_down.contains(&key)
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.is_down(button.key())
    }

    pub fn mouse_went_down(&self) -> impl Iterator<Item = MouseButton> + '_ {
        MouseButton::ALL
            .into_iter()
            .filter(|b| self.key_went_down(b.key()))
    }

    pub fn mouse_went_up(&self) -> impl Iterator<Item = MouseButton> + '_ {
        MouseButton::ALL
            .into_iter()
            .filter(|b| self.key_went_up(b.key()))
    }
}

#[derive(Debug, Default)]
pub struct InputTracker {
    previous: HashSet<VirtualKey>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /*
     * Samples every key with `is_down` and returns the snapshot for this
     * frame. Transitions are computed against the previous call.
     */
    pub fn sample<F>(
        &mut self,
        keys: impl IntoIterator<Item = VirtualKey>,
        is_down: F,
        cursor: Vector2,
    ) -> InputSnapshot
    where
        F: Fn(VirtualKey) -> bool,
    {
        let held: HashSet<VirtualKey> = keys.into_iter().filter(|k| is_down(*k)).collect();

        let mut went_down: Vec<VirtualKey> = held.difference(&self.previous).copied().collect();
        let mut went_up: Vec<VirtualKey> = self.previous.difference(&held).copied().collect();
        went_down.sort();
        went_up.sort();

        if !went_down.is_empty() || !went_up.is_empty() {
            log::trace!("Input: down {went_down:?}, up {went_up:?}");
        }

        self.previous = held.clone();
        InputSnapshot {
            held,
            went_down,
            went_up,
            cursor,
        }
    }
}
