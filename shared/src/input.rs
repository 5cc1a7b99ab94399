//! Key allowlist and per-key pressed/timestamp state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keys the game understands. Anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    W,
    A,
    S,
    D,
    Space,
    /// Client-only debug overlay toggle.
    I,
}

impl Key {
    pub const ALL: [Key; 10] = [
        Key::ArrowUp,
        Key::ArrowDown,
        Key::ArrowLeft,
        Key::ArrowRight,
        Key::W,
        Key::A,
        Key::S,
        Key::D,
        Key::Space,
        Key::I,
    ];

    /// Wire name of the key, matching browser `KeyboardEvent.key` values.
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::ArrowUp => "ArrowUp",
            Key::ArrowDown => "ArrowDown",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
            Key::W => "w",
            Key::A => "a",
            Key::S => "s",
            Key::D => "d",
            Key::Space => " ",
            Key::I => "i",
        }
    }

    pub fn parse(name: &str) -> Option<Key> {
        Key::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// Parses a key received from a remote peer; local-only keys are refused.
    pub fn parse_remote(name: &str) -> Option<Key> {
        Key::parse(name).filter(|key| !key.is_local_only())
    }

    pub fn is_local_only(&self) -> bool {
        matches!(self, Key::I)
    }
}

/// Key transition as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: String,
    pub utc_time: u64,
    pub command_id: u32,
}

impl KeyEvent {
    pub fn new(key: Key, utc_time: u64, command_id: u32) -> Self {
        Self {
            key: key.as_str().to_string(),
            utc_time,
            command_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub pressed: bool,
    /// UTC milliseconds of the last transition.
    pub time: u64,
}

/// Current key state of one player, captured independently on each side.
#[derive(Debug, Clone, Default)]
pub struct Input {
    keys: HashMap<Key, KeyState>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: Key, pressed: bool, time: u64) {
        self.keys.insert(key, KeyState { pressed, time });
    }

    pub fn state(&self, key: Key) -> KeyState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.state(key).pressed
    }

    pub fn left_held(&self) -> bool {
        self.is_pressed(Key::A) || self.is_pressed(Key::ArrowLeft)
    }

    pub fn right_held(&self) -> bool {
        self.is_pressed(Key::D) || self.is_pressed(Key::ArrowRight)
    }

    pub fn jump_held(&self) -> bool {
        self.is_pressed(Key::Space)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
