//! Client input management with command numbering and change detection

use macroquad::prelude::{is_key_down, KeyCode};
use shared::{Input, Key, KeyEvent, Packet};
use std::collections::VecDeque;

/// How long a key event may go unacknowledged before it is sent again.
pub const KEY_RESEND_INTERVAL_MS: u64 = 200;

/// Keyboard key backing each game key.
fn key_code(key: Key) -> KeyCode {
    match key {
        Key::ArrowUp => KeyCode::Up,
        Key::ArrowDown => KeyCode::Down,
        Key::ArrowLeft => KeyCode::Left,
        Key::ArrowRight => KeyCode::Right,
        Key::W => KeyCode::W,
        Key::A => KeyCode::A,
        Key::S => KeyCode::S,
        Key::D => KeyCode::D,
        Key::Space => KeyCode::Space,
        Key::I => KeyCode::I,
    }
}

/// Turns keyboard state into numbered key events
///
/// Every transition that is sent gets the next command id, starting at 1.
/// The local `Input` is updated at the same time so prediction can use it
/// before the server has seen the event.
///
/// Sent events stay queued until a snapshot shows the server has reached
/// their command id, and are resent every `KEY_RESEND_INTERVAL_MS` until then.
pub struct InputManager {
    input: Input,
    next_command_id: u32,
    /// Unacknowledged events with the time they were last sent, oldest first.
    pending: VecDeque<(Packet, u64)>,
    show_debug: bool,
    // Physical state of local-only keys, for edge detection
    debug_key_down: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            input: Input::new(),
            next_command_id: 1,
            pending: VecDeque::new(),
            show_debug: false,
            debug_key_down: false,
        }
    }

    /// Samples the keyboard and returns the events to send, oldest first.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Packet> {
        Key::ALL
            .into_iter()
            .filter_map(|key| self.handle_key(key, is_key_down(key_code(key)), now_ms))
            .collect()
    }

    /// Records the current physical state of one key
    ///
    /// Returns the packet to send for a press or release. Repeats and
    /// local-only keys produce nothing.
    pub fn handle_key(&mut self, key: Key, pressed: bool, now_ms: u64) -> Option<Packet> {
        if key.is_local_only() {
            if pressed && !self.debug_key_down {
                self.show_debug = !self.show_debug;
            }
            self.debug_key_down = pressed;
            return None;
        }

        if self.input.is_pressed(key) == pressed {
            return None;
        }
        self.input.set(key, pressed, now_ms);

        let event = KeyEvent::new(key, now_ms, self.next_command_id);
        self.next_command_id += 1;

        let packet = if pressed {
            Packet::KeyDown(event)
        } else {
            Packet::KeyUp(event)
        };
        self.pending.push_back((packet.clone(), now_ms));
        Some(packet)
    }

    /// Forgets every event the server has applied, up to `command_id`.
    pub fn acknowledge(&mut self, command_id: u32) {
        self.pending
            .retain(|(packet, _)| command_of(packet).map_or(false, |id| id > command_id));
    }

    /// Unacknowledged events whose last send is at least
    /// `KEY_RESEND_INTERVAL_MS` old, oldest first.
    pub fn resend_due(&mut self, now_ms: u64) -> Vec<Packet> {
        self.pending
            .iter_mut()
            .filter(|(_, sent_at)| now_ms.saturating_sub(*sent_at) >= KEY_RESEND_INTERVAL_MS)
            .map(|(packet, sent_at)| {
                *sent_at = now_ms;
                packet.clone()
            })
            .collect()
    }

    pub fn unacknowledged(&self) -> usize {
        self.pending.len()
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Highest command id handed out so far, 0 before the first event.
    pub fn last_command_id(&self) -> u32 {
        self.next_command_id - 1
    }

    pub fn show_debug(&self) -> bool {
        self.show_debug
    }

    /// Starts over for a new server session: no held keys, nothing pending,
    /// command ids from 1 again. The debug overlay stays as it was.
    pub fn reset(&mut self) {
        self.input.clear();
        self.pending.clear();
        self.next_command_id = 1;
    }
}

fn command_of(packet: &Packet) -> Option<u32> {
    match packet {
        Packet::KeyDown(event) | Packet::KeyUp(event) => Some(event.command_id),
        _ => None,
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_id(packet: &Packet) -> u32 {
        match packet {
            Packet::KeyDown(event) | Packet::KeyUp(event) => event.command_id,
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_input_manager_creation() {
        let manager = InputManager::new();
        assert_eq!(manager.last_command_id(), 0);
        assert!(!manager.show_debug());
    }

    #[test]
    fn test_transitions_get_increasing_command_ids() {
        let mut manager = InputManager::new();

        let down = manager.handle_key(Key::D, true, 1_000).unwrap();
        assert!(matches!(down, Packet::KeyDown(_)));
        assert_eq!(command_id(&down), 1);
        assert!(manager.input().right_held());

        let up = manager.handle_key(Key::D, false, 1_050).unwrap();
        assert!(matches!(up, Packet::KeyUp(_)));
        assert_eq!(command_id(&up), 2);
        assert!(!manager.input().right_held());
        assert_eq!(manager.last_command_id(), 2);
    }

    #[test]
    fn test_held_key_is_not_resent() {
        let mut manager = InputManager::new();
        assert!(manager.handle_key(Key::Space, true, 1_000).is_some());
        assert!(manager.handle_key(Key::Space, true, 1_016).is_none());
        assert!(manager.handle_key(Key::A, false, 1_016).is_none());
        assert_eq!(manager.last_command_id(), 1);
        assert_eq!(manager.input().state(Key::Space).time, 1_000);
    }

    #[test]
    fn test_event_carries_key_and_time() {
        let mut manager = InputManager::new();
        match manager.handle_key(Key::Space, true, 1_234) {
            Some(Packet::KeyDown(event)) => {
                assert_eq!(event.key, " ");
                assert_eq!(event.utc_time, 1_234);
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_debug_key_toggles_locally() {
        let mut manager = InputManager::new();

        assert!(manager.handle_key(Key::I, true, 1_000).is_none());
        assert!(manager.show_debug());
        // Held: no second toggle
        assert!(manager.handle_key(Key::I, true, 1_016).is_none());
        assert!(manager.show_debug());

        manager.handle_key(Key::I, false, 1_032);
        manager.handle_key(Key::I, true, 1_048);
        assert!(!manager.show_debug());
        assert_eq!(manager.last_command_id(), 0);
    }

    #[test]
    fn test_reset_restarts_command_numbering() {
        let mut manager = InputManager::new();
        manager.handle_key(Key::I, true, 900);
        manager.handle_key(Key::A, true, 1_000);
        manager.handle_key(Key::D, true, 1_010);
        manager.reset();

        assert!(!manager.input().left_held());
        assert_eq!(manager.last_command_id(), 0);
        assert_eq!(manager.unacknowledged(), 0);
        assert!(manager.show_debug());

        let packet = manager.handle_key(Key::A, true, 2_000).unwrap();
        assert_eq!(command_id(&packet), 1);
    }

    #[test]
    fn test_unacknowledged_events_are_resent_in_order() {
        let mut manager = InputManager::new();
        let down = manager.handle_key(Key::D, true, 1_000).unwrap();
        let up = manager.handle_key(Key::D, false, 1_050).unwrap();

        assert!(manager.resend_due(1_100).is_empty());
        assert_eq!(manager.resend_due(1_200), vec![down.clone()]);
        assert_eq!(manager.resend_due(1_250), vec![up.clone()]);
        // Each event waits a full interval after its last send.
        assert!(manager.resend_due(1_300).is_empty());
        assert_eq!(manager.resend_due(1_450), vec![down, up.clone()]);

        manager.acknowledge(1);
        assert_eq!(manager.unacknowledged(), 1);
        assert_eq!(manager.resend_due(1_650), vec![up]);

        manager.acknowledge(2);
        assert_eq!(manager.unacknowledged(), 0);
        assert!(manager.resend_due(5_000).is_empty());
    }
}
