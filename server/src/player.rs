//! Server-side record of one connected player.

use shared::{BodyId, ClientPlayer, Input, Key, MovementState, PhysicsWorld, PlayerId};
use std::collections::HashMap;

const PLAYER_COLORS: [&str; 8] = ["blue", "red", "green", "purple", "orange", "cyan", "magenta", "yellow"];

/// Avatar color picked from the player's session id.
pub fn player_color(id: PlayerId) -> &'static str {
    PLAYER_COLORS[(id as usize).saturating_sub(1) % PLAYER_COLORS.len()]
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Weak reference into the physics world; resolve before every use.
    pub body_id: BodyId,
    pub movement: MovementState,
    pub input: Input,
    pub latest_command_id: u32,
    /// Command id of the transition currently applied to each key.
    key_commands: HashMap<Key, u32>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, body_id: BodyId) -> Self {
        Self {
            id,
            name,
            body_id,
            movement: MovementState::default(),
            input: Input::new(),
            latest_command_id: 0,
            key_commands: HashMap::new(),
        }
    }

    /// Records a key transition. Command ids only ever move forward.
    ///
    /// Clients resend unacknowledged events, so a transition older than the
    /// one already applied to the same key is a duplicate and leaves the key
    /// alone. Returns whether the key state changed.
    pub fn apply_key(&mut self, key: Key, pressed: bool, time: u64, command_id: u32) -> bool {
        self.latest_command_id = self.latest_command_id.max(command_id);

        let applied = self.key_commands.entry(key).or_insert(0);
        if command_id <= *applied {
            return false;
        }
        *applied = command_id;
        self.input.set(key, pressed, time);
        true
    }

    /// Wire projection, or `None` when the body no longer exists.
    pub fn to_client_player(&self, world: &PhysicsWorld, now_ms: u64) -> Option<ClientPlayer> {
        Some(ClientPlayer {
            id: self.id,
            name: self.name.clone(),
            grounded: self.movement.grounded,
            jump_debounce: self.movement.jump_debounce_active(now_ms),
            jump_released: self.movement.jump_released,
            has_double_jump: self.movement.has_double_jump,
            body: world.simple_body(self.body_id)?,
            latest_command_id: self.latest_command_id,
        })
    }
}
