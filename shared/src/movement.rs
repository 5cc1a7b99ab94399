//! Movement rules applied to a player body.
//!
//! The server runs these authoritatively every tick and the client runs the
//! same code for prediction, so both sides agree on what a held key does.

use crate::body::BodyId;
use crate::constants::{
    AIR_CONTROL, GROUND_RAY_MARGIN, JUMP_DEBOUNCE_MS, JUMP_VELOCITY, MAX_JUMP_COMPENSATION_MS, PLAYER_SPEED,
    VELOCITY_EPSILON,
};
use crate::input::{Input, Key};
use crate::physics::PhysicsWorld;
use crate::vector::Vector2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Ground,
    Air,
}

/// Per-player movement flags.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementState {
    pub grounded: bool,
    /// UTC milliseconds until which another jump is refused.
    pub jump_debounce_until_ms: u64,
    pub jump_released: bool,
    pub has_double_jump: bool,
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            grounded: false,
            jump_debounce_until_ms: 0,
            jump_released: true,
            has_double_jump: true,
        }
    }
}

impl MovementState {
    pub fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
        if grounded {
            self.has_double_jump = true;
        }
    }

    pub fn jump_debounce_active(&self, now_ms: u64) -> bool {
        now_ms < self.jump_debounce_until_ms
    }

    /// Decides whether the current jump key state produces a jump.
    ///
    /// A press is only considered once: it must follow a release, and holding
    /// the key never jumps again.
    pub fn try_jump(&mut self, jump_held: bool, now_ms: u64) -> Option<JumpKind> {
        if !jump_held {
            self.jump_released = true;
            return None;
        }
        if !self.jump_released {
            return None;
        }
        self.jump_released = false;

        if self.jump_debounce_active(now_ms) {
            return None;
        }

        let kind = if self.grounded {
            JumpKind::Ground
        } else if self.has_double_jump {
            self.has_double_jump = false;
            JumpKind::Air
        } else {
            return None;
        };

        self.grounded = false;
        self.jump_debounce_until_ms = now_ms + JUMP_DEBOUNCE_MS;
        Some(kind)
    }
}

/// Horizontal velocity the held keys ask for, or `None` when the player is
/// not steering (no key, or both directions at once).
pub fn horizontal_target(input: &Input, grounded: bool) -> Option<f32> {
    let direction = match (input.left_held(), input.right_held()) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => return None,
    };
    let speed = if grounded {
        PLAYER_SPEED
    } else {
        PLAYER_SPEED * AIR_CONTROL
    };
    Some(direction * speed)
}

/// Writes `target_vx` unless the body already moves at that velocity.
///
/// Returns whether a write happened.
pub fn apply_horizontal(world: &mut PhysicsWorld, id: BodyId, target_vx: f32) -> bool {
    let Some(velocity) = world.velocity(id) else {
        return false;
    };
    if (velocity.x - target_vx).abs() <= VELOCITY_EPSILON {
        return false;
    }
    world.set_velocity(id, Vector2D::new(target_vx, velocity.y))
}

/// Overwrites vertical velocity with the jump impulse.
///
/// Ground jumps also move the body forward by the distance it would have
/// covered during `latency_ms`, capped at `MAX_JUMP_COMPENSATION_MS`.
pub fn apply_jump(world: &mut PhysicsWorld, id: BodyId, kind: JumpKind, latency_ms: u64) -> bool {
    let (Some(velocity), Some(position)) = (world.velocity(id), world.position(id)) else {
        return false;
    };

    if kind == JumpKind::Ground {
        let latency = latency_ms.min(MAX_JUMP_COMPENSATION_MS) as f32 / 1000.0;
        world.set_position(id, Vector2D::new(position.x + velocity.x * latency, position.y));
    }
    world.set_velocity(id, Vector2D::new(velocity.x, JUMP_VELOCITY))
}

/// Re-runs the grounding ray for `id`. A missing body leaves the state alone.
pub fn update_grounded(world: &PhysicsWorld, id: BodyId, state: &mut MovementState) -> Option<bool> {
    let grounded = world.is_grounded(id, GROUND_RAY_MARGIN)?;
    state.set_grounded(grounded);
    Some(grounded)
}

/// One tick of movement: grounding, held horizontal input, jump.
///
/// Returns the jump that happened, if any.
pub fn apply_input(
    world: &mut PhysicsWorld,
    id: BodyId,
    state: &mut MovementState,
    input: &Input,
    now_ms: u64,
) -> Option<JumpKind> {
    update_grounded(world, id, state)?;

    if let Some(target) = horizontal_target(input, state.grounded) {
        apply_horizontal(world, id, target);
    }

    let kind = state.try_jump(input.jump_held(), now_ms)?;
    let latency = now_ms.saturating_sub(input.state(Key::Space).time);
    apply_jump(world, id, kind, latency);
    Some(kind)
}
