//! Tunables shared by the authoritative server and the predicting client.
//!
//! World units are pixels with +y pointing down. Velocities are in pixels per
//! second and timestamps in UTC milliseconds.

/// Downward acceleration applied by the physics world.
pub const GRAVITY: f32 = 980.0;
/// Horizontal speed while a movement key is held on the ground.
pub const PLAYER_SPEED: f32 = 300.0;
/// Fraction of `PLAYER_SPEED` available while airborne.
pub const AIR_CONTROL: f32 = 0.8;
/// Vertical velocity written on a successful jump (negative is up).
pub const JUMP_VELOCITY: f32 = -600.0;
/// Minimum time between two jumps of the same player.
pub const JUMP_DEBOUNCE_MS: u64 = 500;
/// Upper bound for the ground-jump latency compensation.
pub const MAX_JUMP_COMPENSATION_MS: u64 = 200;
/// How far below a body's extent the grounding ray reaches.
pub const GROUND_RAY_MARGIN: f32 = 5.0;
/// Tolerance used when comparing velocities for idempotent writes.
pub const VELOCITY_EPSILON: f32 = 0.01;

pub const PLAYER_RADIUS: f32 = 20.0;
pub const PLAYER_FRICTION: f32 = 0.3;

/// Bodies falling below this line are returned to the spawn point.
pub const WORLD_BOTTOM_Y: f32 = 3000.0;
/// Where frozen players are parked during the building phase.
pub const OFF_STAGE_X: f32 = -10_000.0;
pub const OFF_STAGE_Y: f32 = -10_000.0;

pub const TICK_RATE: u32 = 60;
pub const SNAPSHOT_RATE: u32 = 20;
/// Spiral-of-death guard for a single physics step.
pub const MAX_STEP_MS: u64 = 100;

pub const BUILD_TIME_MS: u64 = 10_000;
pub const PLAY_TIME_MS: u64 = 60_000;
pub const ROUND_LIMIT: u32 = 3;

/// Positional error above which the client snaps instead of blending.
pub const TELEPORT_THRESHOLD: f32 = 75.0;
/// Blend factor used for position correction and camera follow.
pub const LERP_FACTOR: f32 = 0.25;

/// Largest datagram either side will try to read.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
