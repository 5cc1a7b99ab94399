//! Client-side world: snapshot reconciliation and local prediction.
//!
//! The client keeps its own physics world that mirrors the server's ids.
//! Between snapshots the local player is driven by the same movement rules
//! the server uses; when a snapshot arrives every tracked body is pulled
//! towards the authoritative state, either by snapping or by lerping.

use crate::camera::Camera;
use log::{debug, info, warn};
use shared::body::LABEL_PLAYER;
use shared::constants::{LERP_FACTOR, TELEPORT_THRESHOLD};
use shared::movement::{self, JumpKind};
use shared::{BodyId, GameMode, GameState, Input, MovementState, PhysicsWorld, PlayerId, SimpleBody, Vector2D};
use std::collections::HashMap;

/// What happened to an inbound snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied,
    /// Older than the last applied frame.
    Stale,
    /// The server has not yet seen every command we sent.
    CommandLag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    Snap,
    Lerp,
}

/// Pulls `local` towards `server`: snaps when further apart than
/// `threshold`, otherwise moves `factor` of the way.
pub fn correct_position(local: Vector2D, server: Vector2D, threshold: f32, factor: f32) -> (Vector2D, Correction) {
    if local.distance(server) > threshold {
        (server, Correction::Snap)
    } else {
        (local.lerp(server, factor), Correction::Lerp)
    }
}

/// Round information shown in the HUD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hud {
    pub game_mode: GameMode,
    pub time_left_ms: u64,
    pub current_round: u32,
    pub round_limit: u32,
    /// One-way delay estimated from the snapshot timestamp.
    pub ping_ms: u64,
    pub discarded_snapshots: u64,
}

pub struct ClientGameState {
    world: PhysicsWorld,
    my_player_id: Option<PlayerId>,
    my_body: Option<BodyId>,
    movement: MovementState,
    last_frame: Option<u64>,
    ghost: Option<Vector2D>,
    names: HashMap<BodyId, String>,
    camera: Camera,
    hud: Hud,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            world: PhysicsWorld::new(),
            my_player_id: None,
            my_body: None,
            movement: MovementState::default(),
            last_frame: None,
            ghost: None,
            names: HashMap::new(),
            camera: Camera::default(),
            hud: Hud::default(),
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn my_player_id(&self) -> Option<PlayerId> {
        self.my_player_id
    }

    pub fn my_body(&self) -> Option<BodyId> {
        self.my_body
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Latency-advanced server position of the local player.
    pub fn ghost(&self) -> Option<Vector2D> {
        self.ghost
    }

    pub fn player_name(&self, body: BodyId) -> Option<&str> {
        self.names.get(&body).map(String::as_str)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    /// Level geometry sent once after registering.
    ///
    /// Returns how many bodies were added.
    pub fn apply_static_bodies(&mut self, bodies: &[SimpleBody]) -> usize {
        let mut added = 0;
        for body in bodies {
            match self.world.insert_mirrored(body) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => warn!("Skipping level body {}: {}", body.id, e),
            }
        }
        debug!("Mirrored {} of {} level bodies", added, bodies.len());
        added
    }

    pub fn set_my_player(&mut self, id: PlayerId, body: BodyId) {
        info!("Controlling player {} with body {}", id, body);
        self.my_player_id = Some(id);
        self.my_body = Some(body);
        self.movement = MovementState::default();
    }

    pub fn remove_bodies(&mut self, ids: &[BodyId]) {
        for &id in ids {
            self.world.remove(id);
            self.names.remove(&id);
            if self.my_body == Some(id) {
                self.my_body = None;
                self.ghost = None;
            }
        }
    }

    /// Merges an authoritative snapshot into the local world.
    ///
    /// `highest_sent_command` is the newest command id this client has sent.
    pub fn apply_server_state(&mut self, state: &GameState, highest_sent_command: u32, now_ms: u64) -> SnapshotOutcome {
        if let Some(last) = self.last_frame {
            if state.frame_number < last {
                debug!("Discarding stale frame {} (last {})", state.frame_number, last);
                self.hud.discarded_snapshots += 1;
                return SnapshotOutcome::Stale;
            }
        }

        if let Some(me) = self.my_player_id.and_then(|id| state.player(id)) {
            if me.latest_command_id < highest_sent_command {
                debug!(
                    "Discarding frame {}: server at command {}, sent {}",
                    state.frame_number, me.latest_command_id, highest_sent_command
                );
                self.hud.discarded_snapshots += 1;
                return SnapshotOutcome::CommandLag;
            }
        }

        self.last_frame = Some(state.frame_number);

        for body in &state.dynamic_bodies {
            if self.world.contains(body.id) {
                self.world.set_position(body.id, body.position);
                self.set_motion(body);
            } else if let Err(e) = self.world.insert_mirrored(body) {
                warn!("Skipping dynamic body {}: {}", body.id, e);
            }
        }

        for player in &state.players {
            let body = &player.body;
            self.names.insert(body.id, player.name.clone());

            if !self.world.contains(body.id) {
                let template = SimpleBody {
                    label: LABEL_PLAYER.to_string(),
                    ..body.clone()
                };
                if let Err(e) = self.world.insert_mirrored(&template) {
                    warn!("Skipping player {} body {}: {}", player.id, body.id, e);
                }
                continue;
            }

            if self.world.is_static(body.id) != Some(body.is_static) {
                self.world.set_static(body.id, body.is_static);
            }

            if let Some(local) = self.world.position(body.id) {
                let (position, correction) =
                    correct_position(local, body.position, TELEPORT_THRESHOLD, LERP_FACTOR);
                if correction == Correction::Snap {
                    debug!("Snapping body {} by {:.1}px", body.id, local.distance(body.position));
                }
                self.world.set_position(body.id, position);
            }
            self.set_motion(body);
        }

        self.ghost = self
            .my_player_id
            .and_then(|id| state.player(id))
            .map(|me| {
                let elapsed = now_ms.saturating_sub(state.time_stamp_utc) as f32 / 1000.0;
                me.body.position + me.body.velocity * elapsed
            });

        self.hud.game_mode = state.game_mode;
        self.hud.time_left_ms = state.time_left_ms;
        self.hud.current_round = state.current_round;
        self.hud.round_limit = state.round_limit;
        self.hud.ping_ms = now_ms.saturating_sub(state.time_stamp_utc);

        SnapshotOutcome::Applied
    }

    // Velocity and rotation are never interpolated.
    fn set_motion(&mut self, body: &SimpleBody) {
        self.world.set_velocity(body.id, body.velocity);
        self.world.set_angle(body.id, body.angle);
        self.world.set_angular_velocity(body.id, body.angular_velocity);
    }

    /// Applies held input to the local player ahead of the server.
    pub fn predict(&mut self, input: &Input, now_ms: u64) -> Option<JumpKind> {
        let body = self.my_body?;
        // Parked players take no input.
        if self.world.is_static(body)? {
            return None;
        }
        movement::apply_input(&mut self.world, body, &mut self.movement, input, now_ms)
    }

    pub fn update_physics(&mut self, delta_ms: u64) {
        self.world.step(delta_ms);
    }

    pub fn update_camera(&mut self) {
        if let Some(position) = self.my_body.and_then(|body| self.world.position(body)) {
            self.camera.follow(position);
        }
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
