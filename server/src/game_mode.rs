//! Round lifecycle: lobby, building and playing phases.

use crate::level::LevelZones;
use crate::player::Player;
use log::info;
use rand::Rng;
use shared::constants::{OFF_STAGE_X, OFF_STAGE_Y, PLAYER_RADIUS};
use shared::{BodyId, Bounds, GameMode, PhysicsWorld, Vector2D};

#[derive(Debug, Clone, PartialEq)]
pub struct RoundSettings {
    pub round_limit: u32,
    pub build_time_ms: u64,
    pub play_time_ms: u64,
    pub spawn_jitter: bool,
}

/// Parks a body off-stage and pins it in place.
pub fn freeze(world: &mut PhysicsWorld, id: BodyId) -> bool {
    world.set_static(id, true)
        && world.set_position(id, Vector2D::new(OFF_STAGE_X, OFF_STAGE_Y))
        && world.set_velocity(id, Vector2D::ZERO)
}

/// Moves a body to `position` and cancels its motion.
pub fn teleport(world: &mut PhysicsWorld, id: BodyId, position: Vector2D) -> bool {
    world.set_position(id, position) && world.set_velocity(id, Vector2D::ZERO) && world.set_angular_velocity(id, 0.0)
}

pub struct GameModeMachine {
    mode: GameMode,
    round_timer_ms: u64,
    current_round: u32,
    settings: RoundSettings,
}

impl GameModeMachine {
    pub fn new(settings: RoundSettings) -> Self {
        Self {
            mode: GameMode::Lobby,
            round_timer_ms: 0,
            current_round: 0,
            settings,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn round_limit(&self) -> u32 {
        self.settings.round_limit
    }

    /// Whether bodies should currently be parked off-stage.
    pub fn players_frozen(&self) -> bool {
        self.mode == GameMode::Building
    }

    /// Remaining time of the current phase.
    pub fn time_left_ms(&self) -> u64 {
        match self.mode {
            GameMode::Lobby => 0,
            GameMode::BuildingStart => self.settings.build_time_ms,
            GameMode::Building => self.settings.build_time_ms.saturating_sub(self.round_timer_ms),
            GameMode::PlayingStart => self.settings.play_time_ms,
            GameMode::Playing => self.settings.play_time_ms.saturating_sub(self.round_timer_ms),
        }
    }

    /// Advances the round timer and applies at most one transition.
    ///
    /// Returns the new mode when a transition happened.
    pub fn evaluate(
        &mut self,
        delta_ms: u64,
        world: &mut PhysicsWorld,
        players: &[Player],
        zones: &LevelZones,
    ) -> Option<GameMode> {
        self.round_timer_ms += delta_ms;

        let next = match self.mode {
            GameMode::Lobby => {
                if all_inside(world, players, &zones.join) {
                    GameMode::BuildingStart
                } else {
                    return None;
                }
            }
            GameMode::BuildingStart => {
                self.round_timer_ms = 0;
                self.current_round += 1;
                for player in players {
                    freeze(world, player.body_id);
                }
                GameMode::Building
            }
            GameMode::Building => {
                if self.round_timer_ms > self.settings.build_time_ms {
                    GameMode::PlayingStart
                } else {
                    return None;
                }
            }
            GameMode::PlayingStart => {
                for player in players {
                    let position = self.starting_position(&zones.starting);
                    world.set_static(player.body_id, false);
                    teleport(world, player.body_id, position);
                }
                self.round_timer_ms = 0;
                GameMode::Playing
            }
            GameMode::Playing => {
                if players.is_empty() {
                    self.current_round = 0;
                    GameMode::Lobby
                } else if all_inside(world, players, &zones.goal) || self.round_timer_ms > self.settings.play_time_ms {
                    self.complete_round(world, players, zones)
                } else {
                    return None;
                }
            }
        };

        info!(
            "Game mode {} -> {} (round {}/{})",
            self.mode.as_str(),
            next.as_str(),
            self.current_round,
            self.settings.round_limit
        );
        self.mode = next;
        Some(next)
    }

    fn complete_round(&mut self, world: &mut PhysicsWorld, players: &[Player], zones: &LevelZones) -> GameMode {
        if self.current_round < self.settings.round_limit {
            return GameMode::BuildingStart;
        }

        self.current_round = 0;
        for player in players {
            teleport(world, player.body_id, zones.spawn_point());
        }
        GameMode::Lobby
    }

    fn starting_position(&self, zone: &Bounds) -> Vector2D {
        let center = zone.center();
        let (low, high) = (zone.min.x + PLAYER_RADIUS, zone.max.x - PLAYER_RADIUS);
        if !self.settings.spawn_jitter || low >= high {
            return center;
        }
        Vector2D::new(rand::thread_rng().gen_range(low..high), center.y)
    }
}

/// True when there is at least one player and every player's body center is
/// inside `zone`.
fn all_inside(world: &PhysicsWorld, players: &[Player], zone: &Bounds) -> bool {
    !players.is_empty()
        && players.iter().all(|player| {
            world
                .position(player.body_id)
                .map_or(false, |position| zone.contains(position))
        })
}
