//! Authoritative simulation: players, level geometry and the round lifecycle.
//!
//! The simulation is a plain value driven by the network loop. It never
//! touches sockets or clocks; callers pass the current time in and get back
//! the packets that should go out.

use crate::config::SimulationConfig;
use crate::game_mode::{freeze, teleport, GameModeMachine, RoundSettings};
use crate::level::{Level, LevelError, LevelZones};
use crate::player::{player_color, Player};
use log::{debug, error, info};
use shared::body::LABEL_PLAYER;
use shared::constants::PLAYER_RADIUS;
use shared::movement::{self, JumpKind};
use shared::{GameMode, GameState, Key, KeyEvent, Packet, PhysicsWorld, PlayerId, SimpleBody};

/// A packet produced by the simulation together with its audience.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    To { player: PlayerId, packet: Packet },
    Broadcast(Packet),
}

impl Outbound {
    pub fn packet(&self) -> &Packet {
        match self {
            Outbound::To { packet, .. } | Outbound::Broadcast(packet) => packet,
        }
    }
}

pub struct Simulation {
    config: SimulationConfig,
    world: PhysicsWorld,
    zones: LevelZones,
    players: Vec<Player>,
    game_mode: GameModeMachine,
    frame_number: u64,
    last_updated_ms: Option<u64>,
    last_broadcast_ms: Option<u64>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, level: &Level) -> Result<Self, LevelError> {
        let mut world = PhysicsWorld::new();
        let zones = level.instantiate(&mut world)?;
        let game_mode = GameModeMachine::new(RoundSettings {
            round_limit: config.round_limit,
            build_time_ms: config.build_time_ms,
            play_time_ms: config.play_time_ms,
            spawn_jitter: config.spawn_jitter,
        });

        Ok(Self {
            config,
            world,
            zones,
            players: Vec::new(),
            game_mode,
            frame_number: 0,
            last_updated_ms: None,
            last_broadcast_ms: None,
        })
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn zones(&self) -> &LevelZones {
        &self.zones
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn game_mode(&self) -> GameMode {
        self.game_mode.mode()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Creates the avatar for a newly registered player.
    ///
    /// The new player receives the static level geometry and its own ids.
    /// Registering an id twice replaces the previous avatar.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Vec<Outbound> {
        let mut outbound = Vec::new();
        if let Some(previous) = self.remove_player(id) {
            outbound.push(previous);
        }

        let template = SimpleBody::circle(self.zones.spawn_point(), PLAYER_RADIUS, false)
            .with_label(LABEL_PLAYER)
            .with_colors(player_color(id), "black");
        let body_id = match self.world.spawn(&template) {
            Ok(body_id) => body_id,
            Err(e) => {
                error!("Failed to create body for player {}: {}", id, e);
                return outbound;
            }
        };
        if self.game_mode.players_frozen() {
            freeze(&mut self.world, body_id);
        }

        info!("Player {} ({}) joined with body {}", id, name, body_id);
        self.players.push(Player::new(id, name, body_id));

        outbound.extend(self.welcome(id));
        outbound
    }

    /// Level geometry and identity for an existing player, in that order.
    ///
    /// Empty for unknown players.
    pub fn welcome(&self, id: PlayerId) -> Vec<Outbound> {
        let Some(player) = self.player(id) else {
            return Vec::new();
        };
        vec![
            Outbound::To {
                player: id,
                packet: Packet::Bodies(self.static_bodies()),
            },
            Outbound::To {
                player: id,
                packet: Packet::MyPlayer {
                    id,
                    body_id: player.body_id,
                },
            },
        ]
    }

    /// Drops a player and its body; everyone is told to forget the body.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Outbound> {
        let index = self.players.iter().position(|player| player.id == id)?;
        let player = self.players.remove(index);
        self.world.remove(player.body_id);

        info!("Player {} ({}) left", id, player.name);
        Some(Outbound::Broadcast(Packet::RemoveBodies(vec![player.body_id])))
    }

    /// Applies a key transition sent by a client.
    ///
    /// Returns `false` when the event was dropped at the boundary.
    pub fn handle_key(&mut self, id: PlayerId, event: &KeyEvent, pressed: bool) -> bool {
        let Some(key) = Key::parse_remote(&event.key) else {
            debug!("Dropping key {:?} from player {}", event.key, id);
            return false;
        };
        let Some(player) = self.players.iter_mut().find(|player| player.id == id) else {
            debug!("Dropping key from unknown player {}", id);
            return false;
        };

        if !player.apply_key(key, pressed, event.utc_time, event.command_id) {
            debug!("Player {} resent command {}", id, event.command_id);
        }
        true
    }

    /// Runs one simulation step at wall-clock time `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Outbound> {
        self.frame_number += 1;
        let delta_ms = match self.last_updated_ms {
            Some(last) => now_ms.saturating_sub(last).min(self.config.max_step_ms),
            None => 0,
        };

        let mut outbound = Vec::new();
        let mut ground_jump = false;
        let spawn_point = self.zones.spawn_point();

        for player in &mut self.players {
            let body = player.body_id;
            let Some(position) = self.world.position(body) else {
                debug!("Player {} has no body, skipping", player.id);
                continue;
            };

            if position.y > self.config.world_bottom_y {
                debug!("Player {} fell out of the world at {:?}", player.id, position);
                teleport(&mut self.world, body, spawn_point);
            }

            // Frozen avatars take no input.
            if self.world.is_static(body) == Some(true) {
                continue;
            }

            if movement::apply_input(&mut self.world, body, &mut player.movement, &player.input, now_ms)
                == Some(JumpKind::Ground)
            {
                ground_jump = true;
            }
        }

        if ground_jump {
            outbound.push(Outbound::Broadcast(Packet::GameState(self.snapshot(now_ms))));
        }

        self.world.step(delta_ms);

        let broadcast_due = self
            .last_broadcast_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.config.snapshot_interval_ms);
        if broadcast_due {
            outbound.push(Outbound::Broadcast(Packet::GameState(self.snapshot(now_ms))));
            self.last_broadcast_ms = Some(now_ms);
        }

        self.game_mode
            .evaluate(delta_ms, &mut self.world, &self.players, &self.zones);

        self.last_updated_ms = Some(now_ms);
        outbound
    }

    /// Projection of the current state for broadcasting.
    pub fn snapshot(&self, now_ms: u64) -> GameState {
        let players = self
            .players
            .iter()
            .filter_map(|player| player.to_client_player(&self.world, now_ms))
            .collect();

        let dynamic_bodies = self
            .world
            .ids()
            .filter_map(|id| self.world.simple_body(id))
            .filter(|body| !body.is_static && !body.is_player())
            .collect();

        GameState {
            frame_number: self.frame_number,
            players,
            dynamic_bodies,
            time_stamp_utc: now_ms,
            game_mode: self.game_mode.mode(),
            time_left_ms: self.game_mode.time_left_ms(),
            current_round: self.game_mode.current_round(),
            round_limit: self.game_mode.round_limit(),
        }
    }

    /// Level geometry sent once to every joining player.
    fn static_bodies(&self) -> Vec<SimpleBody> {
        self.world
            .ids()
            .filter_map(|id| self.world.simple_body(id))
            .filter(|body| body.is_static && !body.is_player())
            .collect()
    }
}
