//! Render loop glue: routes packets, keyboard and the simulation tick.

use crate::game::{ClientGameState, SnapshotOutcome};
use crate::input::InputManager;
use crate::network::NetworkClient;
use crate::rendering::Renderer;
use log::{debug, info, warn};
use macroquad::prelude::{is_key_pressed, next_frame, KeyCode};
use shared::constants::MAX_STEP_MS;
use shared::{get_timestamp, Packet};
use std::time::{Duration, Instant};

pub struct Session {
    name: String,
    network: NetworkClient,
    game: ClientGameState,
    input: InputManager,
    renderer: Renderer,
    tick_duration: Duration,
    last_tick: Instant,
}

impl Session {
    pub fn new(name: String, network: NetworkClient, tick_duration: Duration) -> Self {
        Self {
            name,
            network,
            game: ClientGameState::new(),
            input: InputManager::new(),
            renderer: Renderer::new(),
            tick_duration,
            last_tick: Instant::now(),
        }
    }

    pub fn game(&self) -> &ClientGameState {
        &self.game
    }

    pub fn input(&self) -> &InputManager {
        &self.input
    }

    /// Runs until Escape is pressed.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect()?;

        loop {
            if is_key_pressed(KeyCode::Escape) {
                break;
            }
            if is_key_pressed(KeyCode::R) {
                info!("Reconnecting...");
                self.connect()?;
            }

            let now = get_timestamp();
            for packet in self.network.poll() {
                self.handle_packet(packet, now);
            }
            for packet in self.input.poll(now) {
                self.network.send(packet);
            }
            for packet in self.input.resend_due(now) {
                self.network.send(packet);
            }
            self.update(now);

            self.renderer
                .render(&self.game, self.input.show_debug(), self.network.is_connected());
            next_frame().await;
        }

        self.network.disconnect();
        Ok(())
    }

    /// Tears down the current world and starts a fresh session.
    ///
    /// The new server session knows none of our old command ids, so
    /// numbering starts over with it.
    fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.game = ClientGameState::new();
        self.input.reset();
        let generation = self.network.connect(&self.name)?;
        debug!("Started session {}", generation);
        self.last_tick = Instant::now();
        Ok(())
    }

    pub fn handle_packet(&mut self, packet: Packet, now_ms: u64) {
        match packet {
            Packet::MyPlayer { id, body_id } => self.game.set_my_player(id, body_id),
            Packet::Bodies(bodies) => {
                self.game.apply_static_bodies(&bodies);
            }
            Packet::GameState(state) => {
                // Acknowledgements count even when the snapshot itself is discarded.
                if let Some(me) = self.game.my_player_id().and_then(|id| state.player(id)) {
                    self.input.acknowledge(me.latest_command_id);
                }
                let outcome = self
                    .game
                    .apply_server_state(&state, self.input.last_command_id(), now_ms);
                if outcome != SnapshotOutcome::Applied {
                    debug!("Snapshot {} not applied: {:?}", state.frame_number, outcome);
                }
            }
            Packet::RemoveBodies(ids) => self.game.remove_bodies(&ids),
            Packet::Rejected { reason } => {
                warn!("Server rejected us: {}", reason);
                self.network.disconnect();
            }
            Packet::Event(message) => info!("Server event: {}", message),
            other => warn!("Unexpected packet from server: {}", other.event_name()),
        }
    }

    /// Fixed-delay simulation tick
    ///
    /// Runs at most once per frame and only while the session is alive, so a
    /// torn-down world is never stepped.
    pub fn update(&mut self, now_ms: u64) {
        if !self.network.is_connected() {
            return;
        }
        let elapsed = self.last_tick.elapsed();
        if elapsed < self.tick_duration {
            return;
        }

        let delta_ms = (elapsed.as_millis() as u64).min(MAX_STEP_MS);
        self.game.predict(self.input.input(), now_ms);
        self.game.update_physics(delta_ms);
        self.game.update_camera();
        self.last_tick = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{BodyId, ClientPlayer, GameMode, GameState, Key, SimpleBody, Vector2D};

    fn session() -> Session {
        let network = NetworkClient::new("127.0.0.1:9".parse().unwrap(), 0);
        Session::new("test".to_string(), network, Duration::from_millis(16))
    }

    fn empty_state(frame_number: u64) -> GameState {
        GameState {
            frame_number,
            players: Vec::new(),
            dynamic_bodies: Vec::new(),
            time_stamp_utc: 1_000,
            game_mode: GameMode::Building,
            time_left_ms: 5_000,
            current_round: 1,
            round_limit: 3,
        }
    }

    #[test]
    fn test_packets_reach_game_state() {
        let mut session = session();

        session.handle_packet(Packet::MyPlayer { id: 3, body_id: BodyId(8) }, 1_000);
        assert_eq!(session.game().my_player_id(), Some(3));
        assert_eq!(session.game().my_body(), Some(BodyId(8)));

        session.handle_packet(Packet::GameState(empty_state(4)), 1_020);
        assert_eq!(session.game().last_frame(), Some(4));
        assert_eq!(session.game().hud().game_mode, GameMode::Building);
        assert_eq!(session.game().hud().ping_ms, 20);

        session.handle_packet(Packet::RemoveBodies(vec![BodyId(8)]), 1_040);
        assert_eq!(session.game().my_body(), None);
    }

    fn snapshot_with_me(frame_number: u64, latest_command_id: u32) -> GameState {
        let body = SimpleBody {
            id: BodyId(8),
            ..SimpleBody::circle(Vector2D::new(0.0, 0.0), 20.0, false).with_label("player")
        };
        GameState {
            players: vec![ClientPlayer {
                id: 3,
                name: "test".to_string(),
                grounded: false,
                jump_debounce: false,
                jump_released: true,
                has_double_jump: true,
                body,
                latest_command_id,
            }],
            ..empty_state(frame_number)
        }
    }

    #[test]
    fn test_reconnect_accepts_fresh_server_snapshots() {
        let mut session = session();
        session.handle_packet(Packet::MyPlayer { id: 3, body_id: BodyId(8) }, 1_000);
        for (i, key) in [Key::D, Key::A, Key::Space].into_iter().enumerate() {
            session.input.handle_key(key, true, 1_000 + i as u64);
        }
        assert_eq!(session.input().last_command_id(), 3);

        session.connect().unwrap();
        assert_eq!(session.input().last_command_id(), 0);

        // The new server session has seen no commands at all.
        session.handle_packet(Packet::MyPlayer { id: 3, body_id: BodyId(8) }, 2_000);
        session.handle_packet(Packet::GameState(snapshot_with_me(1, 0)), 2_000);
        assert_eq!(session.game().last_frame(), Some(1));
        assert!(session.game().world().contains(BodyId(8)));
        assert_eq!(session.game().hud().discarded_snapshots, 0);
    }

    #[test]
    fn test_lagging_snapshot_still_acknowledges() {
        let mut session = session();
        session.handle_packet(Packet::MyPlayer { id: 3, body_id: BodyId(8) }, 1_000);
        session.input.handle_key(Key::D, true, 1_000);
        session.input.handle_key(Key::D, false, 1_050);

        // Only the press reached the server.
        session.handle_packet(Packet::GameState(snapshot_with_me(1, 1)), 1_100);
        assert_eq!(session.game().last_frame(), None);
        assert_eq!(session.input().unacknowledged(), 1);

        session.handle_packet(Packet::GameState(snapshot_with_me(2, 2)), 1_400);
        assert_eq!(session.game().last_frame(), Some(2));
        assert_eq!(session.input().unacknowledged(), 0);
    }

    #[test]
    fn test_update_requires_live_session() {
        let mut session = session();
        session.handle_packet(Packet::MyPlayer { id: 3, body_id: BodyId(8) }, 1_000);
        std::thread::sleep(Duration::from_millis(20));

        let before = session.last_tick;
        session.update(1_020);
        assert_eq!(session.last_tick, before);
    }
}
