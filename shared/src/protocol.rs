//! Named wire events exchanged between server and clients.

use crate::body::{BodyId, SimpleBody};
use crate::input::KeyEvent;
use serde::{Deserialize, Serialize};

/// Session identifier of a connected player, stable for one connection.
pub type PlayerId = u32;

/// Delivery class of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Queued in order; never superseded.
    Reliable,
    /// Latest value wins; may be dropped instead of queued.
    Volatile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    RegisterPlayer { name: String },
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    Disconnect,
    /// Keeps an idle session from timing out.
    Heartbeat,

    MyPlayer { id: PlayerId, body_id: BodyId },
    Bodies(Vec<SimpleBody>),
    GameState(GameState),
    RemoveBodies(Vec<BodyId>),
    Rejected { reason: String },

    /// Debug echo, rebroadcast by the server to everyone.
    Event(String),
}

impl Packet {
    pub fn event_name(&self) -> &'static str {
        match self {
            Packet::RegisterPlayer { .. } => "registerPlayer",
            Packet::KeyDown(_) => "keydown",
            Packet::KeyUp(_) => "keyup",
            Packet::Disconnect => "disconnect",
            Packet::Heartbeat => "heartbeat",
            Packet::MyPlayer { .. } => "myPlayer",
            Packet::Bodies(_) => "bodies",
            Packet::GameState(_) => "gameState",
            Packet::RemoveBodies(_) => "removeBodies",
            Packet::Rejected { .. } => "rejected",
            Packet::Event(_) => "event",
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Packet::GameState(_) | Packet::Heartbeat => Channel::Volatile,
            _ => Channel::Reliable,
        }
    }
}

/// Round lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    #[default]
    Lobby,
    BuildingStart,
    Building,
    PlayingStart,
    Playing,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Lobby => "lobby",
            GameMode::BuildingStart => "buildingStart",
            GameMode::Building => "building",
            GameMode::PlayingStart => "playingStart",
            GameMode::Playing => "playing",
        }
    }
}

/// Read-only projection of a server-side player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPlayer {
    pub id: PlayerId,
    pub name: String,
    pub grounded: bool,
    pub jump_debounce: bool,
    pub jump_released: bool,
    pub has_double_jump: bool,
    pub body: SimpleBody,
    pub latest_command_id: u32,
}

/// Point-in-time snapshot of the authoritative simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub frame_number: u64,
    pub players: Vec<ClientPlayer>,
    pub dynamic_bodies: Vec<SimpleBody>,
    #[serde(rename = "timeStampUTC")]
    pub time_stamp_utc: u64,
    pub game_mode: GameMode,
    pub time_left_ms: u64,
    pub current_round: u32,
    pub round_limit: u32,
}

impl GameState {
    pub fn player(&self, id: PlayerId) -> Option<&ClientPlayer> {
        self.players.iter().find(|player| player.id == id)
    }
}
