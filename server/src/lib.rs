//! # Platformer Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! platformer. It owns the canonical physics world, applies player input,
//! runs the round lifecycle and broadcasts snapshots that clients reconcile
//! against.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the definitive rigid-body simulation. Clients predict with
//! the same movement rules, but whenever the two disagree the server's
//! snapshot wins.
//!
//! ### Session Management
//! Handles the lifecycle of client connections:
//! - Registration and player id assignment
//! - Key event validation against the key allowlist
//! - Disconnection and timeout cleanup
//!
//! ### State Broadcasting
//! Snapshots are sent at a lower rate than the simulation ticks and on a
//! volatile path: a snapshot that could not be sent before the next one was
//! produced is simply replaced. Level geometry, player identity and body
//! removals go through an ordered reliable queue instead.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! All simulation state is owned by one loop that handles inbound messages
//! and ticks one after another. Socket reads, socket writes and timeout
//! checks run as separate tasks that only move messages through channels,
//! so input handling and stepping never race.
//!
//! ### Fixed-Delay Ticks
//! The next tick is armed after the current one completes. A slow tick
//! delays the following one rather than overlapping it, and the physics step
//! is clamped so a long pause never produces a huge, destabilizing step.
//!
//! ### Round Lifecycle
//! Players gather in a join zone in the lobby, are parked off-stage while the
//! level is being built, then race from the starting zone to the goal. After
//! the configured number of rounds everyone returns to the lobby.
//!
//! ## Module Organization
//!
//! ### Simulation Module (`simulation`)
//! The authoritative tick: fall-through recovery, grounding, held input,
//! physics stepping, snapshot cadence.
//!
//! ### Game Mode Module (`game_mode`)
//! The lobby / building / playing state machine and its zone checks.
//!
//! ### Level Module (`level`)
//! JSON level records, zone validation and world construction.
//!
//! ### Client Manager Module (`client_manager`)
//! Address to session mapping, capacity limits and timeouts.
//!
//! ### Network Module (`network`)
//! UDP socket tasks, reliable and volatile dispatch, the main loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::SimulationConfig;
//! use server::level::Level;
//! use server::network::Server;
//! use server::simulation::Simulation;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let level = Level::embedded()?;
//!     let simulation = Simulation::new(SimulationConfig::default(), &level)?;
//!
//!     // 60Hz ticks, at most 16 players
//!     let mut server = Server::new("127.0.0.1:8080", Duration::from_millis(16), 16, simulation).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game_mode;
pub mod level;
pub mod network;
pub mod player;
pub mod simulation;
