//! # Platformer Client Library
//!
//! This library provides the client side of the multiplayer platformer: input
//! capture, the UDP transport, a locally simulated copy of the world and
//! rendering.
//!
//! ## Architecture Overview
//!
//! The server is authoritative, but waiting a round trip before moving would
//! make the game feel sluggish. The client therefore simulates the world
//! itself and merges server snapshots into it as they arrive.
//!
//! ### Client-Side Prediction
//! Key presses are applied to the local player on the next simulation tick,
//! using the same movement rules as the server, before the server has seen
//! them.
//!
//! ### Snapshot Reconciliation
//! Each snapshot is checked before it is applied:
//! - Snapshots older than the last applied frame are dropped
//! - Snapshots that do not yet reflect every key event we sent are dropped,
//!   since applying them would pull the player back in time
//!
//! Accepted snapshots move each body towards the server position. Small
//! errors are smoothed with a lerp, large ones snap. Velocity and rotation are
//! always taken from the server as-is.
//!
//! ### Latency Ghost
//! With the debug overlay on (`I`), a ghost marks where the server's position
//! of the local player would be after the snapshot's one-way delay.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The local physics world, reconciliation, prediction and the HUD state.
//!
//! ### Input Module (`input`)
//! Keyboard sampling and command-numbered key events.
//!
//! ### Network Module (`network`)
//! The transport thread, session generations, heartbeats and registration.
//!
//! ### Session Module (`session`)
//! Per-frame glue between the network, the game state and the renderer,
//! including the fixed-delay simulation tick.
//!
//! ### Rendering Module (`rendering`) and Camera Module (`camera`)
//! Bodies, names, the HUD and debug overlay, seen through a camera that
//! trails the local player.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::NetworkClient;
//! use client::session::Session;
//! use std::time::Duration;
//!
//! async fn play() -> Result<(), Box<dyn std::error::Error>> {
//!     let network = NetworkClient::new("127.0.0.1:8080".parse()?, 0);
//!     let mut session = Session::new("alice".to_string(), network, Duration::from_millis(16));
//!
//!     // Must be driven from inside a macroquad window
//!     session.run().await
//! }
//! ```

pub mod camera;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod session;
