//! Performance benchmarks for critical game systems

use bincode::{deserialize, serialize};
use client::game::ClientGameState;
use server::config::SimulationConfig;
use server::level::Level;
use server::simulation::{Outbound, Simulation};
use shared::constants::MAX_DATAGRAM_SIZE;
use shared::{GameState, Key, KeyEvent, Packet};
use std::time::Instant;

const PLAYERS: u32 = 16;

fn crowded_simulation() -> Simulation {
    let mut sim = Simulation::new(SimulationConfig::default(), &Level::embedded().unwrap()).unwrap();
    for id in 1..=PLAYERS {
        sim.add_player(id, format!("player{}", id));
    }
    sim
}

fn snapshot_of(outbound: &[Outbound]) -> Option<GameState> {
    outbound.iter().rev().find_map(|out| match out.packet() {
        Packet::GameState(state) => Some(state.clone()),
        _ => None,
    })
}

/// Benchmarks the authoritative tick with a full server
#[test]
fn benchmark_server_tick() {
    let mut sim = crowded_simulation();
    for id in 1..=PLAYERS {
        let key = if id % 2 == 0 { Key::D } else { Key::A };
        sim.handle_key(id, &KeyEvent::new(key, 0, 1), true);
    }

    let iterations = 600;
    let start = Instant::now();

    for i in 0..iterations {
        let _ = sim.tick(1_000 + i * 16);
    }

    let duration = start.elapsed();
    println!(
        "Server tick: {} ticks with {} players in {:?} ({:.2} μs/tick)",
        iterations,
        PLAYERS,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(sim.frame_number(), iterations);
    // Ten simulated seconds should take well under ten real ones
    assert!(duration.as_secs() < 10);
}

/// Benchmarks snapshot serialization performance
#[test]
fn benchmark_snapshot_serialization() {
    let sim = crowded_simulation();
    let packet = Packet::GameState(sim.snapshot(1_000));

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _deserialized: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// A full snapshot has to fit into a single datagram
#[test]
fn benchmark_snapshot_size() {
    let sim = crowded_simulation();
    let data = serialize(&Packet::GameState(sim.snapshot(1_000))).unwrap();
    println!("Snapshot with {} players: {} bytes", PLAYERS, data.len());
    assert!(data.len() < MAX_DATAGRAM_SIZE);

    let bodies = serialize(&Packet::Bodies(Vec::new())).unwrap();
    assert!(bodies.len() < 64);
}

/// Benchmarks client reconciliation under a steady snapshot stream
#[test]
fn benchmark_reconciliation_performance() {
    let mut sim = crowded_simulation();
    let mut client = ClientGameState::new();
    client.set_my_player(1, sim.player(1).unwrap().body_id);

    let snapshots: Vec<GameState> = (0..200)
        .filter_map(|i| snapshot_of(&sim.tick(1_000 + i * 50)))
        .collect();
    assert_eq!(snapshots.len(), 200);

    let start = Instant::now();

    for (i, state) in snapshots.iter().enumerate() {
        client.apply_server_state(state, 0, 1_000 + i as u64 * 50);
    }

    let duration = start.elapsed();
    println!(
        "Reconciliation: {} snapshots in {:?} ({:.2} μs/snapshot)",
        snapshots.len(),
        duration,
        duration.as_micros() as f64 / snapshots.len() as f64
    );

    assert_eq!(client.last_frame(), Some(200));
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks client-side prediction performance
#[test]
fn benchmark_client_prediction() {
    let mut sim = crowded_simulation();
    let mut client = ClientGameState::new();
    client.set_my_player(1, sim.player(1).unwrap().body_id);
    if let Some(state) = snapshot_of(&sim.tick(1_000)) {
        client.apply_server_state(&state, 0, 1_000);
    }

    let mut input = shared::Input::new();
    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let now = 1_000 + i * 16;
        input.set(Key::D, i % 2 == 0, now);
        input.set(Key::Space, i % 7 == 0, now);
        client.predict(&input, now);
        client.update_physics(16);
    }

    let duration = start.elapsed();
    println!(
        "Client prediction: {} predictions in {:?} ({:.2} μs/prediction)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}

/// Stress tests key event handling under high load
#[test]
fn stress_test_many_key_events() {
    let mut sim = crowded_simulation();
    let keys = [Key::A, Key::D, Key::Space, Key::ArrowLeft, Key::ArrowRight];

    let iterations = 10_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        let id = i % PLAYERS + 1;
        let key = keys[i as usize % keys.len()];
        sim.handle_key(id, &KeyEvent::new(key, i as u64, i + 1), i % 2 == 0);
    }

    let duration = start.elapsed();
    println!("Key events: {} events in {:?}", iterations, duration);

    let highest = sim.players().iter().map(|player| player.latest_command_id).max();
    assert_eq!(highest, Some(iterations));
    assert!(duration.as_millis() < 500);
}

/// Benchmarks address lookups on the receive path
#[test]
fn benchmark_client_lookup() {
    use server::client_manager::ClientManager;
    use std::net::SocketAddr;

    let mut client_manager = ClientManager::new(PLAYERS as usize);
    let addrs: Vec<SocketAddr> = (1..=PLAYERS)
        .map(|i| format!("127.0.0.1:{}", 8000 + i).parse().unwrap())
        .collect();
    for addr in &addrs {
        client_manager.add_client(*addr);
    }

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let addr = addrs[i % addrs.len()];
        assert!(client_manager.find_client_by_addr(addr).is_some());
    }

    let duration = start.elapsed();
    println!(
        "Client lookup: {} lookups in {:?} ({:.2} ns/lookup)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}
