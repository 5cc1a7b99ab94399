//! Types and rules shared by the platformer server and client.
//!
//! Both sides run the same [`physics::PhysicsWorld`] and the same
//! [`movement`] rules; the server's copy is authoritative and the client's is
//! a prediction corrected by [`protocol::GameState`] snapshots.

pub mod body;
pub mod constants;
pub mod input;
pub mod movement;
pub mod physics;
pub mod protocol;
pub mod vector;

pub use body::{BodyError, BodyId, BodyShape, Geometry, SimpleBody};
pub use input::{Input, Key, KeyEvent};
pub use movement::{JumpKind, MovementState};
pub use physics::{BodyMeta, PhysicsWorld};
pub use protocol::{Channel, ClientPlayer, GameMode, GameState, Packet, PlayerId};
pub use vector::{Bounds, Vector2D};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in UTC milliseconds.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use bincode::{deserialize, serialize};

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let first = get_timestamp();
        let second = get_timestamp();
        assert!(second >= first);
        assert!(first > 1_600_000_000_000);
    }

    #[test]
    fn test_bodies_packet_selects_shape_from_discriminant() {
        let mut world = PhysicsWorld::new();
        let ball = world.spawn(&SimpleBody::circle(Vector2D::new(1.5, -2.0), 12.0, false)).unwrap();
        let slab = world
            .spawn(&SimpleBody::rectangle(Vector2D::new(40.0, 80.0), 200.0, 16.0, true))
            .unwrap();
        world.set_velocity(ball, Vector2D::new(7.0, 3.0));
        world.set_angle(ball, 0.25);

        let bodies: Vec<SimpleBody> = [ball, slab].iter().filter_map(|id| world.simple_body(*id)).collect();
        let data = serialize(&Packet::Bodies(bodies)).unwrap();
        let Packet::Bodies(received) = deserialize::<Packet>(&data).unwrap() else {
            panic!("Wrong packet type after deserialization");
        };

        let mut mirror = PhysicsWorld::new();
        for body in &received {
            assert_eq!(mirror.insert_mirrored(body), Ok(true));
        }

        assert_eq!(mirror.meta(ball).map(|m| m.geometry), Some(Geometry::Circle { radius: 12.0 }));
        assert_eq!(
            mirror.meta(slab).map(|m| m.geometry),
            Some(Geometry::Rectangle {
                width: 200.0,
                height: 16.0
            })
        );
        assert_eq!(mirror.position(ball), world.position(ball));
        assert_eq!(mirror.velocity(ball), world.velocity(ball));
        assert!((mirror.angle(ball).unwrap() - 0.25).abs() < 1e-5);
        assert_eq!(mirror.is_static(slab), Some(true));
    }
}
