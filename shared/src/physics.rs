//! Rigid-body world shared by the server simulation and client prediction.
//!
//! The simulator itself is rapier2d. Everything the game attaches to a body
//! (label, render colors, collision geometry) lives in a side-table keyed by
//! [`BodyId`], so the simulator's own types never leak out of this module.
//! Every accessor that takes a `BodyId` returns `Option` or `bool`: a body that
//! has been removed is an ordinary branch, not an error.

use crate::body::{BodyError, BodyId, BodyShape, Geometry, SimpleBody};
use crate::constants::{GRAVITY, PLAYER_FRICTION};
use crate::vector::{Bounds, Vector2D};
use rapier2d::na;
use rapier2d::parry::query::RayCast;
use rapier2d::prelude::*;
use std::collections::BTreeMap;

/// Game-level data attached to a simulator body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyMeta {
    pub label: String,
    pub geometry: Geometry,
    pub is_sensor: bool,
    pub fill_color: String,
    pub stroke_color: String,
}

#[derive(Debug)]
struct Entry {
    handle: RigidBodyHandle,
    collider: ColliderHandle,
    meta: BodyMeta,
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    entries: BTreeMap<BodyId, Entry>,
    next_id: u32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        // World units are pixels.
        integration_parameters.length_unit = 100.0;

        Self {
            gravity: vector![0.0, GRAVITY],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Creates a body from a template and assigns it a fresh id.
    ///
    /// The template's own `id` is ignored.
    pub fn spawn(&mut self, template: &SimpleBody) -> Result<BodyId, BodyError> {
        let id = BodyId(self.next_id);
        self.insert(id, template)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Creates a body under the id chosen by a remote authority.
    ///
    /// Returns `Ok(false)` when the id is already present.
    pub fn insert_mirrored(&mut self, body: &SimpleBody) -> Result<bool, BodyError> {
        if body.id == BodyId::UNASSIGNED {
            return Err(BodyError::Unassigned);
        }
        if self.entries.contains_key(&body.id) {
            return Ok(false);
        }
        self.insert(body.id, body)?;
        self.next_id = self.next_id.max(body.id.0 + 1);
        Ok(true)
    }

    fn insert(&mut self, id: BodyId, template: &SimpleBody) -> Result<(), BodyError> {
        let geometry = SimpleBody { id, ..template.clone() }.geometry()?;

        let builder = if template.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let mut builder = builder
            .translation(vector![template.position.x, template.position.y])
            .rotation(template.angle)
            .linvel(vector![template.velocity.x, template.velocity.y])
            .angvel(template.angular_velocity);
        // Player avatars never tip over.
        if template.is_player() {
            builder = builder.lock_rotations();
        }
        let handle = self.bodies.insert(builder.build());

        let collider = match geometry {
            Geometry::Circle { radius } => ColliderBuilder::ball(radius),
            Geometry::Rectangle { width, height } => ColliderBuilder::cuboid(width / 2.0, height / 2.0),
        }
        .sensor(template.is_sensor)
        .friction(PLAYER_FRICTION)
        .build();
        let collider = self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        self.entries.insert(
            id,
            Entry {
                handle,
                collider,
                meta: BodyMeta {
                    label: template.label.clone(),
                    geometry,
                    is_sensor: template.is_sensor,
                    fill_color: template.fill_color.clone(),
                    stroke_color: template.stroke_color.clone(),
                },
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, id: BodyId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        self.bodies
            .remove(
                entry.handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of every body, in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.entries.keys().copied()
    }

    /// First body carrying `label`, lowest id first.
    pub fn find_by_label(&self, label: &str) -> Option<BodyId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.meta.label == label)
            .map(|(id, _)| *id)
    }

    pub fn meta(&self, id: BodyId) -> Option<&BodyMeta> {
        self.entries.get(&id).map(|entry| &entry.meta)
    }

    fn body(&self, id: BodyId) -> Option<&RigidBody> {
        let entry = self.entries.get(&id)?;
        self.bodies.get(entry.handle)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        let entry = self.entries.get(&id)?;
        self.bodies.get_mut(entry.handle)
    }

    pub fn position(&self, id: BodyId) -> Option<Vector2D> {
        let translation = self.body(id)?.translation();
        Some(Vector2D::new(translation.x, translation.y))
    }

    pub fn velocity(&self, id: BodyId) -> Option<Vector2D> {
        let linvel = self.body(id)?.linvel();
        Some(Vector2D::new(linvel.x, linvel.y))
    }

    pub fn angle(&self, id: BodyId) -> Option<f32> {
        Some(self.body(id)?.rotation().angle())
    }

    pub fn angular_velocity(&self, id: BodyId) -> Option<f32> {
        Some(self.body(id)?.angvel())
    }

    pub fn is_static(&self, id: BodyId) -> Option<bool> {
        Some(self.body(id)?.body_type() == RigidBodyType::Fixed)
    }

    pub fn set_position(&mut self, id: BodyId, position: Vector2D) -> bool {
        match self.body_mut(id) {
            Some(body) => {
                body.set_translation(vector![position.x, position.y], true);
                true
            }
            None => false,
        }
    }

    pub fn set_velocity(&mut self, id: BodyId, velocity: Vector2D) -> bool {
        match self.body_mut(id) {
            Some(body) => {
                body.set_linvel(vector![velocity.x, velocity.y], true);
                true
            }
            None => false,
        }
    }

    pub fn set_angle(&mut self, id: BodyId, angle: f32) -> bool {
        match self.body_mut(id) {
            Some(body) => {
                body.set_rotation(na::UnitComplex::new(angle), true);
                true
            }
            None => false,
        }
    }

    pub fn set_angular_velocity(&mut self, id: BodyId, angular_velocity: f32) -> bool {
        match self.body_mut(id) {
            Some(body) => {
                body.set_angvel(angular_velocity, true);
                true
            }
            None => false,
        }
    }

    /// Switches a body between fixed and dynamic.
    pub fn set_static(&mut self, id: BodyId, is_static: bool) -> bool {
        let body_type = if is_static {
            RigidBodyType::Fixed
        } else {
            RigidBodyType::Dynamic
        };
        match self.body_mut(id) {
            Some(body) => {
                body.set_body_type(body_type, true);
                true
            }
            None => false,
        }
    }

    /// Projects a body back into its wire form.
    pub fn simple_body(&self, id: BodyId) -> Option<SimpleBody> {
        let meta = self.meta(id)?;
        let body = self.body(id)?;
        let translation = body.translation();
        let linvel = body.linvel();

        let (shape, width, height, radius) = match meta.geometry {
            Geometry::Circle { radius } => (BodyShape::Circle, None, None, Some(radius)),
            Geometry::Rectangle { width, height } => (BodyShape::Rectangle, Some(width), Some(height), None),
        };

        Some(SimpleBody {
            id,
            position: Vector2D::new(translation.x, translation.y),
            velocity: Vector2D::new(linvel.x, linvel.y),
            angle: body.rotation().angle(),
            angular_velocity: body.angvel(),
            shape,
            width,
            height,
            radius,
            is_static: body.body_type() == RigidBodyType::Fixed,
            is_sensor: meta.is_sensor,
            label: meta.label.clone(),
            fill_color: meta.fill_color.clone(),
            stroke_color: meta.stroke_color.clone(),
        })
    }

    /// World-space bounding box of a body's vertices.
    pub fn bounds(&self, id: BodyId) -> Option<Bounds> {
        let geometry = self.meta(id)?.geometry;
        Some(geometry.bounds(self.position(id)?, self.angle(id)?))
    }

    /// Whether a short ray cast straight down from the body's center hits
    /// anything solid other than the body itself.
    ///
    /// The ray reaches `margin` past the body's lower extent. Sensors are
    /// ignored. Colliders are tested at their parent body's current pose, so
    /// teleports and fresh spawns are seen before the next step.
    pub fn is_grounded(&self, id: BodyId, margin: f32) -> Option<bool> {
        let entry = self.entries.get(&id)?;
        let origin = self.bodies.get(entry.handle)?.translation();
        let reach = entry.meta.geometry.extent_below() + margin;
        let ray = Ray::new(na::Point2::new(origin.x, origin.y), vector![0.0, 1.0]);

        let hit = self
            .colliders
            .iter()
            .filter(|(handle, collider)| *handle != entry.collider && !collider.is_sensor())
            .any(|(_, collider)| {
                let Some(parent) = collider.parent().and_then(|parent| self.bodies.get(parent)) else {
                    return false;
                };
                collider.shape().intersects_ray(parent.position(), &ray, reach)
            });
        Some(hit)
    }

    /// Advances the simulation by `delta_ms` milliseconds.
    pub fn step(&mut self, delta_ms: u64) {
        if delta_ms == 0 {
            return;
        }
        self.integration_parameters.dt = delta_ms as f32 / 1000.0;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::LABEL_PLAYER;
    use assert_approx_eq::assert_approx_eq;

    fn floor() -> SimpleBody {
        SimpleBody::rectangle(Vector2D::new(0.0, 100.0), 400.0, 20.0, true)
    }

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let mut world = PhysicsWorld::new();
        assert!(world.is_empty());

        let first = world.spawn(&floor()).unwrap();
        let second = world.spawn(&SimpleBody::circle(Vector2D::ZERO, 20.0, false)).unwrap();

        assert_eq!(first, BodyId(1));
        assert_eq!(second, BodyId(2));
        assert_eq!(world.len(), 2);
        assert_eq!(world.ids().collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn test_spawn_rejects_invalid_template() {
        let mut world = PhysicsWorld::new();
        let mut broken = SimpleBody::circle(Vector2D::ZERO, 20.0, false);
        broken.radius = None;

        assert!(world.spawn(&broken).is_err());
        assert!(world.is_empty());
        // A failed spawn must not burn an id.
        assert_eq!(world.spawn(&floor()).unwrap(), BodyId(1));
    }

    #[test]
    fn test_removed_body_is_a_normal_branch() {
        let mut world = PhysicsWorld::new();
        let id = world.spawn(&floor()).unwrap();

        assert!(world.remove(id));
        assert!(!world.remove(id));
        assert!(!world.contains(id));
        assert!(world.position(id).is_none());
        assert!(world.simple_body(id).is_none());
        assert!(world.is_grounded(id, 5.0).is_none());
        assert!(!world.set_velocity(id, Vector2D::ZERO));
        assert!(!world.set_static(id, true));
    }

    #[test]
    fn test_gravity_moves_dynamic_bodies_only() {
        let mut world = PhysicsWorld::new();
        let wall = world.spawn(&floor()).unwrap();
        let ball = world.spawn(&SimpleBody::circle(Vector2D::new(0.0, -500.0), 10.0, false)).unwrap();

        world.step(100);

        assert!(world.position(ball).unwrap().y > -500.0);
        assert!(world.velocity(ball).unwrap().y > 0.0);
        assert_eq!(world.position(wall), Some(Vector2D::new(0.0, 100.0)));
    }

    #[test]
    fn test_zero_step_is_noop() {
        let mut world = PhysicsWorld::new();
        let ball = world.spawn(&SimpleBody::circle(Vector2D::new(3.0, 4.0), 10.0, false)).unwrap();

        world.step(0);
        assert_eq!(world.position(ball), Some(Vector2D::new(3.0, 4.0)));
    }

    #[test]
    fn test_grounding_ignores_self_and_sensors() {
        let mut world = PhysicsWorld::new();
        let ball = world
            .spawn(&SimpleBody::circle(Vector2D::new(0.0, 68.0), 20.0, false).with_label(LABEL_PLAYER))
            .unwrap();

        // Alone in the world.
        assert_eq!(world.is_grounded(ball, 5.0), Some(false));

        // A sensor zone under the ball does not count.
        world
            .spawn(&SimpleBody::rectangle(Vector2D::new(0.0, 100.0), 400.0, 20.0, true).with_sensor(true))
            .unwrap();
        assert_eq!(world.is_grounded(ball, 5.0), Some(false));

        // Floor top edge at y=90, ray reaches 68 + 20 + 5 = 93.
        world.spawn(&floor()).unwrap();
        assert_eq!(world.is_grounded(ball, 5.0), Some(true));

        world.set_position(ball, Vector2D::new(0.0, 60.0));
        assert_eq!(world.is_grounded(ball, 5.0), Some(false));
    }

    #[test]
    fn test_grounding_follows_collider_shapes() {
        let mut world = PhysicsWorld::new();
        let ball = world
            .spawn(&SimpleBody::circle(Vector2D::new(0.0, 0.0), 20.0, false).with_label(LABEL_PLAYER))
            .unwrap();

        // A plank standing on its end: 10 wide, reaching up to y=24.
        let plank = world
            .spawn(&SimpleBody::rectangle(Vector2D::new(0.0, 74.0), 100.0, 10.0, true))
            .unwrap();
        assert_eq!(world.is_grounded(ball, 5.0), Some(false));
        world.set_angle(plank, std::f32::consts::FRAC_PI_2);
        assert_eq!(world.is_grounded(ball, 5.0), Some(true));

        // Another player's head counts as ground too.
        world.remove(plank);
        let other = world
            .spawn(&SimpleBody::circle(Vector2D::new(0.0, 42.0), 20.0, false).with_label(LABEL_PLAYER))
            .unwrap();
        assert_eq!(world.is_grounded(ball, 5.0), Some(true));
        assert_eq!(world.is_grounded(other, 5.0), Some(false));
    }

    #[test]
    fn test_freeze_and_thaw() {
        let mut world = PhysicsWorld::new();
        let ball = world.spawn(&SimpleBody::circle(Vector2D::ZERO, 10.0, false)).unwrap();

        assert!(world.set_static(ball, true));
        assert_eq!(world.is_static(ball), Some(true));
        world.step(50);
        assert_eq!(world.position(ball), Some(Vector2D::ZERO));

        assert!(world.set_static(ball, false));
        assert_eq!(world.is_static(ball), Some(false));
        world.step(50);
        assert!(world.position(ball).unwrap().y > 0.0);
    }

    #[test]
    fn test_simple_body_projection_preserves_shape() {
        let mut world = PhysicsWorld::new();
        let template = SimpleBody::rectangle(Vector2D::new(12.0, -7.5), 64.0, 16.0, false)
            .with_label("crate")
            .with_colors("brown", "black");
        let id = world.spawn(&template).unwrap();
        world.set_velocity(id, Vector2D::new(30.0, -4.0));
        world.set_angle(id, 0.5);

        let body = world.simple_body(id).unwrap();
        assert_eq!(body.id, id);
        assert_eq!(body.shape, BodyShape::Rectangle);
        assert_eq!((body.width, body.height, body.radius), (Some(64.0), Some(16.0), None));
        assert_approx_eq!(body.position.x, 12.0);
        assert_approx_eq!(body.position.y, -7.5);
        assert_approx_eq!(body.velocity.x, 30.0);
        assert_approx_eq!(body.velocity.y, -4.0);
        assert_approx_eq!(body.angle, 0.5, 1e-5);
        assert!(!body.is_static);
        assert_eq!(body.label, "crate");
        assert_eq!(body.fill_color, "brown");
    }

    #[test]
    fn test_mirrored_bodies_keep_remote_ids() {
        let mut server = PhysicsWorld::new();
        server.spawn(&floor()).unwrap();
        let ball_id = server.spawn(&SimpleBody::circle(Vector2D::new(5.0, 6.0), 20.0, false)).unwrap();
        let wire = server.simple_body(ball_id).unwrap();

        let mut client = PhysicsWorld::new();
        assert_eq!(client.insert_mirrored(&wire), Ok(true));
        assert_eq!(client.insert_mirrored(&wire), Ok(false));
        assert!(client.contains(ball_id));
        assert_eq!(client.meta(ball_id).map(|m| m.geometry), Some(Geometry::Circle { radius: 20.0 }));

        let template = SimpleBody::circle(Vector2D::ZERO, 1.0, false);
        assert_eq!(client.insert_mirrored(&template), Err(BodyError::Unassigned));
        // Locally spawned bodies never collide with mirrored ids.
        assert!(client.spawn(&template).unwrap() > ball_id);
    }

    #[test]
    fn test_find_by_label_and_bounds() {
        let mut world = PhysicsWorld::new();
        world.spawn(&floor()).unwrap();
        let zone = world
            .spawn(&SimpleBody::rectangle(Vector2D::new(50.0, 50.0), 100.0, 40.0, true).with_label("goal"))
            .unwrap();

        assert_eq!(world.find_by_label("goal"), Some(zone));
        assert_eq!(world.find_by_label("spawnZone"), None);

        let bounds = world.bounds(zone).unwrap();
        assert_approx_eq!(bounds.min.x, 0.0);
        assert_approx_eq!(bounds.min.y, 30.0);
        assert_approx_eq!(bounds.max.x, 100.0);
        assert_approx_eq!(bounds.max.y, 70.0);
    }
}
