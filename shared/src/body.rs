//! Wire-format projection of a single physics body.

use crate::vector::{Bounds, Vector2D};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const LABEL_PLAYER: &str = "player";
pub const LABEL_PLATFORM: &str = "platform";
pub const LABEL_STARTING_ZONE: &str = "startingZone";
pub const LABEL_GOAL: &str = "goal";
pub const LABEL_JOIN_GAME_ZONE: &str = "joinGameZone";
pub const LABEL_SPAWN_ZONE: &str = "spawnZone";

/// Identifier of a body inside one physics world.
///
/// Ids are handed out by the world when a body is spawned; application code
/// never picks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u32);

impl BodyId {
    /// Placeholder carried by templates that have not been spawned yet.
    pub const UNASSIGNED: BodyId = BodyId(0);
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyShape {
    Circle,
    Rectangle,
}

/// Validated collision shape of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
}

impl Geometry {
    /// Distance from the center to the lowest point at zero rotation.
    pub fn extent_below(&self) -> f32 {
        match *self {
            Geometry::Circle { radius } => radius,
            Geometry::Rectangle { height, .. } => height / 2.0,
        }
    }

    /// World-space axis-aligned box around the shape's vertices.
    pub fn bounds(&self, center: Vector2D, angle: f32) -> Bounds {
        match *self {
            Geometry::Circle { radius } => Bounds {
                min: Vector2D::new(center.x - radius, center.y - radius),
                max: Vector2D::new(center.x + radius, center.y + radius),
            },
            Geometry::Rectangle { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                let corners = [
                    Vector2D::new(-hw, -hh),
                    Vector2D::new(hw, -hh),
                    Vector2D::new(hw, hh),
                    Vector2D::new(-hw, hh),
                ]
                .map(|corner| center + corner.rotate(angle));
                // Four corners always produce a box.
                Bounds::from_points(&corners).unwrap_or(Bounds {
                    min: center,
                    max: center,
                })
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BodyError {
    #[error("circle body {0} has no radius")]
    MissingRadius(BodyId),
    #[error("rectangle body {0} is missing width or height")]
    MissingDimensions(BodyId),
    #[error("body {0} has non-positive dimensions")]
    InvalidDimensions(BodyId),
    #[error("cannot mirror a body without an id")]
    Unassigned,
}

/// Flattened, serializable state of one rigid body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleBody {
    pub id: BodyId,
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub angle: f32,
    pub angular_velocity: f32,
    pub shape: BodyShape,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub radius: Option<f32>,
    pub is_static: bool,
    pub is_sensor: bool,
    pub label: String,
    pub fill_color: String,
    pub stroke_color: String,
}

impl SimpleBody {
    pub fn rectangle(center: Vector2D, width: f32, height: f32, is_static: bool) -> Self {
        Self {
            id: BodyId::UNASSIGNED,
            position: center,
            velocity: Vector2D::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            shape: BodyShape::Rectangle,
            width: Some(width),
            height: Some(height),
            radius: None,
            is_static,
            is_sensor: false,
            label: LABEL_PLATFORM.to_string(),
            fill_color: "gray".to_string(),
            stroke_color: "black".to_string(),
        }
    }

    pub fn circle(center: Vector2D, radius: f32, is_static: bool) -> Self {
        Self {
            id: BodyId::UNASSIGNED,
            position: center,
            velocity: Vector2D::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            shape: BodyShape::Circle,
            width: None,
            height: None,
            radius: Some(radius),
            is_static,
            is_sensor: false,
            label: String::new(),
            fill_color: "gray".to_string(),
            stroke_color: "black".to_string(),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_colors(mut self, fill: &str, stroke: &str) -> Self {
        self.fill_color = fill.to_string();
        self.stroke_color = stroke.to_string();
        self
    }

    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    /// Picks the collision shape from the `shape` discriminant alone.
    pub fn geometry(&self) -> Result<Geometry, BodyError> {
        let geometry = match self.shape {
            BodyShape::Circle => Geometry::Circle {
                radius: self.radius.ok_or(BodyError::MissingRadius(self.id))?,
            },
            BodyShape::Rectangle => match (self.width, self.height) {
                (Some(width), Some(height)) => Geometry::Rectangle { width, height },
                _ => return Err(BodyError::MissingDimensions(self.id)),
            },
        };

        let valid = match geometry {
            Geometry::Circle { radius } => radius > 0.0,
            Geometry::Rectangle { width, height } => width > 0.0 && height > 0.0,
        };
        if !valid {
            return Err(BodyError::InvalidDimensions(self.id));
        }
        Ok(geometry)
    }

    pub fn is_player(&self) -> bool {
        self.label == LABEL_PLAYER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_populate_matching_fields() {
        let rect = SimpleBody::rectangle(Vector2D::new(10.0, 20.0), 100.0, 50.0, true);
        assert_eq!(rect.shape, BodyShape::Rectangle);
        assert_eq!((rect.width, rect.height, rect.radius), (Some(100.0), Some(50.0), None));
        assert_eq!(
            rect.geometry(),
            Ok(Geometry::Rectangle {
                width: 100.0,
                height: 50.0
            })
        );

        let ball = SimpleBody::circle(Vector2D::ZERO, 20.0, false);
        assert_eq!(ball.shape, BodyShape::Circle);
        assert_eq!((ball.width, ball.height, ball.radius), (None, None, Some(20.0)));
        assert_eq!(ball.geometry(), Ok(Geometry::Circle { radius: 20.0 }));
    }

    #[test]
    fn test_geometry_uses_discriminant_only() {
        let mut body = SimpleBody::circle(Vector2D::ZERO, 20.0, false);
        body.width = Some(5.0);
        body.height = Some(5.0);
        assert_eq!(body.geometry(), Ok(Geometry::Circle { radius: 20.0 }));

        body.shape = BodyShape::Rectangle;
        assert_eq!(
            body.geometry(),
            Ok(Geometry::Rectangle {
                width: 5.0,
                height: 5.0
            })
        );
    }

    #[test]
    fn test_missing_shape_fields() {
        let mut body = SimpleBody::circle(Vector2D::ZERO, 20.0, false);
        body.id = BodyId(7);
        body.radius = None;
        assert_eq!(body.geometry(), Err(BodyError::MissingRadius(BodyId(7))));

        let mut rect = SimpleBody::rectangle(Vector2D::ZERO, 10.0, 10.0, true);
        rect.height = None;
        assert_eq!(
            rect.geometry(),
            Err(BodyError::MissingDimensions(BodyId::UNASSIGNED))
        );

        let flat = SimpleBody::rectangle(Vector2D::ZERO, 10.0, 0.0, true);
        assert_eq!(
            flat.geometry(),
            Err(BodyError::InvalidDimensions(BodyId::UNASSIGNED))
        );
    }

    #[test]
    fn test_rotated_rectangle_bounds() {
        let geometry = Geometry::Rectangle {
            width: 100.0,
            height: 20.0,
        };
        let bounds = geometry.bounds(Vector2D::new(50.0, 50.0), std::f32::consts::FRAC_PI_2);
        assert!((bounds.width() - 20.0).abs() < 1e-3);
        assert!((bounds.height() - 100.0).abs() < 1e-3);
        assert!(bounds.contains(Vector2D::new(50.0, 99.0)));
    }
}
