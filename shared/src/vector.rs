use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Represents a vector in 2D space.
///
/// All operations return new values; `Vector2D` is `Copy` and never mutated
/// in place by its own methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2D {
    /// Positive direction is to the right.
    pub x: f32,
    /// Positive direction is down.
    pub y: f32,
}

impl Vector2D {
    pub const ZERO: Vector2D = Vector2D { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: Vector2D) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(&self) -> f32 {
        self.dot(*self).sqrt()
    }

    pub fn distance(&self, other: Vector2D) -> f32 {
        (*self - other).length()
    }

    /// Returns the unit vector, or zero for a zero-length input.
    pub fn normalize(&self) -> Vector2D {
        let length = self.length();
        if length == 0.0 {
            Vector2D::ZERO
        } else {
            *self * (1.0 / length)
        }
    }

    /// Moves `t` of the way from `self` towards `to`.
    pub fn lerp(&self, to: Vector2D, t: f32) -> Vector2D {
        Vector2D::new(self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
    }

    pub fn rotate(&self, radians: f32) -> Vector2D {
        let (sin, cos) = radians.sin_cos();
        Vector2D::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Rounds each component to the nearest multiple of `grid_size`.
    ///
    /// Non-positive grid sizes leave the vector untouched.
    pub fn snap_to_grid(&self, grid_size: f32) -> Vector2D {
        if grid_size <= 0.0 {
            return *self;
        }
        Vector2D::new(
            (self.x / grid_size).round() * grid_size,
            (self.y / grid_size).round() * grid_size,
        )
    }
}

impl Add for Vector2D {
    type Output = Vector2D;

    fn add(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector2D {
    type Output = Vector2D;

    fn mul(self, rhs: f32) -> Vector2D {
        Vector2D::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;

    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector2D,
    pub max: Vector2D,
}

impl Bounds {
    /// Smallest box enclosing every point. Returns `None` for no points.
    pub fn from_points(points: &[Vector2D]) -> Option<Bounds> {
        let first = *points.first()?;
        let mut bounds = Bounds {
            min: first,
            max: first,
        };
        for point in &points[1..] {
            bounds.min.x = bounds.min.x.min(point.x);
            bounds.min.y = bounds.min.y.min(point.y);
            bounds.max.x = bounds.max.x.max(point.x);
            bounds.max.y = bounds.max.y.max(point.y);
        }
        Some(bounds)
    }

    /// Inclusive on all edges.
    pub fn contains(&self, point: Vector2D) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn center(&self) -> Vector2D {
        self.min.lerp(self.max, 0.5)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}
