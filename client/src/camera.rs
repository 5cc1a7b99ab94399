//! Camera that trails the local player.

use shared::constants::LERP_FACTOR;
use shared::Vector2D;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World position shown at the center of the screen.
    pub position: Vector2D,
    pub smoothing: f32,
}

impl Camera {
    pub fn new(position: Vector2D) -> Self {
        Self {
            position,
            smoothing: LERP_FACTOR,
        }
    }

    /// Moves a fixed fraction of the remaining distance towards `target`.
    pub fn follow(&mut self, target: Vector2D) {
        self.position = self.position.lerp(target, self.smoothing);
    }

    pub fn snap_to(&mut self, target: Vector2D) {
        self.position = target;
    }

    pub fn world_to_screen(&self, world: Vector2D, screen_width: f32, screen_height: f32) -> Vector2D {
        world - self.position + Vector2D::new(screen_width / 2.0, screen_height / 2.0)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector2D::ZERO)
    }
}
