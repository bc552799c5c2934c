//! Camera follow with dead-zone support, and the viewport that drives
//! actor visibility.

use glam::Vec2;

use crate::actor::ActorId;
use crate::math::Rect;
use crate::physics::PhysicsWorld;

/// The player's view of the world, in pixels.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec2,
    pub viewport_size: Vec2,
}

impl Camera {
    pub fn new(position: Vec2, viewport_size: Vec2) -> Self {
        Self {
            position,
            viewport_size,
        }
    }

    pub fn viewport(&self) -> Rect {
        Rect::centered(self.position, self.viewport_size.x, self.viewport_size.y)
    }

    /// Keep the viewport inside the map bounds (when the map is larger
    /// than the viewport on that axis).
    pub fn clamp_to(&mut self, bounds: Rect) {
        let half = self.viewport_size / 2.0;
        if bounds.w > self.viewport_size.x {
            self.position.x = self
                .position
                .x
                .clamp(bounds.x + half.x, bounds.x + bounds.w - half.x);
        }
        if bounds.h > self.viewport_size.y {
            self.position.y = self
                .position
                .y
                .clamp(bounds.y + half.y, bounds.y + bounds.h - half.y);
        }
    }
}

/// Camera follow behavior: the target roams freely inside a dead zone;
/// beyond it the camera trails, optionally smoothed.
#[derive(Clone, Copy, Debug)]
pub struct CameraFollow {
    pub target: Option<ActorId>,
    pub dead_zone: Vec2,
    pub smooth: bool,
    pub smooth_factor: f32,
}

impl CameraFollow {
    pub fn new() -> Self {
        Self {
            target: None,
            dead_zone: Vec2::new(100.0, 100.0),
            smooth: false,
            smooth_factor: 0.1,
        }
    }

    #[must_use]
    pub fn follow(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_dead_zone(mut self, width: f32, height: f32) -> Self {
        self.dead_zone = Vec2::new(width, height);
        self
    }

    #[must_use]
    pub fn with_smoothing(mut self, factor: f32) -> Self {
        self.smooth = true;
        self.smooth_factor = factor.clamp(0.0, 1.0);
        self
    }
}

impl Default for CameraFollow {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance the camera toward its target, honoring the dead zone.
pub fn update_camera_follow(camera: &mut Camera, follow: &CameraFollow, physics: &PhysicsWorld) {
    let Some(target_pos) = follow.target.and_then(|t| physics.position(t)) else {
        return;
    };

    let offset = target_pos - camera.position;
    let half_dead = follow.dead_zone / 2.0;
    if offset.x.abs() <= half_dead.x && offset.y.abs() <= half_dead.y {
        return;
    }

    let mut desired = camera.position;
    if offset.x.abs() > half_dead.x {
        desired.x = target_pos.x - offset.x.signum() * half_dead.x;
    }
    if offset.y.abs() > half_dead.y {
        desired.y = target_pos.y - offset.y.signum() * half_dead.y;
    }

    if follow.smooth {
        camera.position += (desired - camera.position) * follow.smooth_factor;
    } else {
        camera.position = desired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_clamps_to_large_maps_only() {
        let mut camera = Camera::new(Vec2::new(10.0, 10.0), Vec2::new(400.0, 300.0));
        camera.clamp_to(Rect::new(0.0, 0.0, 2000.0, 100.0));
        assert_eq!(camera.position.x, 200.0, "clamped to the left edge");
        assert_eq!(camera.position.y, 10.0, "short maps do not clamp y");
    }

    #[test]
    fn follow_does_not_move_inside_dead_zone() {
        let mut physics = PhysicsWorld::new();
        let target = ActorId::from_raw(1);
        crate::physics::BodyBuilder::new(crate::physics::BodyKind::Fixed, Vec2::new(520.0, 300.0))
            .fixture(crate::physics::FixtureDef::new(
                crate::physics::FixtureKind::Item,
                crate::physics::Shape::Circle { radius: 4.0 },
                crate::physics::category::ITEM,
                0,
            ))
            .build(&mut physics, target)
            .unwrap();

        let mut camera = Camera::new(Vec2::new(500.0, 300.0), Vec2::new(800.0, 600.0));
        let follow = CameraFollow::new().follow(target).with_dead_zone(100.0, 100.0);

        update_camera_follow(&mut camera, &follow, &physics);
        assert_eq!(camera.position, Vec2::new(500.0, 300.0));
    }
}
