//! Small math helpers shared across the simulation.
//!
//! `glam::Vec2` is the vector type everywhere outside `physics.rs`; rapier's
//! own types never leak past that module.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world pixels. Used for map objects, camera
/// viewports, and platform span checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle centered on `center`.
    pub fn centered(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// Grow the rectangle by `margin` on every side.
    pub fn inflated(&self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.w + margin * 2.0,
            self.h + margin * 2.0,
        )
    }
}

/// Rotate a vector by `angle` radians.
///
/// Movement impulses are rotated along the ground slope so a character walks
/// up an incline instead of ramming into it.
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Slope angle (radians) of a surface given its contact normal.
///
/// A flat floor in our y-down world has normal (0, -1) and angle 0.
pub fn slope_angle(normal: Vec2) -> f32 {
    normal.x.atan2(-normal.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersection_and_containment() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(20.0, 20.0, 2.0, 2.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains(Vec2::new(5.0, 5.0)));
        assert!(!a.contains(Vec2::new(-0.1, 5.0)));
    }

    #[test]
    fn flat_floor_has_zero_slope() {
        let angle = slope_angle(Vec2::new(0.0, -1.0));
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn rotate_keeps_length() {
        let v = Vec2::new(3.0, 4.0);
        let r = rotate(v, 0.7);
        assert!((r.length() - 5.0).abs() < 1e-4);
    }
}
