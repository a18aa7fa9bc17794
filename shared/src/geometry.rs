//! Axis-aligned rectangles and the distance helpers used by every collision check.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `2 * half_extent` centred on `(cx, cy)`.
    pub fn centered(cx: f32, cy: f32, half_extent: f32) -> Self {
        Self::new(
            cx - half_extent,
            cy - half_extent,
            half_extent * 2.0,
            half_extent * 2.0,
        )
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap test. Rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() <= other.left()
            || other.right() <= self.left()
            || self.bottom() <= other.top()
            || other.bottom() <= self.top())
    }

    /// Half-open containment: `[left, right) x [top, bottom)`.
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.left() && px < self.right() && py >= self.top() && py < self.bottom()
    }
}

pub fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

/// Angle in degrees from `(ax, ay)` towards `(bx, by)`.
pub fn angle_to(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    (by - ay).atan2(bx - ax).to_degrees()
}

/// Linear falloff used by explosions: full damage at the centre, zero at the radius.
pub fn splash_damage(damage: f32, dist: f32, radius: f32) -> Option<f32> {
    if radius <= 0.0 || dist >= radius {
        return None;
    }
    Some((damage * (1.0 - dist / radius)).floor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_rect_touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_centered_rect() {
        let r = Rect::centered(100.0, 50.0, 30.0);
        assert_eq!(r.left(), 70.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.right(), 130.0);
        assert_eq!(r.bottom(), 80.0);
        assert_eq!(r.center(), (100.0, 50.0));
    }

    #[test]
    fn test_contains_point_is_half_open() {
        let r = Rect::new(0.0, 0.0, 20.0, 20.0);
        assert!(r.contains_point(0.0, 0.0));
        assert!(r.contains_point(19.9, 19.9));
        assert!(!r.contains_point(20.0, 5.0));
    }

    #[test]
    fn test_splash_falloff() {
        assert_eq!(splash_damage(300.0, 0.0, 60.0), Some(300.0));
        assert_eq!(splash_damage(300.0, 30.0, 60.0), Some(150.0));
        assert_eq!(splash_damage(300.0, 60.0, 60.0), None);
        assert_eq!(splash_damage(300.0, 90.0, 60.0), None);
    }

    #[test]
    fn test_angle_and_distance() {
        assert_approx_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0, 1e-5);
        assert_approx_eq!(angle_to(0.0, 0.0, 0.0, 10.0), 90.0, 1e-4);
        assert_approx_eq!(angle_to(0.0, 0.0, -10.0, 0.0), 180.0, 1e-4);
    }
}
