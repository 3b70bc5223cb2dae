//! Common value types shared by every entity kind.

use serde::{Deserialize, Serialize};

/// 2D position or direction in world pixels. `y` grows downwards.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn len(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dist_sqr(&self, other: Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn dist(&self, other: Vec2) -> f64 {
        self.dist_sqr(other).sqrt()
    }

    pub fn normalized(&self) -> Self {
        let len = self.len();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Unit vector pointing from `self` to `target`.
    pub fn direction_to(&self, target: Vec2) -> Self {
        (target - *self).normalized()
    }

    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn angle_to(&self, target: Vec2) -> f64 {
        (target - *self).angle()
    }

    pub fn rotated(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Step towards `target` by at most `step`; lands exactly on it when closer.
    pub fn move_towards(&self, target: Vec2, step: f64) -> Self {
        let dist = self.dist(target);
        if dist <= step || dist == 0.0 {
            return target;
        }
        *self + self.direction_to(target) * step
    }

    /// Move `dist` along `angle`.
    pub fn move_in_direction(&self, dist: f64, angle: f64) -> Self {
        *self + Vec2::from_angle(angle) * dist
    }

    pub fn midpoint(&self, other: Vec2) -> Self {
        Self {
            x: (self.x + other.x) * 0.5,
            y: (self.y + other.y) * 0.5,
        }
    }

    pub fn rounded(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// Axis-aligned rectangle, used for the map bounds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_size(width: f64, height: f64) -> Self {
        Self {
            min: Vec2::ZERO,
            max: Vec2::new(width, height),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        self.min.midpoint(self.max)
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= self.min.x && pos.x < self.max.x && pos.y >= self.min.y && pos.y < self.max.y
    }

    /// Pull `pos` inside the rectangle, keeping `pad` pixels from every edge.
    pub fn clamp_pos(&self, pos: Vec2, pad: f64) -> Vec2 {
        Vec2 {
            x: pos.x.clamp(self.min.x + pad, (self.max.x - pad).max(self.min.x + pad)),
            y: pos.y.clamp(self.min.y + pad, (self.max.y - pad).max(self.min.y + pad)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_towards_lands_exactly() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a.move_towards(b, 10.0), b);
        let half = a.move_towards(b, 2.5);
        assert!((half.x - 1.5).abs() < 1e-9);
        assert!((half.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_direction_to_points_at_target() {
        let dir = Vec2::new(10.0, 10.0).direction_to(Vec2::new(10.0, 0.0));
        assert!((dir.y + 1.0).abs() < 1e-9);
        assert_eq!(Vec2::ZERO.direction_to(Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn test_rotation() {
        let v = Vec2::new(1.0, 0.0).rotated(std::f64::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-9);
        assert!((v.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_clamp() {
        let r = Rect::from_size(100.0, 50.0);
        assert_eq!(r.clamp_pos(Vec2::new(-5.0, 70.0), 10.0), Vec2::new(10.0, 40.0));
        assert!(r.contains(Vec2::new(99.0, 0.0)));
        assert!(!r.contains(Vec2::new(100.0, 0.0)));
    }
}
