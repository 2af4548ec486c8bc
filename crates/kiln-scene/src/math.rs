//! 2D vector math.
//!
//! [`Vector2`] is a small `Copy` value type. Every method returns a new value;
//! the only in-place mutations are [`Vector2::set`] and the `*Assign` operator
//! impls.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A 2D vector with `f64` components.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };
    pub const ONE: Vector2 = Vector2 { x: 1.0, y: 1.0 };
    pub const UP: Vector2 = Vector2 { x: 0.0, y: -1.0 };
    pub const DOWN: Vector2 = Vector2 { x: 0.0, y: 1.0 };
    pub const LEFT: Vector2 = Vector2 { x: -1.0, y: 0.0 };
    pub const RIGHT: Vector2 = Vector2 { x: 1.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Overwrite both components in place.
    #[inline]
    pub fn set(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction. The zero vector normalizes to zero.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    #[inline]
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Linear interpolation; `t` is not clamped.
    #[inline]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Component-wise product.
    #[inline]
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }

    /// Rotate counter-clockwise by `radians`.
    pub fn rotate(self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Angle of the vector in radians, measured from the +x axis.
    #[inline]
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Clamp each component into `[min, max]`. Never panics: an inverted
    /// range yields `max`, and a NaN bound is ignored.
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self::new(self.x.max(min.x).min(max.x), self.y.max(min.y).min(max.y))
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for Vector2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vector2 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl MulAssign<f64> for Vector2 {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn clamp_tolerates_inverted_and_nan_bounds() {
        let p = Vector2::new(5.0, -5.0);
        let lo = Vector2::new(-1.0, -1.0);
        let hi = Vector2::new(1.0, 1.0);
        assert_eq!(p.clamp(lo, hi), Vector2::new(1.0, -1.0));
        // Inverted range: no panic, result is the upper bound.
        assert_eq!(p.clamp(hi, lo), Vector2::new(-1.0, -1.0));
        let nan = Vector2::new(f64::NAN, f64::NAN);
        assert_eq!(p.clamp(nan, hi), Vector2::new(1.0, -5.0));
    }

    #[test]
    fn zero_vector_normalizes_to_zero() {
        assert_eq!(Vector2::ZERO.normalized(), Vector2::ZERO);
    }

    #[test]
    fn normalized_has_unit_length() {
        let v = Vector2::new(3.0, 4.0).normalized();
        assert!(approx(v.length(), 1.0));
        assert!(approx(v.x, 0.6));
        assert!(approx(v.y, 0.8));
    }

    #[test]
    fn arithmetic_returns_new_values() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, -1.0);
        assert_eq!(a + b, Vector2::new(4.0, 1.0));
        assert_eq!(a - b, Vector2::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));
        assert_eq!(b / 2.0, Vector2::new(1.5, -0.5));
        assert_eq!(-a, Vector2::new(-1.0, -2.0));
        // Operands untouched.
        assert_eq!(a, Vector2::new(1.0, 2.0));
    }

    #[test]
    fn in_place_setters_mutate() {
        let mut v = Vector2::new(1.0, 1.0);
        v += Vector2::new(1.0, 2.0);
        v *= 2.0;
        assert_eq!(v, Vector2::new(4.0, 6.0));
        v.set(-1.0, 0.5);
        assert_eq!(v, Vector2::new(-1.0, 0.5));
    }

    #[test]
    fn distance_and_lerp() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(6.0, 8.0);
        assert!(approx(a.distance(b), 10.0));
        assert_eq!(a.lerp(b, 0.5), Vector2::new(3.0, 4.0));
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = Vector2::RIGHT.rotate(std::f64::consts::FRAC_PI_2);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, 1.0));
    }

    #[test]
    fn dot_and_cross() {
        let a = Vector2::new(1.0, 0.0);
        let b = Vector2::new(0.0, 1.0);
        assert_eq!(a.dot(b), 0.0);
        assert_eq!(a.cross(b), 1.0);
    }
}
