//! 2D physics: colliders, rigidbodies and the pairwise [`PhysicsSystem`].
//!
//! Each step:
//!
//! 1. Active, non-kinematic rigidbodies integrate gravity, accumulated forces
//!    and drag; the result is written to the owner's Transform velocity.
//! 2. Every active collider is gathered by scanning GameObjects in id order.
//! 3. All unordered pairs on different GameObjects are tested. Pairs are keyed
//!    by the two GameObject ids and diffed against the previous step to
//!    produce enter / stay / exit transitions.
//! 4. Transitions are dispatched to the Script components of both objects
//!    (trigger callbacks if either collider is a trigger, collision
//!    callbacks otherwise) and published on the event bus.
//! 5. Non-trigger pairs between two dynamic bodies get an impulse response.
//!
//! There is no broad phase; cost is quadratic in the number of colliders.

pub mod collider;
pub mod rigidbody;
pub mod system;

use serde::{Deserialize, Serialize};

use kiln_scene::math::Vector2;

pub use collider::{
    check_collision, resolve_collider, world_bounds, BoxCollider, Bounds, CircleCollider,
    ColliderShape, ResolvedCollider, COLLIDER_TAG,
};
pub use rigidbody::{Rigidbody, RIGIDBODY_TYPE};
pub use system::{CollisionEvent, ContactPhase, PairKey, PhysicsSystem};

/// Tunables for the physics step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Acceleration applied to every body, scaled by its `gravity_scale`.
    /// Screen coordinates: positive y points down.
    pub gravity: Vector2,
    /// Coefficient of restitution used for every impulse. 0 is perfectly
    /// inelastic, 1 perfectly elastic.
    pub restitution: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vector2::new(0.0, 9.81),
            restitution: 0.8,
        }
    }
}

impl PhysicsConfig {
    pub fn zero_gravity() -> Self {
        Self {
            gravity: Vector2::ZERO,
            ..Default::default()
        }
    }

    /// Reject non-finite gravity and restitution outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), String> {
        if !self.gravity.is_finite() {
            return Err(format!("gravity must be finite, got {}", self.gravity));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(format!(
                "restitution must be within [0, 1], got {}",
                self.restitution
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PhysicsConfig::default().validate().is_ok());
        assert_eq!(PhysicsConfig::default().restitution, 0.8);
    }

    #[test]
    fn config_validation() {
        let bad = PhysicsConfig {
            restitution: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let nan = PhysicsConfig {
            gravity: Vector2::new(f64::NAN, 0.0),
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn config_from_partial_json() {
        let cfg: PhysicsConfig = serde_json::from_str(r#"{"restitution": 0.5}"#).unwrap();
        assert_eq!(cfg.restitution, 0.5);
        assert_eq!(cfg.gravity, PhysicsConfig::default().gravity);
    }
}
