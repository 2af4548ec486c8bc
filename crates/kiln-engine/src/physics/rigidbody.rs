//! Rigidbody component: mass, damping and accumulated forces.

use serde::{Deserialize, Serialize};

use kiln_scene::component::Component;
use kiln_scene::math::Vector2;

pub const RIGIDBODY_TYPE: &str = "Rigidbody";

/// Dynamic body state integrated by the physics system.
///
/// `force` and `torque` accumulate between steps and are cleared after each
/// integration. Kinematic bodies are neither integrated nor pushed by
/// collision impulses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rigidbody {
    pub mass: f64,
    pub drag: f64,
    pub angular_drag: f64,
    pub gravity_scale: f64,
    pub is_kinematic: bool,
    pub velocity: Vector2,
    pub angular_velocity: f64,
    #[serde(skip)]
    pub force: Vector2,
    #[serde(skip)]
    pub torque: f64,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            mass: 1.0,
            drag: 0.0,
            angular_drag: 0.05,
            gravity_scale: 1.0,
            is_kinematic: false,
            velocity: Vector2::ZERO,
            angular_velocity: 0.0,
            force: Vector2::ZERO,
            torque: 0.0,
        }
    }
}

impl Rigidbody {
    pub fn with_mass(mass: f64) -> Self {
        Self {
            mass,
            ..Default::default()
        }
    }

    pub fn kinematic() -> Self {
        Self {
            is_kinematic: true,
            ..Default::default()
        }
    }

    pub fn add_force(&mut self, force: Vector2) {
        self.force += force;
    }

    pub fn add_torque(&mut self, torque: f64) {
        self.torque += torque;
    }

    /// Instantaneous change of velocity: `Δv = impulse / mass`.
    pub fn apply_impulse(&mut self, impulse: Vector2) {
        if self.is_kinematic {
            return;
        }
        self.velocity += impulse * self.inverse_mass();
    }

    /// `1 / mass`, or zero for kinematic or massless bodies.
    pub fn inverse_mass(&self) -> f64 {
        if self.is_kinematic || self.mass <= 0.0 || !self.mass.is_finite() {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Advance velocities by `dt` under `gravity`, apply drag, and clear the
    /// accumulated force and torque.
    pub fn integrate(&mut self, gravity: Vector2, dt: f64) {
        let inv_mass = self.inverse_mass();
        if inv_mass == 0.0 {
            self.clear_forces();
            return;
        }
        self.force += gravity * (self.mass * self.gravity_scale);

        let acceleration = self.force * inv_mass;
        self.velocity += acceleration * dt;
        self.velocity *= (1.0 - self.drag * dt).max(0.0);

        let angular_acceleration = self.torque * inv_mass;
        self.angular_velocity += angular_acceleration * dt;
        self.angular_velocity *= (1.0 - self.angular_drag * dt).max(0.0);

        self.clear_forces();
    }

    fn clear_forces(&mut self) {
        self.force = Vector2::ZERO;
        self.torque = 0.0;
    }
}

impl Component for Rigidbody {
    fn type_tags(&self) -> &'static [&'static str] {
        &[RIGIDBODY_TYPE]
    }

    fn serialize(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }

    fn deserialize(&mut self, data: &serde_json::Value) -> anyhow::Result<()> {
        let parsed: Rigidbody = serde_json::from_value(data.clone())?;
        anyhow::ensure!(parsed.mass > 0.0, "rigidbody mass must be positive, got {}", parsed.mass);
        *self = parsed;
        Ok(())
    }

    fn clone_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_accelerates_regardless_of_mass() {
        let gravity = Vector2::new(0.0, 10.0);
        let mut light = Rigidbody::with_mass(1.0);
        let mut heavy = Rigidbody::with_mass(50.0);
        light.integrate(gravity, 0.5);
        heavy.integrate(gravity, 0.5);
        assert_eq!(light.velocity, Vector2::new(0.0, 5.0));
        assert_eq!(heavy.velocity, light.velocity);
    }

    #[test]
    fn forces_clear_after_integration() {
        let mut body = Rigidbody {
            gravity_scale: 0.0,
            ..Default::default()
        };
        body.add_force(Vector2::new(4.0, 0.0));
        body.add_torque(2.0);
        body.integrate(Vector2::ZERO, 1.0);
        assert_eq!(body.velocity, Vector2::new(4.0, 0.0));
        assert_eq!(body.force, Vector2::ZERO);
        assert_eq!(body.torque, 0.0);
        body.integrate(Vector2::ZERO, 1.0);
        assert_eq!(body.velocity, Vector2::new(4.0, 0.0));
    }

    #[test]
    fn drag_never_reverses_velocity() {
        let mut body = Rigidbody {
            drag: 100.0,
            gravity_scale: 0.0,
            velocity: Vector2::new(3.0, -3.0),
            ..Default::default()
        };
        body.integrate(Vector2::ZERO, 0.1);
        assert_eq!(body.velocity, Vector2::ZERO);
    }

    #[test]
    fn kinematic_ignores_impulses_and_gravity() {
        let mut body = Rigidbody::kinematic();
        body.velocity = Vector2::new(1.0, 0.0);
        body.apply_impulse(Vector2::new(100.0, 0.0));
        body.integrate(Vector2::new(0.0, 10.0), 1.0);
        assert_eq!(body.velocity, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn deserialize_rejects_non_positive_mass() {
        let mut body = Rigidbody::default();
        assert!(body.deserialize(&serde_json::json!({"mass": 0.0})).is_err());
        body.deserialize(&serde_json::json!({"mass": 2.0, "drag": 0.5}))
            .unwrap();
        assert_eq!(body.mass, 2.0);
        assert_eq!(body.gravity_scale, 1.0);
    }
}
