//! The Transform component every GameObject owns.

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::math::Vector2;

/// Type tag of [`Transform`].
pub const TRANSFORM_TYPE: &str = "Transform";

/// Local position, rotation (radians) and scale, plus the velocities the
/// transform system integrates each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub position: Vector2,
    pub rotation: f64,
    pub scale: Vector2,
    /// Linear velocity in units per second, written by physics.
    pub velocity: Vector2,
    /// Angular velocity in radians per second, written by physics.
    pub angular_velocity: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector2::ZERO,
            rotation: 0.0,
            scale: Vector2::ONE,
            velocity: Vector2::ZERO,
            angular_velocity: 0.0,
        }
    }
}

impl Transform {
    pub fn at(position: Vector2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn translate(&mut self, delta: Vector2) {
        self.position += delta;
    }

    pub fn rotate(&mut self, radians: f64) {
        self.rotation += radians;
    }

    /// The persisted subset of the transform.
    pub fn data(&self) -> TransformData {
        TransformData {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    pub fn apply_data(&mut self, data: &TransformData) {
        self.position = data.position;
        self.rotation = data.rotation;
        self.scale = data.scale;
    }
}

impl Component for Transform {
    fn type_tags(&self) -> &'static [&'static str] {
        &[TRANSFORM_TYPE]
    }

    fn serialize(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.data()).ok()
    }

    fn deserialize(&mut self, data: &serde_json::Value) -> anyhow::Result<()> {
        let parsed: TransformData = serde_json::from_value(data.clone())?;
        self.apply_data(&parsed);
        Ok(())
    }

    fn clone_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

/// Snapshot layout of a transform: `{position:{x,y}, rotation, scale:{x,y}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformData {
    pub position: Vector2,
    pub rotation: f64,
    pub scale: Vector2,
}

impl Default for TransformData {
    fn default() -> Self {
        Transform::default().data()
    }
}

/// A transform resolved through the parent chain into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub position: Vector2,
    pub rotation: f64,
    pub scale: Vector2,
}

impl WorldTransform {
    pub const IDENTITY: WorldTransform = WorldTransform {
        position: Vector2::ZERO,
        rotation: 0.0,
        scale: Vector2::ONE,
    };

    /// Compose a child's local transform under this (parent) world transform.
    pub fn compose(&self, local: &Transform) -> WorldTransform {
        WorldTransform {
            position: self.position + local.position.scale(self.scale).rotate(self.rotation),
            rotation: self.rotation + local.rotation,
            scale: self.scale.scale(local.scale),
        }
    }

    /// Map a point from this transform's local space into world space.
    pub fn transform_point(&self, local: Vector2) -> Vector2 {
        self.position + local.scale(self.scale).rotate(self.rotation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_uses_snapshot_layout() {
        let mut t = Transform::at(Vector2::new(1.0, 2.0));
        t.rotation = 0.5;
        t.velocity = Vector2::new(9.0, 9.0);
        let value = t.serialize().unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "position": {"x": 1.0, "y": 2.0},
                "rotation": 0.5,
                "scale": {"x": 1.0, "y": 1.0}
            })
        );
    }

    #[test]
    fn deserialize_restores_fields() {
        let mut t = Transform::default();
        t.deserialize(&serde_json::json!({
            "position": {"x": -3.0, "y": 4.0},
            "rotation": 1.0,
            "scale": {"x": 2.0, "y": 2.0}
        }))
        .unwrap();
        assert_eq!(t.position, Vector2::new(-3.0, 4.0));
        assert_eq!(t.rotation, 1.0);
        assert_eq!(t.scale, Vector2::new(2.0, 2.0));
    }

    #[test]
    fn compose_applies_parent_scale_then_rotation() {
        let parent = WorldTransform {
            position: Vector2::new(10.0, 0.0),
            rotation: std::f64::consts::FRAC_PI_2,
            scale: Vector2::new(2.0, 2.0),
        };
        let child = Transform::at(Vector2::new(1.0, 0.0));
        let world = parent.compose(&child);
        assert!((world.position.x - 10.0).abs() < 1e-9);
        assert!((world.position.y - 2.0).abs() < 1e-9);
        assert_eq!(world.scale, Vector2::new(2.0, 2.0));
    }
}
