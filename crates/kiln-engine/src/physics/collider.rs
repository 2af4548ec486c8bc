//! Box and circle colliders and their overlap predicates.
//!
//! Both collider components resolve to a world-space [`ColliderShape`] using
//! the owner's world transform (parent chain included): the local offset is
//! scaled by the world scale, and sizes are scaled by the absolute world
//! scale. Rotation is ignored; boxes are axis-aligned. Touching shapes count
//! as overlapping.
//!
//! Geometry is sanitized on the way in: a negative box size or radius is
//! rejected when loading component data, and a shape that still resolves to
//! non-finite values is left out of the physics step.

use serde::{Deserialize, Serialize};

use kiln_scene::component::Component;
use kiln_scene::id::ComponentId;
use kiln_scene::math::Vector2;
use kiln_scene::transform::WorldTransform;
use kiln_scene::world::World;

/// Capability tag shared by every collider variant.
pub const COLLIDER_TAG: &str = "Collider";

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned world bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vector2,
    pub max: Vector2,
}

impl Bounds {
    /// Bounds around `center`. The sign of `half` is ignored.
    pub fn from_center(center: Vector2, half: Vector2) -> Self {
        let half = abs(half);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn center(&self) -> Vector2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector2 {
        self.max - self.min
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        // Separating axis on x, then y.
        if self.max.x < other.min.x || other.max.x < self.min.x {
            return false;
        }
        !(self.max.y < other.min.y || other.max.y < self.min.y)
    }

    pub fn closest_point(&self, p: Vector2) -> Vector2 {
        p.clamp(self.min, self.max)
    }

    pub fn contains(&self, p: Vector2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

// ---------------------------------------------------------------------------
// ColliderShape
// ---------------------------------------------------------------------------

/// A collider resolved into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Box(Bounds),
    Circle { center: Vector2, radius: f64 },
}

impl ColliderShape {
    pub fn bounds(&self) -> Bounds {
        match *self {
            ColliderShape::Box(bounds) => bounds,
            ColliderShape::Circle { center, radius } => {
                Bounds::from_center(center, Vector2::new(radius, radius))
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            ColliderShape::Box(bounds) => bounds.is_finite(),
            ColliderShape::Circle { center, radius } => center.is_finite() && radius.is_finite(),
        }
    }

    pub fn intersects(&self, other: &ColliderShape) -> bool {
        match (*self, *other) {
            (ColliderShape::Box(a), ColliderShape::Box(b)) => a.overlaps(&b),
            (
                ColliderShape::Circle { center: ca, radius: ra },
                ColliderShape::Circle { center: cb, radius: rb },
            ) => ca.distance(cb) <= ra + rb,
            (ColliderShape::Circle { center, radius }, ColliderShape::Box(b))
            | (ColliderShape::Box(b), ColliderShape::Circle { center, radius }) => {
                b.closest_point(center).distance(center) <= radius
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Collider components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxCollider {
    pub size: Vector2,
    pub offset: Vector2,
    pub is_trigger: bool,
}

impl Default for BoxCollider {
    fn default() -> Self {
        Self {
            size: Vector2::ONE,
            offset: Vector2::ZERO,
            is_trigger: false,
        }
    }
}

impl BoxCollider {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Vector2::new(width, height),
            ..Default::default()
        }
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn shape(&self, world: &WorldTransform) -> ColliderShape {
        let center = world.position + self.offset.scale(world.scale);
        let half = self.size.scale(abs(world.scale)) * 0.5;
        ColliderShape::Box(Bounds::from_center(center, half))
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.size.is_finite() && self.size.x >= 0.0 && self.size.y >= 0.0,
            "box collider size must be finite and non-negative, got {}",
            self.size
        );
        anyhow::ensure!(self.offset.is_finite(), "box collider offset must be finite");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircleCollider {
    pub radius: f64,
    pub offset: Vector2,
    pub is_trigger: bool,
}

impl Default for CircleCollider {
    fn default() -> Self {
        Self {
            radius: 0.5,
            offset: Vector2::ZERO,
            is_trigger: false,
        }
    }
}

impl CircleCollider {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            ..Default::default()
        }
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn shape(&self, world: &WorldTransform) -> ColliderShape {
        let center = world.position + self.offset.scale(world.scale);
        let s = abs(world.scale);
        ColliderShape::Circle {
            center,
            radius: self.radius.abs() * s.x.max(s.y),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.radius.is_finite() && self.radius >= 0.0,
            "circle collider radius must be finite and non-negative, got {}",
            self.radius
        );
        anyhow::ensure!(self.offset.is_finite(), "circle collider offset must be finite");
        Ok(())
    }
}

fn abs(v: Vector2) -> Vector2 {
    Vector2::new(v.x.abs(), v.y.abs())
}

macro_rules! collider_component {
    ($ty:ty, $name:literal) => {
        impl Component for $ty {
            fn type_tags(&self) -> &'static [&'static str] {
                &[$name, COLLIDER_TAG]
            }

            fn serialize(&self) -> Option<serde_json::Value> {
                serde_json::to_value(self).ok()
            }

            fn deserialize(&mut self, data: &serde_json::Value) -> anyhow::Result<()> {
                let loaded: $ty = serde_json::from_value(data.clone())?;
                loaded.validate()?;
                *self = loaded;
                Ok(())
            }

            fn clone_component(&self) -> Option<Box<dyn Component>> {
                Some(Box::new(self.clone()))
            }
        }
    };
}

collider_component!(BoxCollider, "BoxCollider");
collider_component!(CircleCollider, "CircleCollider");

// ---------------------------------------------------------------------------
// Resolution against the world
// ---------------------------------------------------------------------------

/// A collider component resolved for one physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCollider {
    pub id: ComponentId,
    pub owner: kiln_scene::id::GameObjectId,
    pub shape: ColliderShape,
    pub is_trigger: bool,
}

/// Resolve a collider component into world space. `None` for ids that are not
/// colliders, whose owner is gone, or whose shape is not finite.
pub fn resolve_collider(world: &World, id: ComponentId) -> Option<ResolvedCollider> {
    let owner = world.component_owner(id)?;
    let wt = world.world_transform(owner)?;
    let (shape, is_trigger) = if let Some(b) = world.component::<BoxCollider>(id) {
        (b.shape(&wt), b.is_trigger)
    } else if let Some(c) = world.component::<CircleCollider>(id) {
        (c.shape(&wt), c.is_trigger)
    } else {
        return None;
    };
    if !shape.is_finite() {
        tracing::debug!(collider = %id, "non-finite collider shape skipped");
        return None;
    }
    Some(ResolvedCollider {
        id,
        owner,
        shape,
        is_trigger,
    })
}

/// World bounds of a collider component.
pub fn world_bounds(world: &World, id: ComponentId) -> Option<Bounds> {
    resolve_collider(world, id).map(|c| c.shape.bounds())
}

/// Whether two collider components overlap right now.
pub fn check_collision(world: &World, a: ComponentId, b: ComponentId) -> bool {
    match (resolve_collider(world, a), resolve_collider(world, b)) {
        (Some(a), Some(b)) => a.shape.intersects(&b.shape),
        _ => false,
    }
}
