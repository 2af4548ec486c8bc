//! Kiln Scene -- GameObject/Component data model for the Kiln engine.
//!
//! A [`World`](world::World) owns every GameObject and component in an arena
//! keyed by id. Components implement the [`Component`](component::Component)
//! trait and are indexed per *type tag*, with a second index (the active
//! cache) holding only components that are enabled on active GameObjects.
//! Systems in `kiln-engine` iterate those indexes each frame.
//!
//! # Quick Start
//!
//! ```
//! use kiln_scene::prelude::*;
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Health(u32);
//!
//! impl Component for Health {
//!     fn type_tags(&self) -> &'static [&'static str] {
//!         &["Health"]
//!     }
//! }
//!
//! let mut world = World::new();
//! let player = world.create_game_object("player");
//! let hp = world.add_component(player, Health(10)).unwrap();
//!
//! assert_eq!(world.active_components_by_type("Health"), &[hp]);
//! world.set_active(player, false).unwrap();
//! assert!(world.active_components_by_type("Health").is_empty());
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod game_object;
pub mod id;
pub mod math;
pub mod script;
pub mod snapshot;
pub mod transform;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by scene operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The GameObject does not exist (never created or already destroyed).
    #[error("game object {0} does not exist")]
    UnknownGameObject(id::GameObjectId),

    /// The component does not exist.
    #[error("component {0} does not exist")]
    UnknownComponent(id::ComponentId),

    /// Every GameObject owns exactly one Transform.
    #[error("game object {0} already has a Transform")]
    DuplicateTransform(id::GameObjectId),

    /// Re-parenting would make an object its own ancestor.
    #[error("cannot parent {child} under {parent}: would create a cycle")]
    CyclicParent {
        child: id::GameObjectId,
        parent: id::GameObjectId,
    },

    /// A required component is not present on the GameObject.
    #[error("game object {game_object} is missing required component '{dependency}'")]
    MissingDependency {
        game_object: id::GameObjectId,
        dependency: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{downcast_mut, downcast_ref, Component, ComponentFactory};
    pub use crate::game_object::{GameObject, DEFAULT_TAG};
    pub use crate::id::{ComponentId, GameObjectId};
    pub use crate::math::Vector2;
    pub use crate::script::{Contact, Script};
    pub use crate::snapshot::{
        capture_node, capture_tree, restore_node, restore_tree, ComponentRecord, GameObjectNode,
    };
    pub use crate::transform::{Transform, TransformData, WorldTransform, TRANSFORM_TYPE};
    pub use crate::world::World;
    pub use crate::SceneError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
