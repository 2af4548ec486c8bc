//! Kiln Engine -- frame loop, systems, events and physics on top of
//! [`kiln_scene`].
//!
//! An [`Engine`](engine::Engine) owns a [`World`](kiln_scene::world::World)
//! and a list of [`ComponentSystem`](system::ComponentSystem)s. Every frame it
//! hands each system the active components of the types it declared, in
//! ascending priority order, and drains deferred events at fixed points of the
//! frame. Collisions, input and engine lifecycle are published on the
//! [`EventBus`](events::EventBus).
//!
//! # Quick Start
//!
//! ```
//! use kiln_engine::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig {
//!     physics: PhysicsConfig::zero_gravity(),
//!     ..Default::default()
//! })
//! .unwrap();
//! engine.register_system("transform", TransformSystem).unwrap();
//! engine.register_system("physics", PhysicsSystem::default()).unwrap();
//!
//! let world = engine.world_mut();
//! let a = world.create_game_object_with("a", Transform::at(Vector2::new(0.0, 0.0)));
//! world.add_component(a, BoxCollider::new(2.0, 2.0)).unwrap();
//! let b = world.create_game_object_with("b", Transform::at(Vector2::new(1.5, 0.0)));
//! world.add_component(b, BoxCollider::new(2.0, 2.0)).unwrap();
//!
//! engine.start();
//! engine.step(1.0 / 60.0);
//! let physics = engine.system::<PhysicsSystem>("physics").unwrap();
//! assert!(physics.is_touching(a, b));
//! ```

#![deny(unsafe_code)]

pub mod engine;
pub mod events;
pub mod input;
pub mod logging;
pub mod physics;
pub mod render;
pub mod resources;
pub mod snapshot;
pub mod system;
pub mod systems;
pub mod time;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the scene crate for convenience.
pub use kiln_scene;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by engine setup and snapshot handling.
///
/// Per-frame failures (a system update, a script callback, a single draw) are
/// logged and counted instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A configuration value is out of range or the document is malformed.
    #[error("invalid engine configuration: {details}")]
    InvalidConfig { details: String },

    /// A system's `on_init` hook failed; the system was not registered.
    #[error("system '{name}' failed to initialize: {details}")]
    SystemInit { name: String, details: String },

    /// A snapshot document could not be encoded or decoded.
    #[error("snapshot error: {details}")]
    Snapshot { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use kiln_scene::prelude::*;

    pub use crate::engine::{
        DebugInfo, Engine, EngineConfig, EngineState, FrameHandle, FrameScheduler,
        ManualScheduler, SystemInfo,
    };
    pub use crate::events::{
        EngineRequest, Event, EventBus, EventContext, EventPhase, ListenerId,
    };
    pub use crate::input::{InputEvent, InputState};
    pub use crate::physics::{
        BoxCollider, CircleCollider, ColliderShape, CollisionEvent, ContactPhase, PairKey,
        PhysicsConfig, PhysicsSystem, Rigidbody,
    };
    pub use crate::render::{
        Camera, CommandRecorder, DrawCommand, DrawContext, RenderSystem, Shape, ShapeRenderer,
        SharedDrawContext,
    };
    pub use crate::resources::{
        FsLoader, MemoryLoader, Resource, ResourceError, ResourceLoader, ResourceManager,
    };
    pub use crate::snapshot::{EngineSnapshot, TimeSnapshot};
    pub use crate::system::{priority, ComponentSystem, SystemContext, SystemStats};
    pub use crate::systems::{ScriptSystem, TransformSystem};
    pub use crate::time::Time;
    pub use crate::EngineError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Counts collision enters.
    #[derive(Default)]
    struct Bumper {
        enters: Rc<RefCell<u32>>,
    }

    impl Component for Bumper {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Bumper", "Script"]
        }

        fn as_script_mut(&mut self) -> Option<&mut dyn Script> {
            Some(self)
        }
    }

    impl Script for Bumper {
        fn on_collision_enter(&mut self, _contact: &Contact) -> anyhow::Result<()> {
            *self.enters.borrow_mut() += 1;
            Ok(())
        }
    }

    #[test]
    fn falling_box_passes_static_floor_with_one_enter() {
        let mut engine = Engine::default();
        engine.register_system("transform", TransformSystem).unwrap();
        engine.register_system("physics", PhysicsSystem::default()).unwrap();
        engine.register_system("scripts", ScriptSystem).unwrap();

        let enters = Rc::new(RefCell::new(0));
        let world = engine.world_mut();
        let floor = world.create_game_object_with("floor", Transform::at(Vector2::new(0.0, 10.0)));
        world.add_component(floor, BoxCollider::new(100.0, 1.0)).unwrap();
        let crate_ = world.create_game_object("crate");
        world.add_component(crate_, BoxCollider::new(1.0, 1.0)).unwrap();
        world.add_component(crate_, Rigidbody::default()).unwrap();
        world
            .add_component(crate_, Bumper { enters: enters.clone() })
            .unwrap();

        engine.start();
        engine.run_frames(300, 1.0 / 60.0);

        // A collider without a rigidbody gets no impulse response.
        assert_eq!(*enters.borrow(), 1);
        let y = engine.world().transform(crate_).unwrap().position.y;
        assert!(y > 11.0, "crate should have fallen past the floor: y = {y}");
        let physics = engine.system::<PhysicsSystem>("physics").unwrap();
        assert!(!physics.is_touching(floor, crate_));
    }

    #[test]
    fn error_messages_carry_details() {
        let err = EngineError::SystemInit {
            name: "physics".into(),
            details: "boom".into(),
        };
        assert_eq!(err.to_string(), "system 'physics' failed to initialize: boom");
    }
}
