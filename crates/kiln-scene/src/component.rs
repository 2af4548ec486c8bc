//! The component capability trait and the name→constructor factory.
//!
//! Components are stored as `Box<dyn Component>` in the
//! [`World`](crate::world::World) arena. Everything a component may optionally
//! support (serialization, cloning, script callbacks) is a trait method with a
//! no-op default, so a capability is queried by calling the method rather than
//! by probing for it.
//!
//! Pools and "subtype" queries are keyed by *type tags*: the first tag is the
//! concrete type name, the rest name capability families (`"Collider"`,
//! `"Script"`, ...).

use std::any::Any;
use std::collections::HashMap;

use crate::id::GameObjectId;
use crate::script::Script;

// ---------------------------------------------------------------------------
// AsAny
// ---------------------------------------------------------------------------

/// Upcast helper so `dyn Component` can be downcast to its concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// An attachable unit of state and behavior.
///
/// Only [`type_tags`](Component::type_tags) is mandatory. Lifecycle hooks are
/// invoked by the world: `on_init` once after attach, `on_enable` /
/// `on_disable` when the component's active state flips, `on_destroy` once on
/// removal.
pub trait Component: AsAny {
    /// Concrete type name first, then capability family names.
    fn type_tags(&self) -> &'static [&'static str];

    /// The concrete type name used as the primary pool key.
    fn type_name(&self) -> &'static str {
        self.type_tags().first().copied().unwrap_or("Component")
    }

    /// Tags of components that must already be present on the owner.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    fn on_init(&mut self, _owner: GameObjectId) {}

    fn on_enable(&mut self) {}

    fn on_disable(&mut self) {}

    fn on_destroy(&mut self) {}

    /// Snapshot payload. `None` means the component carries no persisted data.
    fn serialize(&self) -> Option<serde_json::Value> {
        None
    }

    /// Restore from a payload previously produced by [`serialize`](Component::serialize).
    fn deserialize(&mut self, _data: &serde_json::Value) -> anyhow::Result<()> {
        Ok(())
    }

    /// Deep copy used by `World::clone_game_object`. Components returning
    /// `None` are skipped when their owner is cloned.
    fn clone_component(&self) -> Option<Box<dyn Component>> {
        None
    }

    /// Script capability: per-frame update and collision/trigger callbacks.
    fn as_script_mut(&mut self) -> Option<&mut dyn Script> {
        None
    }

    /// Whether this component reports `tag` among its type tags.
    fn has_tag(&self, tag: &str) -> bool {
        self.type_tags().iter().any(|t| *t == tag)
    }
}

/// Downcast a component trait object to its concrete type.
pub fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

/// Mutable variant of [`downcast_ref`].
pub fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

// ---------------------------------------------------------------------------
// ComponentFactory
// ---------------------------------------------------------------------------

type Constructor = Box<dyn Fn() -> Box<dyn Component>>;

/// Registry mapping a component type name to a constructor.
///
/// Used when restoring snapshots: a `{type, data}` record is rebuilt by
/// constructing a default instance and feeding it the data. Registering the
/// same name twice replaces the earlier constructor.
pub struct ComponentFactory {
    constructors: HashMap<String, Constructor>,
}

impl ComponentFactory {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register `T` under its own [`type_name`](Component::type_name).
    pub fn register<T>(&mut self) -> &'static str
    where
        T: Component + Default,
    {
        let name = T::default().type_name();
        self.register_with(name, || Box::new(T::default()));
        name
    }

    /// Register an arbitrary constructor under `name`.
    pub fn register_with<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn() -> Box<dyn Component> + 'static,
    {
        if self.constructors.contains_key(name) {
            tracing::debug!(component = %name, "replacing component constructor");
        }
        self.constructors.insert(name.to_owned(), Box::new(ctor));
    }

    /// Build a fresh instance, or `None` when the name is unknown.
    pub fn create(&self, name: &str) -> Option<Box<dyn Component>> {
        self.constructors.get(name).map(|ctor| ctor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Registered names, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("names", &self.registered_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Health(u32);

    impl Component for Health {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Health"]
        }
    }

    #[derive(Debug, Default)]
    struct Patrol;

    impl Component for Patrol {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Patrol", "Script"]
        }
    }

    #[test]
    fn type_name_is_first_tag() {
        assert_eq!(Patrol.type_name(), "Patrol");
        assert!(Patrol.has_tag("Script"));
        assert!(!Health(1).has_tag("Script"));
    }

    #[test]
    fn downcast_through_trait_object() {
        let boxed: Box<dyn Component> = Box::new(Health(7));
        assert_eq!(downcast_ref::<Health>(&*boxed), Some(&Health(7)));
        assert!(downcast_ref::<Patrol>(&*boxed).is_none());
    }

    #[test]
    fn factory_creates_by_name() {
        let mut factory = ComponentFactory::new();
        assert_eq!(factory.register::<Health>(), "Health");
        factory.register::<Patrol>();

        let made = factory.create("Health").unwrap();
        assert_eq!(made.type_name(), "Health");
        assert!(factory.create("Missing").is_none());
        assert_eq!(factory.registered_names(), vec!["Health", "Patrol"]);
    }

    #[test]
    fn optional_capabilities_default_to_none() {
        let mut h = Health(3);
        assert!(h.serialize().is_none());
        assert!(h.clone_component().is_none());
        assert!(h.as_script_mut().is_none());
        assert!(h.dependencies().is_empty());
    }
}
