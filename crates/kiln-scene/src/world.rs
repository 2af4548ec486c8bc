//! The [`World`] is the arena that owns every GameObject and component.
//!
//! Besides storage it maintains two per-tag indexes:
//!
//! - the *component map*: every registered component under each of its type
//!   tags, in insertion order;
//! - the *active cache*: the subset whose `enabled` flag is set and whose owner
//!   is active.
//!
//! The active cache is patched on every mutation that can change membership
//! (attach, removal, enable toggles, owner activation) and is never rebuilt
//! from scratch. `active_cache[tag] ⊆ component_map[tag]` always holds.

use std::collections::{BTreeMap, HashMap};

use crate::component::{downcast_mut, downcast_ref, Component};
use crate::game_object::GameObject;
use crate::id::{ComponentId, GameObjectId, IdAllocator};
use crate::script::Script;
use crate::transform::{Transform, WorldTransform, TRANSFORM_TYPE};
use crate::SceneError;

// ---------------------------------------------------------------------------
// ComponentSlot
// ---------------------------------------------------------------------------

/// Arena entry for one component instance.
struct ComponentSlot {
    /// Assigned once at attach; never changes.
    owner: GameObjectId,
    enabled: bool,
    /// Whether the component is currently registered in the pools.
    registered: bool,
    /// Whether the component currently sits in the active cache.
    cached_active: bool,
    tags: &'static [&'static str],
    component: Box<dyn Component>,
}

fn remove_id(list: &mut Vec<ComponentId>, id: ComponentId) -> bool {
    match list.iter().position(|c| *c == id) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Arena of GameObjects and components with per-tag pools.
pub struct World {
    ids: IdAllocator,
    game_objects: BTreeMap<GameObjectId, GameObject>,
    components: HashMap<ComponentId, ComponentSlot>,
    component_map: HashMap<String, Vec<ComponentId>>,
    active_cache: HashMap<String, Vec<ComponentId>>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("game_object_count", &self.game_objects.len())
            .field("component_count", &self.components.len())
            .field("pool_count", &self.component_map.len())
            .finish()
    }
}

impl World {
    /// Create an empty world. Ids start at 1 and are never reused.
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
            game_objects: BTreeMap::new(),
            components: HashMap::new(),
            component_map: HashMap::new(),
            active_cache: HashMap::new(),
        }
    }

    // -- GameObject lifecycle -------------------------------------------------

    /// Create a root GameObject with a fresh Transform.
    pub fn create_game_object(&mut self, name: &str) -> GameObjectId {
        let id = self.ids.next_game_object();
        let transform_id = self.ids.next_component();
        self.game_objects
            .insert(id, GameObject::new(id, name, transform_id));
        self.insert_slot(id, transform_id, Box::new(Transform::default()));
        tracing::trace!(game_object = %id, name, "created game object");
        id
    }

    /// Create a GameObject whose Transform starts at the given values.
    pub fn create_game_object_with(&mut self, name: &str, transform: Transform) -> GameObjectId {
        let id = self.create_game_object(name);
        if let Some(t) = self.transform_mut(id) {
            *t = transform;
        }
        id
    }

    /// Destroy a GameObject and its whole subtree.
    ///
    /// Children go first, then every own component is unregistered and gets
    /// `on_destroy`, then the object leaves its parent and the registry.
    /// Returns `false` if the object is unknown or already being destroyed.
    pub fn destroy(&mut self, id: GameObjectId) -> bool {
        let (children, components) = match self.game_objects.get_mut(&id) {
            Some(go) if !go.destroying => {
                go.destroying = true;
                (go.children.clone(), go.components.clone())
            }
            _ => return false,
        };

        for child in children {
            self.destroy(child);
        }

        for component in components {
            self.drop_component(component);
        }

        self.unlink_from_parent(id);

        if let Some(go) = self.game_objects.remove(&id) {
            tracing::trace!(game_object = %id, name = %go.name, "destroyed game object");
        }
        true
    }

    /// Destroy every GameObject and release all pools.
    pub fn clear(&mut self) {
        let roots = self.root_game_objects();
        for root in roots {
            self.destroy(root);
        }
        // Anything left means a broken parent link; destroy it anyway.
        let leftovers: Vec<GameObjectId> = self.game_objects.keys().copied().collect();
        for id in leftovers {
            self.destroy(id);
        }
        self.components.clear();
        self.component_map.clear();
        self.active_cache.clear();
    }

    // -- GameObject access ----------------------------------------------------

    /// The GameObject record for `id`, or `None` if it is not live.
    pub fn game_object(&self, id: GameObjectId) -> Option<&GameObject> {
        self.game_objects.get(&id)
    }

    /// Mutable access for name and tag edits. Activation and hierarchy changes
    /// go through [`set_active`](Self::set_active) and
    /// [`set_parent`](Self::set_parent).
    pub fn game_object_mut(&mut self, id: GameObjectId) -> Option<&mut GameObject> {
        self.game_objects.get_mut(&id)
    }

    /// Whether `id` names a live GameObject. False once it is destroyed.
    pub fn contains(&self, id: GameObjectId) -> bool {
        self.game_objects.contains_key(&id)
    }

    /// All live GameObject ids in ascending order.
    pub fn game_object_ids(&self) -> Vec<GameObjectId> {
        self.game_objects.keys().copied().collect()
    }

    pub fn game_objects(&self) -> impl Iterator<Item = &GameObject> {
        self.game_objects.values()
    }

    /// Number of live GameObjects, inactive ones included.
    pub fn game_object_count(&self) -> usize {
        self.game_objects.len()
    }

    /// Live GameObjects without a parent, in ascending id order.
    pub fn root_game_objects(&self) -> Vec<GameObjectId> {
        self.game_objects
            .values()
            .filter(|go| go.parent.is_none())
            .map(|go| go.id)
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<GameObjectId> {
        self.game_objects
            .values()
            .find(|go| go.name == name)
            .map(|go| go.id)
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<GameObjectId> {
        self.game_objects
            .values()
            .filter(|go| go.tag == tag)
            .map(|go| go.id)
            .collect()
    }

    pub fn is_active(&self, id: GameObjectId) -> bool {
        self.game_objects.get(&id).is_some_and(|go| go.active)
    }

    // -- Activation -----------------------------------------------------------

    /// Flip a GameObject's active flag.
    ///
    /// No-op when unchanged. Otherwise every local component receives
    /// `on_enable` / `on_disable` and is reconciled against the active cache.
    /// Children are left alone; see [`set_active_recursive`](Self::set_active_recursive).
    pub fn set_active(&mut self, id: GameObjectId, active: bool) -> Result<(), SceneError> {
        let components = {
            let go = self
                .game_objects
                .get_mut(&id)
                .ok_or(SceneError::UnknownGameObject(id))?;
            if go.active == active {
                return Ok(());
            }
            go.active = active;
            go.components.clone()
        };

        for component in components {
            if let Some(slot) = self.components.get_mut(&component) {
                if active {
                    slot.component.on_enable();
                } else {
                    slot.component.on_disable();
                }
            }
            self.on_component_state_changed(component);
        }
        Ok(())
    }

    /// [`set_active`](Self::set_active) applied to a GameObject and all of
    /// its descendants.
    pub fn set_active_recursive(
        &mut self,
        id: GameObjectId,
        active: bool,
    ) -> Result<(), SceneError> {
        self.set_active(id, active)?;
        let children = self.children(id).to_vec();
        for child in children {
            self.set_active_recursive(child, active)?;
        }
        Ok(())
    }

    // -- Hierarchy ------------------------------------------------------------

    pub fn parent(&self, id: GameObjectId) -> Option<GameObjectId> {
        self.game_objects.get(&id).and_then(|go| go.parent)
    }

    pub fn children(&self, id: GameObjectId) -> &[GameObjectId] {
        self.game_objects
            .get(&id)
            .map(|go| go.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `ancestor` appears on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: GameObjectId, id: GameObjectId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Re-parent `child`. Unlinks from the old parent before linking to the
    /// new one. Assigning the object itself or one of its descendants as
    /// parent is rejected.
    pub fn set_parent(
        &mut self,
        child: GameObjectId,
        parent: Option<GameObjectId>,
    ) -> Result<(), SceneError> {
        if !self.contains(child) {
            return Err(SceneError::UnknownGameObject(child));
        }
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(SceneError::UnknownGameObject(p));
            }
            if p == child || self.is_ancestor(child, p) {
                return Err(SceneError::CyclicParent { child, parent: p });
            }
        }
        if self.parent(child) == parent {
            return Ok(());
        }

        self.unlink_from_parent(child);
        if let Some(go) = self.game_objects.get_mut(&child) {
            go.parent = parent;
        }
        if let Some(p) = parent {
            if let Some(parent_go) = self.game_objects.get_mut(&p) {
                parent_go.children.push(child);
            }
        }
        Ok(())
    }

    fn unlink_from_parent(&mut self, child: GameObjectId) {
        let old_parent = match self.game_objects.get_mut(&child) {
            Some(go) => go.parent.take(),
            None => None,
        };
        if let Some(p) = old_parent {
            if let Some(parent_go) = self.game_objects.get_mut(&p) {
                parent_go.children.retain(|c| *c != child);
            }
        }
    }

    // -- Transforms -----------------------------------------------------------

    pub fn transform(&self, id: GameObjectId) -> Option<&Transform> {
        let transform_id = self.game_objects.get(&id)?.transform;
        self.component::<Transform>(transform_id)
    }

    pub fn transform_mut(&mut self, id: GameObjectId) -> Option<&mut Transform> {
        let transform_id = self.game_objects.get(&id)?.transform;
        self.component_mut::<Transform>(transform_id)
    }

    /// The transform resolved through the whole parent chain.
    pub fn world_transform(&self, id: GameObjectId) -> Option<WorldTransform> {
        let mut chain = vec![self.transform(id)?];
        let mut current = self.parent(id);
        while let Some(p) = current {
            if let Some(t) = self.transform(p) {
                chain.push(t);
            }
            current = self.parent(p);
        }
        let world = chain
            .iter()
            .rev()
            .fold(WorldTransform::IDENTITY, |acc, local| acc.compose(local));
        Some(world)
    }

    pub fn world_position(&self, id: GameObjectId) -> Option<crate::math::Vector2> {
        self.world_transform(id).map(|t| t.position)
    }

    // -- Attaching components -------------------------------------------------

    /// Attach `component` to a GameObject and return its id.
    ///
    /// The component is registered into the pools of all its tags and then
    /// receives `on_init`. Missing dependencies are logged and tolerated.
    pub fn add_component<T: Component>(
        &mut self,
        owner: GameObjectId,
        component: T,
    ) -> Result<ComponentId, SceneError> {
        self.add_boxed_component(owner, Box::new(component))
    }

    /// Attach a default-constructed `T`.
    pub fn add_default_component<T: Component + Default>(
        &mut self,
        owner: GameObjectId,
    ) -> Result<ComponentId, SceneError> {
        self.add_component(owner, T::default())
    }

    pub fn add_boxed_component(
        &mut self,
        owner: GameObjectId,
        component: Box<dyn Component>,
    ) -> Result<ComponentId, SceneError> {
        match self.game_objects.get(&owner) {
            Some(go) if !go.destroying => {}
            _ => return Err(SceneError::UnknownGameObject(owner)),
        }
        if component.type_name() == TRANSFORM_TYPE {
            return Err(SceneError::DuplicateTransform(owner));
        }
        for dependency in component.dependencies() {
            if !self.has_component_tag(owner, dependency) {
                tracing::warn!(
                    game_object = %owner,
                    component = component.type_name(),
                    dependency = *dependency,
                    "attaching component without its required dependency"
                );
            }
        }

        let id = self.ids.next_component();
        if let Some(go) = self.game_objects.get_mut(&owner) {
            go.components.push(id);
        }
        self.insert_slot(owner, id, component);
        Ok(id)
    }

    fn insert_slot(&mut self, owner: GameObjectId, id: ComponentId, component: Box<dyn Component>) {
        let tags = component.type_tags();
        self.components.insert(
            id,
            ComponentSlot {
                owner,
                enabled: true,
                registered: false,
                cached_active: false,
                tags,
                component,
            },
        );
        self.register_component(id);
        if let Some(slot) = self.components.get_mut(&id) {
            slot.component.on_init(owner);
        }
    }

    // -- Removing components --------------------------------------------------

    /// Remove the first component of concrete type `T`. The Transform is never
    /// removed.
    pub fn remove_component<T: Component>(&mut self, owner: GameObjectId) -> bool {
        match self.get_component_id::<T>(owner) {
            Some(id) => self.remove_component_instance(id),
            None => false,
        }
    }

    /// Remove every component of concrete type `T`; returns how many went.
    pub fn remove_all_components<T: Component>(&mut self, owner: GameObjectId) -> usize {
        self.get_component_ids::<T>(owner)
            .into_iter()
            .filter(|id| self.remove_component_instance(*id))
            .count()
    }

    /// Remove one component by id: unregister, `on_destroy`, detach.
    pub fn remove_component_instance(&mut self, id: ComponentId) -> bool {
        let owner = match self.components.get(&id) {
            Some(slot) => slot.owner,
            None => return false,
        };
        if self
            .game_objects
            .get(&owner)
            .is_some_and(|go| go.transform == id)
        {
            tracing::warn!(game_object = %owner, "the Transform component cannot be removed");
            return false;
        }
        self.drop_component(id);
        if let Some(go) = self.game_objects.get_mut(&owner) {
            remove_id(&mut go.components, id);
        }
        true
    }

    /// Unregister, destroy and free a component slot.
    fn drop_component(&mut self, id: ComponentId) {
        self.unregister_component(id);
        if let Some(mut slot) = self.components.remove(&id) {
            slot.component.on_destroy();
        }
    }

    // -- Pools & active cache -------------------------------------------------

    /// Make sure pools exist for `tag`. Existing members are kept.
    pub fn ensure_pool(&mut self, tag: &str) {
        self.component_map.entry(tag.to_owned()).or_default();
        self.active_cache.entry(tag.to_owned()).or_default();
    }

    /// Add a component to the pools of all its tags and, when active, to the
    /// active cache. Registering the same instance twice is a caller error.
    pub fn register_component(&mut self, id: ComponentId) {
        let active = self.is_component_active(id);
        let Some(slot) = self.components.get_mut(&id) else {
            return;
        };
        slot.registered = true;
        slot.cached_active = active;
        for tag in slot.tags {
            self.component_map
                .entry((*tag).to_owned())
                .or_default()
                .push(id);
            let cache = self.active_cache.entry((*tag).to_owned()).or_default();
            if active {
                cache.push(id);
            }
        }
    }

    /// Remove a component from every pool by identity. No-op when absent.
    pub fn unregister_component(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get_mut(&id) else {
            return;
        };
        if !slot.registered {
            return;
        }
        slot.registered = false;
        let was_active = std::mem::replace(&mut slot.cached_active, false);
        for tag in slot.tags {
            if let Some(pool) = self.component_map.get_mut(*tag) {
                remove_id(pool, id);
            }
            if was_active {
                if let Some(cache) = self.active_cache.get_mut(*tag) {
                    remove_id(cache, id);
                }
            }
        }
    }

    /// Re-evaluate the active predicate for one component and move it into or
    /// out of the active cache.
    pub fn on_component_state_changed(&mut self, id: ComponentId) {
        let active = self.is_component_active(id);
        let Some(slot) = self.components.get_mut(&id) else {
            return;
        };
        if !slot.registered || slot.cached_active == active {
            return;
        }
        slot.cached_active = active;
        for tag in slot.tags {
            let cache = self.active_cache.entry((*tag).to_owned()).or_default();
            if active {
                cache.push(id);
            } else {
                remove_id(cache, id);
            }
        }
    }

    /// Every registered component carrying `tag`, in insertion order.
    pub fn components_by_type(&self, tag: &str) -> &[ComponentId] {
        self.component_map
            .get(tag)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The active subset of [`components_by_type`](Self::components_by_type).
    pub fn active_components_by_type(&self, tag: &str) -> &[ComponentId] {
        self.active_cache
            .get(tag)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_pool(&self, tag: &str) -> bool {
        self.component_map.contains_key(tag)
    }

    /// Tags that currently have a pool, sorted.
    pub fn pool_types(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.component_map.keys().map(|s| s.as_str()).collect();
        tags.sort();
        tags
    }

    // -- Component state ------------------------------------------------------

    /// `enabled ∧ owner.active`, computed fresh.
    pub fn is_component_active(&self, id: ComponentId) -> bool {
        self.components.get(&id).is_some_and(|slot| {
            slot.enabled && self.game_objects.get(&slot.owner).is_some_and(|go| go.active)
        })
    }

    pub fn is_component_enabled(&self, id: ComponentId) -> bool {
        self.components.get(&id).is_some_and(|slot| slot.enabled)
    }

    /// Toggle a component's `enabled` flag, firing `on_enable` / `on_disable`
    /// and reconciling the active cache. No-op when unchanged.
    pub fn set_component_enabled(
        &mut self,
        id: ComponentId,
        enabled: bool,
    ) -> Result<(), SceneError> {
        let slot = self
            .components
            .get_mut(&id)
            .ok_or(SceneError::UnknownComponent(id))?;
        if slot.enabled == enabled {
            return Ok(());
        }
        slot.enabled = enabled;
        if enabled {
            slot.component.on_enable();
        } else {
            slot.component.on_disable();
        }
        self.on_component_state_changed(id);
        Ok(())
    }

    pub fn component_owner(&self, id: ComponentId) -> Option<GameObjectId> {
        self.components.get(&id).map(|slot| slot.owner)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// All live component ids, sorted.
    pub fn component_ids(&self) -> Vec<ComponentId> {
        let mut ids: Vec<ComponentId> = self.components.keys().copied().collect();
        ids.sort();
        ids
    }

    // -- Component access -----------------------------------------------------

    pub fn component_dyn(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(&id).map(|slot| &*slot.component)
    }

    pub fn component_dyn_mut(&mut self, id: ComponentId) -> Option<&mut dyn Component> {
        match self.components.get_mut(&id) {
            Some(slot) => Some(&mut *slot.component),
            None => None,
        }
    }

    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.component_dyn(id).and_then(|c| downcast_ref::<T>(c))
    }

    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.component_dyn_mut(id).and_then(|c| downcast_mut::<T>(c))
    }

    /// The script capability of a component, if it has one.
    pub fn script_mut(&mut self, id: ComponentId) -> Option<&mut dyn Script> {
        match self.components.get_mut(&id) {
            Some(slot) => slot.component.as_script_mut(),
            None => None,
        }
    }

    /// Type tags of a live component.
    pub fn component_tags(&self, id: ComponentId) -> &'static [&'static str] {
        self.components.get(&id).map(|slot| slot.tags).unwrap_or(&[])
    }

    /// First component of concrete type `T` on a GameObject.
    pub fn get_component<T: Component>(&self, owner: GameObjectId) -> Option<&T> {
        let id = self.get_component_id::<T>(owner)?;
        self.component::<T>(id)
    }

    pub fn get_component_mut<T: Component>(&mut self, owner: GameObjectId) -> Option<&mut T> {
        let id = self.get_component_id::<T>(owner)?;
        self.component_mut::<T>(id)
    }

    pub fn get_component_id<T: Component>(&self, owner: GameObjectId) -> Option<ComponentId> {
        self.game_objects
            .get(&owner)?
            .components
            .iter()
            .copied()
            .find(|id| self.component::<T>(*id).is_some())
    }

    pub fn get_component_ids<T: Component>(&self, owner: GameObjectId) -> Vec<ComponentId> {
        self.game_objects
            .get(&owner)
            .map(|go| {
                go.components
                    .iter()
                    .copied()
                    .filter(|id| self.component::<T>(*id).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every component of concrete type `T` on a GameObject.
    pub fn get_components<T: Component>(&self, owner: GameObjectId) -> Vec<&T> {
        self.get_component_ids::<T>(owner)
            .into_iter()
            .filter_map(|id| self.component::<T>(id))
            .collect()
    }

    /// First component on a GameObject carrying `tag` (subtype match).
    pub fn get_component_by_tag(&self, owner: GameObjectId, tag: &str) -> Option<ComponentId> {
        self.game_objects
            .get(&owner)?
            .components
            .iter()
            .copied()
            .find(|id| self.component_tags(*id).contains(&tag))
    }

    pub fn get_components_by_tag(&self, owner: GameObjectId, tag: &str) -> Vec<ComponentId> {
        self.game_objects
            .get(&owner)
            .map(|go| {
                go.components
                    .iter()
                    .copied()
                    .filter(|id| self.component_tags(*id).contains(&tag))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_component_tag(&self, owner: GameObjectId, tag: &str) -> bool {
        self.get_component_by_tag(owner, tag).is_some()
    }

    /// Fetch a component the caller's logic cannot work without.
    ///
    /// # Errors
    ///
    /// [`SceneError::MissingDependency`] when the GameObject has no `T`.
    pub fn require_component<T: Component>(&self, owner: GameObjectId) -> Result<&T, SceneError> {
        self.get_component::<T>(owner)
            .ok_or_else(|| SceneError::MissingDependency {
                game_object: owner,
                dependency: short_type_name::<T>().to_owned(),
            })
    }

    // -- Cloning --------------------------------------------------------------

    /// Copy a GameObject: Transform fields plus every component that supports
    /// [`clone_component`](Component::clone_component). Components without it
    /// are skipped, and children are not copied. The clone is a root named
    /// `"<name> (Clone)"`.
    pub fn clone_game_object(&mut self, source: GameObjectId) -> Result<GameObjectId, SceneError> {
        let (name, tag, active, component_ids, transform_id) = {
            let go = self
                .game_objects
                .get(&source)
                .ok_or(SceneError::UnknownGameObject(source))?;
            (
                go.name.clone(),
                go.tag.clone(),
                go.active,
                go.components.clone(),
                go.transform,
            )
        };

        let transform = self.transform(source).cloned().unwrap_or_default();
        let copy = self.create_game_object_with(&format!("{name} (Clone)"), transform);
        if let Some(go) = self.game_objects.get_mut(&copy) {
            go.tag = tag;
        }

        for id in component_ids {
            if id == transform_id {
                continue;
            }
            let Some(slot) = self.components.get(&id) else {
                continue;
            };
            let enabled = slot.enabled;
            let type_name = slot.component.type_name();
            let Some(cloned) = slot.component.clone_component() else {
                tracing::debug!(
                    component = type_name,
                    "component does not support cloning, skipped"
                );
                continue;
            };
            let new_id = self.add_boxed_component(copy, cloned)?;
            if !enabled {
                self.set_component_enabled(new_id, false)?;
            }
        }

        if !active {
            self.set_active(copy, false)?;
        }
        Ok(copy)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector2;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Health(u32);

    impl Component for Health {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Health"]
        }

        fn clone_component(&self) -> Option<Box<dyn Component>> {
            Some(Box::new(self.clone()))
        }
    }

    #[derive(Debug, Default)]
    struct Opaque;

    impl Component for Opaque {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Opaque"]
        }
    }

    #[derive(Debug, Default)]
    struct NeedsHealth;

    impl Component for NeedsHealth {
        fn type_tags(&self) -> &'static [&'static str] {
            &["NeedsHealth"]
        }

        fn dependencies(&self) -> &'static [&'static str] {
            &["Health"]
        }
    }

    /// Records lifecycle hook calls into a shared log.
    struct Probe {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Component for Probe {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Probe", "Script"]
        }

        fn on_init(&mut self, owner: GameObjectId) {
            self.log.borrow_mut().push(format!("init {owner}"));
        }

        fn on_enable(&mut self) {
            self.log.borrow_mut().push("enable".into());
        }

        fn on_disable(&mut self) {
            self.log.borrow_mut().push("disable".into());
        }

        fn on_destroy(&mut self) {
            self.log.borrow_mut().push("destroy".into());
        }
    }

    // -- creation -------------------------------------------------------------

    #[test]
    fn new_game_object_owns_a_registered_transform() {
        let mut world = World::new();
        let go = world.create_game_object("player");
        let obj = world.game_object(go).unwrap();
        assert_eq!(obj.components().len(), 1);
        assert!(world.transform(go).is_some());
        assert_eq!(world.components_by_type(TRANSFORM_TYPE), &[obj.transform_id()]);
        assert_eq!(world.active_components_by_type(TRANSFORM_TYPE).len(), 1);
    }

    #[test]
    fn second_transform_is_rejected() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        let err = world.add_component(go, Transform::default()).unwrap_err();
        assert!(matches!(err, SceneError::DuplicateTransform(id) if id == go));
    }

    #[test]
    fn adding_to_unknown_object_fails() {
        let mut world = World::new();
        let ghost = GameObjectId::from_raw(99);
        assert!(world.add_component(ghost, Health(1)).is_err());
    }

    #[test]
    fn add_component_calls_init_with_owner() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new();
        let go = world.create_game_object("a");
        let id = world.add_component(go, Probe { log: log.clone() }).unwrap();
        assert_eq!(world.component_owner(id), Some(go));
        assert_eq!(log.borrow().as_slice(), &[format!("init {go}")]);
    }

    #[test]
    fn duplicates_of_same_type_are_allowed() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        world.add_component(go, Health(1)).unwrap();
        world.add_component(go, Health(2)).unwrap();
        assert_eq!(world.get_components::<Health>(go), vec![&Health(1), &Health(2)]);
        assert_eq!(world.get_component::<Health>(go), Some(&Health(1)));
    }

    #[test]
    fn missing_dependency_is_tolerated_but_require_fails() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        assert!(world.add_component(go, NeedsHealth).is_ok());
        let err = world.require_component::<Health>(go).unwrap_err();
        assert!(matches!(err, SceneError::MissingDependency { .. }));
        world.add_component(go, Health(5)).unwrap();
        assert_eq!(world.require_component::<Health>(go).unwrap(), &Health(5));
    }

    // -- tag queries ----------------------------------------------------------

    #[test]
    fn tag_queries_match_capability_families() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new();
        let go = world.create_game_object("a");
        world.add_component(go, Health(1)).unwrap();
        let probe = world.add_component(go, Probe { log }).unwrap();

        assert_eq!(world.get_component_by_tag(go, "Script"), Some(probe));
        assert_eq!(world.components_by_type("Script"), &[probe]);
        assert_eq!(world.components_by_type("Probe"), &[probe]);
        assert!(world.has_component_tag(go, "Health"));
        assert!(!world.has_component_tag(go, "Collider"));
    }

    // -- removal --------------------------------------------------------------

    #[test]
    fn remove_component_unregisters_and_destroys() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new();
        let go = world.create_game_object("a");
        let id = world.add_component(go, Probe { log: log.clone() }).unwrap();

        assert!(world.remove_component::<Probe>(go));
        assert!(!world.remove_component::<Probe>(go));
        assert!(world.components_by_type("Probe").is_empty());
        assert!(world.active_components_by_type("Probe").is_empty());
        assert!(world.component_dyn(id).is_none());
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy"));
    }

    #[test]
    fn transform_cannot_be_removed() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        assert!(!world.remove_component::<Transform>(go));
        let tid = world.game_object(go).unwrap().transform_id();
        assert!(!world.remove_component_instance(tid));
        assert!(world.transform(go).is_some());
    }

    #[test]
    fn remove_all_components_of_type() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        world.add_component(go, Health(1)).unwrap();
        world.add_component(go, Opaque).unwrap();
        world.add_component(go, Health(2)).unwrap();
        assert_eq!(world.remove_all_components::<Health>(go), 2);
        assert!(world.get_component::<Health>(go).is_none());
        assert!(world.get_component::<Opaque>(go).is_some());
    }

    #[test]
    fn unregister_absent_component_is_noop() {
        let mut world = World::new();
        world.unregister_component(ComponentId::from_raw(1234));
        let go = world.create_game_object("a");
        let id = world.add_component(go, Health(1)).unwrap();
        world.unregister_component(id);
        world.unregister_component(id);
        assert!(world.components_by_type("Health").is_empty());
    }

    // -- active cache ---------------------------------------------------------

    #[test]
    fn disabling_component_leaves_active_cache_only() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        let id = world.add_component(go, Health(1)).unwrap();

        world.set_component_enabled(id, false).unwrap();
        assert_eq!(world.components_by_type("Health"), &[id]);
        assert!(world.active_components_by_type("Health").is_empty());

        world.set_component_enabled(id, true).unwrap();
        assert_eq!(world.active_components_by_type("Health"), &[id]);
    }

    #[test]
    fn deactivating_owner_empties_active_cache() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        let id = world.add_component(go, Health(1)).unwrap();

        world.set_active(go, false).unwrap();
        assert!(!world.is_component_active(id));
        assert!(world.active_components_by_type("Health").is_empty());
        assert!(world.active_components_by_type(TRANSFORM_TYPE).is_empty());

        // Enabling the component while the owner is inactive keeps it out.
        world.set_component_enabled(id, false).unwrap();
        world.set_component_enabled(id, true).unwrap();
        assert!(world.active_components_by_type("Health").is_empty());

        world.set_active(go, true).unwrap();
        assert_eq!(world.active_components_by_type("Health"), &[id]);
    }

    #[test]
    fn set_active_fires_hooks_once_per_change() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new();
        let go = world.create_game_object("a");
        world.add_component(go, Probe { log: log.clone() }).unwrap();
        log.borrow_mut().clear();

        world.set_active(go, false).unwrap();
        world.set_active(go, false).unwrap();
        world.set_active(go, true).unwrap();
        assert_eq!(log.borrow().as_slice(), &["disable", "enable"]);
    }

    #[test]
    fn set_active_is_not_recursive() {
        let mut world = World::new();
        let parent = world.create_game_object("parent");
        let child = world.create_game_object("child");
        world.set_parent(child, Some(parent)).unwrap();

        world.set_active(parent, false).unwrap();
        assert!(world.is_active(child));

        world.set_active_recursive(parent, false).unwrap();
        assert!(!world.is_active(child));
    }

    #[test]
    fn ensure_pool_keeps_existing_members() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        let id = world.add_component(go, Health(1)).unwrap();
        world.ensure_pool("Health");
        world.ensure_pool("Unused");
        assert_eq!(world.components_by_type("Health"), &[id]);
        assert!(world.has_pool("Unused"));
    }

    // -- hierarchy ------------------------------------------------------------

    #[test]
    fn reparenting_unlinks_old_parent() {
        let mut world = World::new();
        let a = world.create_game_object("a");
        let b = world.create_game_object("b");
        let c = world.create_game_object("c");

        world.set_parent(c, Some(a)).unwrap();
        world.set_parent(c, Some(b)).unwrap();
        assert!(world.children(a).is_empty());
        assert_eq!(world.children(b), &[c]);
        assert_eq!(world.parent(c), Some(b));

        world.set_parent(c, None).unwrap();
        assert!(world.children(b).is_empty());
        assert_eq!(world.root_game_objects(), vec![a, b, c]);
    }

    #[test]
    fn cyclic_parenting_is_rejected() {
        let mut world = World::new();
        let a = world.create_game_object("a");
        let b = world.create_game_object("b");
        let c = world.create_game_object("c");
        world.set_parent(b, Some(a)).unwrap();
        world.set_parent(c, Some(b)).unwrap();

        assert!(matches!(
            world.set_parent(a, Some(c)),
            Err(SceneError::CyclicParent { .. })
        ));
        assert!(matches!(
            world.set_parent(a, Some(a)),
            Err(SceneError::CyclicParent { .. })
        ));
        assert_eq!(world.parent(a), None);
    }

    #[test]
    fn world_transform_follows_parent_chain() {
        let mut world = World::new();
        let parent = world.create_game_object_with("p", Transform::at(Vector2::new(10.0, 5.0)));
        let child = world.create_game_object_with("c", Transform::at(Vector2::new(1.0, 1.0)));
        world.set_parent(child, Some(parent)).unwrap();
        world.transform_mut(parent).unwrap().scale = Vector2::new(2.0, 3.0);

        let wt = world.world_transform(child).unwrap();
        assert_eq!(wt.position, Vector2::new(12.0, 8.0));
        assert_eq!(wt.scale, Vector2::new(2.0, 3.0));
    }

    // -- destroy --------------------------------------------------------------

    #[test]
    fn destroy_cascades_through_children() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new();
        let root = world.create_game_object("root");
        let child = world.create_game_object("child");
        let grandchild = world.create_game_object("grandchild");
        world.set_parent(child, Some(root)).unwrap();
        world.set_parent(grandchild, Some(child)).unwrap();
        for go in [root, child, grandchild] {
            world.add_component(go, Probe { log: log.clone() }).unwrap();
        }
        let survivor = world.create_game_object("survivor");

        assert!(world.destroy(root));
        assert!(!world.destroy(root));
        assert_eq!(world.game_object_ids(), vec![survivor]);
        let destroyed = log.borrow().iter().filter(|l| *l == "destroy").count();
        assert_eq!(destroyed, 3);
        assert!(world.components_by_type("Probe").is_empty());
        assert_eq!(world.components_by_type(TRANSFORM_TYPE).len(), 1);
    }

    #[test]
    fn destroying_child_detaches_from_parent() {
        let mut world = World::new();
        let root = world.create_game_object("root");
        let child = world.create_game_object("child");
        world.set_parent(child, Some(root)).unwrap();
        world.destroy(child);
        assert!(world.children(root).is_empty());
        assert!(world.contains(root));
    }

    #[test]
    fn clear_releases_pools() {
        let mut world = World::new();
        let go = world.create_game_object("a");
        world.add_component(go, Health(1)).unwrap();
        world.ensure_pool("Unused");
        world.clear();
        assert_eq!(world.game_object_count(), 0);
        assert_eq!(world.component_count(), 0);
        assert!(world.pool_types().is_empty());
    }

    // -- clone ----------------------------------------------------------------

    #[test]
    fn clone_copies_cloneable_components_only() {
        let mut world = World::new();
        let go = world.create_game_object_with("orc", Transform::at(Vector2::new(3.0, 4.0)));
        world.game_object_mut(go).unwrap().set_tag("enemy");
        world.add_component(go, Health(9)).unwrap();
        world.add_component(go, Opaque).unwrap();

        let copy = world.clone_game_object(go).unwrap();
        let obj = world.game_object(copy).unwrap();
        assert_eq!(obj.name(), "orc (Clone)");
        assert_eq!(obj.tag(), "enemy");
        assert_eq!(world.transform(copy).unwrap().position, Vector2::new(3.0, 4.0));
        assert_eq!(world.get_component::<Health>(copy), Some(&Health(9)));
        assert!(world.get_component::<Opaque>(copy).is_none());
        assert_eq!(world.components_by_type("Health").len(), 2);
    }
}
