//! GameObject records stored in the world arena.
//!
//! A [`GameObject`] is plain data: identity, naming, the active flag, the ids
//! of the components it owns (insertion order, Transform first) and its place
//! in the scene tree as id references. All mutations that touch the pools or
//! fire lifecycle hooks go through [`World`](crate::world::World).

use crate::id::{ComponentId, GameObjectId};

/// Tag given to GameObjects created without one.
pub const DEFAULT_TAG: &str = "Untagged";

/// A node in the scene tree.
#[derive(Debug, Clone)]
pub struct GameObject {
    pub(crate) id: GameObjectId,
    pub(crate) name: String,
    pub(crate) tag: String,
    pub(crate) active: bool,
    pub(crate) components: Vec<ComponentId>,
    pub(crate) transform: ComponentId,
    pub(crate) parent: Option<GameObjectId>,
    pub(crate) children: Vec<GameObjectId>,
    /// Set for the duration of a destroy cascade.
    pub(crate) destroying: bool,
}

impl GameObject {
    pub(crate) fn new(id: GameObjectId, name: &str, transform: ComponentId) -> Self {
        Self {
            id,
            name: name.to_owned(),
            tag: DEFAULT_TAG.to_owned(),
            active: true,
            components: vec![transform],
            transform,
            parent: None,
            children: Vec::new(),
            destroying: false,
        }
    }

    pub fn id(&self) -> GameObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// The object's own active flag. Parents are not consulted.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Component ids in insertion order; the Transform is always first.
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    pub fn transform_id(&self) -> ComponentId {
        self.transform
    }

    pub fn parent(&self) -> Option<GameObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[GameObjectId] {
        &self.children
    }

    pub fn is_destroying(&self) -> bool {
        self.destroying
    }
}
