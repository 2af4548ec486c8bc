//! GameObject and component identifiers.
//!
//! Ids are plain monotonic counters handed out by an [`IdAllocator`] owned by
//! the [`World`](crate::world::World). They are never recycled, so a stale id
//! held by a system after a destroy simply resolves to `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// GameObjectId
// ---------------------------------------------------------------------------

/// Identifier of a GameObject, unique within its world.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameObjectId(u64);

impl GameObjectId {
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for GameObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameObjectId({})", self.0)
    }
}

impl fmt::Display for GameObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "go#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentId
// ---------------------------------------------------------------------------

/// Stable identity of one component instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(u64);

impl ComponentId {
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IdAllocator
// ---------------------------------------------------------------------------

/// Monotonic allocator for both id kinds.
///
/// Ids start at 1 so that 0 never names a live object.
#[derive(Debug)]
pub struct IdAllocator {
    next_game_object: u64,
    next_component: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_game_object: 1,
            next_component: 1,
        }
    }

    pub fn next_game_object(&mut self) -> GameObjectId {
        let id = GameObjectId(self.next_game_object);
        self.next_game_object += 1;
        id
    }

    pub fn next_component(&mut self) -> ComponentId {
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        id
    }

    /// Number of GameObject ids handed out so far.
    pub fn game_objects_allocated(&self) -> u64 {
        self.next_game_object - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
