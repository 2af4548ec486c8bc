//! Engine-level snapshot and restore with a BLAKE3 state hash.
//!
//! An [`EngineSnapshot`] is the persisted document:
//!
//! ```json
//! { "gameObjects": [ ... ], "time": { "startTime": 0.0, "totalTime": 1.5 } }
//! ```
//!
//! # What Is NOT Serialized
//!
//! - Registered systems and their stats. They are code, not data.
//! - Event listeners and queued deferred events.
//! - Cached resources, camera and input state.
//! - Component state a component chooses not to expose through `serialize`.
//!
//! # Usage
//!
//! ```
//! use kiln_engine::prelude::*;
//!
//! let mut engine = Engine::default();
//! let ball = engine.world_mut().create_game_object("ball");
//! engine.world_mut().add_component(ball, Rigidbody::with_mass(2.0)).unwrap();
//!
//! let snapshot = engine.serialize();
//! let hash = engine.state_hash();
//! assert_eq!(hash.len(), 64);
//!
//! engine.world_mut().destroy(ball);
//! engine.deserialize(&snapshot).unwrap();
//! assert_eq!(engine.world().game_object_count(), 1);
//! assert_eq!(engine.state_hash(), hash);
//! ```

use serde::{Deserialize, Serialize};

use kiln_scene::snapshot::{capture_tree, restore_tree, GameObjectNode};

use crate::engine::Engine;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// The persisted part of the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSnapshot {
    pub start_time: f64,
    pub total_time: f64,
}

/// A serializable image of the scene tree and clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    #[serde(default)]
    pub game_objects: Vec<GameObjectNode>,
    #[serde(default)]
    pub time: TimeSnapshot,
}

impl EngineSnapshot {
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(|e| EngineError::Snapshot {
            details: e.to_string(),
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Snapshot {
            details: e.to_string(),
        })
    }

    pub fn from_json(s: &str) -> Result<Self, EngineError> {
        serde_json::from_str(s).map_err(|e| EngineError::Snapshot {
            details: e.to_string(),
        })
    }

    /// Total number of GameObjects in the document.
    pub fn game_object_count(&self) -> usize {
        self.game_objects.iter().map(|n| n.subtree_len()).sum()
    }

    /// BLAKE3 hex digest (64 chars) of the canonical JSON encoding.
    ///
    /// GameObject ids are excluded: a restored scene gets fresh ids but
    /// hashes the same as its source.
    pub fn compute_hash(&self) -> String {
        let mut stripped = self.game_objects.clone();
        for node in &mut stripped {
            zero_ids(node);
        }
        #[derive(Serialize)]
        struct HashableState<'a> {
            game_objects: &'a [GameObjectNode],
            time: &'a TimeSnapshot,
        }
        let hashable = HashableState {
            game_objects: &stripped,
            time: &self.time,
        };
        // Serializing plain derived structs into a Vec cannot fail.
        let bytes = serde_json::to_vec(&hashable).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

fn zero_ids(node: &mut GameObjectNode) {
    node.id = 0;
    for child in &mut node.children {
        zero_ids(child);
    }
}

// ---------------------------------------------------------------------------
// Engine snapshot/restore
// ---------------------------------------------------------------------------

impl Engine {
    /// Capture every root GameObject (with its subtree) and the clock.
    pub fn serialize(&self) -> EngineSnapshot {
        EngineSnapshot {
            game_objects: capture_tree(&self.world),
            time: TimeSnapshot {
                start_time: self.time.start_time(),
                total_time: self.time.total_time(),
            },
        }
    }

    pub fn serialize_json(&self) -> Result<String, EngineError> {
        self.serialize().to_json()
    }

    /// Replace the scene with `snapshot`.
    ///
    /// Existing GameObjects are destroyed first. Registered systems are kept
    /// and their pools recreated, so the restored components are picked up on
    /// the next frame. Component types missing from the factory are skipped.
    pub fn deserialize(&mut self, snapshot: &EngineSnapshot) -> anyhow::Result<()> {
        self.world.clear();
        self.ensure_system_pools();
        let roots = restore_tree(&mut self.world, &snapshot.game_objects, &self.factory)?;
        self.time
            .restore(snapshot.time.start_time, snapshot.time.total_time);
        self.last_purge = snapshot.time.total_time;
        tracing::info!(
            roots = roots.len(),
            game_objects = self.world.game_object_count(),
            "scene restored"
        );
        Ok(())
    }

    pub fn deserialize_json(&mut self, s: &str) -> anyhow::Result<()> {
        let snapshot = EngineSnapshot::from_json(s)?;
        self.deserialize(&snapshot)
    }

    /// BLAKE3 hex digest of the current serialized state.
    pub fn state_hash(&self) -> String {
        self.serialize().compute_hash()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
