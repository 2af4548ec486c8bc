//! Script capability: per-frame behavior and collision callbacks.
//!
//! A component opts in by returning `Some(self)` from
//! [`Component::as_script_mut`](crate::component::Component::as_script_mut)
//! and listing `"Script"` among its type tags so the script system's pool
//! picks it up.

use crate::id::{ComponentId, GameObjectId};

/// The other side of a collision or trigger overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// GameObject owning the other collider.
    pub other: GameObjectId,
    /// The other collider component.
    pub other_collider: ComponentId,
    /// Whether the pair was treated as a trigger overlap.
    pub is_trigger: bool,
}

/// Callbacks a script component may implement. All default to no-ops.
///
/// Errors are logged by the caller and never abort the frame.
pub trait Script {
    fn on_update(&mut self, _dt: f64) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_collision_enter(&mut self, _contact: &Contact) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_collision_stay(&mut self, _contact: &Contact) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_collision_exit(&mut self, _contact: &Contact) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_trigger_enter(&mut self, _contact: &Contact) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_trigger_stay(&mut self, _contact: &Contact) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_trigger_exit(&mut self, _contact: &Contact) -> anyhow::Result<()> {
        Ok(())
    }
}
