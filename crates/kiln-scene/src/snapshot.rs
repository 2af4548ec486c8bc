//! Scene tree capture and restore.
//!
//! A [`GameObjectNode`] is the persisted form of one GameObject and its
//! subtree. Component payloads are `{type, data}` records resolved back to
//! instances through a [`ComponentFactory`] on restore. Restored objects get
//! fresh ids; the `id` field is informational.

use serde::{Deserialize, Serialize};

use crate::component::ComponentFactory;
use crate::id::GameObjectId;
use crate::transform::{TransformData, TRANSFORM_TYPE};
use crate::world::World;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// A serialized component: its type name plus whatever `serialize` produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One GameObject and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameObjectNode {
    pub id: u64,
    pub name: String,
    pub tag: String,
    pub is_active: bool,
    pub transform: TransformData,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
    #[serde(default)]
    pub children: Vec<GameObjectNode>,
}

impl GameObjectNode {
    /// Number of nodes in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_len()).sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Capture one GameObject and its subtree, or `None` if the id is unknown.
///
/// Components whose `serialize` returns `None` are recorded with a `null`
/// payload so their type still round-trips.
pub fn capture_node(world: &World, id: GameObjectId) -> Option<GameObjectNode> {
    let go = world.game_object(id)?;
    let transform = world.transform(id).map(|t| t.data()).unwrap_or_default();

    let components = go
        .components()
        .iter()
        .filter(|c| **c != go.transform_id())
        .filter_map(|c| world.component_dyn(*c))
        .map(|component| ComponentRecord {
            type_name: component.type_name().to_owned(),
            data: component.serialize().unwrap_or(serde_json::Value::Null),
        })
        .collect();

    let children = go
        .children()
        .iter()
        .filter_map(|child| capture_node(world, *child))
        .collect();

    Some(GameObjectNode {
        id: id.to_raw(),
        name: go.name().to_owned(),
        tag: go.tag().to_owned(),
        is_active: go.is_active(),
        transform,
        components,
        children,
    })
}

/// Capture every root GameObject, in ascending id order.
pub fn capture_tree(world: &World) -> Vec<GameObjectNode> {
    world
        .root_game_objects()
        .into_iter()
        .filter_map(|root| capture_node(world, root))
        .collect()
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// Rebuild a node (and its children) under `parent`.
///
/// Unknown component types are skipped, as are records whose payload fails
/// to deserialize. The active flag is applied last so components see a
/// single `on_disable` for inactive objects.
pub fn restore_node(
    world: &mut World,
    node: &GameObjectNode,
    parent: Option<GameObjectId>,
    factory: &ComponentFactory,
) -> anyhow::Result<GameObjectId> {
    let id = world.create_game_object(&node.name);
    if let Some(go) = world.game_object_mut(id) {
        go.set_tag(node.tag.clone());
    }
    if let Some(t) = world.transform_mut(id) {
        t.apply_data(&node.transform);
    }
    if parent.is_some() {
        world.set_parent(id, parent)?;
    }

    for record in &node.components {
        if record.type_name == TRANSFORM_TYPE {
            continue;
        }
        let Some(mut component) = factory.create(&record.type_name) else {
            tracing::debug!(component = %record.type_name, "unknown component type, skipped");
            continue;
        };
        if !record.data.is_null() {
            if let Err(err) = component.deserialize(&record.data) {
                tracing::warn!(
                    component = %record.type_name,
                    game_object = %id,
                    error = %err,
                    "component data rejected, skipped"
                );
                continue;
            }
        }
        world.add_boxed_component(id, component)?;
    }

    for child in &node.children {
        restore_node(world, child, Some(id), factory)?;
    }

    if !node.is_active {
        world.set_active(id, false)?;
    }
    Ok(id)
}

/// Restore a list of root nodes; returns the new root ids.
pub fn restore_tree(
    world: &mut World,
    nodes: &[GameObjectNode],
    factory: &ComponentFactory,
) -> anyhow::Result<Vec<GameObjectId>> {
    nodes
        .iter()
        .map(|node| restore_node(world, node, None, factory))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
