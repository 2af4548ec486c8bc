//! The physics step and persistent contact-pair tracking.

use std::collections::BTreeMap;

use serde_json::json;

use kiln_scene::id::{ComponentId, GameObjectId};
use kiln_scene::script::{Contact, Script};
use kiln_scene::transform::Transform;
use kiln_scene::world::World;

use super::collider::{resolve_collider, ResolvedCollider, COLLIDER_TAG};
use super::rigidbody::{Rigidbody, RIGIDBODY_TYPE};
use super::PhysicsConfig;
use crate::events::EventBus;
use crate::system::{priority, ComponentSystem, SystemContext};

/// Tag under which script-capable components are pooled.
pub const SCRIPT_TAG: &str = "Script";

// ---------------------------------------------------------------------------
// PairKey
// ---------------------------------------------------------------------------

/// Unordered pair of GameObjects, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub a: GameObjectId,
    pub b: GameObjectId,
}

impl PairKey {
    pub fn new(x: GameObjectId, y: GameObjectId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn contains(&self, id: GameObjectId) -> bool {
        self.a == id || self.b == id
    }
}

/// What the pair looked like when it was last seen touching. Kept so an exit
/// can be reported with the same colliders after they stop overlapping.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PairRecord {
    collider_a: ComponentId,
    collider_b: ComponentId,
    is_trigger: bool,
}

// ---------------------------------------------------------------------------
// CollisionEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    Enter,
    Stay,
    Exit,
}

/// One contact transition produced by a physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub phase: ContactPhase,
    pub pair: PairKey,
    /// Collider on `pair.a`.
    pub collider_a: ComponentId,
    /// Collider on `pair.b`.
    pub collider_b: ComponentId,
    pub is_trigger: bool,
}

impl CollisionEvent {
    /// Bus event name, e.g. `physics:collisionEnter` or `physics:triggerExit`.
    pub fn event_name(&self) -> &'static str {
        match (self.is_trigger, self.phase) {
            (false, ContactPhase::Enter) => "physics:collisionEnter",
            (false, ContactPhase::Stay) => "physics:collisionStay",
            (false, ContactPhase::Exit) => "physics:collisionExit",
            (true, ContactPhase::Enter) => "physics:triggerEnter",
            (true, ContactPhase::Stay) => "physics:triggerStay",
            (true, ContactPhase::Exit) => "physics:triggerExit",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        json!({
            "a": self.pair.a.to_raw(),
            "b": self.pair.b.to_raw(),
            "colliderA": self.collider_a.to_raw(),
            "colliderB": self.collider_b.to_raw(),
            "isTrigger": self.is_trigger,
        })
    }
}

// ---------------------------------------------------------------------------
// PhysicsSystem
// ---------------------------------------------------------------------------

/// Integrates rigidbodies, detects overlaps and resolves collisions.
#[derive(Debug, Default)]
pub struct PhysicsSystem {
    config: PhysicsConfig,
    touching: BTreeMap<PairKey, PairRecord>,
    last_events: Vec<CollisionEvent>,
    steps: u64,
}

impl PhysicsSystem {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_restitution(&mut self, restitution: f64) {
        self.config.restitution = restitution.clamp(0.0, 1.0);
    }

    /// Transitions produced by the most recent step, in dispatch order.
    pub fn last_events(&self) -> &[CollisionEvent] {
        &self.last_events
    }

    /// Pairs touching as of the most recent step.
    pub fn touching_pairs(&self) -> Vec<PairKey> {
        self.touching.keys().copied().collect()
    }

    pub fn is_touching(&self, a: GameObjectId, b: GameObjectId) -> bool {
        self.touching.contains_key(&PairKey::new(a, b))
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Forget all contact state without reporting exits.
    pub fn reset(&mut self) {
        self.touching.clear();
        self.last_events.clear();
    }

    /// Run one physics step over the whole world.
    pub fn step(&mut self, world: &mut World, events: &mut EventBus, dt: f64) {
        self.steps += 1;
        self.last_events.clear();

        self.integrate(world, dt);
        let colliders = collect_colliders(world);
        let current = detect_pairs(&colliders);

        for (key, record) in &current {
            let phase = if self.touching.contains_key(key) {
                ContactPhase::Stay
            } else {
                ContactPhase::Enter
            };
            self.last_events.push(CollisionEvent {
                phase,
                pair: *key,
                collider_a: record.collider_a,
                collider_b: record.collider_b,
                is_trigger: record.is_trigger,
            });
        }
        for (key, record) in &self.touching {
            if !current.contains_key(key) {
                self.last_events.push(CollisionEvent {
                    phase: ContactPhase::Exit,
                    pair: *key,
                    collider_a: record.collider_a,
                    collider_b: record.collider_b,
                    is_trigger: record.is_trigger,
                });
            }
        }
        self.touching = current;

        for event in &self.last_events {
            if !event.is_trigger && event.phase != ContactPhase::Exit {
                resolve_pair(world, event.pair, self.config.restitution);
            }
            dispatch_scripts(world, event);
            events.emit(event.event_name(), event.payload());
        }
    }

    fn integrate(&self, world: &mut World, dt: f64) {
        let bodies: Vec<ComponentId> = world.active_components_by_type(RIGIDBODY_TYPE).to_vec();
        for id in bodies {
            let Some(owner) = world.component_owner(id) else {
                continue;
            };
            let Some(body) = world.component_mut::<Rigidbody>(id) else {
                continue;
            };
            if body.is_kinematic {
                continue;
            }
            body.integrate(self.config.gravity, dt);
            let (velocity, angular_velocity) = (body.velocity, body.angular_velocity);
            if let Some(t) = world.transform_mut(owner) {
                t.velocity = velocity;
                t.angular_velocity = angular_velocity;
            }
        }
    }
}

impl ComponentSystem for PhysicsSystem {
    fn component_types(&self) -> &'static [&'static str] {
        &[RIGIDBODY_TYPE, COLLIDER_TAG]
    }

    fn priority(&self) -> i32 {
        priority::PHYSICS
    }

    fn update(
        &mut self,
        dt: f64,
        _batch: &[ComponentId],
        ctx: &mut SystemContext<'_>,
    ) -> anyhow::Result<()> {
        self.step(ctx.world, ctx.events, dt);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Step stages
// ---------------------------------------------------------------------------

/// Every active collider, GameObjects in id order, components in attach order.
fn collect_colliders(world: &World) -> Vec<ResolvedCollider> {
    let mut out = Vec::new();
    for go in world.game_objects() {
        if !go.is_active() {
            continue;
        }
        for id in world.get_components_by_tag(go.id(), COLLIDER_TAG) {
            if !world.is_component_active(id) {
                continue;
            }
            if let Some(resolved) = resolve_collider(world, id) {
                out.push(resolved);
            }
        }
    }
    out
}

/// Test all pairs (i < j) on different GameObjects. The first overlapping
/// collider pair found for a GameObject pair represents it.
fn detect_pairs(colliders: &[ResolvedCollider]) -> BTreeMap<PairKey, PairRecord> {
    let mut current = BTreeMap::new();
    for (i, ci) in colliders.iter().enumerate() {
        for cj in &colliders[i + 1..] {
            if ci.owner == cj.owner {
                continue;
            }
            let key = PairKey::new(ci.owner, cj.owner);
            if current.contains_key(&key) || !ci.shape.intersects(&cj.shape) {
                continue;
            }
            let (on_a, on_b) = if ci.owner == key.a { (ci, cj) } else { (cj, ci) };
            current.insert(
                key,
                PairRecord {
                    collider_a: on_a.id,
                    collider_b: on_b.id,
                    is_trigger: ci.is_trigger || cj.is_trigger,
                },
            );
        }
    }
    current
}

/// Impulse response between two dynamic bodies along the line joining their
/// world positions.
fn resolve_pair(world: &mut World, pair: PairKey, restitution: f64) {
    let (Some(id_a), Some(id_b)) = (
        dynamic_body(world, pair.a),
        dynamic_body(world, pair.b),
    ) else {
        return;
    };
    let (Some(pos_a), Some(pos_b)) = (world.world_position(pair.a), world.world_position(pair.b))
    else {
        return;
    };
    let (Some(a), Some(b)) = (
        world.component::<Rigidbody>(id_a),
        world.component::<Rigidbody>(id_b),
    ) else {
        return;
    };

    let normal = (pos_b - pos_a).normalized();
    if normal.length_squared() == 0.0 {
        return;
    }
    let relative = b.velocity - a.velocity;
    let along_normal = relative.dot(normal);
    if along_normal > 0.0 {
        return;
    }
    let (inv_a, inv_b) = (a.inverse_mass(), b.inverse_mass());
    let j = -(1.0 + restitution) * along_normal / (inv_a + inv_b);
    let impulse = normal * j;

    let va = a.velocity - impulse * inv_a;
    let vb = b.velocity + impulse * inv_b;
    set_velocity(world, id_a, pair.a, va);
    set_velocity(world, id_b, pair.b, vb);
}

fn dynamic_body(world: &World, owner: GameObjectId) -> Option<ComponentId> {
    world
        .get_component_ids::<Rigidbody>(owner)
        .into_iter()
        .find(|id| {
            world.is_component_active(*id)
                && world
                    .component::<Rigidbody>(*id)
                    .is_some_and(|rb| rb.inverse_mass() > 0.0)
        })
}

fn set_velocity(
    world: &mut World,
    body: ComponentId,
    owner: GameObjectId,
    velocity: kiln_scene::math::Vector2,
) {
    if let Some(rb) = world.component_mut::<Rigidbody>(body) {
        rb.velocity = velocity;
    }
    if let Some(t) = world.transform_mut(owner) {
        t.velocity = velocity;
    }
}

/// Deliver a transition to the active scripts on both sides. A failing
/// callback is logged and does not stop delivery to the others.
fn dispatch_scripts(world: &mut World, event: &CollisionEvent) {
    let sides = [
        (event.pair.a, event.pair.b, event.collider_b),
        (event.pair.b, event.pair.a, event.collider_a),
    ];
    for (me, other, other_collider) in sides {
        let contact = Contact {
            other,
            other_collider,
            is_trigger: event.is_trigger,
        };
        for id in world.get_components_by_tag(me, SCRIPT_TAG) {
            if !world.is_component_active(id) {
                continue;
            }
            let Some(script) = world.script_mut(id) else {
                continue;
            };
            if let Err(err) = invoke(script, event, &contact) {
                tracing::error!(
                    script = %id,
                    game_object = %me,
                    other = %other,
                    event = event.event_name(),
                    error = %format!("{err:#}"),
                    "collision callback failed"
                );
            }
        }
    }
}

fn invoke(
    script: &mut dyn Script,
    event: &CollisionEvent,
    contact: &Contact,
) -> anyhow::Result<()> {
    match (event.is_trigger, event.phase) {
        (false, ContactPhase::Enter) => script.on_collision_enter(contact),
        (false, ContactPhase::Stay) => script.on_collision_stay(contact),
        (false, ContactPhase::Exit) => script.on_collision_exit(contact),
        (true, ContactPhase::Enter) => script.on_trigger_enter(contact),
        (true, ContactPhase::Stay) => script.on_trigger_stay(contact),
        (true, ContactPhase::Exit) => script.on_trigger_exit(contact),
    }
}

/// Velocity currently stored on a GameObject's Transform.
pub fn transform_velocity(world: &World, owner: GameObjectId) -> Option<kiln_scene::math::Vector2> {
    world.get_component::<Transform>(owner).map(|t| t.velocity)
}
