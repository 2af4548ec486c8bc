//! Property test: contact transitions are complete and consistent.
//!
//! Random sequences of moves, activation toggles, collider toggles and
//! reshapes (including zero, negative and NaN sizes and zero scale) are
//! interleaved with physics steps. Every step returns normally, and after
//! every step:
//!
//! - each pair appears at most once in the step's events;
//! - a pair touching before the step gets exactly one Stay or Exit;
//! - a pair not touching before the step can only Enter;
//! - the pairs that entered or stayed are exactly the touching set.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use kiln_engine::events::EventBus;
use kiln_engine::physics::{
    BoxCollider, CircleCollider, ContactPhase, PairKey, PhysicsConfig, PhysicsSystem,
};
use kiln_scene::id::{ComponentId, GameObjectId};
use kiln_scene::math::Vector2;
use kiln_scene::world::World;

const BODIES: usize = 5;

#[derive(Debug, Clone)]
enum Op {
    Move { body: usize, x: i8, y: i8 },
    ToggleActive { body: usize },
    ToggleCollider { body: usize },
    Reshape { body: usize, geometry: Geometry },
    Step,
}

#[derive(Debug, Clone, Copy)]
enum Geometry {
    Size(f64),
    ZeroScale,
    UnitScale,
}

fn geometry_strategy() -> impl Strategy<Value = Geometry> {
    prop_oneof![
        2 => prop_oneof![Just(2.0), Just(0.5), Just(0.0), Just(-2.0), Just(f64::NAN)]
            .prop_map(Geometry::Size),
        1 => Just(Geometry::ZeroScale),
        1 => Just(Geometry::UnitScale),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..BODIES, -4i8..=4, -4i8..=4).prop_map(|(body, x, y)| Op::Move { body, x, y }),
        1 => (0..BODIES).prop_map(|body| Op::ToggleActive { body }),
        1 => (0..BODIES).prop_map(|body| Op::ToggleCollider { body }),
        1 => (0..BODIES, geometry_strategy())
            .prop_map(|(body, geometry)| Op::Reshape { body, geometry }),
        3 => Just(Op::Step),
    ]
}

fn setup() -> (World, Vec<GameObjectId>, Vec<ComponentId>) {
    let mut world = World::new();
    let mut bodies = Vec::new();
    let mut colliders = Vec::new();
    for i in 0..BODIES {
        let go = world.create_game_object(&format!("body{i}"));
        let collider = if i % 2 == 0 {
            world.add_component(go, BoxCollider::new(2.0, 2.0)).unwrap()
        } else {
            world.add_component(go, CircleCollider::new(1.0)).unwrap()
        };
        bodies.push(go);
        colliders.push(collider);
    }
    (world, bodies, colliders)
}

fn check_step(
    before: &BTreeSet<PairKey>,
    physics: &PhysicsSystem,
) -> Result<BTreeSet<PairKey>, TestCaseError> {
    let mut seen: BTreeMap<PairKey, ContactPhase> = BTreeMap::new();
    for event in physics.last_events() {
        prop_assert!(
            seen.insert(event.pair, event.phase).is_none(),
            "pair {:?} reported twice in one step",
            event.pair
        );
        prop_assert!(event.pair.a < event.pair.b);
        let was_touching = before.contains(&event.pair);
        match event.phase {
            ContactPhase::Enter => prop_assert!(!was_touching, "enter for touching pair"),
            ContactPhase::Stay | ContactPhase::Exit => {
                prop_assert!(was_touching, "stay/exit for pair that was not touching")
            }
        }
    }
    for pair in before {
        prop_assert!(seen.contains_key(pair), "touching pair {:?} dropped silently", pair);
    }
    let now: BTreeSet<PairKey> = seen
        .iter()
        .filter(|(_, phase)| **phase != ContactPhase::Exit)
        .map(|(pair, _)| *pair)
        .collect();
    let reported: BTreeSet<PairKey> = physics.touching_pairs().into_iter().collect();
    prop_assert_eq!(&now, &reported);
    Ok(now)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn contact_transitions_are_complete(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let (mut world, bodies, colliders) = setup();
        let mut events = EventBus::new();
        let mut physics = PhysicsSystem::new(PhysicsConfig::zero_gravity());
        let mut touching = BTreeSet::new();

        for op in ops {
            match op {
                Op::Move { body, x, y } => {
                    let t = world.transform_mut(bodies[body]).unwrap();
                    t.position = Vector2::new(f64::from(x), f64::from(y));
                }
                Op::ToggleActive { body } => {
                    let active = world.is_active(bodies[body]);
                    world.set_active(bodies[body], !active).unwrap();
                }
                Op::ToggleCollider { body } => {
                    let enabled = world.is_component_enabled(colliders[body]);
                    world.set_component_enabled(colliders[body], !enabled).unwrap();
                }
                Op::Reshape { body, geometry } => match geometry {
                    Geometry::Size(size) => {
                        if let Some(b) = world.component_mut::<BoxCollider>(colliders[body]) {
                            b.size = Vector2::new(size, size);
                        } else if let Some(c) =
                            world.component_mut::<CircleCollider>(colliders[body])
                        {
                            c.radius = size * 0.5;
                        }
                    }
                    Geometry::ZeroScale => {
                        world.transform_mut(bodies[body]).unwrap().scale = Vector2::ZERO;
                    }
                    Geometry::UnitScale => {
                        world.transform_mut(bodies[body]).unwrap().scale = Vector2::ONE;
                    }
                },
                Op::Step => {
                    physics.step(&mut world, &mut events, 1.0 / 60.0);
                    touching = check_step(&touching, &physics)?;
                }
            }
        }

        // Separating everything ends every contact with an exit.
        for (i, body) in bodies.iter().enumerate() {
            let t = world.transform_mut(*body).unwrap();
            t.position = Vector2::new(i as f64 * 100.0, 0.0);
            t.scale = Vector2::ONE;
        }
        physics.step(&mut world, &mut events, 1.0 / 60.0);
        let after = check_step(&touching, &physics)?;
        prop_assert!(after.is_empty());
        prop_assert!(physics
            .last_events()
            .iter()
            .all(|e| e.phase == ContactPhase::Exit));
    }
}
