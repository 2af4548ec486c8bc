//! Built-in systems: transform integration and script updates.

use kiln_scene::id::ComponentId;
use kiln_scene::transform::{Transform, TRANSFORM_TYPE};

use crate::physics::system::SCRIPT_TAG;
use crate::system::{priority, ComponentSystem, SystemContext};

// ---------------------------------------------------------------------------
// TransformSystem
// ---------------------------------------------------------------------------

/// Moves every active Transform by its velocity and angular velocity.
#[derive(Debug, Default)]
pub struct TransformSystem;

impl ComponentSystem for TransformSystem {
    fn component_types(&self) -> &'static [&'static str] {
        &[TRANSFORM_TYPE]
    }

    fn priority(&self) -> i32 {
        priority::TRANSFORM
    }

    fn update(
        &mut self,
        dt: f64,
        batch: &[ComponentId],
        ctx: &mut SystemContext<'_>,
    ) -> anyhow::Result<()> {
        for id in batch {
            if let Some(t) = ctx.world.component_mut::<Transform>(*id) {
                let velocity = t.velocity;
                t.translate(velocity * dt);
                let spin = t.angular_velocity;
                t.rotate(spin * dt);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptSystem
// ---------------------------------------------------------------------------

/// Calls `on_update` on every active script component.
///
/// Each script is isolated: a failure is logged and the remaining scripts
/// still run. The update then reports an error so the failure is counted in
/// the system's stats.
#[derive(Debug, Default)]
pub struct ScriptSystem;

impl ComponentSystem for ScriptSystem {
    fn component_types(&self) -> &'static [&'static str] {
        &[SCRIPT_TAG]
    }

    fn priority(&self) -> i32 {
        priority::SCRIPT
    }

    fn update(
        &mut self,
        dt: f64,
        batch: &[ComponentId],
        ctx: &mut SystemContext<'_>,
    ) -> anyhow::Result<()> {
        let mut failed = 0usize;
        for id in batch {
            // Earlier scripts may have destroyed or disabled this one.
            if !ctx.world.is_component_active(*id) {
                continue;
            }
            let Some(script) = ctx.world.script_mut(*id) else {
                continue;
            };
            if let Err(err) = script.on_update(dt) {
                failed += 1;
                tracing::error!(script = %id, error = %format!("{err:#}"), "script update failed");
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {} scripts failed", batch.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::render::Camera;
    use crate::time::Time;
    use kiln_scene::component::Component;
    use kiln_scene::math::Vector2;
    use kiln_scene::script::Script;
    use kiln_scene::world::World;

    struct Counter {
        calls: u32,
        fail: bool,
    }

    impl Component for Counter {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Counter", SCRIPT_TAG]
        }

        fn as_script_mut(&mut self) -> Option<&mut dyn Script> {
            Some(self)
        }
    }

    impl Script for Counter {
        fn on_update(&mut self, _dt: f64) -> anyhow::Result<()> {
            self.calls += 1;
            anyhow::ensure!(!self.fail, "counter failed");
            Ok(())
        }
    }

    fn run(system: &mut dyn ComponentSystem, world: &mut World, dt: f64) -> anyhow::Result<()> {
        let batch = crate::system::gather_batch(world, system.component_types());
        let mut events = EventBus::new();
        let time = Time::default();
        let camera = Camera::default();
        let mut ctx = SystemContext {
            world,
            events: &mut events,
            time: &time,
            camera: &camera,
        };
        system.update(dt, &batch, &mut ctx)
    }

    #[test]
    fn transform_integrates_velocity() {
        let mut world = World::new();
        let go = world.create_game_object("mover");
        {
            let t = world.transform_mut(go).unwrap();
            t.velocity = Vector2::new(2.0, -4.0);
            t.angular_velocity = 1.0;
        }
        run(&mut TransformSystem, &mut world, 0.5).unwrap();
        let t = world.transform(go).unwrap();
        assert_eq!(t.position, Vector2::new(1.0, -2.0));
        assert_eq!(t.rotation, 0.5);
    }

    #[test]
    fn one_failing_script_does_not_stop_others() {
        let mut world = World::new();
        let go = world.create_game_object("actor");
        let bad = world.add_component(go, Counter { calls: 0, fail: true }).unwrap();
        let good = world.add_component(go, Counter { calls: 0, fail: false }).unwrap();

        assert!(run(&mut ScriptSystem, &mut world, 0.1).is_err());
        assert_eq!(world.component::<Counter>(bad).unwrap().calls, 1);
        assert_eq!(world.component::<Counter>(good).unwrap().calls, 1);
    }
}
