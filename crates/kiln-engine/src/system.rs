//! The component-system contract.
//!
//! A [`ComponentSystem`] declares which component type tags it processes and
//! a priority. Each frame the engine hands it an owned batch of the active
//! components of those tags, together with a [`SystemContext`] exposing the
//! world and the engine collaborators it may touch.
//!
//! Every registered system is wrapped in a [`RegisteredSystem`] that times
//! each update and accumulates [`SystemStats`].

use std::collections::HashSet;
use std::time::{Duration, Instant};

use kiln_scene::component::AsAny;
use kiln_scene::id::ComponentId;
use kiln_scene::world::World;

use crate::events::EventBus;
use crate::render::Camera;
use crate::time::Time;

/// Conventional priorities. Lower values run earlier in the frame.
pub mod priority {
    pub const TRANSFORM: i32 = 0;
    pub const PHYSICS: i32 = 10;
    pub const DEFAULT: i32 = 25;
    pub const SCRIPT: i32 = 50;
    pub const RENDER: i32 = 100;
}

// ---------------------------------------------------------------------------
// SystemContext
// ---------------------------------------------------------------------------

/// What a system can reach during an update.
pub struct SystemContext<'a> {
    pub world: &'a mut World,
    pub events: &'a mut EventBus,
    pub time: &'a Time,
    pub camera: &'a Camera,
}

// ---------------------------------------------------------------------------
// ComponentSystem
// ---------------------------------------------------------------------------

/// Batch logic over all active components of the declared types.
pub trait ComponentSystem: AsAny {
    /// Tags this system consumes, in the order batches are assembled.
    fn component_types(&self) -> &'static [&'static str];

    fn priority(&self) -> i32 {
        priority::DEFAULT
    }

    /// Called once when the system is registered.
    fn on_init(&mut self, _world: &mut World) -> anyhow::Result<()> {
        Ok(())
    }

    /// Process one frame. `batch` holds the active components of
    /// [`component_types`](ComponentSystem::component_types), deduplicated.
    fn update(
        &mut self,
        dt: f64,
        batch: &[ComponentId],
        ctx: &mut SystemContext<'_>,
    ) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// SystemStats
// ---------------------------------------------------------------------------

/// Timing and failure counters for one registered system.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemStats {
    pub last_update: Duration,
    pub total_update: Duration,
    pub calls: u64,
    pub errors: u64,
}

impl SystemStats {
    pub fn average_update(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total_update.div_f64(self.calls as f64)
        }
    }

    fn record(&mut self, elapsed: Duration, failed: bool) {
        self.last_update = elapsed;
        self.total_update += elapsed;
        self.calls += 1;
        if failed {
            self.errors += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// RegisteredSystem
// ---------------------------------------------------------------------------

/// A named system together with its registration order and stats.
pub struct RegisteredSystem {
    name: String,
    seq: u64,
    system: Box<dyn ComponentSystem>,
    stats: SystemStats,
}

impl std::fmt::Debug for RegisteredSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredSystem")
            .field("name", &self.name)
            .field("priority", &self.system.priority())
            .field("types", &self.system.component_types())
            .field("stats", &self.stats)
            .finish()
    }
}

impl RegisteredSystem {
    pub(crate) fn new(name: &str, seq: u64, system: Box<dyn ComponentSystem>) -> Self {
        Self {
            name: name.to_owned(),
            seq,
            system,
            stats: SystemStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.system.priority()
    }

    pub fn component_types(&self) -> &'static [&'static str] {
        self.system.component_types()
    }

    pub fn stats(&self) -> &SystemStats {
        &self.stats
    }

    pub(crate) fn sort_key(&self) -> (i32, u64) {
        (self.system.priority(), self.seq)
    }

    pub(crate) fn system_mut(&mut self) -> &mut dyn ComponentSystem {
        &mut *self.system
    }

    pub(crate) fn system_ref(&self) -> &dyn ComponentSystem {
        &*self.system
    }

    /// Run one timed update. Errors are logged and counted; returns whether
    /// the update succeeded.
    pub(crate) fn run(
        &mut self,
        dt: f64,
        batch: &[ComponentId],
        ctx: &mut SystemContext<'_>,
    ) -> bool {
        let start = Instant::now();
        let result = self.system.update(dt, batch, ctx);
        let elapsed = start.elapsed();
        self.stats.record(elapsed, result.is_err());
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    system = %self.name,
                    batch = batch.len(),
                    error = %format!("{err:#}"),
                    "system update failed"
                );
                false
            }
        }
    }
}

/// Union of the active components of `types`, in declaration order then pool
/// order, without duplicates.
pub fn gather_batch(world: &World, types: &[&str]) -> Vec<ComponentId> {
    if let [tag] = types {
        return world.active_components_by_type(tag).to_vec();
    }
    let mut seen = HashSet::new();
    let mut batch = Vec::new();
    for tag in types {
        for id in world.active_components_by_type(tag) {
            if seen.insert(*id) {
                batch.push(*id);
            }
        }
    }
    batch
}
