//! The engine: system registry, frame scheduler and frame loop.
//!
//! An [`Engine`] is an ordinary value. It owns the [`World`], the registered
//! systems, the [`EventBus`], the clock, the camera and the resource cache.
//! Several engines can coexist in one process.
//!
//! Each frame:
//!
//! 1. The clock advances.
//! 2. Deferred `PreUpdate` events are drained.
//! 3. Systems run in ascending priority (ties by registration order), each
//!    with an owned batch of the active components of its declared types.
//!    Systems with an empty batch are skipped. A failing system is logged
//!    and counted; the frame continues.
//! 4. Deferred `Update` then `PostUpdate` events are drained.
//! 5. `engine:update` is emitted with `{deltaTime, systemsRun}`.
//! 6. Stale deferred events are purged on a fixed simulated-time interval.
//! 7. Deferred `EndFrame` events are drained.
//! 8. [`EngineRequest`]s raised during the frame are applied.
//! 9. The next frame is requested from the [`FrameScheduler`] if still
//!    running.
//!
//! # Example
//!
//! ```
//! use kiln_engine::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.register_system("transform", TransformSystem).unwrap();
//!
//! let ball = engine.world_mut().create_game_object("ball");
//! engine.world_mut().transform_mut(ball).unwrap().velocity = Vector2::new(10.0, 0.0);
//!
//! engine.start();
//! engine.run_frames(10, 0.1);
//! let x = engine.world().transform(ball).unwrap().position.x;
//! assert!((x - 10.0).abs() < 1e-9);
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use kiln_scene::component::ComponentFactory;
use kiln_scene::math::Vector2;
use kiln_scene::world::World;

use crate::events::{EngineRequest, EventBus, EventPhase};
use crate::input::{InputEvent, InputState};
use crate::physics::{BoxCollider, CircleCollider, PhysicsConfig, Rigidbody};
use crate::render::{Camera, ShapeRenderer};
use crate::resources::ResourceManager;
use crate::system::{
    gather_batch, priority, ComponentSystem, RegisteredSystem, SystemContext, SystemStats,
};
use crate::time::Time;
use crate::EngineError;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Engine tunables. Every field has a default, so a partial JSON document
/// is enough to override a few of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on a single frame delta, in seconds.
    pub max_delta: f64,
    /// Multiplier applied to every frame delta.
    pub time_scale: f64,
    /// Wall-clock budget for draining one deferred phase, in milliseconds.
    pub deferred_budget_ms: f64,
    /// Simulated seconds between purges of stale deferred events.
    pub deferred_purge_interval: f64,
    /// Age in seconds after which a queued deferred event is dropped.
    pub deferred_max_age: f64,
    /// Cap on events dispatched by one emit, follow-ups included.
    pub max_event_cascade: usize,
    pub physics: PhysicsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_delta: crate::time::DEFAULT_MAX_DELTA,
            time_scale: 1.0,
            deferred_budget_ms: 4.0,
            deferred_purge_interval: 10.0,
            deferred_max_age: 30.0,
            max_event_cascade: crate::events::DEFAULT_MAX_CASCADE,
            physics: PhysicsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(s: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            serde_json::from_str(s).map_err(|e| EngineError::InvalidConfig {
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("max_delta", self.max_delta),
            ("deferred_budget_ms", self.deferred_budget_ms),
            ("deferred_purge_interval", self.deferred_purge_interval),
            ("deferred_max_age", self.deferred_max_age),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig {
                    details: format!("{name} must be positive and finite, got {value}"),
                });
            }
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(EngineError::InvalidConfig {
                details: format!(
                    "time_scale must be non-negative and finite, got {}",
                    self.time_scale
                ),
            });
        }
        if self.max_event_cascade == 0 {
            return Err(EngineError::InvalidConfig {
                details: "max_event_cascade must be at least 1".to_owned(),
            });
        }
        self.physics
            .validate()
            .map_err(|details| EngineError::InvalidConfig { details })
    }

    fn deferred_budget(&self) -> Duration {
        Duration::from_secs_f64(self.deferred_budget_ms / 1000.0)
    }
}

// ---------------------------------------------------------------------------
// FrameScheduler
// ---------------------------------------------------------------------------

/// Token for a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host hook for "call me back on the next frame".
///
/// The host answers a request by calling
/// [`Engine::on_animation_frame`] once. A cancelled request must not be
/// answered.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Scheduler that only records requests; frames are driven by the caller
/// through [`Engine::step`] or [`Engine::on_animation_frame`].
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next: u64,
    pending: Option<FrameHandle>,
}

impl ManualScheduler {
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineState {
    Stopped,
    Running,
    /// Cleared by `restart`; starts on the next frame boundary.
    RestartPending,
}

/// Snapshot of engine internals for tooling.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub state: EngineState,
    pub frame_count: u64,
    pub total_time: f64,
    pub delta_time: f64,
    pub game_objects: usize,
    pub components: usize,
    /// Tag → (registered, active).
    pub pools: BTreeMap<String, (usize, usize)>,
    pub systems: Vec<SystemInfo>,
    pub deferred_events: usize,
    /// Simulated time of the last stale-event purge.
    pub last_purge: f64,
    pub resources: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub name: String,
    pub priority: i32,
    pub component_types: Vec<String>,
    pub calls: u64,
    pub errors: u64,
    pub last_update_ms: f64,
    pub average_update_ms: f64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    config: EngineConfig,
    pub(crate) world: World,
    events: EventBus,
    pub(crate) time: Time,
    camera: Camera,
    resources: ResourceManager,
    input: InputState,
    pub(crate) factory: ComponentFactory,
    /// Sorted by `(priority, registration sequence)`.
    systems: Vec<RegisteredSystem>,
    next_system_seq: u64,
    state: EngineState,
    scheduler: Box<dyn FrameScheduler>,
    pending_frame: Option<FrameHandle>,
    in_frame: bool,
    pub(crate) last_purge: f64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("systems", &self.systems.len())
            .field("world", &self.world)
            .field("frame_count", &self.time.frame_count())
            .finish()
    }
}

impl Engine {
    /// Create an engine after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let mut time = Time::new(config.max_delta);
        time.set_time_scale(config.time_scale);

        let mut factory = ComponentFactory::new();
        factory.register::<BoxCollider>();
        factory.register::<CircleCollider>();
        factory.register::<Rigidbody>();
        factory.register::<ShapeRenderer>();

        let mut events = EventBus::with_max_cascade(config.max_event_cascade);
        install_camera_listeners(&mut events);

        Self {
            config,
            world: World::new(),
            events,
            time,
            camera: Camera::default(),
            resources: ResourceManager::default(),
            input: InputState::default(),
            factory,
            systems: Vec::new(),
            next_system_seq: 0,
            state: EngineState::Stopped,
            scheduler: Box::new(ManualScheduler::default()),
            pending_frame: None,
            in_frame: false,
            last_purge: 0.0,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Box<dyn FrameScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_resources(mut self, resources: ResourceManager) -> Self {
        self.resources = resources;
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut Time {
        &mut self.time
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Name→constructor registry used when restoring snapshots.
    pub fn factory(&self) -> &ComponentFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut ComponentFactory {
        &mut self.factory
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Whether a frame request is outstanding with the scheduler.
    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    // -- Systems --------------------------------------------------------------

    /// Register a system under `name`.
    ///
    /// Pools for every declared type are created if missing (existing
    /// members are kept), the system's `on_init` runs, and the priority order
    /// is recomputed. A system already registered under `name` is replaced.
    pub fn register_system<S: ComponentSystem>(
        &mut self,
        name: &str,
        system: S,
    ) -> Result<(), EngineError> {
        self.register_boxed_system(name, Box::new(system))
    }

    pub fn register_boxed_system(
        &mut self,
        name: &str,
        mut system: Box<dyn ComponentSystem>,
    ) -> Result<(), EngineError> {
        for tag in system.component_types() {
            self.world.ensure_pool(tag);
        }
        system
            .on_init(&mut self.world)
            .map_err(|e| EngineError::SystemInit {
                name: name.to_owned(),
                details: format!("{e:#}"),
            })?;

        if let Some(idx) = self.systems.iter().position(|s| s.name() == name) {
            tracing::warn!(system = %name, "system already registered, replacing");
            self.systems.remove(idx);
        }
        let seq = self.next_system_seq;
        self.next_system_seq += 1;
        self.systems.push(RegisteredSystem::new(name, seq, system));
        self.systems.sort_by_key(|s| s.sort_key());
        tracing::debug!(system = %name, "system registered");
        Ok(())
    }

    pub fn unregister_system(&mut self, name: &str) -> bool {
        match self.systems.iter().position(|s| s.name() == name) {
            Some(idx) => {
                self.systems.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Registered system names in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    pub fn system_stats(&self, name: &str) -> Option<&SystemStats> {
        self.find_system(name).map(|s| s.stats())
    }

    /// Borrow a registered system as its concrete type.
    pub fn system<S: ComponentSystem>(&self, name: &str) -> Option<&S> {
        self.find_system(name)?
            .system_ref()
            .as_any()
            .downcast_ref::<S>()
    }

    pub fn system_mut<S: ComponentSystem>(&mut self, name: &str) -> Option<&mut S> {
        self.systems
            .iter_mut()
            .find(|s| s.name() == name)?
            .system_mut()
            .as_any_mut()
            .downcast_mut::<S>()
    }

    fn find_system(&self, name: &str) -> Option<&RegisteredSystem> {
        self.systems.iter().find(|s| s.name() == name)
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Begin running. No-op when already running.
    pub fn start(&mut self) {
        if self.state == EngineState::Running {
            return;
        }
        self.time.reset();
        self.last_purge = 0.0;
        self.state = EngineState::Running;
        tracing::info!("engine started");
        self.emit("engine:start", json!({}));
        self.request_frame();
    }

    /// Stop running and cancel the outstanding frame request. State is kept.
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.cancel_frame();
        self.state = EngineState::Stopped;
        tracing::info!(frames = self.time.frame_count(), "engine stopped");
        self.emit("engine:stop", json!({}));
    }

    /// Stop, destroy every GameObject, drop all systems, pools and cached
    /// resources.
    pub fn clear(&mut self) {
        self.stop();
        self.world.clear();
        self.systems.clear();
        self.resources.clear();
        self.events.clear_deferred();
        self.input.reset();
        tracing::info!("engine cleared");
        self.emit("engine:clear", json!({}));
    }

    /// Clear everything, then start again on the next frame boundary.
    ///
    /// Called from a listener or system, use
    /// [`EngineRequest::Restart`] instead; it is applied after the frame.
    pub fn restart(&mut self) {
        self.emit("engine:restart", json!({}));
        self.clear();
        self.state = EngineState::RestartPending;
        self.request_frame();
    }

    fn request_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.scheduler.request_frame());
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    // -- Frame loop -----------------------------------------------------------

    /// Host callback for a scheduled frame. `timestamp_ms` is the host's
    /// monotonic clock. Returns whether a frame ran.
    pub fn on_animation_frame(&mut self, timestamp_ms: f64) -> bool {
        self.pending_frame = None;
        if !self.enter_frame() {
            return false;
        }
        let dt = self.time.advance_to(timestamp_ms);
        self.run_frame(dt);
        true
    }

    /// Run one frame with an explicit delta in seconds. Returns whether a
    /// frame ran.
    pub fn step(&mut self, dt: f64) -> bool {
        self.pending_frame = None;
        if !self.enter_frame() {
            return false;
        }
        let dt = self.time.advance_by(dt);
        self.run_frame(dt);
        true
    }

    /// Run up to `n` frames of `dt` seconds; stops early if the engine stops.
    pub fn run_frames(&mut self, n: usize, dt: f64) -> usize {
        let mut ran = 0;
        for _ in 0..n {
            if !self.step(dt) {
                break;
            }
            ran += 1;
        }
        ran
    }

    fn enter_frame(&mut self) -> bool {
        if self.state == EngineState::RestartPending {
            self.state = EngineState::Stopped;
            self.start();
        }
        self.state == EngineState::Running
    }

    fn run_frame(&mut self, dt: f64) {
        let frame = self.time.frame_count();
        let _span = tracing::trace_span!("frame", frame).entered();
        self.in_frame = true;

        self.drain(EventPhase::PreUpdate);

        let mut systems_run = 0usize;
        for entry in self.systems.iter_mut() {
            let batch = gather_batch(&self.world, entry.component_types());
            if batch.is_empty() {
                continue;
            }
            let mut ctx = SystemContext {
                world: &mut self.world,
                events: &mut self.events,
                time: &self.time,
                camera: &self.camera,
            };
            entry.run(dt, &batch, &mut ctx);
            systems_run += 1;
        }

        self.drain(EventPhase::Update);
        self.drain(EventPhase::PostUpdate);

        self.events.emit(
            "engine:update",
            json!({ "deltaTime": dt, "systemsRun": systems_run }),
        );

        if self.time.total_time() - self.last_purge >= self.config.deferred_purge_interval {
            self.last_purge = self.time.total_time();
            self.events
                .purge_older_than(Duration::from_secs_f64(self.config.deferred_max_age));
        }

        self.drain(EventPhase::EndFrame);
        self.in_frame = false;

        self.apply_requests();
        if self.state == EngineState::Running {
            self.request_frame();
        }
    }

    fn drain(&mut self, phase: EventPhase) {
        self.events.drain_phase(phase, self.config.deferred_budget());
    }

    /// Render out of band: every system at or above render priority runs once
    /// with its current batch. Works whether or not the engine is running.
    pub fn force_render(&mut self) -> usize {
        let mut ran = 0;
        for entry in self.systems.iter_mut() {
            if entry.priority() < priority::RENDER {
                continue;
            }
            let batch = gather_batch(&self.world, entry.component_types());
            let mut ctx = SystemContext {
                world: &mut self.world,
                events: &mut self.events,
                time: &self.time,
                camera: &self.camera,
            };
            entry.run(0.0, &batch, &mut ctx);
            ran += 1;
        }
        if !self.in_frame {
            self.apply_requests();
        }
        ran
    }

    // -- Events & requests ----------------------------------------------------

    /// Emit on the bus. Outside a frame, requests raised by listeners are
    /// applied immediately.
    pub fn emit(&mut self, name: &str, data: serde_json::Value) -> usize {
        let n = self.events.emit(name, data);
        if !self.in_frame {
            self.apply_requests();
        }
        n
    }

    /// Feed one host input event: updates [`InputState`] and republishes it
    /// as an `input:*` event.
    pub fn handle_input(&mut self, event: InputEvent) -> usize {
        self.input.apply(&event, &self.camera);
        let payload = event.payload(&self.camera);
        self.emit(event.event_name(), payload)
    }

    fn apply_requests(&mut self) {
        // Applying a request can emit events that raise further requests.
        loop {
            let requests = self.events.take_requests();
            if requests.is_empty() {
                break;
            }
            for request in requests {
                tracing::debug!(?request, "applying engine request");
                match request {
                    EngineRequest::Stop => self.stop(),
                    EngineRequest::Clear => self.clear(),
                    EngineRequest::Restart => self.restart(),
                    EngineRequest::MoveCamera(position) => self.camera.move_to(position),
                    EngineRequest::ZoomCamera(zoom) => self.camera.set_zoom(zoom),
                }
            }
        }
    }

    // -- Diagnostics ----------------------------------------------------------

    pub fn debug_info(&self) -> DebugInfo {
        let pools = self
            .world
            .pool_types()
            .into_iter()
            .map(|tag| {
                (
                    tag.to_owned(),
                    (
                        self.world.components_by_type(tag).len(),
                        self.world.active_components_by_type(tag).len(),
                    ),
                )
            })
            .collect();
        let systems = self
            .systems
            .iter()
            .map(|s| SystemInfo {
                name: s.name().to_owned(),
                priority: s.priority(),
                component_types: s.component_types().iter().map(|t| (*t).to_owned()).collect(),
                calls: s.stats().calls,
                errors: s.stats().errors,
                last_update_ms: s.stats().last_update.as_secs_f64() * 1000.0,
                average_update_ms: s.stats().average_update().as_secs_f64() * 1000.0,
            })
            .collect();
        DebugInfo {
            state: self.state,
            frame_count: self.time.frame_count(),
            total_time: self.time.total_time(),
            delta_time: self.time.delta_time(),
            game_objects: self.world.game_object_count(),
            components: self.world.component_count(),
            pools,
            systems,
            deferred_events: self.events.deferred_len(),
            last_purge: self.last_purge,
            resources: self.resources.len(),
        }
    }

    pub(crate) fn ensure_system_pools(&mut self) {
        for entry in &self.systems {
            for tag in entry.component_types() {
                self.world.ensure_pool(tag);
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

/// `camera:move {x, y}` and `camera:zoom {zoom}` become engine requests.
fn install_camera_listeners(events: &mut EventBus) {
    events.on("camera:move", |event, ctx| {
        let x = event.data.get("x").and_then(|v| v.as_f64());
        let y = event.data.get("y").and_then(|v| v.as_f64());
        match (x, y) {
            (Some(x), Some(y)) => ctx.request(EngineRequest::MoveCamera(Vector2::new(x, y))),
            _ => tracing::warn!(data = %event.data, "camera:move needs numeric x and y"),
        }
    });
    events.on("camera:zoom", |event, ctx| {
        match event.data.get("zoom").and_then(|v| v.as_f64()) {
            Some(zoom) => ctx.request(EngineRequest::ZoomCamera(zoom)),
            None => tracing::warn!(data = %event.data, "camera:zoom needs a numeric zoom"),
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_scene::component::Component;
    use kiln_scene::id::ComponentId;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tagged;

    impl Component for Tagged {
        fn type_tags(&self) -> &'static [&'static str] {
            &["Tagged"]
        }
    }

    /// Appends `label` to a shared log on every update.
    struct Recorder {
        label: &'static str,
        priority: i32,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ComponentSystem for Recorder {
        fn component_types(&self) -> &'static [&'static str] {
            &["Tagged"]
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn update(
            &mut self,
            _dt: f64,
            _batch: &[ComponentId],
            _ctx: &mut SystemContext<'_>,
        ) -> anyhow::Result<()> {
            self.log.borrow_mut().push(self.label);
            Ok(())
        }
    }

    /// Raises an engine request from inside a frame.
    struct Requester(EngineRequest);

    impl ComponentSystem for Requester {
        fn component_types(&self) -> &'static [&'static str] {
            &["Tagged"]
        }

        fn update(
            &mut self,
            _dt: f64,
            _batch: &[ComponentId],
            ctx: &mut SystemContext<'_>,
        ) -> anyhow::Result<()> {
            ctx.events.request(self.0.clone());
            Ok(())
        }
    }

    fn engine_with_tagged() -> Engine {
        let mut engine = Engine::default();
        let go = engine.world_mut().create_game_object("thing");
        engine.world_mut().add_component(go, Tagged).unwrap();
        engine
    }

    #[test]
    fn config_rejects_bad_values() {
        let cfg = EngineConfig {
            max_delta: 0.0,
            ..Default::default()
        };
        assert!(matches!(Engine::new(cfg), Err(EngineError::InvalidConfig { .. })));
        assert!(EngineConfig::from_json_str(r#"{"time_scale": -1.0}"#).is_err());
        assert!(EngineConfig::from_json_str("not json").is_err());
        let cfg = EngineConfig::from_json_str(r#"{"physics": {"restitution": 0.25}}"#).unwrap();
        assert_eq!(cfg.physics.restitution, 0.25);
        assert_eq!(cfg.max_delta, crate::time::DEFAULT_MAX_DELTA);
    }

    #[test]
    fn systems_sorted_by_priority_then_registration() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine_with_tagged();
        for (label, priority) in [("render", 100), ("first", 0), ("mid-a", 50), ("mid-b", 50)] {
            engine
                .register_system(label, Recorder { label, priority, log: log.clone() })
                .unwrap();
        }
        assert_eq!(engine.system_names(), vec!["first", "mid-a", "mid-b", "render"]);

        engine.start();
        engine.step(0.016);
        assert_eq!(log.borrow().as_slice(), &["first", "mid-a", "mid-b", "render"]);
    }

    #[test]
    fn duplicate_name_replaces_system() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine_with_tagged();
        engine
            .register_system("s", Recorder { label: "old", priority: 0, log: log.clone() })
            .unwrap();
        engine
            .register_system("s", Recorder { label: "new", priority: 0, log: log.clone() })
            .unwrap();
        engine.start();
        engine.step(0.016);
        assert_eq!(log.borrow().as_slice(), &["new"]);
        assert_eq!(engine.system_names().len(), 1);
    }

    #[test]
    fn empty_batch_skips_system() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::default();
        engine
            .register_system("idle", Recorder { label: "idle", priority: 0, log: log.clone() })
            .unwrap();
        let updates = Rc::new(RefCell::new(Vec::new()));
        let u = updates.clone();
        engine
            .events_mut()
            .on("engine:update", move |e, _| u.borrow_mut().push(e.data["systemsRun"].clone()));

        engine.start();
        engine.step(0.016);
        assert!(log.borrow().is_empty());
        assert_eq!(updates.borrow().as_slice(), &[json!(0)]);
        assert_eq!(engine.system_stats("idle").unwrap().calls, 0);
    }

    #[test]
    fn stopped_engine_runs_no_frames() {
        let mut engine = engine_with_tagged();
        assert!(!engine.step(0.016));
        engine.start();
        assert!(engine.has_pending_frame());
        assert!(engine.step(0.016));
        engine.stop();
        assert!(!engine.has_pending_frame());
        assert!(!engine.on_animation_frame(100.0));
        assert_eq!(engine.time().frame_count(), 1);
    }

    #[test]
    fn stop_requested_inside_frame_applies_after_frame() {
        let mut engine = engine_with_tagged();
        engine.register_system("stopper", Requester(EngineRequest::Stop)).unwrap();
        let stops = Rc::new(RefCell::new(0));
        let s = stops.clone();
        engine.events_mut().on("engine:stop", move |_, _| *s.borrow_mut() += 1);

        engine.start();
        assert_eq!(engine.run_frames(5, 0.016), 1);
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(*stops.borrow(), 1);
        assert!(!engine.has_pending_frame());
    }

    #[test]
    fn restart_clears_and_starts_on_next_frame() {
        let mut engine = engine_with_tagged();
        let starts = Rc::new(RefCell::new(0));
        let s = starts.clone();
        engine.events_mut().on("engine:start", move |_, _| *s.borrow_mut() += 1);

        engine.start();
        engine.step(0.016);
        engine.restart();
        assert_eq!(engine.state(), EngineState::RestartPending);
        assert_eq!(engine.world().game_object_count(), 0);
        assert!(engine.has_pending_frame());

        assert!(engine.step(0.016));
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(*starts.borrow(), 2);
        assert_eq!(engine.time().frame_count(), 1);
    }

    #[test]
    fn camera_events_move_camera() {
        let mut engine = Engine::default();
        engine.emit("camera:move", json!({"x": 5.0, "y": -2.0}));
        engine.emit("camera:zoom", json!({"zoom": 2.5}));
        assert_eq!(engine.camera().position, Vector2::new(5.0, -2.0));
        assert_eq!(engine.camera().zoom, 2.5);
    }

    #[test]
    fn input_is_republished_with_world_coordinates() {
        let mut engine = Engine::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        engine
            .events_mut()
            .on("input:mousemove", move |e, _| s.borrow_mut().push(e.data["worldX"].clone()));
        engine.handle_input(InputEvent::MouseMove {
            position: Vector2::new(410.0, 300.0),
        });
        assert_eq!(seen.borrow().as_slice(), &[json!(10.0)]);
        assert_eq!(engine.input().pointer(), Vector2::new(410.0, 300.0));
    }

    #[test]
    fn force_render_runs_only_render_priority() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine_with_tagged();
        let logic = Recorder {
            label: "logic",
            priority: 10,
            log: log.clone(),
        };
        let draw = Recorder {
            label: "draw",
            priority: priority::RENDER,
            log: log.clone(),
        };
        engine.register_system("logic", logic).unwrap();
        engine.register_system("draw", draw).unwrap();
        assert_eq!(engine.force_render(), 1);
        assert_eq!(log.borrow().as_slice(), &["draw"]);
    }

    #[test]
    fn deferred_events_drain_in_frame() {
        let mut engine = engine_with_tagged();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        engine.events_mut().on("later", move |_, _| *h.borrow_mut() += 1);
        engine
            .events_mut()
            .emit_deferred(EventPhase::EndFrame, "later", json!(null));
        assert_eq!(*hits.borrow(), 0);
        engine.start();
        engine.step(0.016);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn debug_info_reports_pools_and_systems() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = engine_with_tagged();
        engine
            .register_system("rec", Recorder { label: "rec", priority: 0, log })
            .unwrap();
        engine.start();
        engine.run_frames(3, 0.016);

        let info = engine.debug_info();
        assert_eq!(info.game_objects, 1);
        assert_eq!(info.pools["Tagged"], (1, 1));
        assert_eq!(info.systems[0].calls, 3);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["state"], json!("running"));
    }

    #[test]
    fn system_downcast_by_name() {
        let mut engine = Engine::default();
        engine
            .register_system("physics", crate::physics::PhysicsSystem::default())
            .unwrap();
        assert!(engine.system::<crate::physics::PhysicsSystem>("physics").is_some());
        assert!(engine.system::<crate::systems::TransformSystem>("physics").is_none());
        assert!(engine.world().has_pool("Rigidbody"));
        assert!(engine.world().has_pool("Collider"));
    }
}
