//! Event bus with listener priorities and per-phase deferred queues.
//!
//! Listeners are closures receiving the [`Event`] and an [`EventContext`].
//! The context is the only thing a listener can act through: it may emit
//! follow-up events (dispatched after the current one, breadth-first) and
//! raise [`EngineRequest`]s that the engine applies at a safe point. A
//! listener therefore never re-enters the engine.
//!
//! Deferred events are queued per [`EventPhase`] and drained by the frame
//! loop at fixed points, each drain bounded by a wall-clock budget.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use kiln_scene::math::Vector2;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A named event with a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Points in the frame at which deferred events are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventPhase {
    PreUpdate,
    Update,
    PostUpdate,
    EndFrame,
}

impl EventPhase {
    pub const ALL: [EventPhase; 4] = [
        EventPhase::PreUpdate,
        EventPhase::Update,
        EventPhase::PostUpdate,
        EventPhase::EndFrame,
    ];

    fn index(self) -> usize {
        match self {
            EventPhase::PreUpdate => 0,
            EventPhase::Update => 1,
            EventPhase::PostUpdate => 2,
            EventPhase::EndFrame => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// EngineRequest
// ---------------------------------------------------------------------------

/// Engine-level actions raised from listeners or systems.
///
/// Requests are applied by the engine after the current frame (or right after
/// the emitting call when no frame is running).
#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    Stop,
    Restart,
    Clear,
    /// Move the camera to an absolute world position.
    MoveCamera(Vector2),
    /// Set the camera zoom factor.
    ZoomCamera(f64),
}

// ---------------------------------------------------------------------------
// EventContext
// ---------------------------------------------------------------------------

/// Handle passed to listeners for follow-up work.
#[derive(Debug, Default)]
pub struct EventContext {
    follow_ups: Vec<Event>,
    requests: Vec<EngineRequest>,
}

impl EventContext {
    /// Queue an event to be dispatched after the current one.
    pub fn emit(&mut self, name: impl Into<String>, data: serde_json::Value) {
        self.follow_ups.push(Event::new(name, data));
    }

    pub fn request(&mut self, request: EngineRequest) {
        self.requests.push(request);
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Identifies a registered listener for [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&Event, &mut EventContext)>;

struct Listener {
    id: ListenerId,
    priority: i32,
    once: bool,
    callback: Callback,
}

struct DeferredEvent {
    event: Event,
    queued_at: Instant,
}

/// Default cap on events dispatched by a single `emit`, follow-ups included.
pub const DEFAULT_MAX_CASCADE: usize = 1024;

pub struct EventBus {
    listeners: HashMap<String, Vec<Listener>>,
    deferred: [VecDeque<DeferredEvent>; 4],
    requests: Vec<EngineRequest>,
    next_listener: u64,
    max_cascade: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_names", &self.listeners.len())
            .field("deferred", &self.deferred_len())
            .field("requests", &self.requests)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_max_cascade(DEFAULT_MAX_CASCADE)
    }

    pub fn with_max_cascade(max_cascade: usize) -> Self {
        Self {
            listeners: HashMap::new(),
            deferred: Default::default(),
            requests: Vec::new(),
            next_listener: 1,
            max_cascade: max_cascade.max(1),
        }
    }

    // -- Subscription ---------------------------------------------------------

    /// Subscribe to `name` with default priority 0.
    pub fn on<F>(&mut self, name: &str, callback: F) -> ListenerId
    where
        F: FnMut(&Event, &mut EventContext) + 'static,
    {
        self.subscribe(name, 0, false, Box::new(callback))
    }

    /// Subscribe with an explicit priority. Higher priorities run first;
    /// equal priorities run in subscription order.
    pub fn on_with_priority<F>(&mut self, name: &str, priority: i32, callback: F) -> ListenerId
    where
        F: FnMut(&Event, &mut EventContext) + 'static,
    {
        self.subscribe(name, priority, false, Box::new(callback))
    }

    /// Subscribe for a single delivery.
    pub fn once<F>(&mut self, name: &str, callback: F) -> ListenerId
    where
        F: FnMut(&Event, &mut EventContext) + 'static,
    {
        self.subscribe(name, 0, true, Box::new(callback))
    }

    fn subscribe(
        &mut self,
        name: &str,
        priority: i32,
        once: bool,
        callback: Callback,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        let list = self.listeners.entry(name.to_owned()).or_default();
        let at = list
            .iter()
            .position(|l| l.priority < priority)
            .unwrap_or(list.len());
        list.insert(
            at,
            Listener {
                id,
                priority,
                once,
                callback,
            },
        );
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(idx) = list.iter().position(|l| l.id == id) {
                list.remove(idx);
                return true;
            }
        }
        false
    }

    /// Remove every listener of one event name.
    pub fn off_all(&mut self, name: &str) -> usize {
        self.listeners.remove(name).map_or(0, |l| l.len())
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, |l| l.len())
    }

    // -- Dispatch -------------------------------------------------------------

    /// Dispatch an event synchronously, followed by any follow-ups the
    /// listeners emitted. Returns the number of listener invocations.
    pub fn emit(&mut self, name: &str, data: serde_json::Value) -> usize {
        self.dispatch(Event::new(name, data))
    }

    /// Dispatch a prepared event.
    pub fn dispatch(&mut self, event: Event) -> usize {
        let mut queue = VecDeque::from([event]);
        let mut dispatched = 0usize;
        let mut invocations = 0usize;

        while let Some(event) = queue.pop_front() {
            if dispatched == self.max_cascade {
                tracing::warn!(
                    event = %event.name,
                    dropped = queue.len() + 1,
                    "event cascade limit reached, dropping follow-ups"
                );
                break;
            }
            dispatched += 1;

            let mut ctx = EventContext::default();
            if let Some(list) = self.listeners.get_mut(&event.name) {
                for listener in list.iter_mut() {
                    (listener.callback)(&event, &mut ctx);
                    invocations += 1;
                }
                list.retain(|l| !l.once);
            }
            queue.extend(ctx.follow_ups);
            self.requests.extend(ctx.requests);
        }
        invocations
    }

    /// Raise an engine request directly.
    pub fn request(&mut self, request: EngineRequest) {
        self.requests.push(request);
    }

    /// Take every request raised since the last call.
    pub fn take_requests(&mut self) -> Vec<EngineRequest> {
        std::mem::take(&mut self.requests)
    }

    // -- Deferred queues ------------------------------------------------------

    /// Queue an event for delivery when `phase` is next drained.
    pub fn emit_deferred(&mut self, phase: EventPhase, name: &str, data: serde_json::Value) {
        self.deferred[phase.index()].push_back(DeferredEvent {
            event: Event::new(name, data),
            queued_at: Instant::now(),
        });
    }

    /// Dispatch queued events of one phase until the queue is empty or the
    /// budget is spent. At least one event is processed when any is queued.
    /// Events queued during the drain wait for the next one.
    pub fn drain_phase(&mut self, phase: EventPhase, budget: Duration) -> usize {
        let start = Instant::now();
        let available = self.deferred[phase.index()].len();
        let mut processed = 0;
        while processed < available {
            let Some(deferred) = self.deferred[phase.index()].pop_front() else {
                break;
            };
            self.dispatch(deferred.event);
            processed += 1;
            if start.elapsed() >= budget {
                break;
            }
        }
        processed
    }

    /// Drop deferred events queued longer than `max_age` ago.
    pub fn purge_older_than(&mut self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        for queue in &mut self.deferred {
            let before = queue.len();
            queue.retain(|d| now.duration_since(d.queued_at) <= max_age);
            purged += before - queue.len();
        }
        if purged > 0 {
            tracing::debug!(purged, "purged stale deferred events");
        }
        purged
    }

    pub fn pending_deferred(&self, phase: EventPhase) -> usize {
        self.deferred[phase.index()].len()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.iter().map(|q| q.len()).sum()
    }

    pub fn clear_deferred(&mut self) {
        for queue in &mut self.deferred {
            queue.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
