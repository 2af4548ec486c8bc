//! Frame clock.
//!
//! [`Time`] turns host timestamps (milliseconds, as delivered by an
//! animation-frame callback) into per-frame deltas in seconds. The first frame
//! after [`reset`](Time::reset) has a delta of zero. Deltas are clamped to
//! `max_delta` so a stalled host does not produce a huge simulation step.

/// Default upper bound on a single frame delta, in seconds.
pub const DEFAULT_MAX_DELTA: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct Time {
    /// Host timestamp (ms) at which the clock was last reset.
    start_time: f64,
    /// Accumulated scaled simulation time in seconds.
    total_time: f64,
    delta_time: f64,
    frame_count: u64,
    max_delta: f64,
    time_scale: f64,
    last_timestamp: Option<f64>,
}

impl Time {
    pub fn new(max_delta: f64) -> Self {
        Self {
            start_time: 0.0,
            total_time: 0.0,
            delta_time: 0.0,
            frame_count: 0,
            max_delta,
            time_scale: 1.0,
            last_timestamp: None,
        }
    }

    /// Forget all accumulated state. The next frame starts a fresh timeline.
    pub fn reset(&mut self) {
        self.start_time = 0.0;
        self.total_time = 0.0;
        self.delta_time = 0.0;
        self.frame_count = 0;
        self.last_timestamp = None;
    }

    /// Advance from a host timestamp in milliseconds; returns the scaled delta.
    pub fn advance_to(&mut self, timestamp_ms: f64) -> f64 {
        let raw = match self.last_timestamp {
            None => {
                self.start_time = timestamp_ms;
                0.0
            }
            Some(last) => ((timestamp_ms - last) / 1000.0).max(0.0),
        };
        self.last_timestamp = Some(timestamp_ms);
        self.advance_by(raw)
    }

    /// Advance by an explicit delta in seconds; returns the scaled delta.
    pub fn advance_by(&mut self, dt: f64) -> f64 {
        let clamped = if dt.is_finite() {
            dt.clamp(0.0, self.max_delta)
        } else {
            0.0
        };
        self.delta_time = clamped * self.time_scale;
        self.total_time += self.delta_time;
        self.frame_count += 1;
        self.delta_time
    }

    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Negative scales are treated as zero.
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }

    /// Restore the persisted part of the clock.
    pub fn restore(&mut self, start_time: f64, total_time: f64) {
        self.start_time = start_time;
        self.total_time = total_time;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELTA)
    }
}
