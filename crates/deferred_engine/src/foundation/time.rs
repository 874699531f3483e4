//! Time management utilities

use std::time::Instant;

/// Per-frame timing context
///
/// Tracks the raw frame delta, the scaled delta handed to gameplay updates and the total
/// elapsed time. `update` samples the wall clock; `advance` steps by an explicit delta so
/// headless runs and tests stay deterministic.
#[derive(Debug, Clone)]
pub struct TimeContext {
    last_frame: Instant,
    delta_time: f32,
    elapsed_time: f32,
    time_scale: f32,
    frame_count: u64,
}

impl Default for TimeContext {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TimeContext {
    /// Create a new timing context with the given time scale
    pub fn new(time_scale: f32) -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            elapsed_time: 0.0,
            time_scale,
            frame_count: 0,
        }
    }

    /// Update from the wall clock (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.advance(elapsed.as_secs_f32());
    }

    /// Advance by an explicit frame delta in seconds
    pub fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time.max(0.0);
        self.elapsed_time += self.delta_time;
        self.frame_count += 1;
    }

    /// Unscaled time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Frame delta multiplied by the time scale
    pub fn scaled_time(&self) -> f32 {
        self.delta_time * self.time_scale
    }

    /// Total unscaled time since the context was created
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    /// Current time scale
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Number of frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
