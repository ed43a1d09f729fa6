//! Time management for the game loop.
//!
//! `Time` can run off the wall clock ([`Time::update`]) or be stepped by hand
//! ([`Time::advance`]) for headless runs and tests. Gameplay timers read
//! [`Time::elapsed`] as their timestamp source either way.

use std::time::{Duration, Instant};

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct Time {
    /// Time of the last frame.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
    /// Fixed timestep for physics (default 120 Hz).
    fixed_timestep: Duration,
    /// Accumulated time for fixed updates.
    accumulator: Duration,
    /// Upper bound for a single frame delta, so a stalled frame cannot
    /// explode into hundreds of fixed steps.
    max_delta: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            fixed_timestep: Duration::from_secs_f64(1.0 / 120.0),
            accumulator: Duration::ZERO,
            max_delta: Duration::from_millis(100),
        }
    }

    /// Update timing at the start of a new frame from the wall clock.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.advance(delta);
    }

    /// Advance the clock by an explicit delta (headless runs, tests).
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta.min(self.max_delta);
        self.elapsed += self.delta;
        self.frame_count += 1;
        self.accumulator += self.delta;
    }

    /// Re-anchor the wall clock, e.g. after a pause, so the next frame does
    /// not see the paused interval as its delta.
    pub fn reset_frame_anchor(&mut self) {
        self.last_frame = Instant::now();
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get the delta time as a Duration.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total elapsed time as Duration.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check if a fixed update should run and consume the time.
    pub fn should_fixed_update(&mut self) -> bool {
        if self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            true
        } else {
            false
        }
    }

    /// Drop any accumulated fixed-step time (used while physics is paused).
    pub fn clear_accumulator(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }

    /// Set the fixed timestep rate in Hz.
    pub fn set_fixed_rate(&mut self, hz: f64) {
        self.fixed_timestep = Duration::from_secs_f64(1.0 / hz);
    }
}

/// Normalised progress of a timed window started at `start`, clamped to [0, 1].
pub fn progress(now: Duration, start: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_sub(start);
    (elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_elapsed_and_fixed_steps() {
        let mut time = Time::new();
        time.set_fixed_rate(100.0);
        time.advance(Duration::from_millis(25));
        assert_eq!(time.elapsed(), Duration::from_millis(25));
        let mut steps = 0;
        while time.should_fixed_update() {
            steps += 1;
        }
        assert_eq!(steps, 2);
    }

    #[test]
    fn advance_clamps_long_frames() {
        let mut time = Time::new();
        time.advance(Duration::from_secs(3));
        assert_eq!(time.delta(), Duration::from_millis(100));
    }

    #[test]
    fn progress_is_clamped() {
        let start = Duration::from_millis(1000);
        let d = Duration::from_millis(1000);
        assert_eq!(progress(Duration::from_millis(500), start, d), 0.0);
        assert!((progress(Duration::from_millis(1500), start, d) - 0.5).abs() < 1e-6);
        assert_eq!(progress(Duration::from_millis(5000), start, d), 1.0);
    }
}
