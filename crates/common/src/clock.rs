//! Clock and timing utilities for preview playback.
//!
//! Playback is driven by an explicit transport clock rather than a timer:
//! whoever owns the loop calls [`PlaybackClock::advance`] with the elapsed
//! wall time, which keeps the whole playback path deterministic under test.
//! This module also provides:
//! - Drift measurement between the logical clock and an external player
//! - A rate controller for throttling periodic work

/// Transport state of the playback clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

/// The single logical clock that all preview media is slaved to.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    position_secs: f64,
    duration_secs: f64,
    rate: f64,
    state: TransportState,
}

impl PlaybackClock {
    /// Create a stopped clock for a timeline of the given length.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            position_secs: 0.0,
            duration_secs: duration_secs.max(0.0),
            rate: 1.0,
            state: TransportState::Stopped,
        }
    }

    /// Current logical time in seconds.
    pub fn position(&self) -> f64 {
        self.position_secs
    }

    pub fn duration(&self) -> f64 {
        self.duration_secs
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Update the timeline length (after edits). The position is clamped.
    pub fn set_duration(&mut self, duration_secs: f64) {
        self.duration_secs = duration_secs.max(0.0);
        self.position_secs = self.position_secs.min(self.duration_secs);
    }

    /// Playback speed multiplier (1.0 = realtime).
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = if rate.is_finite() { rate.max(0.0) } else { 1.0 };
    }

    pub fn play(&mut self) {
        if self.position_secs >= self.duration_secs {
            self.position_secs = 0.0;
        }
        self.state = TransportState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
        }
    }

    /// Stop and rewind to zero.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position_secs = 0.0;
    }

    /// Jump to an absolute position, clamped to the timeline.
    pub fn seek(&mut self, position_secs: f64) {
        self.position_secs = position_secs.clamp(0.0, self.duration_secs);
    }

    /// Advance by `delta_secs` of wall time. Returns the new position.
    ///
    /// Only moves while playing. Reaching the end pauses the transport at
    /// the final position.
    pub fn advance(&mut self, delta_secs: f64) -> f64 {
        if self.state != TransportState::Playing || !delta_secs.is_finite() || delta_secs <= 0.0 {
            return self.position_secs;
        }

        self.position_secs += delta_secs * self.rate;
        if self.position_secs >= self.duration_secs {
            self.position_secs = self.duration_secs;
            self.state = TransportState::Paused;
        }
        self.position_secs
    }
}

/// Drift measurement between the logical clock and an external player.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Where the media should be (seconds into the source).
    pub expected_secs: f64,
    /// Where the player reports it is.
    pub reported_secs: f64,
}

impl DriftMeasurement {
    pub fn new(expected_secs: f64, reported_secs: f64) -> Self {
        Self {
            expected_secs,
            reported_secs,
        }
    }

    /// Drift in seconds (positive = player is ahead).
    pub fn drift_secs(&self) -> f64 {
        self.reported_secs - self.expected_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_secs(&self, threshold_secs: f64) -> bool {
        self.drift_secs().abs() > threshold_secs
    }
}

/// Rate controller for periodic work driven by `advance` calls.
#[derive(Debug)]
pub struct RateController {
    target_interval_secs: f64,
    last_tick_secs: Option<f64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_secs: 1.0 / target_hz.max(1) as f64,
            last_tick_secs: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now_secs: f64) -> bool {
        match self.last_tick_secs {
            None => {
                self.last_tick_secs = Some(now_secs);
                true
            }
            Some(last) if now_secs >= last + self.target_interval_secs - 1e-9 => {
                self.last_tick_secs = Some(now_secs);
                true
            }
            _ => false,
        }
    }

    /// Forget the last tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_secs = None;
    }

    /// Target interval in seconds.
    pub fn interval_secs(&self) -> f64 {
        self.target_interval_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_only_advances_while_playing() {
        let mut clock = PlaybackClock::new(10.0);
        assert_eq!(clock.advance(1.0), 0.0);

        clock.play();
        assert!((clock.advance(0.5) - 0.5).abs() < 1e-9);
        clock.pause();
        assert!((clock.advance(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_clock_pauses_at_end() {
        let mut clock = PlaybackClock::new(2.0);
        clock.play();
        clock.advance(5.0);
        assert_eq!(clock.position(), 2.0);
        assert_eq!(clock.state(), TransportState::Paused);

        // Playing again from the end restarts at zero.
        clock.play();
        assert_eq!(clock.position(), 0.0);
    }

    #[test]
    fn test_clock_seek_and_rate() {
        let mut clock = PlaybackClock::new(10.0);
        clock.seek(42.0);
        assert_eq!(clock.position(), 10.0);
        clock.seek(-1.0);
        assert_eq!(clock.position(), 0.0);

        clock.set_rate(2.0);
        clock.play();
        assert!((clock.advance(1.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement::new(1.0, 1.05);
        assert!((drift.drift_secs() - 0.05).abs() < 1e-9);
        assert!((drift.drift_ms() - 50.0).abs() < 1e-6);
        assert!(drift.exceeds_threshold_secs(0.01));
        assert!(!drift.exceeds_threshold_secs(0.1));
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(10);
        assert!(ctrl.should_tick(0.0)); // first tick always fires
        assert!(!ctrl.should_tick(0.05)); // 50ms later, too soon
        assert!(ctrl.should_tick(0.1));
        ctrl.reset();
        assert!(ctrl.should_tick(0.11));
    }
}
