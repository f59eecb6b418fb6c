//! Tick-driven preview session.

use cutline_common::clock::{PlaybackClock, RateController};
use cutline_common::config::PlaybackDefaults;
use cutline_timeline_model::{Clip, Track};

use crate::resources::{ResourcePool, SyncReport, Synchronizer};
use crate::sync::{resolve_at, MixSettings, PlaybackView};

/// Transport clock plus synchronizer, driven by [`PlaybackSession::tick`].
pub struct PlaybackSession<P: ResourcePool> {
    clock: PlaybackClock,
    synchronizer: Synchronizer<P>,
    rate: RateController,
    mix: MixSettings,
    wall_secs: f64,
}

impl<P: ResourcePool> PlaybackSession<P> {
    /// Start a stopped session over `clips`, so a seek before the first
    /// tick already lands inside the timeline.
    pub fn new(pool: P, defaults: &PlaybackDefaults, clips: &[Clip]) -> Self {
        Self {
            clock: PlaybackClock::new(timeline_end(clips)),
            synchronizer: Synchronizer::new(pool, defaults.clamped_drift_tolerance()),
            rate: RateController::new(defaults.tick_hz),
            mix: MixSettings::with_volume(defaults.default_volume),
            wall_secs: 0.0,
        }
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn synchronizer(&self) -> &Synchronizer<P> {
        &self.synchronizer
    }

    pub fn mix(&self) -> MixSettings {
        self.mix
    }

    pub fn set_mix(&mut self, mix: MixSettings) {
        self.mix = mix;
        self.rate.reset();
    }

    /// Update the timeline length after edits; `tick` does this on its own.
    pub fn set_duration(&mut self, duration_secs: f64) {
        self.clock.set_duration(duration_secs);
    }

    pub fn play(&mut self) {
        self.clock.play();
        self.rate.reset();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        self.rate.reset();
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.rate.reset();
    }

    pub fn seek(&mut self, position_secs: f64) {
        self.clock.seek(position_secs);
        self.rate.reset();
    }

    /// The view at the current clock position.
    pub fn view(&self, clips: &[Clip], tracks: &[Track]) -> PlaybackView {
        resolve_at(clips, tracks, self.clock.position(), &self.mix)
    }

    /// Advance by `delta_secs` of wall time and, if a sync is due, align
    /// the media resources with the new position.
    ///
    /// Returns `None` when the sync was throttled.
    pub fn tick(&mut self, delta_secs: f64, clips: &[Clip], tracks: &[Track]) -> Option<SyncReport> {
        let duration = timeline_end(clips);
        if (self.clock.duration() - duration).abs() > f64::EPSILON {
            self.clock.set_duration(duration);
        }

        let was_playing = self.clock.is_playing();
        let position = self.clock.advance(delta_secs);
        if delta_secs.is_finite() && delta_secs > 0.0 {
            self.wall_secs += delta_secs;
        }
        if was_playing && !self.clock.is_playing() {
            tracing::debug!(position, "Reached end of timeline");
            self.rate.reset();
        }

        if !self.rate.should_tick(self.wall_secs) {
            return None;
        }

        let view = resolve_at(clips, tracks, position, &self.mix);
        Some(self.synchronizer.sync(&view, self.clock.is_playing()))
    }

    /// Return every media resource to the pool.
    pub fn shutdown(&mut self) -> usize {
        self.clock.stop();
        self.synchronizer.release_all()
    }
}

fn timeline_end(clips: &[Clip]) -> f64 {
    clips.iter().map(Clip::end).fold(0.0, f64::max)
}
