//! Media element synchronization.
//!
//! The synchronizer compares each live media element against the
//! [`PlaybackView`] and only issues directives for what differs, so calling
//! [`Synchronizer::sync`] repeatedly with the same view is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use cutline_timeline_model::ClipId;

use crate::error::PlaybackError;
use crate::sync::{needs_resync, ActiveClip, PlaybackView};

const VOLUME_EPSILON: f64 = 1e-6;

/// A decoder/player bound to one clip's source.
pub trait MediaResource {
    /// Current position in source seconds.
    fn position(&self) -> f64;
    fn is_playing(&self) -> bool;
    fn volume(&self) -> f64;

    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_secs: f64);
    fn set_volume(&mut self, volume: f64);
}

/// Hands out media resources for clips and takes them back.
pub trait ResourcePool {
    type Resource: MediaResource;

    fn acquire(&mut self, clip: &ActiveClip) -> Result<Self::Resource, PlaybackError>;

    fn release(&mut self, clip_id: &ClipId, resource: Self::Resource);
}

/// What one `sync` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub acquired: Vec<ClipId>,
    pub released: Vec<ClipId>,
    /// Clips whose resource could not be acquired this tick.
    pub skipped: Vec<ClipId>,
    pub seeks: usize,
    pub plays: usize,
    pub pauses: usize,
    pub volume_changes: usize,
}

impl SyncReport {
    /// Number of directives sent to media resources.
    pub fn directives(&self) -> usize {
        self.seeks + self.plays + self.pauses + self.volume_changes
    }
}

/// Keeps a set of media resources aligned with the playback view.
pub struct Synchronizer<P: ResourcePool> {
    pool: P,
    live: BTreeMap<ClipId, P::Resource>,
    drift_tolerance: f64,
}

impl<P: ResourcePool> Synchronizer<P> {
    /// `drift_tolerance` is clamped to `[0.1, 0.5]` seconds.
    pub fn new(pool: P, drift_tolerance: f64) -> Self {
        Self {
            pool,
            live: BTreeMap::new(),
            drift_tolerance: drift_tolerance.clamp(0.1, 0.5),
        }
    }

    pub fn drift_tolerance(&self) -> f64 {
        self.drift_tolerance
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn resource(&self, clip_id: &ClipId) -> Option<&P::Resource> {
        self.live.get(clip_id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Bring every resource in line with `view`.
    ///
    /// When `transport_playing` is false every resource is paused but still
    /// positioned, so scrubbing shows the right frame.
    pub fn sync(&mut self, view: &PlaybackView, transport_playing: bool) -> SyncReport {
        let mut report = SyncReport::default();

        let wanted: BTreeSet<&ClipId> = view.active().map(|c| &c.clip_id).collect();
        let stale: Vec<ClipId> = self
            .live
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for clip_id in stale {
            if let Some(mut resource) = self.live.remove(&clip_id) {
                if resource.is_playing() {
                    resource.pause();
                    report.pauses += 1;
                }
                self.pool.release(&clip_id, resource);
                report.released.push(clip_id);
            }
        }

        for active in view.active() {
            if !self.live.contains_key(&active.clip_id) {
                match self.pool.acquire(active) {
                    Ok(resource) => {
                        tracing::debug!(clip = %active.clip_id, source = %active.source_ref, "Media resource acquired");
                        self.live.insert(active.clip_id.clone(), resource);
                        report.acquired.push(active.clip_id.clone());
                    }
                    Err(e) => {
                        tracing::warn!(clip = %active.clip_id, error = %e, "Skipping clip this tick");
                        report.skipped.push(active.clip_id.clone());
                        continue;
                    }
                }
            }

            if let Some(resource) = self.live.get_mut(&active.clip_id) {
                align(resource, active, transport_playing, self.drift_tolerance, &mut report);
            }
        }

        if report.directives() > 0 {
            tracing::trace!(
                time = view.time,
                seeks = report.seeks,
                plays = report.plays,
                pauses = report.pauses,
                "Media synchronized"
            );
        }
        report
    }

    /// Pause and return every resource to the pool.
    pub fn release_all(&mut self) -> usize {
        let live = std::mem::take(&mut self.live);
        let count = live.len();
        for (clip_id, mut resource) in live {
            if resource.is_playing() {
                resource.pause();
            }
            self.pool.release(&clip_id, resource);
        }
        count
    }
}

fn align<R: MediaResource>(
    resource: &mut R,
    active: &ActiveClip,
    transport_playing: bool,
    tolerance: f64,
    report: &mut SyncReport,
) {
    if (resource.volume() - active.volume).abs() > VOLUME_EPSILON {
        resource.set_volume(active.volume);
        report.volume_changes += 1;
    }

    if needs_resync(resource.position(), active.local_time, tolerance) {
        tracing::debug!(
            clip = %active.clip_id,
            reported = resource.position(),
            expected = active.local_time,
            "Correcting drift"
        );
        resource.seek(active.local_time);
        report.seeks += 1;
    }

    let should_play = transport_playing && active.should_play();
    if should_play && !resource.is_playing() {
        resource.play();
        report.plays += 1;
    } else if !should_play && resource.is_playing() {
        resource.pause();
        report.pauses += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{resolve_at, MixSettings};
    use cutline_timeline_model::{default_tracks, Clip, ClipKind};

    #[derive(Debug, Default)]
    struct FakeMedia {
        position: f64,
        playing: bool,
        volume: f64,
    }

    impl MediaResource for FakeMedia {
        fn position(&self) -> f64 {
            self.position
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
        fn volume(&self) -> f64 {
            self.volume
        }
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn seek(&mut self, position_secs: f64) {
            self.position = position_secs;
        }
        fn set_volume(&mut self, volume: f64) {
            self.volume = volume;
        }
    }

    #[derive(Default)]
    struct FakePool {
        missing: Vec<String>,
        released: Vec<ClipId>,
    }

    impl ResourcePool for FakePool {
        type Resource = FakeMedia;

        fn acquire(&mut self, clip: &ActiveClip) -> Result<FakeMedia, PlaybackError> {
            if self.missing.contains(&clip.source_ref) {
                return Err(PlaybackError::ResourceUnavailable {
                    clip: clip.clip_id.clone(),
                    source_ref: clip.source_ref.clone(),
                    reason: "not found".to_string(),
                });
            }
            Ok(FakeMedia::default())
        }

        fn release(&mut self, clip_id: &ClipId, _resource: FakeMedia) {
            self.released.push(clip_id.clone());
        }
    }

    fn clips() -> Vec<Clip> {
        vec![
            Clip::new("v", "track1", ClipKind::Video, "v.mp4", 0.0, 10.0),
            Clip::new("m", "track2", ClipKind::Audio, "m.wav", 0.0, 3.0).with_volume(0.5),
        ]
    }

    #[test]
    fn test_sync_is_idempotent() {
        let tracks = default_tracks();
        let clips = clips();
        let view = resolve_at(&clips, &tracks, 1.0, &MixSettings::default());
        let mut sync = Synchronizer::new(FakePool::default(), 0.3);

        let first = sync.sync(&view, true);
        assert_eq!(first.acquired.len(), 2);
        assert_eq!(first.plays, 2);
        assert_eq!(first.seeks, 2);

        let second = sync.sync(&view, true);
        assert_eq!(second.directives(), 0);
        assert!(second.acquired.is_empty());
    }

    #[test]
    fn test_small_drift_is_tolerated() {
        let tracks = default_tracks();
        let clips = clips();
        let mut sync = Synchronizer::new(FakePool::default(), 0.3);
        sync.sync(&resolve_at(&clips, &tracks, 1.0, &MixSettings::default()), true);

        // Media has not moved; 0.2s behind is fine, 0.5s is not.
        let report = sync.sync(&resolve_at(&clips, &tracks, 1.2, &MixSettings::default()), true);
        assert_eq!(report.seeks, 0);
        let report = sync.sync(&resolve_at(&clips, &tracks, 1.5, &MixSettings::default()), true);
        assert_eq!(report.seeks, 2);
        assert_eq!(sync.resource(&ClipId::from("v")).unwrap().position, 1.5);
    }

    #[test]
    fn test_inactive_clips_are_released() {
        let tracks = default_tracks();
        let clips = clips();
        let mut sync = Synchronizer::new(FakePool::default(), 0.3);
        sync.sync(&resolve_at(&clips, &tracks, 1.0, &MixSettings::default()), true);

        let report = sync.sync(&resolve_at(&clips, &tracks, 4.0, &MixSettings::default()), true);
        assert_eq!(report.released, vec![ClipId::from("m")]);
        assert_eq!(sync.live_count(), 1);
        assert_eq!(sync.pool().released, vec![ClipId::from("m")]);
    }

    #[test]
    fn test_paused_transport_pauses_media() {
        let tracks = default_tracks();
        let clips = clips();
        let mut sync = Synchronizer::new(FakePool::default(), 0.3);
        let view = resolve_at(&clips, &tracks, 1.0, &MixSettings::default());
        sync.sync(&view, true);

        let report = sync.sync(&view, false);
        assert_eq!(report.pauses, 2);
        assert!(!sync.resource(&ClipId::from("v")).unwrap().playing);
    }

    #[test]
    fn test_missing_media_is_skipped() {
        let tracks = default_tracks();
        let clips = clips();
        let pool = FakePool {
            missing: vec!["m.wav".to_string()],
            ..FakePool::default()
        };
        let mut sync = Synchronizer::new(pool, 0.3);
        let report = sync.sync(&resolve_at(&clips, &tracks, 1.0, &MixSettings::default()), true);
        assert_eq!(report.skipped, vec![ClipId::from("m")]);
        assert_eq!(report.acquired, vec![ClipId::from("v")]);
    }

    #[test]
    fn test_volume_follows_mix() {
        let tracks = default_tracks();
        let clips = clips();
        let mut sync = Synchronizer::new(FakePool::default(), 0.3);
        sync.sync(&resolve_at(&clips, &tracks, 1.0, &MixSettings::with_volume(0.8)), true);
        let m = sync.resource(&ClipId::from("m")).unwrap();
        assert!((m.volume - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_tolerance_is_clamped() {
        assert_eq!(Synchronizer::new(FakePool::default(), 5.0).drift_tolerance(), 0.5);
        assert_eq!(Synchronizer::new(FakePool::default(), 0.0).drift_tolerance(), 0.1);
    }
}
