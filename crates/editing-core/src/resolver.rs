//! Collision and snap resolution for drag, resize, and drop.
//!
//! The resolver never mutates the timeline. It takes a *desired* placement
//! and answers with either a placement that satisfies the no-overlap
//! invariant or a rejection, in which case the caller keeps the clip where
//! it was. Neighbours are always visited in `(start, id)` order so the same
//! inputs give the same answer.

use serde::{Deserialize, Serialize};

use cutline_common::config::EditorDefaults;
use cutline_timeline_model::{Clip, ClipId, Timeline, TimelineError, TrackId, TIME_EPSILON};

/// Resolver tuning, usually derived from [`EditorDefaults`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Shortest clip a resize may produce.
    pub min_clip_duration: f64,

    /// Horizontal zoom used to turn pixel deltas into seconds.
    pub pixels_per_second: f64,

    /// Lane height used to turn vertical deltas into track changes.
    pub track_height_px: f64,

    /// Snapping parameters; `None` disables snapping.
    pub snap: Option<SnapConfig>,
}

/// Where and how strongly edges snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapConfig {
    /// Spacing of time-grid marks in seconds.
    pub grid_interval: f64,

    /// Capture distance in pixels.
    pub tolerance_px: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&EditorDefaults::default())
    }
}

impl From<&EditorDefaults> for ResolverConfig {
    fn from(defaults: &EditorDefaults) -> Self {
        Self {
            min_clip_duration: defaults.min_clip_duration_secs.max(TIME_EPSILON),
            pixels_per_second: defaults.pixels_per_second.max(1e-3),
            track_height_px: defaults.track_height_px.max(1.0),
            snap: defaults.snapping.then_some(SnapConfig {
                grid_interval: defaults.grid_interval_secs,
                tolerance_px: defaults.snap_tolerance_px,
            }),
        }
    }
}

impl ResolverConfig {
    pub fn without_snapping(mut self) -> Self {
        self.snap = None;
        self
    }

    /// Snap capture distance converted to seconds at the current zoom.
    pub fn snap_tolerance_secs(&self) -> f64 {
        match self.snap {
            Some(snap) => snap.tolerance_px.max(0.0) / self.pixels_per_second,
            None => 0.0,
        }
    }
}

/// What an edge was snapped to.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapTarget {
    /// A time-grid mark.
    Grid { time: f64 },
    /// Start of another clip on the destination track.
    ClipStart { clip: ClipId, time: f64 },
    /// End of another clip on the destination track.
    ClipEnd { clip: ClipId, time: f64 },
}

impl SnapTarget {
    pub fn time(&self) -> f64 {
        match self {
            SnapTarget::Grid { time }
            | SnapTarget::ClipStart { time, .. }
            | SnapTarget::ClipEnd { time, .. } => *time,
        }
    }
}

/// A valid placement produced by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub track_id: TrackId,
    pub start: f64,
    pub duration: f64,

    /// The collision pass moved the clip away from the requested start.
    pub relocated: bool,

    /// Set when an edge was snapped.
    pub snapped_to: Option<SnapTarget>,
}

impl Placement {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Why no valid placement exists.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Neither side of the blocking clip has room.
    NoFreeSlot { blocker: ClipId },
    /// A resize would run into a neighbour.
    Overlap { neighbor: ClipId },
    /// A resize would go below the minimum clip duration.
    BelowMinimumDuration,
    /// A resize would leave nothing after trimming.
    TrimExhausted,
}

/// Outcome of a resolve call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Placed(Placement),
    Rejected(RejectReason),
}

impl Resolution {
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Resolution::Placed(p) => Some(p),
            Resolution::Rejected(_) => None,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, Resolution::Placed(_))
    }
}

/// Which edge of a clip is being dragged during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeEdge {
    /// Moves `start`; the end time stays fixed.
    Start,
    /// Changes `duration` only.
    End,
}

/// Pointer displacement of an in-progress drag, in timeline pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    pub clip_id: ClipId,
    /// Horizontal displacement (time axis).
    pub delta_x_px: f64,
    /// Vertical displacement (across tracks).
    pub delta_y_px: f64,
}

/// A clip dropped onto the timeline from outside (media bin, generator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPayload {
    #[serde(flatten)]
    pub clip: Clip,

    /// When set, the clip may only land on this track.
    #[serde(default)]
    pub allowed_track: Option<TrackId>,
}

/// Stateless resolver over a borrowed timeline.
pub struct Resolver<'a> {
    timeline: &'a Timeline,
    config: &'a ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(timeline: &'a Timeline, config: &'a ResolverConfig) -> Self {
        Self { timeline, config }
    }

    /// Resolve moving an existing clip to `track_id` at `start`.
    pub fn resolve_move(
        &self,
        clip_id: &ClipId,
        track_id: &TrackId,
        start: f64,
    ) -> Result<Resolution, TimelineError> {
        let clip = self.clip(clip_id)?;
        self.check_track(track_id, clip)?;
        Ok(self.place(track_id, start, clip.duration, Some(clip_id)))
    }

    /// Resolve placing a clip that is not yet on the timeline, using its
    /// own `track_id` and `start` as the desired placement.
    pub fn resolve_insert(&self, clip: &Clip) -> Result<Resolution, TimelineError> {
        if self.timeline.clip(&clip.id).is_some() {
            return Err(TimelineError::DuplicateClip {
                clip: clip.id.clone(),
            });
        }
        self.check_track(&clip.track_id, clip)?;
        if !clip.duration.is_finite() || clip.duration <= TIME_EPSILON {
            return Err(TimelineError::InvalidPlacement {
                clip: clip.id.clone(),
                message: format!("duration must be positive, got {}", clip.duration),
            });
        }
        Ok(self.place(&clip.track_id, clip.start, clip.duration, None))
    }

    /// Map a drag gesture to its destination track and desired start.
    ///
    /// The vertical displacement is rounded to whole lanes and clamped to
    /// the track range.
    pub fn drag_target(&self, gesture: &DragGesture) -> Result<(TrackId, f64), TimelineError> {
        let clip = self.clip(&gesture.clip_id)?;
        let tracks = self.timeline.tracks();
        let origin = self
            .timeline
            .track_index(&clip.track_id)
            .ok_or_else(|| TimelineError::UnknownTrack {
                track: clip.track_id.clone(),
            })?;

        let lanes = finite_or_zero(gesture.delta_y_px / self.config.track_height_px).round();
        let max_index = tracks.len().saturating_sub(1) as f64;
        let index = (origin as f64 + lanes).clamp(0.0, max_index) as usize;

        let start = clip.start + finite_or_zero(gesture.delta_x_px / self.config.pixels_per_second);
        Ok((tracks[index].id.clone(), start))
    }

    /// Resolve a drag gesture: track switching plus a move.
    pub fn resolve_drag(&self, gesture: &DragGesture) -> Result<Resolution, TimelineError> {
        let (track_id, start) = self.drag_target(gesture)?;
        self.resolve_move(&gesture.clip_id, &track_id, start)
    }

    /// Check a drop against the destination track before resolving it.
    pub fn check_drop(
        &self,
        payload: &DropPayload,
        destination: &TrackId,
    ) -> Result<(), TimelineError> {
        self.check_track(destination, &payload.clip)?;
        if let Some(allowed) = &payload.allowed_track {
            if allowed != destination {
                return Err(TimelineError::TrackNotAllowed {
                    track: destination.clone(),
                    allowed: allowed.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve a drop at `start` on `destination`.
    pub fn resolve_drop(
        &self,
        payload: &DropPayload,
        destination: &TrackId,
        start: f64,
    ) -> Result<Resolution, TimelineError> {
        self.check_drop(payload, destination)?;
        let mut clip = payload.clip.clone();
        clip.track_id = destination.clone();
        clip.start = start;
        self.resolve_insert(&clip)
    }

    /// Resolve dragging one edge of a clip to `time`.
    pub fn resolve_resize(
        &self,
        clip_id: &ClipId,
        edge: ResizeEdge,
        time: f64,
    ) -> Result<Resolution, TimelineError> {
        let clip = self.clip(clip_id)?;
        let min = self.config.min_clip_duration;
        let time = finite_or(time, match edge {
            ResizeEdge::Start => clip.start,
            ResizeEdge::End => clip.end(),
        });

        // (start, duration) candidates: snapped first, then unsnapped.
        let (unsnapped, snapped) = match edge {
            ResizeEdge::Start => {
                let end = clip.end();
                if end - min < -TIME_EPSILON {
                    return Ok(Resolution::Rejected(RejectReason::BelowMinimumDuration));
                }
                let latest = (end - min).max(0.0);
                let start = time.clamp(0.0, latest);
                let snapped = self
                    .nearest_snap(&clip.track_id, start, Some(clip_id))
                    .map(|(offset, target)| (start + offset, target))
                    .filter(|(s, _)| *s >= -TIME_EPSILON && *s <= latest + TIME_EPSILON)
                    .map(|(s, target)| ((s.max(0.0), end - s.max(0.0)), target));
                ((start, end - start), snapped)
            }
            ResizeEdge::End => {
                let end = time.max(clip.start + min);
                let snapped = self
                    .nearest_snap(&clip.track_id, end, Some(clip_id))
                    .map(|(offset, target)| (end + offset, target))
                    .filter(|(e, _)| *e - clip.start >= min - TIME_EPSILON)
                    .map(|(e, target)| ((clip.start, e - clip.start), target));
                ((clip.start, end - clip.start), snapped)
            }
        };

        if unsnapped.1 - clip.trim_start - clip.trim_end <= TIME_EPSILON {
            return Ok(Resolution::Rejected(RejectReason::TrimExhausted));
        }

        if let Some(((start, duration), target)) = snapped {
            let trim_ok = duration - clip.trim_start - clip.trim_end > TIME_EPSILON;
            if trim_ok && self.timeline.is_free(&clip.track_id, start, duration, Some(clip_id)) {
                return Ok(Resolution::Placed(Placement {
                    track_id: clip.track_id.clone(),
                    start,
                    duration,
                    relocated: false,
                    snapped_to: Some(target),
                }));
            }
        }

        let (start, duration) = unsnapped;
        match self
            .timeline
            .first_conflict(&clip.track_id, start, duration, Some(clip_id))
        {
            Some(neighbor) => Ok(Resolution::Rejected(RejectReason::Overlap {
                neighbor: neighbor.id.clone(),
            })),
            None => Ok(Resolution::Placed(Placement {
                track_id: clip.track_id.clone(),
                start,
                duration,
                relocated: false,
                snapped_to: None,
            })),
        }
    }

    fn clip(&self, id: &ClipId) -> Result<&'a Clip, TimelineError> {
        self.timeline
            .clip(id)
            .ok_or_else(|| TimelineError::UnknownClip { clip: id.clone() })
    }

    fn check_track(&self, track_id: &TrackId, clip: &Clip) -> Result<(), TimelineError> {
        let track = self
            .timeline
            .track(track_id)
            .ok_or_else(|| TimelineError::UnknownTrack {
                track: track_id.clone(),
            })?;
        if !track.accepts(clip.kind) {
            return Err(TimelineError::TrackKindMismatch {
                track: track_id.clone(),
                kind: clip.kind,
            });
        }
        Ok(())
    }

    /// Collision pass followed by the snap pass.
    fn place(
        &self,
        track_id: &TrackId,
        desired_start: f64,
        duration: f64,
        ignore: Option<&ClipId>,
    ) -> Resolution {
        let desired = finite_or_zero(desired_start).max(0.0);
        let timeline = self.timeline;

        let (start, relocated) = match timeline.first_conflict(track_id, desired, duration, ignore) {
            None => (desired, false),
            Some(blocker) => {
                let before = blocker.start - duration;
                let after = blocker.end();
                if before >= -TIME_EPSILON
                    && timeline.is_free(track_id, before.max(0.0), duration, ignore)
                {
                    (before.max(0.0), true)
                } else if timeline.is_free(track_id, after, duration, ignore) {
                    (after, true)
                } else {
                    tracing::debug!(
                        track = %track_id,
                        desired,
                        duration,
                        blocker = %blocker.id,
                        "No free slot around blocking clip"
                    );
                    return Resolution::Rejected(RejectReason::NoFreeSlot {
                        blocker: blocker.id.clone(),
                    });
                }
            }
        };

        let snapped = self
            .nearest_move_snap(track_id, start, duration, ignore)
            .map(|(offset, target)| (start + offset, target))
            .filter(|(s, _)| *s >= -TIME_EPSILON)
            .map(|(s, target)| (s.max(0.0), target))
            .filter(|(s, _)| timeline.is_free(track_id, *s, duration, ignore));

        let (start, snapped_to) = match snapped {
            Some((s, target)) => (s, Some(target)),
            None => (start, None),
        };

        Resolution::Placed(Placement {
            track_id: track_id.clone(),
            start,
            duration,
            relocated,
            snapped_to,
        })
    }

    /// Best snap for either edge of `[start, start+duration)`. The start edge
    /// wins ties.
    fn nearest_move_snap(
        &self,
        track_id: &TrackId,
        start: f64,
        duration: f64,
        ignore: Option<&ClipId>,
    ) -> Option<(f64, SnapTarget)> {
        let from_start = self.nearest_snap(track_id, start, ignore);
        let from_end = self.nearest_snap(track_id, start + duration, ignore);
        match (from_start, from_end) {
            (Some(s), Some(e)) => {
                if e.0.abs() < s.0.abs() - TIME_EPSILON {
                    Some(e)
                } else {
                    Some(s)
                }
            }
            (s, e) => s.or(e),
        }
    }

    /// Nearest snap point to `edge` within tolerance, as `(offset, target)`.
    /// Ties go to the earlier point.
    fn nearest_snap(
        &self,
        track_id: &TrackId,
        edge: f64,
        ignore: Option<&ClipId>,
    ) -> Option<(f64, SnapTarget)> {
        let snap = self.config.snap?;
        let tolerance = self.config.snap_tolerance_secs();
        if tolerance <= 0.0 {
            return None;
        }

        let mut candidates: Vec<SnapTarget> = vec![];
        if snap.grid_interval > TIME_EPSILON {
            let mark = (edge / snap.grid_interval).round() * snap.grid_interval;
            candidates.push(SnapTarget::Grid { time: mark });
        }
        for other in self.timeline.clips_on_track(track_id) {
            if Some(&other.id) == ignore {
                continue;
            }
            candidates.push(SnapTarget::ClipStart {
                clip: other.id.clone(),
                time: other.start,
            });
            candidates.push(SnapTarget::ClipEnd {
                clip: other.id.clone(),
                time: other.end(),
            });
        }

        candidates
            .into_iter()
            .map(|target| (target.time() - edge, target))
            .filter(|(offset, _)| offset.abs() <= tolerance + TIME_EPSILON)
            .min_by(|(a, ta), (b, tb)| {
                a.abs()
                    .total_cmp(&b.abs())
                    .then_with(|| ta.time().total_cmp(&tb.time()))
            })
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn finite_or_zero(value: f64) -> f64 {
    finite_or(value, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_timeline_model::ClipKind;

    fn video(id: &str, start: f64, duration: f64) -> Clip {
        Clip::new(id, "track1", ClipKind::Video, format!("{id}.mp4"), start, duration)
    }

    fn timeline_with(clips: &[Clip]) -> Timeline {
        let mut timeline = Timeline::new();
        for clip in clips {
            timeline.add_clip(clip.clone()).unwrap();
        }
        timeline
    }

    fn no_snap() -> ResolverConfig {
        ResolverConfig::default().without_snapping()
    }

    fn placed(resolution: Resolution) -> Placement {
        match resolution {
            Resolution::Placed(p) => p,
            Resolution::Rejected(reason) => panic!("expected placement, got {reason:?}"),
        }
    }

    #[test]
    fn test_insert_relocates_after_overlapping_clip() {
        let timeline = timeline_with(&[video("a", 0.0, 5.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);

        let p = placed(resolver.resolve_insert(&video("b", 3.0, 4.0)).unwrap());
        assert_eq!(p.start, 5.0);
        assert!(p.relocated);
    }

    #[test]
    fn test_move_prefers_slot_before_blocker() {
        let timeline = timeline_with(&[video("a", 0.0, 2.0), video("b", 10.0, 5.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);

        // a (2s) dropped at 12 collides with b; there is room before b at 8.
        let p = placed(
            resolver
                .resolve_move(&ClipId::from("a"), &TrackId::from("track1"), 12.0)
                .unwrap(),
        );
        assert_eq!(p.start, 8.0);
    }

    #[test]
    fn test_move_rejected_when_no_gap_fits() {
        let timeline = timeline_with(&[
            video("a", 0.0, 3.0),
            video("b", 3.0, 3.0),
            video("c", 6.0, 3.0),
            video("m", 20.0, 4.0),
        ]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);

        // m (4s) at 4 hits b: before b is [-1, 3) (negative), after b is [6, 10) which hits c.
        let resolution = resolver
            .resolve_move(&ClipId::from("m"), &TrackId::from("track1"), 4.0)
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Rejected(RejectReason::NoFreeSlot {
                blocker: ClipId::from("b")
            })
        );
    }

    #[test]
    fn test_move_to_incompatible_track_is_error() {
        let timeline = timeline_with(&[video("a", 0.0, 3.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);
        let err = resolver
            .resolve_move(&ClipId::from("a"), &TrackId::from("track2"), 0.0)
            .unwrap_err();
        assert!(matches!(err, TimelineError::TrackKindMismatch { .. }));
    }

    #[test]
    fn test_snap_to_neighbor_edge_within_tolerance() {
        let timeline = timeline_with(&[video("a", 0.0, 5.0), video("b", 20.0, 2.0)]);
        // 10px at 50px/s = 0.2s tolerance, grid far away from the edges used here.
        let config = ResolverConfig {
            snap: Some(SnapConfig {
                grid_interval: 100.0,
                tolerance_px: 10.0,
            }),
            ..ResolverConfig::default()
        };
        let resolver = Resolver::new(&timeline, &config);

        let p = placed(
            resolver
                .resolve_move(&ClipId::from("b"), &TrackId::from("track1"), 5.15)
                .unwrap(),
        );
        assert!((p.start - 5.0).abs() < 1e-9);
        assert_eq!(
            p.snapped_to,
            Some(SnapTarget::ClipEnd {
                clip: ClipId::from("a"),
                time: 5.0
            })
        );

        // Out of tolerance: unsnapped.
        let p = placed(
            resolver
                .resolve_move(&ClipId::from("b"), &TrackId::from("track1"), 5.5)
                .unwrap(),
        );
        assert_eq!(p.start, 5.5);
        assert_eq!(p.snapped_to, None);
    }

    #[test]
    fn test_snap_end_edge_to_grid() {
        let timeline = timeline_with(&[video("a", 0.0, 2.5)]);
        let config = ResolverConfig::default();
        let resolver = Resolver::new(&timeline, &config);

        // start 3.42 (0.42 from grid), end 5.92 (0.08 from grid mark 6).
        let p = placed(
            resolver
                .resolve_move(&ClipId::from("a"), &TrackId::from("track1"), 3.42)
                .unwrap(),
        );
        assert!((p.end() - 6.0).abs() < 1e-9);
        assert_eq!(p.snapped_to, Some(SnapTarget::Grid { time: 6.0 }));
    }

    #[test]
    fn test_neighbor_edge_beats_grid_mark() {
        // b's start is 0.12s from grid mark 5 but level with a's end.
        let timeline = timeline_with(&[video("a", 0.0, 5.12), video("b", 20.0, 2.0)]);
        let config = ResolverConfig {
            snap: Some(SnapConfig {
                grid_interval: 1.0,
                tolerance_px: 10.0,
            }),
            ..ResolverConfig::default()
        };
        let resolver = Resolver::new(&timeline, &config);
        let p = placed(
            resolver
                .resolve_move(&ClipId::from("b"), &TrackId::from("track1"), 5.12)
                .unwrap(),
        );
        assert!((p.start - 5.12).abs() < 1e-9);
        assert_eq!(
            p.snapped_to,
            Some(SnapTarget::ClipEnd {
                clip: ClipId::from("a"),
                time: 5.12
            })
        );
    }

    #[test]
    fn test_rejected_snap_keeps_unsnapped_edge() {
        // 2s of source on each side is trimmed away. Grid mark 4 is the
        // only snap in range, but ending there would leave nothing to play.
        let timeline = timeline_with(&[video("a", 0.0, 6.0).with_trim(2.0, 2.0)]);
        let config = ResolverConfig {
            snap: Some(SnapConfig {
                grid_interval: 1.0,
                tolerance_px: 10.0,
            }),
            ..ResolverConfig::default()
        };
        let resolver = Resolver::new(&timeline, &config);
        let p = placed(
            resolver
                .resolve_resize(&ClipId::from("a"), ResizeEdge::End, 4.15)
                .unwrap(),
        );
        assert_eq!(p.start, 0.0);
        assert!((p.duration - 4.15).abs() < 1e-9);
        assert_eq!(p.snapped_to, None);
    }

    #[test]
    fn test_drag_switches_tracks_and_clamps() {
        let mut timeline = Timeline::new();
        timeline
            .add_clip(Clip::new("m", "track2", ClipKind::Audio, "m.wav", 1.0, 2.0))
            .unwrap();
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);

        // One lane down (60px), 100px right (2s at 50px/s).
        let (track, start) = resolver
            .drag_target(&DragGesture {
                clip_id: ClipId::from("m"),
                delta_x_px: 100.0,
                delta_y_px: 65.0,
            })
            .unwrap();
        assert_eq!(track, TrackId::from("track3"));
        assert!((start - 3.0).abs() < 1e-9);

        // Far below the last lane clamps to the voice-over lane.
        let (track, _) = resolver
            .drag_target(&DragGesture {
                clip_id: ClipId::from("m"),
                delta_x_px: 0.0,
                delta_y_px: 10_000.0,
            })
            .unwrap();
        assert_eq!(track, TrackId::from("voiceover"));

        // Dragging up onto the video lane is a kind mismatch.
        let err = resolver
            .resolve_drag(&DragGesture {
                clip_id: ClipId::from("m"),
                delta_x_px: 0.0,
                delta_y_px: -60.0,
            })
            .unwrap_err();
        assert!(matches!(err, TimelineError::TrackKindMismatch { .. }));
    }

    #[test]
    fn test_drag_left_past_zero_clamps_start() {
        let timeline = timeline_with(&[video("a", 1.0, 2.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);
        let p = placed(
            resolver
                .resolve_drag(&DragGesture {
                    clip_id: ClipId::from("a"),
                    delta_x_px: -500.0,
                    delta_y_px: 0.0,
                })
                .unwrap(),
        );
        assert_eq!(p.start, 0.0);
    }

    #[test]
    fn test_resize_start_edge_keeps_end_fixed() {
        let timeline = timeline_with(&[video("a", 2.0, 4.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);
        let p = placed(
            resolver
                .resolve_resize(&ClipId::from("a"), ResizeEdge::Start, 3.0)
                .unwrap(),
        );
        assert_eq!(p.start, 3.0);
        assert_eq!(p.end(), 6.0);

        // Cannot shrink below the minimum duration.
        let p = placed(
            resolver
                .resolve_resize(&ClipId::from("a"), ResizeEdge::Start, 5.9)
                .unwrap(),
        );
        assert!((p.duration - 0.5).abs() < 1e-9);
        assert_eq!(p.end(), 6.0);
    }

    #[test]
    fn test_resize_end_edge_changes_duration_only() {
        let timeline = timeline_with(&[video("a", 2.0, 4.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);
        let p = placed(
            resolver
                .resolve_resize(&ClipId::from("a"), ResizeEdge::End, 9.0)
                .unwrap(),
        );
        assert_eq!(p.start, 2.0);
        assert_eq!(p.duration, 7.0);

        let p = placed(
            resolver
                .resolve_resize(&ClipId::from("a"), ResizeEdge::End, 0.0)
                .unwrap(),
        );
        assert!((p.duration - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_resize_rejected_on_neighbor_overlap() {
        let timeline = timeline_with(&[video("a", 0.0, 4.0), video("b", 5.0, 2.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);
        let resolution = resolver
            .resolve_resize(&ClipId::from("a"), ResizeEdge::End, 6.0)
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Rejected(RejectReason::Overlap {
                neighbor: ClipId::from("b")
            })
        );

        let resolution = resolver
            .resolve_resize(&ClipId::from("b"), ResizeEdge::Start, 3.0)
            .unwrap();
        assert!(!resolution.is_placed());
    }

    #[test]
    fn test_resize_rejected_when_trim_exhausted() {
        let timeline = timeline_with(&[video("a", 0.0, 6.0).with_trim(2.0, 2.0)]);
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);
        let resolution = resolver
            .resolve_resize(&ClipId::from("a"), ResizeEdge::End, 3.0)
            .unwrap();
        assert_eq!(resolution, Resolution::Rejected(RejectReason::TrimExhausted));
    }

    #[test]
    fn test_resize_end_snaps_to_neighbor_start() {
        let timeline = timeline_with(&[video("a", 0.0, 4.0), video("b", 7.3, 2.0)]);
        let config = ResolverConfig::default();
        let resolver = Resolver::new(&timeline, &config);
        let p = placed(
            resolver
                .resolve_resize(&ClipId::from("a"), ResizeEdge::End, 7.2)
                .unwrap(),
        );
        assert!((p.end() - 7.3).abs() < 1e-9);
    }

    #[test]
    fn test_drop_checks_kind_and_allowed_track() {
        let timeline = Timeline::new();
        let config = no_snap();
        let resolver = Resolver::new(&timeline, &config);

        let payload = DropPayload {
            clip: Clip::new("vo1", "voiceover", ClipKind::Audio, "vo.wav", 0.0, 3.0),
            allowed_track: Some(TrackId::from("voiceover")),
        };
        let err = resolver
            .resolve_drop(&payload, &TrackId::from("track2"), 0.0)
            .unwrap_err();
        assert_eq!(
            err,
            TimelineError::TrackNotAllowed {
                track: TrackId::from("track2"),
                allowed: TrackId::from("voiceover"),
            }
        );

        let err = resolver
            .resolve_drop(&payload, &TrackId::from("track1"), 0.0)
            .unwrap_err();
        assert!(matches!(err, TimelineError::TrackKindMismatch { .. }));

        let p = placed(
            resolver
                .resolve_drop(&payload, &TrackId::from("voiceover"), 1.5)
                .unwrap(),
        );
        assert_eq!(p.start, 1.5);
    }

    #[test]
    fn test_drop_payload_wire_format() {
        let raw = r#"{
            "id": "gen-1",
            "trackId": "track1",
            "start": 0,
            "duration": 4,
            "kind": "image",
            "sourceRef": "generated/still.png",
            "allowedTrack": "track1"
        }"#;
        let payload: DropPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.clip.kind, ClipKind::Image);
        assert_eq!(payload.allowed_track, Some(TrackId::from("track1")));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let timeline = timeline_with(&[
            video("a", 0.0, 3.0),
            video("b", 4.0, 2.0),
            video("c", 9.0, 1.0),
        ]);
        let config = ResolverConfig::default();
        let resolver = Resolver::new(&timeline, &config);
        let first = resolver.resolve_insert(&video("n", 4.5, 2.5)).unwrap();
        for _ in 0..10 {
            assert_eq!(resolver.resolve_insert(&video("n", 4.5, 2.5)).unwrap(), first);
        }
    }
}
