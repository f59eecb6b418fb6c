//! The editing session: owns the timeline and its history.
//!
//! Every committed mutation goes through [`Editor`], which validates it,
//! applies it to the timeline, and records a history snapshot. Resolver
//! rejections are not errors: the clip keeps its previous placement and the
//! caller receives the [`Resolution`] explaining why.

use cutline_common::config::EditorDefaults;
use cutline_timeline_model::{
    Clip, ClipId, ClipPatch, Timeline, TimelineError, TimelineSnapshot, TrackId,
};

use crate::history::HistoryManager;
use crate::resolver::{
    DragGesture, DropPayload, Placement, Resolution, ResizeEdge, Resolver, ResolverConfig,
};

pub struct Editor {
    timeline: Timeline,
    history: HistoryManager,
    config: ResolverConfig,
}

impl Editor {
    pub fn new(timeline: Timeline, config: ResolverConfig, history_limit: usize) -> Self {
        let history = HistoryManager::new(timeline.snapshot(), history_limit);
        Self {
            timeline,
            history,
            config,
        }
    }

    pub fn from_defaults(timeline: Timeline, defaults: &EditorDefaults) -> Self {
        Self::new(timeline, ResolverConfig::from(defaults), defaults.history_limit)
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        self.timeline.snapshot()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.timeline, &self.config)
    }

    /// Insert a clip exactly where it says it goes.
    pub fn add_clip(&mut self, clip: Clip) -> Result<&Clip, TimelineError> {
        let id = clip.id.clone();
        self.timeline.add_clip(clip)?;
        self.commit("add");
        self.get(&id)
    }

    /// Insert a clip, relocating it next to whatever it collides with.
    pub fn insert_clip(&mut self, mut clip: Clip) -> Result<Resolution, TimelineError> {
        let resolution = self.resolver().resolve_insert(&clip)?;
        if let Resolution::Placed(placement) = &resolution {
            clip.track_id = placement.track_id.clone();
            clip.start = placement.start;
            clip.duration = placement.duration;
            self.timeline.add_clip(clip)?;
            self.commit("insert");
        }
        Ok(resolution)
    }

    pub fn remove_clip(&mut self, id: &ClipId) -> Result<Clip, TimelineError> {
        let removed = self.timeline.remove_clip(id)?;
        self.commit("remove");
        Ok(removed)
    }

    /// Apply a patch verbatim. Placement changes are not relocated.
    pub fn update_clip(&mut self, id: &ClipId, patch: &ClipPatch) -> Result<&Clip, TimelineError> {
        self.timeline.update_clip(id, patch)?;
        self.commit("update");
        self.get(id)
    }

    pub fn set_volume(&mut self, id: &ClipId, volume: f64) -> Result<&Clip, TimelineError> {
        let patch = ClipPatch {
            volume: Some(volume),
            ..ClipPatch::default()
        };
        self.update_clip(id, &patch)
    }

    pub fn set_muted(&mut self, id: &ClipId, muted: bool) -> Result<&Clip, TimelineError> {
        let patch = ClipPatch {
            muted: Some(muted),
            ..ClipPatch::default()
        };
        self.update_clip(id, &patch)
    }

    pub fn trim_clip(
        &mut self,
        id: &ClipId,
        trim_start: f64,
        trim_end: f64,
    ) -> Result<&Clip, TimelineError> {
        self.update_clip(id, &ClipPatch::trim(trim_start, trim_end))
    }

    /// Move a clip through the resolver.
    pub fn move_clip(
        &mut self,
        id: &ClipId,
        track_id: &TrackId,
        start: f64,
    ) -> Result<Resolution, TimelineError> {
        let resolution = self.resolver().resolve_move(id, track_id, start)?;
        self.apply(id, &resolution, "move")?;
        Ok(resolution)
    }

    /// Where a drag would land right now, without committing it.
    pub fn preview_drag(&self, gesture: &DragGesture) -> Result<Resolution, TimelineError> {
        self.resolver().resolve_drag(gesture)
    }

    /// Commit a finished drag gesture.
    pub fn commit_drag(&mut self, gesture: &DragGesture) -> Result<Resolution, TimelineError> {
        let resolution = self.resolver().resolve_drag(gesture)?;
        self.apply(&gesture.clip_id, &resolution, "drag")?;
        Ok(resolution)
    }

    pub fn resize_clip(
        &mut self,
        id: &ClipId,
        edge: ResizeEdge,
        time: f64,
    ) -> Result<Resolution, TimelineError> {
        let resolution = self.resolver().resolve_resize(id, edge, time)?;
        self.apply(id, &resolution, "resize")?;
        Ok(resolution)
    }

    /// Place a dropped clip on `track_id` near `start`.
    pub fn drop_clip(
        &mut self,
        payload: &DropPayload,
        track_id: &TrackId,
        start: f64,
    ) -> Result<Resolution, TimelineError> {
        let resolution = self.resolver().resolve_drop(payload, track_id, start)?;
        if let Resolution::Placed(placement) = &resolution {
            let mut clip = payload.clip.clone();
            clip.track_id = placement.track_id.clone();
            clip.start = placement.start;
            clip.duration = placement.duration;
            self.timeline.add_clip(clip)?;
            self.commit("drop");
        }
        Ok(resolution)
    }

    /// Restore the previous state. Returns `false` at the bottom of history.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.timeline.restore(snapshot);
                tracing::debug!(cursor = self.history.cursor(), "Undo");
                true
            }
            None => false,
        }
    }

    /// Re-apply an undone state. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.timeline.restore(snapshot);
                tracing::debug!(cursor = self.history.cursor(), "Redo");
                true
            }
            None => false,
        }
    }

    fn apply(
        &mut self,
        id: &ClipId,
        resolution: &Resolution,
        action: &'static str,
    ) -> Result<(), TimelineError> {
        match resolution {
            Resolution::Placed(Placement {
                track_id,
                start,
                duration,
                ..
            }) => {
                let patch = ClipPatch::placement(track_id.clone(), *start, *duration);
                self.timeline.update_clip(id, &patch)?;
                self.commit(action);
            }
            Resolution::Rejected(reason) => {
                tracing::debug!(clip = %id, action, ?reason, "Edit rejected, placement kept");
            }
        }
        Ok(())
    }

    fn commit(&mut self, action: &'static str) {
        if self.history.record(self.timeline.snapshot()) {
            tracing::debug!(action, entries = self.history.len(), "History recorded");
        }
    }

    fn get(&self, id: &ClipId) -> Result<&Clip, TimelineError> {
        self.timeline
            .clip(id)
            .ok_or_else(|| TimelineError::UnknownClip { clip: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::RejectReason;
    use cutline_timeline_model::ClipKind;

    fn editor() -> Editor {
        Editor::new(
            Timeline::new(),
            ResolverConfig::default().without_snapping(),
            100,
        )
    }

    fn video(id: &str, start: f64, duration: f64) -> Clip {
        Clip::new(id, "track1", ClipKind::Video, format!("{id}.mp4"), start, duration)
    }

    #[test]
    fn test_insert_relocates_overlapping_clip() {
        let mut editor = editor();
        editor.insert_clip(video("a", 0.0, 5.0)).unwrap();
        let resolution = editor.insert_clip(video("b", 3.0, 4.0)).unwrap();
        assert!(resolution.is_placed());

        let b = editor.timeline().clip(&ClipId::from("b")).unwrap();
        assert_eq!(b.start, 5.0);
        assert_eq!(b.duration, 4.0);
    }

    #[test]
    fn test_rejected_move_keeps_placement_and_history() {
        let mut editor = editor();
        editor.add_clip(video("a", 0.0, 3.0)).unwrap();
        editor.add_clip(video("b", 3.0, 3.0)).unwrap();
        editor.add_clip(video("c", 6.0, 3.0)).unwrap();
        editor.add_clip(video("m", 20.0, 4.0)).unwrap();
        let entries = editor.history().len();

        let resolution = editor
            .move_clip(&ClipId::from("m"), &TrackId::from("track1"), 4.0)
            .unwrap();
        assert!(matches!(
            resolution,
            Resolution::Rejected(RejectReason::NoFreeSlot { .. })
        ));
        assert_eq!(editor.timeline().clip(&ClipId::from("m")).unwrap().start, 20.0);
        assert_eq!(editor.history().len(), entries);
    }

    #[test]
    fn test_undo_redo_restores_serialized_state() {
        let mut editor = editor();
        editor.add_clip(video("a", 0.0, 2.0)).unwrap();
        let before = serde_json::to_string(editor.timeline()).unwrap();

        editor
            .move_clip(&ClipId::from("a"), &TrackId::from("track1"), 7.0)
            .unwrap();
        let after = serde_json::to_string(editor.timeline()).unwrap();
        assert_ne!(before, after);

        assert!(editor.undo());
        assert_eq!(serde_json::to_string(editor.timeline()).unwrap(), before);
        assert!(editor.redo());
        assert_eq!(serde_json::to_string(editor.timeline()).unwrap(), after);
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let mut editor = editor();
        assert!(!editor.undo());
        assert!(!editor.redo());
        assert!(editor.timeline().clips().is_empty());
    }

    #[test]
    fn test_failed_mutation_records_nothing() {
        let mut editor = editor();
        editor.add_clip(video("a", 0.0, 5.0)).unwrap();
        assert!(editor.add_clip(video("b", 1.0, 1.0)).is_err());
        assert!(editor.trim_clip(&ClipId::from("a"), 4.0, 1.0).is_err());
        assert_eq!(editor.history().len(), 2);
    }

    #[test]
    fn test_drag_preview_does_not_mutate() {
        let mut editor = editor();
        editor
            .add_clip(Clip::new("m", "track2", ClipKind::Audio, "m.wav", 0.0, 2.0))
            .unwrap();
        let gesture = DragGesture {
            clip_id: ClipId::from("m"),
            delta_x_px: 150.0,
            delta_y_px: 60.0,
        };

        let preview = editor.preview_drag(&gesture).unwrap();
        assert_eq!(editor.timeline().clip(&ClipId::from("m")).unwrap().start, 0.0);

        let committed = editor.commit_drag(&gesture).unwrap();
        assert_eq!(preview, committed);
        let m = editor.timeline().clip(&ClipId::from("m")).unwrap();
        assert_eq!(m.track_id, TrackId::from("track3"));
        assert!((m.start - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_commits_through_history() {
        let mut editor = editor();
        editor.add_clip(video("a", 0.0, 4.0)).unwrap();
        editor
            .resize_clip(&ClipId::from("a"), ResizeEdge::End, 6.0)
            .unwrap();
        assert_eq!(editor.timeline().clip(&ClipId::from("a")).unwrap().duration, 6.0);
        assert!(editor.undo());
        assert_eq!(editor.timeline().clip(&ClipId::from("a")).unwrap().duration, 4.0);
    }

    #[test]
    fn test_drop_inserts_on_allowed_track() {
        let mut editor = editor();
        let payload = DropPayload {
            clip: Clip::new("vo", "voiceover", ClipKind::Audio, "vo.wav", 0.0, 2.0),
            allowed_track: Some(TrackId::from("voiceover")),
        };
        assert!(editor
            .drop_clip(&payload, &TrackId::from("track2"), 0.0)
            .is_err());
        assert!(editor.timeline().clips().is_empty());

        editor
            .drop_clip(&payload, &TrackId::from("voiceover"), 1.0)
            .unwrap();
        let vo = editor.timeline().clip(&ClipId::from("vo")).unwrap();
        assert_eq!(vo.start, 1.0);
    }

    #[test]
    fn test_volume_and_mute_edits_are_undoable() {
        let mut editor = editor();
        editor
            .add_clip(Clip::new("m", "track2", ClipKind::Audio, "m.wav", 0.0, 2.0))
            .unwrap();
        editor.set_volume(&ClipId::from("m"), 0.5).unwrap();
        editor.set_muted(&ClipId::from("m"), true).unwrap();

        let m = editor.timeline().clip(&ClipId::from("m")).unwrap();
        assert_eq!((m.volume, m.muted), (0.5, true));

        editor.undo();
        editor.undo();
        let m = editor.timeline().clip(&ClipId::from("m")).unwrap();
        assert_eq!((m.volume, m.muted), (1.0, false));
    }
}
