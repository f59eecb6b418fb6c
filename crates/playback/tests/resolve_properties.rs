use cutline_playback::{clip_state_at, effective_volume, resolve_at, ClipPhase, MixSettings};
use cutline_timeline_model::{default_tracks, Clip, ClipKind};
use proptest::prelude::*;

fn trimmed_clip() -> impl Strategy<Value = Clip> {
    (0.0f64..20.0, 1.0f64..20.0, 0.0f64..0.45, 0.0f64..0.45, 0.0f64..=1.0, any::<bool>()).prop_map(
        |(start, duration, front, back, volume, muted)| {
            Clip::new("c", "track2", ClipKind::Audio, "c.wav", start, duration)
                .with_trim(duration * front, duration * back)
                .with_volume(volume)
                .with_muted(muted)
        },
    )
}

proptest! {
    #[test]
    fn local_time_stays_inside_playable_region(clip in trimmed_clip(), at in 0.0f64..1.0) {
        let t = clip.start + at * clip.duration;
        let mix = MixSettings::default();
        if let Some(active) = clip_state_at(&clip, t, &mix) {
            prop_assert!(active.local_time >= clip.trim_start - 1e-9);
            prop_assert!(active.local_time <= clip.duration - clip.trim_end + 1e-9);
            if active.phase != ClipPhase::Playing {
                prop_assert_eq!(active.volume, 0.0);
            }
        }
    }

    #[test]
    fn effective_volume_is_bounded(
        clip in trimmed_clip(),
        global in 0.0f64..=1.0,
        global_muted in any::<bool>(),
    ) {
        let mix = MixSettings { volume: global, muted: global_muted };
        let volume = effective_volume(&clip, &mix);
        prop_assert!((0.0..=1.0).contains(&volume));
        if clip.muted || global_muted {
            prop_assert_eq!(volume, 0.0);
        }
    }

    #[test]
    fn inactive_outside_clip_interval(clip in trimmed_clip(), offset in 0.0f64..5.0) {
        let tracks = default_tracks();
        let mix = MixSettings::default();
        let after = resolve_at(std::slice::from_ref(&clip), &tracks, clip.end() + offset, &mix);
        prop_assert!(after.is_empty());
        if clip.start - offset - 1e-6 > 0.0 {
            let before = resolve_at(
                std::slice::from_ref(&clip),
                &tracks,
                clip.start - offset - 1e-6,
                &mix,
            );
            prop_assert!(before.is_empty());
        }
    }
}
