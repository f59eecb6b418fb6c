//! Render plan construction.
//!
//! A [`RenderPlan`] is derived fresh for every export and never mutated.
//! It lists the concat entries for the video lane, the audio mix inputs,
//! the encode parameters, and the ordered transcoder operations that turn
//! them into the final file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use cutline_timeline_model::{
    Clip, ClipId, ClipKind, ExportFormat, ExportOptions, ExportQuality, LoadedProject, Track,
    TrackRole, TIME_EPSILON,
};

use crate::error::RenderError;

/// Resolves a clip's `sourceRef` to a local file the transcoder can read.
pub trait SourceResolver {
    fn resolve(&self, clip: &Clip) -> Result<PathBuf, RenderError>;
}

impl<F> SourceResolver for F
where
    F: Fn(&Clip) -> Result<PathBuf, RenderError>,
{
    fn resolve(&self, clip: &Clip) -> Result<PathBuf, RenderError> {
        self(clip)
    }
}

/// Resolves sources against a project's `sources/` directory.
pub struct ProjectSources<'a> {
    project: &'a LoadedProject,
}

impl<'a> ProjectSources<'a> {
    pub fn new(project: &'a LoadedProject) -> Self {
        Self { project }
    }
}

impl SourceResolver for ProjectSources<'_> {
    fn resolve(&self, clip: &Clip) -> Result<PathBuf, RenderError> {
        let path = self.project.source_path(&clip.source_ref);
        if path.is_file() {
            Ok(path)
        } else {
            Err(RenderError::SourceFetch {
                clip: clip.id.clone(),
                source_ref: clip.source_ref.clone(),
                reason: format!("no file at {}", path.display()),
            })
        }
    }
}

/// Transcoder stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    Concatenate,
    MixAudio,
    Encode,
}

impl RenderStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderStage::Concatenate => "concatenate",
            RenderStage::MixAudio => "mix_audio",
            RenderStage::Encode => "encode",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One video-lane clip in concat order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcatEntry {
    pub clip_id: ClipId,
    pub kind: ClipKind,
    pub path: PathBuf,
    pub timeline_start: f64,

    /// Source seconds to start from (`trimStart`); unset for stills.
    pub inpoint: Option<f64>,
    /// Source seconds to stop at (`duration - trimEnd`); unset for stills.
    pub outpoint: Option<f64>,
    /// Display time for stills.
    pub duration: Option<f64>,
}

impl ConcatEntry {
    fn from_clip(clip: &Clip, path: PathBuf) -> Self {
        // The source may run longer than the clip, so every video entry
        // is bounded explicitly.
        let (inpoint, outpoint, duration) = match clip.kind {
            ClipKind::Image => (None, None, Some(clip.duration)),
            _ => (
                Some(clip.trim_start),
                Some(clip.duration - clip.trim_end),
                None,
            ),
        };
        Self {
            clip_id: clip.id.clone(),
            kind: clip.kind,
            path,
            timeline_start: clip.start,
            inpoint,
            outpoint,
            duration,
        }
    }

    /// Length this entry contributes to the concatenated stream.
    pub fn output_duration(&self, clip_duration: f64) -> f64 {
        match (self.duration, self.inpoint, self.outpoint) {
            (Some(d), _, _) => d,
            (None, Some(i), Some(o)) => o - i,
            _ => clip_duration,
        }
    }

    fn manifest_lines(&self) -> String {
        let mut lines = format!("file '{}'\n", escape_manifest_path(&self.path));
        if let Some(duration) = self.duration {
            lines.push_str(&format!("duration {}\n", seconds(duration)));
        }
        if let Some(inpoint) = self.inpoint {
            lines.push_str(&format!("inpoint {}\n", seconds(inpoint)));
        }
        if let Some(outpoint) = self.outpoint {
            lines.push_str(&format!("outpoint {}\n", seconds(outpoint)));
        }
        lines
    }
}

/// One audio-lane clip feeding the mixer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMixEntry {
    pub clip_id: ClipId,
    pub source: PathBuf,
    pub trim_start: f64,
    pub effective_duration: f64,
    /// Timeline offset in seconds.
    pub delay: f64,
    /// Gain; 0 when muted.
    pub volume: f64,
}

impl AudioMixEntry {
    fn from_clip(clip: &Clip, source: PathBuf) -> Self {
        Self {
            clip_id: clip.id.clone(),
            source,
            trim_start: clip.trim_start,
            effective_duration: clip.effective_duration(),
            delay: clip.start,
            volume: if clip.muted {
                0.0
            } else {
                clip.volume.clamp(0.0, 1.0)
            },
        }
    }

    pub fn end(&self) -> f64 {
        self.delay + self.effective_duration
    }
}

/// Encoder speed/quality pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodePreset {
    pub preset: &'static str,
    pub crf: u8,
}

impl From<ExportQuality> for EncodePreset {
    fn from(quality: ExportQuality) -> Self {
        match quality {
            ExportQuality::Draft => Self {
                preset: "ultrafast",
                crf: 30,
            },
            ExportQuality::Standard => Self {
                preset: "medium",
                crf: 23,
            },
            ExportQuality::High => Self {
                preset: "slow",
                crf: 18,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EncodeParams {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub preset: EncodePreset,
}

impl EncodeParams {
    pub fn from_options(options: &ExportOptions) -> Self {
        let (width, height) = options.size.dimensions();
        Self {
            format: options.format,
            width,
            height,
            preset: options.quality.into(),
        }
    }

    /// Output flags for the final encode, excluding input and size.
    pub fn codec_args(&self) -> Vec<String> {
        let crf = self.preset.crf.to_string();
        let args: Vec<&str> = match self.format {
            ExportFormat::Mp4 => vec![
                "-c:v",
                "libx264",
                "-preset",
                self.preset.preset,
                "-crf",
                crf.as_str(),
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-movflags",
                "+faststart",
            ],
            ExportFormat::Webm => vec![
                "-c:v",
                "libvpx-vp9",
                "-crf",
                crf.as_str(),
                "-b:v",
                "0",
                "-c:a",
                "libopus",
                "-b:a",
                "128k",
            ],
            ExportFormat::Gif => vec![
                "-vf",
                "fps=15,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
                "-an",
            ],
        };
        args.into_iter().map(str::to_string).collect()
    }
}

/// A transcoder invocation. `args` follow the ffmpeg CLI convention and
/// exclude the binary name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOperation {
    pub stage: RenderStage,
    pub args: Vec<String>,
    pub output: PathBuf,
    /// Media length the stage produces, used to turn timestamps into progress.
    pub expected_duration_secs: f64,
}

/// Uncovered span on the video lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineGap {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub concat: Vec<ConcatEntry>,
    /// Concat demuxer manifest text.
    pub manifest: String,
    pub manifest_path: PathBuf,
    pub audio_mix: Vec<AudioMixEntry>,
    pub encode: EncodeParams,
    pub operations: Vec<RenderOperation>,
    pub gaps: Vec<TimelineGap>,
    /// Clips dropped because their source could not be fetched.
    pub skipped: Vec<ClipId>,
    pub scratch_dir: PathBuf,
    pub output_path: PathBuf,
}

impl RenderPlan {
    /// Where the last operation writes before the file is moved into place.
    pub fn final_output(&self) -> Option<&Path> {
        self.operations.last().map(|op| op.output.as_path())
    }

    pub fn stages(&self) -> Vec<RenderStage> {
        self.operations.iter().map(|op| op.stage).collect()
    }
}

/// Builds a [`RenderPlan`] from a clip set and export options.
#[derive(Debug, Clone)]
pub struct RenderPlanBuilder {
    options: ExportOptions,
    scratch_dir: PathBuf,
    output_path: PathBuf,
}

impl RenderPlanBuilder {
    pub fn new(
        options: ExportOptions,
        scratch_dir: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            options,
            scratch_dir: scratch_dir.into(),
            output_path: output_path.into(),
        }
    }

    /// Builder for a project export: scratch space under `cache/`, output
    /// under `exports/` unless `output_path` is given.
    pub fn for_project(
        project: &LoadedProject,
        options: ExportOptions,
        output_path: Option<PathBuf>,
    ) -> Self {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let scratch = project.root.join("cache").join(format!("export-{stamp}"));
        let output = output_path.unwrap_or_else(|| {
            project
                .root
                .join("exports")
                .join(format!("export-{stamp}.{}", options.format.extension()))
        });
        Self::new(options, scratch, output)
    }

    pub fn build(
        &self,
        clips: &[Clip],
        tracks: &[Track],
        sources: &dyn SourceResolver,
    ) -> Result<RenderPlan, RenderError> {
        let role_of = |clip: &Clip| {
            tracks
                .iter()
                .find(|t| t.id == clip.track_id)
                .map(|t| t.role)
        };

        let mut sorted: Vec<&Clip> = clips.iter().collect();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        let mut skipped = vec![];
        let mut first_video_failure = None;
        let mut video: Vec<(&Clip, ConcatEntry)> = vec![];
        let mut audio_mix = vec![];

        for clip in sorted {
            let role = role_of(clip);
            let is_video = role == Some(TrackRole::Video) && clip.kind.is_visual();
            let is_audio = role.is_some_and(TrackRole::is_audio) && clip.kind == ClipKind::Audio;
            if !is_video && !is_audio {
                tracing::debug!(clip = %clip.id, track = %clip.track_id, "Clip not on a renderable lane");
                continue;
            }

            let path = match sources.resolve(clip) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(clip = %clip.id, error = %e, "Skipping clip, source unavailable");
                    skipped.push(clip.id.clone());
                    if is_video && first_video_failure.is_none() {
                        first_video_failure = Some(e);
                    }
                    continue;
                }
            };

            if is_video {
                video.push((clip, ConcatEntry::from_clip(clip, path)));
            } else {
                audio_mix.push(AudioMixEntry::from_clip(clip, path));
            }
        }

        if video.is_empty() {
            return Err(first_video_failure.unwrap_or(RenderError::NoVideoClips));
        }

        let gaps = find_gaps(video.iter().map(|(clip, _)| *clip));
        for gap in &gaps {
            tracing::warn!(start = gap.start, end = gap.end, "Gap on video track will be closed in the export");
        }

        let concat_duration: f64 = video
            .iter()
            .map(|(clip, entry)| entry.output_duration(clip.duration))
            .sum();
        let concat: Vec<ConcatEntry> = video.into_iter().map(|(_, entry)| entry).collect();
        let manifest: String = concat.iter().map(ConcatEntry::manifest_lines).collect();
        let encode = EncodeParams::from_options(&self.options);

        let manifest_path = self.scratch_dir.join("concat.txt");
        let mut operations = vec![];

        let concat_out = self.scratch_dir.join("concat.mkv");
        operations.push(RenderOperation {
            stage: RenderStage::Concatenate,
            args: vec![
                "-y".to_string(),
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                path_arg(&manifest_path),
                "-c".to_string(),
                "copy".to_string(),
                path_arg(&concat_out),
            ],
            output: concat_out.clone(),
            expected_duration_secs: concat_duration,
        });

        let mut duration = concat_duration;
        let mut encode_input = concat_out;
        if !audio_mix.is_empty() {
            duration = audio_mix
                .iter()
                .map(AudioMixEntry::end)
                .fold(concat_duration, f64::max);
            let mixed_out = self.scratch_dir.join("mixed.mkv");
            operations.push(RenderOperation {
                stage: RenderStage::MixAudio,
                args: mix_args(&encode_input, &audio_mix, &mixed_out),
                output: mixed_out.clone(),
                expected_duration_secs: duration,
            });
            encode_input = mixed_out;
        }

        let final_out = self
            .scratch_dir
            .join(format!("final.{}", encode.format.extension()));
        let mut encode_args = vec![
            "-y".to_string(),
            "-i".to_string(),
            path_arg(&encode_input),
            "-s".to_string(),
            format!("{}x{}", encode.width, encode.height),
        ];
        encode_args.extend(encode.codec_args());
        encode_args.push(path_arg(&final_out));
        operations.push(RenderOperation {
            stage: RenderStage::Encode,
            args: encode_args,
            output: final_out,
            expected_duration_secs: duration,
        });

        tracing::info!(
            video_clips = concat.len(),
            audio_clips = audio_mix.len(),
            skipped = skipped.len(),
            gaps = gaps.len(),
            format = %encode.format,
            "Render plan built"
        );

        Ok(RenderPlan {
            concat,
            manifest,
            manifest_path,
            audio_mix,
            encode,
            operations,
            gaps,
            skipped,
            scratch_dir: self.scratch_dir.clone(),
            output_path: self.output_path.clone(),
        })
    }
}

fn mix_args(input: &Path, entries: &[AudioMixEntry], output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string(), "-i".to_string(), path_arg(input)];
    for entry in entries {
        args.push("-i".to_string());
        args.push(path_arg(&entry.source));
    }

    let mut graph = String::new();
    let mut labels = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let delay_ms = (entry.delay * 1000.0).round() as u64;
        graph.push_str(&format!(
            "[{input}:a]atrim=start={start}:duration={duration},asetpts=PTS-STARTPTS,adelay={delay_ms}|{delay_ms},volume={volume}[a{i}];",
            input = i + 1,
            start = seconds(entry.trim_start),
            duration = seconds(entry.effective_duration),
            volume = seconds(entry.volume),
        ));
        labels.push_str(&format!("[a{i}]"));
    }
    graph.push_str(&format!(
        "{labels}amix=inputs={}:duration=longest:normalize=0[aout]",
        entries.len()
    ));

    args.extend(
        [
            "-filter_complex",
            graph.as_str(),
            "-map",
            "0:v",
            "-map",
            "[aout]",
            "-c:v",
            "copy",
            "-c:a",
            "aac",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(path_arg(output));
    args
}

fn find_gaps<'a>(video: impl Iterator<Item = &'a Clip>) -> Vec<TimelineGap> {
    let mut gaps = vec![];
    let mut cursor = 0.0;
    for clip in video {
        if clip.start > cursor + TIME_EPSILON {
            gaps.push(TimelineGap {
                start: cursor,
                end: clip.start,
            });
        }
        cursor = f64::max(cursor, clip.end());
    }
    gaps
}

fn escape_manifest_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Seconds with millisecond precision and no trailing zeros.
fn seconds(value: f64) -> String {
    if value.abs() < 0.0005 {
        return "0".to_string();
    }
    let s = format!("{value:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
