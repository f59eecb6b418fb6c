//! Project metadata and export option types.
//!
//! A project is the top-level container that ties together the timeline,
//! its source media directory, and the export defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::clip::Clip;
use crate::timeline::Timeline;

/// Top-level project file (`meta/project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Tracks and clips.
    pub timeline: Timeline,

    /// Export options saved with the project; unset means the
    /// configured defaults apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportOptions>,
}

/// Export request as sent by the UI: `{format, quality, size}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub quality: ExportQuality,
    pub size: ExportSize,
}

/// Output container/codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp4,
    Webm,
    Gif,
}

/// Compression effort / quality trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    Draft,
    #[default]
    Standard,
    High,
}

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExportSize {
    #[serde(rename = "480p")]
    P480,
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl ExportFormat {
    /// File extension for the final artifact.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Webm => "webm",
            ExportFormat::Gif => "gif",
        }
    }
}

impl ExportSize {
    /// Pixel dimensions (width, height).
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ExportSize::P480 => (854, 480),
            ExportSize::P720 => (1280, 720),
            ExportSize::P1080 => (1920, 1080),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportSize::P480 => "480p",
            ExportSize::P720 => "720p",
            ExportSize::P1080 => "1080p",
        }
    }
}

impl ExportQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportQuality::Draft => "draft",
            ExportQuality::Standard => "standard",
            ExportQuality::High => "high",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl fmt::Display for ExportQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ExportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(ExportFormat::Mp4),
            "webm" => Ok(ExportFormat::Webm),
            "gif" => Ok(ExportFormat::Gif),
            other => Err(ProjectError::ValidationError {
                message: format!("Unknown format: {other}. Use: mp4, webm, gif"),
            }),
        }
    }
}

impl FromStr for ExportQuality {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ExportQuality::Draft),
            "standard" => Ok(ExportQuality::Standard),
            "high" => Ok(ExportQuality::High),
            other => Err(ProjectError::ValidationError {
                message: format!("Unknown quality: {other}. Use: draft, standard, high"),
            }),
        }
    }
}

impl FromStr for ExportSize {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "480p" | "480" => Ok(ExportSize::P480),
            "720p" | "720" => Ok(ExportSize::P720),
            "1080p" | "1080" => Ok(ExportSize::P1080),
            other => Err(ProjectError::ValidationError {
                message: format!("Unknown size: {other}. Use: 480p, 720p, 1080p"),
            }),
        }
    }
}

/// The complete in-memory representation of a loaded project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project metadata and timeline.
    pub project: Project,
}

impl Project {
    /// Create a new project with the default track layout.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            id: uuid_v4(),
            created_at: now.clone(),
            modified_at: now,
            timeline: Timeline::new(),
            export: None,
        }
    }

    /// Refresh the modification timestamp.
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

impl LoadedProject {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let project_path = root.join("meta").join("project.json");

        let project_json =
            std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
                path: project_path.clone(),
                source: e,
            })?;

        let project: Project =
            serde_json::from_str(&project_json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;

        Ok(Self { root, project })
    }

    /// Save the project file to disk.
    pub fn save(&self) -> Result<(), ProjectError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| ProjectError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        let project_path = meta_dir.join("project.json");
        let project_json =
            serde_json::to_string_pretty(&self.project).map_err(|e| ProjectError::ParseError {
                path: project_path.clone(),
                source: e,
            })?;
        std::fs::write(&project_path, project_json).map_err(|e| ProjectError::IoError {
            path: project_path,
            source: e,
        })?;

        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["sources", "meta", "cache", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let loaded = Self {
            root,
            project: Project::new(name),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Local path a clip's `sourceRef` points at. Relative references are
    /// resolved against `sources/`.
    pub fn source_path(&self, source_ref: &str) -> PathBuf {
        let path = Path::new(source_ref);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join("sources").join(path)
        }
    }

    /// Validate that all referenced source files exist and that the stored
    /// timeline satisfies its placement invariants.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        let check_clip = |clip: &Clip, errors: &mut Vec<String>| {
            let path = self.source_path(&clip.source_ref);
            if !path.exists() {
                errors.push(format!(
                    "{} clip {} source missing: {}",
                    clip.kind, clip.id, clip.source_ref
                ));
            }
        };

        for clip in self.project.timeline.clips() {
            check_clip(clip, &mut errors);
        }

        for error in self.project.timeline.validate() {
            errors.push(format!("Timeline invariant violated: {error}"));
        }

        errors
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

/// Generate a simple UUID v4 without external dependency.
fn uuid_v4() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFFFFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3F) | 0x80) as u16 | (((seed >> 66) & 0x3FF) as u16) << 6,
        (seed >> 76) & 0xFFFFFFFFFFFF,
    )
}
