//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CutlineError, CutlineResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where projects are stored.
    pub projects_dir: PathBuf,

    /// Timeline editing behaviour.
    #[serde(default)]
    pub editor: EditorDefaults,

    /// Preview playback behaviour.
    #[serde(default)]
    pub playback: PlaybackDefaults,

    /// Default export settings.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Editing parameters for drag, resize, and snapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// Horizontal zoom: timeline pixels per second.
    pub pixels_per_second: f64,

    /// Height of one track lane in pixels.
    pub track_height_px: f64,

    /// Snap distance in pixels.
    pub snap_tolerance_px: f64,

    /// Spacing of time-grid marks in seconds.
    pub grid_interval_secs: f64,

    /// Whether snapping is enabled.
    pub snapping: bool,

    /// Shortest duration a resize may produce.
    pub min_clip_duration_secs: f64,

    /// Maximum number of undo snapshots kept.
    pub history_limit: usize,
}

/// Preview playback parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Synchronizer tick rate.
    pub tick_hz: u32,

    /// Player drift (seconds) tolerated before a corrective seek.
    pub drift_tolerance_secs: f64,

    /// Initial master volume [0.0, 1.0].
    pub default_volume: f64,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output format (`mp4`, `webm`, `gif`).
    pub format: String,

    /// Quality preset (`draft`, `standard`, `high`).
    pub quality: String,

    /// Output size (`480p`, `720p`, `1080p`).
    pub size: String,

    /// Transcoder executable.
    pub ffmpeg_binary: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cutline=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            editor: EditorDefaults::default(),
            playback: PlaybackDefaults::default(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            pixels_per_second: 50.0,
            track_height_px: 60.0,
            snap_tolerance_px: 10.0,
            grid_interval_secs: 1.0,
            snapping: true,
            min_clip_duration_secs: 0.5,
            history_limit: 100,
        }
    }
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            tick_hz: 10,
            drift_tolerance_secs: 0.3,
            default_volume: 1.0,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
            quality: "standard".to_string(),
            size: "720p".to_string(),
            ffmpeg_binary: "ffmpeg".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl PlaybackDefaults {
    /// Drift tolerance limited to the range the synchronizer supports.
    pub fn clamped_drift_tolerance(&self) -> f64 {
        self.drift_tolerance_secs.clamp(0.1, 0.5)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => match config.validate() {
                        Ok(()) => return config,
                        Err(e) => {
                            tracing::warn!(path = ?config_path, error = %e, "Ignoring invalid config");
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> CutlineResult<()> {
        self.validate()?;
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }

    /// Reject values the editor and playback engine cannot work with.
    pub fn validate(&self) -> CutlineResult<()> {
        let editor = &self.editor;
        let positive = [
            ("editor.pixels_per_second", editor.pixels_per_second),
            ("editor.track_height_px", editor.track_height_px),
            ("editor.grid_interval_secs", editor.grid_interval_secs),
            ("editor.min_clip_duration_secs", editor.min_clip_duration_secs),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CutlineError::config(format!("{key} must be positive, got {value}")));
            }
        }
        if !(editor.snap_tolerance_px.is_finite() && editor.snap_tolerance_px >= 0.0) {
            return Err(CutlineError::config("editor.snap_tolerance_px must not be negative"));
        }
        if editor.history_limit == 0 {
            return Err(CutlineError::config("editor.history_limit must be at least 1"));
        }
        if self.playback.tick_hz == 0 {
            return Err(CutlineError::config("playback.tick_hz must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.playback.default_volume) {
            return Err(CutlineError::config("playback.default_volume must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cutline").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("cutline").join("projects")
}
