//! Staged export execution.
//!
//! [`run_export`] runs a [`RenderPlan`]'s operations one after another
//! through a [`TranscoderBackend`], reporting progress to a single
//! observer. Intermediates live in the plan's scratch directory, which is
//! removed whatever the outcome. The output path is only written once the
//! last stage has succeeded.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;

use crate::error::RenderError;
use crate::plan::{RenderOperation, RenderPlan, RenderStage};

/// Export lifecycle notification. Exactly one terminal event
/// (`Completed`, `Failed`, `Cancelled`) is emitted per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExportEvent {
    /// `percent` is in `[0, 100]` for the named stage.
    Progress { stage: RenderStage, percent: f64 },
    Completed { artifact: PathBuf },
    Failed { stage: RenderStage, reason: String },
    Cancelled { stage: RenderStage },
}

impl ExportEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExportEvent::Progress { .. })
    }
}

/// Observer callback for export events.
pub type ExportObserver = Box<dyn Fn(ExportEvent) + Send + Sync>;

/// Requests cancellation of a running export.
#[derive(Debug, Clone)]
pub struct ExportCanceller {
    tx: watch::Sender<bool>,
}

impl ExportCanceller {
    pub fn cancel(&self) {
        // No receivers left means the export already finished.
        let _ = self.tx.send(true);
    }
}

/// Observed by the runner and backend to stop early.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested. Never resolves if the
    /// canceller is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a linked canceller/token pair.
pub fn cancellation() -> (ExportCanceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (ExportCanceller { tx }, CancelToken { rx })
}

/// Executes a single render operation.
#[async_trait]
pub trait TranscoderBackend: Send + Sync {
    /// Run `op` to completion, reporting stage progress as a fraction in
    /// `[0, 1]`. Must return [`RenderError::Cancelled`] promptly once
    /// `cancel` fires.
    async fn run(
        &self,
        op: &RenderOperation,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &mut CancelToken,
    ) -> Result<(), RenderError>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Run every operation of `plan` and move the result to its output path.
pub async fn run_export(
    plan: &RenderPlan,
    backend: &dyn TranscoderBackend,
    observer: &(dyn Fn(ExportEvent) + Send + Sync),
    mut cancel: CancelToken,
) -> Result<PathBuf, RenderError> {
    tracing::info!(
        backend = backend.name(),
        stages = plan.operations.len(),
        output = %plan.output_path.display(),
        "Starting export"
    );
    let started = std::time::Instant::now();

    let outcome = execute(plan, backend, observer, &mut cancel).await;
    remove_scratch(&plan.scratch_dir).await;

    match outcome {
        Ok(artifact) => {
            tracing::info!(
                artifact = %artifact.display(),
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Export finished"
            );
            observer(ExportEvent::Completed {
                artifact: artifact.clone(),
            });
            Ok(artifact)
        }
        Err(RenderError::Cancelled { stage }) => {
            tracing::info!(%stage, "Export cancelled");
            observer(ExportEvent::Cancelled { stage });
            Err(RenderError::Cancelled { stage })
        }
        Err(e) => {
            let stage = match &e {
                RenderError::Stage { stage, .. } => *stage,
                _ => RenderStage::Concatenate,
            };
            tracing::error!(%stage, error = %e, "Export failed");
            observer(ExportEvent::Failed {
                stage,
                reason: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn execute(
    plan: &RenderPlan,
    backend: &dyn TranscoderBackend,
    observer: &(dyn Fn(ExportEvent) + Send + Sync),
    cancel: &mut CancelToken,
) -> Result<PathBuf, RenderError> {
    let io_failure =
        |stage: RenderStage, e: std::io::Error| RenderError::stage(stage, e.to_string());

    tokio::fs::create_dir_all(&plan.scratch_dir)
        .await
        .map_err(|e| io_failure(RenderStage::Concatenate, e))?;
    tokio::fs::write(&plan.manifest_path, &plan.manifest)
        .await
        .map_err(|e| io_failure(RenderStage::Concatenate, e))?;

    for op in &plan.operations {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled { stage: op.stage });
        }

        observer(ExportEvent::Progress {
            stage: op.stage,
            percent: 0.0,
        });
        tracing::debug!(stage = %op.stage, args = ?op.args, "Running stage");

        let stage = op.stage;
        let report = move |fraction: f64| {
            observer(ExportEvent::Progress {
                stage,
                percent: (fraction * 100.0).clamp(0.0, 100.0),
            });
        };
        backend.run(op, &report, cancel).await?;

        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled { stage: op.stage });
        }
        observer(ExportEvent::Progress {
            stage: op.stage,
            percent: 100.0,
        });
    }

    let Some(final_output) = plan.final_output() else {
        return Err(RenderError::stage(RenderStage::Encode, "plan has no operations"));
    };
    if let Some(parent) = plan.output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_failure(RenderStage::Encode, e))?;
    }
    move_into_place(final_output, &plan.output_path)
        .await
        .map_err(|e| io_failure(RenderStage::Encode, e))?;

    Ok(plan.output_path.clone())
}

async fn move_into_place(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // Scratch and output may be on different filesystems. Copy under a
    // hidden name first so `to` only ever appears complete.
    let staging = staging_path(to);
    let staged = match tokio::fs::copy(from, &staging).await {
        Ok(_) => tokio::fs::rename(&staging, to).await,
        Err(e) => Err(e),
    };
    if let Err(e) = staged {
        if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %staging.display(), error = %cleanup, "Failed to remove staged output");
            }
        }
        return Err(e);
    }
    tokio::fs::remove_file(from).await
}

fn staging_path(to: &Path) -> PathBuf {
    let name = to
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    to.with_file_name(format!(".{name}.partial"))
}

async fn remove_scratch(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => tracing::debug!(dir = %dir.display(), "Removed scratch directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove scratch directory"),
    }
}

/// Runs operations with the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl TranscoderBackend for FfmpegBackend {
    async fn run(
        &self,
        op: &RenderOperation,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &mut CancelToken,
    ) -> Result<(), RenderError> {
        let stage = op.stage;
        let mut child = Command::new(&self.binary)
            .args(["-hide_banner", "-nostats", "-progress", "pipe:1"])
            .args(&op.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::stage(stage, format!("Failed to start {}: {e}", self.binary)))?;

        tracing::info!(pid = child.id(), %stage, "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::stage(stage, "Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RenderError::stage(stage, "Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(%stage, "Killing ffmpeg after cancellation");
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "Failed to kill ffmpeg");
                    }
                    stderr_task.abort();
                    return Err(RenderError::Cancelled { stage });
                }
                line = lines.next_line() => {
                    let line = line.map_err(|e| {
                        RenderError::stage(stage, format!("Failed reading ffmpeg progress: {e}"))
                    })?;
                    let Some(line) = line else { break };
                    if let Some((key, value)) = line.trim().split_once('=') {
                        state.update(key, value);
                        if key == "progress" {
                            progress(state.fraction(op.expected_duration_secs));
                        }
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RenderError::stage(stage, format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(RenderError::stage(
                stage,
                format!("ffmpeg exited with {status}: {}", stderr_tail(&stderr_output, 20)),
            ));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn stderr_tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.trim().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Accumulated `-progress` key/value state.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn fraction(&self, expected_duration_secs: f64) -> f64 {
        if self.complete {
            1.0
        } else if expected_duration_secs <= 0.0 {
            0.0
        } else {
            (self.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
        }
    }
}
