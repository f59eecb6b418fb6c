//! Check system capabilities.

use cutline_common::config::AppConfig;
use cutline_render_engine::{FfmpegBackend, TranscoderBackend};

pub fn run(config: &AppConfig, write_config: bool) -> anyhow::Result<()> {
    println!("Cutline System Check");
    println!("{}", "=".repeat(50));

    let binary = &config.export.ffmpeg_binary;
    let backend = FfmpegBackend::new(binary.as_str());
    let ffmpeg_ok = backend.is_available();
    if ffmpeg_ok {
        println!("[OK] Transcoder: {binary}");
    } else {
        println!("[MISSING] Transcoder: {binary} not found in PATH");
        println!("     Install ffmpeg or set export.ffmpeg_binary in the config file.");
    }

    match config.validate() {
        Ok(()) => println!("[OK] Configuration"),
        Err(e) => println!("[INVALID] Configuration: {e}"),
    }
    println!("[OK] Projects directory: {}", config.projects_dir.display());
    println!(
        "[OK] Playback: {} Hz sync, drift tolerance {:.2}s",
        config.playback.tick_hz,
        config.playback.clamped_drift_tolerance()
    );

    if write_config {
        config.save()?;
        println!("[OK] Configuration written");
    }

    println!();
    if ffmpeg_ok {
        println!("All required capabilities are available. Cutline is ready.");
    } else {
        println!("Exports are unavailable until ffmpeg is installed.");
    }

    Ok(())
}
