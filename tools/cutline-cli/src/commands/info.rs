//! Show project information.

use std::path::PathBuf;

use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let p = &project.project;
    let timeline = &p.timeline;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!();

    println!("Timeline: {:.2}s, {} clip(s)", timeline.duration(), timeline.clips().len());
    for track in timeline.tracks() {
        let clips = timeline.clips_on_track(&track.id);
        println!("  {} ({}): {} clip(s)", track.name, track.id, clips.len());
        for clip in clips {
            let mut flags = vec![];
            if clip.trim_start > 0.0 || clip.trim_end > 0.0 {
                flags.push(format!("trim {:.2}/{:.2}", clip.trim_start, clip.trim_end));
            }
            if clip.volume < 1.0 {
                flags.push(format!("vol {:.2}", clip.volume));
            }
            if clip.muted {
                flags.push("muted".to_string());
            }
            println!(
                "    {:<12} {:>8.2}s → {:>8.2}s  {:<5} {}{}",
                clip.id.as_str(),
                clip.start,
                clip.end(),
                clip.kind.as_str(),
                clip.source_ref,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!("  ({})", flags.join(", "))
                }
            );
        }
    }
    println!();

    match &p.export {
        Some(export) => {
            println!("Export options:");
            println!("  Format: {}", export.format);
            println!("  Quality: {}", export.quality);
            let (w, h) = export.size.dimensions();
            println!("  Size: {} ({w}x{h})", export.size);
        }
        None => println!("Export options: configured defaults"),
    }

    Ok(())
}
