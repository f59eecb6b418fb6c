//! Initialize a new Cutline project.

use std::path::PathBuf;

use cutline_timeline_model::LoadedProject;

pub fn run(name: String, output: PathBuf) -> anyhow::Result<()> {
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let project = LoadedProject::create(&project_dir, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!("  Tracks:");
    for track in project.project.timeline.tracks() {
        let accepts: Vec<&str> = track.accepts.iter().map(|k| k.as_str()).collect();
        println!("    {:<10} {:<12} [{}]", track.id.as_str(), track.name, accepts.join(", "));
    }
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── sources/     (media files referenced by clips)");
    println!("  ├── meta/        (project.json)");
    println!("  ├── cache/       (export scratch space)");
    println!("  └── exports/     (rendered output)");

    Ok(())
}
