pub mod add;
pub mod check;
pub mod export;
pub mod info;
pub mod init;
pub mod plan;
pub mod preview;
pub mod validate;

use std::path::Path;
use std::str::FromStr;

use cutline_common::config::AppConfig;
use cutline_timeline_model::{ExportOptions, LoadedProject, ProjectError};

use crate::ExportArgs;

pub(crate) fn load_project(path: &Path) -> anyhow::Result<LoadedProject> {
    LoadedProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

/// Resolve export options per field: command-line flag, then the
/// project's saved options, then the config default.
pub(crate) fn export_options(
    config: &AppConfig,
    saved: Option<&ExportOptions>,
    args: &ExportArgs,
) -> anyhow::Result<ExportOptions> {
    Ok(ExportOptions {
        format: pick(args.format.as_deref(), saved.map(|o| o.format), &config.export.format)?,
        quality: pick(args.quality.as_deref(), saved.map(|o| o.quality), &config.export.quality)?,
        size: pick(args.size.as_deref(), saved.map(|o| o.size), &config.export.size)?,
    })
}

fn pick<T>(flag: Option<&str>, saved: Option<T>, fallback: &str) -> anyhow::Result<T>
where
    T: FromStr<Err = ProjectError>,
{
    match (flag, saved) {
        (Some(flag), _) => Ok(flag.parse()?),
        (None, Some(saved)) => Ok(saved),
        (None, None) => Ok(fallback.parse()?),
    }
}
