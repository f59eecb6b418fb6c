//! Cutline CLI: command-line interface for timeline projects.
//!
//! Usage:
//!   cutline init <NAME>          Create a new project
//!   cutline info <PATH>          Show project information
//!   cutline validate <PATH>      Validate a project and its sources
//!   cutline add <PATH> ...       Place a clip on the timeline
//!   cutline preview <PATH> --at  Show what plays at a given time
//!   cutline plan <PATH>          Print the render plan
//!   cutline export <PATH>        Export a project to a video file
//!   cutline check                Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use cutline_common::config::AppConfig;
use cutline_timeline_model::ClipKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "cutline",
    about = "Multi-track timeline editing and export",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Video,
    Audio,
    Image,
}

impl From<KindArg> for ClipKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Video => ClipKind::Video,
            KindArg::Audio => ClipKind::Audio,
            KindArg::Image => ClipKind::Image,
        }
    }
}

/// Export option overrides shared by `plan` and `export`.
#[derive(clap::Args)]
struct ExportArgs {
    /// Output format: mp4|webm|gif
    #[arg(long)]
    format: Option<String>,

    /// Quality: draft|standard|high
    #[arg(long)]
    quality: Option<String>,

    /// Frame size: 480p|720p|1080p
    #[arg(long)]
    size: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Parent directory (defaults to the configured projects directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Validate a project and its source media
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Place a clip on the timeline
    Add {
        /// Path to the project directory
        path: PathBuf,

        /// Media kind
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Source reference (relative paths resolve under sources/)
        #[arg(long)]
        source: String,

        /// Destination track (defaults to the video lane or the first audio lane)
        #[arg(long)]
        track: Option<String>,

        /// Desired start in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// Length on the timeline in seconds
        #[arg(long)]
        duration: f64,

        /// Seconds trimmed from the front
        #[arg(long, default_value = "0")]
        trim_start: f64,

        /// Seconds trimmed from the back
        #[arg(long, default_value = "0")]
        trim_end: f64,

        /// Clip gain [0.0, 1.0]
        #[arg(long, default_value = "1")]
        volume: f64,

        /// Fail on collision instead of relocating the clip
        #[arg(long)]
        strict: bool,
    },

    /// Show which clips are live at a given time
    Preview {
        /// Path to the project directory
        path: PathBuf,

        /// Timeline position in seconds
        #[arg(long)]
        at: f64,

        /// Global volume [0.0, 1.0]
        #[arg(long)]
        volume: Option<f64>,

        /// Mute all audio
        #[arg(long)]
        muted: bool,
    },

    /// Print the render plan without running it
    Plan {
        /// Path to the project directory
        path: PathBuf,

        #[command(flatten)]
        export: ExportArgs,

        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a project to a video file (Ctrl-C cancels)
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Check system capabilities
    Check {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    cutline_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Init { name, output } => {
            commands::init::run(name, output.unwrap_or_else(|| config.projects_dir.clone()))
        }
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Add {
            path,
            kind,
            source,
            track,
            start,
            duration,
            trim_start,
            trim_end,
            volume,
            strict,
        } => commands::add::run(
            &config,
            commands::add::AddRequest {
                path,
                kind: kind.into(),
                source,
                track,
                start,
                duration,
                trim_start,
                trim_end,
                volume,
                strict,
            },
        ),
        Commands::Preview {
            path,
            at,
            volume,
            muted,
        } => commands::preview::run(&config, path, at, volume, muted),
        Commands::Plan { path, export, json } => commands::plan::run(&config, path, &export, json),
        Commands::Export {
            path,
            output,
            export,
        } => commands::export::run(&config, path, output, &export).await,
        Commands::Check { write_config } => commands::check::run(&config, write_config),
    }
}
