use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use reelcast::{
    AudioDestination, ContainerFormat, EngineConfig, FfmpegCapabilities, PlaybackState, Resolution,
    Storyboard, Studio, TracingPresenter, TransitionKind,
};

#[derive(Parser, Debug)]
#[command(name = "reelcast", version)]
struct Cli {
    /// Log at debug level.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a storyboard to MP4 or WebM (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Play a storyboard's narration and log scene switches.
    Preview(PreviewArgs),
    /// List the container formats the local `ffmpeg` can produce.
    Formats,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Engine config JSON. `REELCAST_*` environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input storyboard JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory the timestamped recording is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, value_enum)]
    resolution: Option<Resolution>,

    #[arg(long, value_enum)]
    format: Option<ContainerFormat>,

    #[arg(long, value_enum)]
    transition: Option<TransitionKind>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input storyboard JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Export(args) => cmd_export(args).await,
        Command::Preview(args) => cmd_preview(args).await,
        Command::Formats => cmd_formats(),
    }
}

fn load_config(args: &ConfigArgs) -> anyhow::Result<EngineConfig> {
    let cfg = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    Ok(cfg.with_env_overrides()?)
}

async fn open_studio<D: AudioDestination>(
    cfg: EngineConfig,
    destination: D,
    in_path: &Path,
) -> anyhow::Result<Studio<D>> {
    let storyboard = Storyboard::from_path(in_path)
        .with_context(|| format!("load storyboard '{}'", in_path.display()))?;
    let probe = FfmpegCapabilities::probe().unwrap_or_default();
    let mut studio =
        Studio::open(cfg, destination, Box::new(TracingPresenter), Box::new(probe)).await?;
    studio.load_storyboard(storyboard).await?;
    Ok(studio)
}

async fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.config)?;
    let mut studio = open_studio(cfg, reelcast::SilentDestination::new(), &args.in_path).await?;
    if let Some(resolution) = args.resolution {
        studio.set_resolution(resolution);
    }
    if let Some(format) = args.format {
        studio.set_format(format);
    }
    if let Some(kind) = args.transition {
        studio.set_transition(kind);
    }

    let artifact = match studio
        .export(|pct| tracing::info!(progress = pct, "exporting"))
        .await
    {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %e, "export failed");
            anyhow::bail!(e.user_message());
        }
    };

    let path = artifact.save_to_dir(&args.out_dir)?;
    println!("{}", path.display());
    Ok(())
}

async fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.config)?;

    #[cfg(feature = "speaker")]
    let destination = reelcast::SpeakerDestination::open_default()?;
    #[cfg(not(feature = "speaker"))]
    let destination = reelcast::SilentDestination::new();

    let mut studio = open_studio(cfg, destination, &args.in_path).await?;
    let mut status = studio.playback().subscribe();
    studio.play()?;

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() || status.borrow().state == PlaybackState::Idle {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                studio.stop();
                break;
            }
        }
    }
    Ok(())
}

fn cmd_formats() -> anyhow::Result<()> {
    let caps = FfmpegCapabilities::probe()?;
    for format in ContainerFormat::PREFERENCE {
        match caps.missing(format) {
            None => println!("{format}\tavailable"),
            Some(why) => println!("{format}\tunavailable (missing {why})"),
        }
    }
    Ok(())
}
