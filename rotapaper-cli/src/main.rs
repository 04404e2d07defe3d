use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use rotapaper_core::config::Config;
use rotapaper_core::error::RotapaperError;
use rotapaper_core::locator::ChannelLocator;
use rotapaper_core::monitor;
use rotapaper_core::paths::RotapaperPaths;
use rotapaper_core::protocol::ProtocolClient;
use rotapaper_core::rotation::{CatalogSource, RotationController, RotationState};
use rotapaper_core::scheduler;

#[derive(Parser)]
#[command(name = "rotapaper", version, about = "Random wallpaper rotation for hyprpaper")]
struct Cli {
    /// Directories containing the images
    #[arg(value_name = "DIRECTORIES")]
    directories: Vec<PathBuf>,

    /// Monitor to update (repeatable); defaults to every connected monitor
    #[arg(short, long = "monitor")]
    monitors: Vec<String>,

    /// Additional image file types (repeatable or comma separated)
    #[arg(short = 'f', long = "file-types", value_delimiter = ',')]
    file_types: Vec<String>,

    /// Collect images from subdirectories too
    #[arg(short, long)]
    recursive: bool,

    /// Keep wallpapers loaded in memory after switching
    #[arg(short, long = "keep-wallpapers-loaded")]
    keep_loaded: bool,

    /// Show the same wallpaper on every monitor
    #[arg(short, long)]
    consistent: bool,

    /// Rescan the directories before every rotation
    #[arg(long)]
    rescan: bool,

    /// Rotate every N seconds (minimum 10) instead of once
    #[arg(short = 't', long = "interval", value_name = "SECONDS")]
    interval: Option<u64>,

    /// Path to the hyprpaper socket
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        let rotation = &mut config.rotation;
        if !self.directories.is_empty() {
            rotation.directories = self.directories;
        }
        if !self.monitors.is_empty() {
            rotation.monitors = self.monitors;
        }
        if !self.file_types.is_empty() {
            rotation.extensions = self.file_types;
        }
        rotation.recursive |= self.recursive;
        rotation.keep_loaded |= self.keep_loaded;
        rotation.consistent |= self.consistent;
        rotation.rescan |= self.rescan;
        if self.interval.is_some() {
            rotation.interval = self.interval;
        }
        if self.socket.is_some() {
            config.daemon.socket = self.socket;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "rotapaper=debug,rotapaper_core=debug"
    } else {
        "rotapaper=info,rotapaper_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default(&RotapaperPaths::new()?)?,
    };
    cli.apply(&mut config);
    config.validate()?;

    let socket = ChannelLocator::from_env().locate(config.daemon.socket.as_deref())?;
    info!(path = %socket.display(), "using hyprpaper socket");

    let rotation = &config.rotation;
    let source = CatalogSource::new(rotation.expanded_directories(), &rotation.extensions);
    let catalog = source.scan(rotation.recursive)?;

    let monitors = if rotation.monitors.is_empty() {
        monitor::detect_monitors().await?
    } else {
        rotation.monitors.clone()
    };

    let state = RotationState::new(catalog, source, rotation.options());
    let mut controller =
        RotationController::new(ProtocolClient::connect_to(socket), state, monitors)?;

    let Some(period) = rotation.period() else {
        controller.cycle().await?;
        return Ok(());
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("received signal, finishing current rotation");
        let _ = shutdown_tx.send(true);
    });

    scheduler::run_periodic(period, &mut controller, shutdown_rx, true).await?;
    info!("rotapaper stopped");
    Ok(())
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RotapaperError>() {
        Some(
            RotapaperError::Config(_) | RotapaperError::InvalidPeriod(_) | RotapaperError::Toml(_),
        ) => 2,
        Some(RotapaperError::EmptyCatalog) => 3,
        Some(RotapaperError::Protocol { .. }) => 4,
        Some(RotapaperError::Compositor(_) | RotapaperError::Json(_)) => 33,
        Some(RotapaperError::DaemonUnavailable(_)) => 34,
        Some(RotapaperError::CompositorMissing) => 127,
        Some(RotapaperError::Io(_)) | None => 1,
    }
}
