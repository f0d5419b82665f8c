//! Binary entrypoint for the photo wall.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use photo_wall::config::Config;
use photo_wall::drive::DriveClient;
use photo_wall::gallery::{Frame, HttpSource, PhotoSource, ProxySource};
use photo_wall::logging;
use photo_wall::platform::PageFullscreen;
use photo_wall::tasks::wall;
use photo_wall::web::{self, WallHandle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "photo-wall", version, about = "Live event photo wall fed by a Google Drive folder")]
struct Cli {
    /// Path to YAML config file; defaults plus GOOGLE_* variables when absent.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the Drive proxy, the wall page, and the wall session.
    Serve,
    /// Serve only the wall page, polling another server's photo listing.
    Wall {
        /// Base URL of the server exposing /api/photos.
        #[arg(long, value_name = "URL")]
        server: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        error!(error = ?err, "photo-wall exited with error");
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_env_overrides();
    config.validate().context("validating configuration")?;
    let addr = config.bind_addr()?;

    info!(command = ?cli.command, %addr, "starting photo-wall");
    let cancel = CancellationToken::new();

    match cli.command {
        Commands::Serve => {
            if config.drive.folder_id().is_none() {
                warn!("no drive folder configured; /api/photos will report a configuration error");
            }
            let drive = Arc::new(config.drive.clone());
            let provider = Arc::new(
                DriveClient::from_config(&drive).context("configuring drive client")?,
            );
            let source = Arc::new(ProxySource::new(Arc::clone(&provider), Arc::clone(&drive)));
            let (handle, session) = start_wall(source, &config, cancel.clone());
            let router = web::api_router(provider, drive).merge(web::wall_router(handle, config.page));
            web::serve(router, addr, cancel.clone()).await?;
            cancel.cancel();
            session.await.context("wall session panicked")??;
        }
        Commands::Wall { server } => {
            let http = reqwest::Client::builder()
                .user_agent(concat!("photo-wall/", env!("CARGO_PKG_VERSION")))
                .timeout(config.gallery.fetch_timeout)
                .build()
                .context("building http client")?;
            info!(%server, "polling remote wall server");
            let source = Arc::new(HttpSource::new(http, server));
            let (handle, session) = start_wall(source, &config, cancel.clone());
            web::serve(web::wall_router(handle, config.page), addr, cancel.clone()).await?;
            cancel.cancel();
            session.await.context("wall session panicked")??;
        }
    }
    Ok(())
}

fn start_wall<S: PhotoSource>(
    source: Arc<S>,
    config: &Config,
    cancel: CancellationToken,
) -> (WallHandle, tokio::task::JoinHandle<Result<()>>) {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (frame_tx, frame_rx) = watch::channel(Frame::default());
    let session = tokio::spawn(wall::run(
        source,
        config.gallery.clone(),
        PageFullscreen::default(),
        command_rx,
        frame_tx,
        cancel,
        StdRng::from_os_rng(),
    ));
    (WallHandle::new(command_tx, frame_rx), session)
}
