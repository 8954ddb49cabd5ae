use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use station_playlist_sync as lib;
use lib::api::auth::{StaticToken, TokenSource};
use lib::api::spotify::SpotifyClient;
use lib::config::Config;
use lib::engine::SyncEngine;
use lib::station::{NowPlayingSource, StationClient};
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "station-playlist-sync", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize, then keep the managed playlist in sync until Ctrl-C
    Run,
    /// Fetch the station's now-playing feed once and print it
    NowPlaying,
    /// Authorize and resolve the managed playlist, then exit
    Resolve,
    /// Validate config file and exit
    ConfigValidate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(p) => format!("loading config from {}", p.display()),
        None => "loading config".to_string(),
    })?;

    let _guard = init_logging(&cfg)?;

    match cli.command {
        Commands::ConfigValidate => match cfg.validate() {
            Ok(()) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        },
        Commands::NowPlaying => {
            let station = StationClient::from_config(&cfg)?;
            let np = station
                .fetch_now_playing()
                .await
                .with_context(|| format!("fetching {}", station.url()))?;
            println!("{}", serde_json::to_string_pretty(&np)?);
        }
        Commands::Resolve => {
            cfg.validate()?;
            let service = spotify_client(&cfg).await?;
            let (session, index) = lib::session::start_session(&service)
                .await
                .context("starting session")?;
            println!("user:     {}", session.user_id);
            println!("playlist: {} (owner {})", session.playlist.id, session.playlist.owner_id);
            println!("tracks:   {}", index.len());
        }
        Commands::Run => {
            cfg.validate()?;
            let service = Arc::new(spotify_client(&cfg).await?);
            let (session, index) = lib::session::start_session(service.as_ref())
                .await
                .context("starting session")?;
            let station: Arc<dyn NowPlayingSource> = Arc::new(StationClient::from_config(&cfg)?);

            let handle = SyncEngine::new(session, index, station, service).spawn();
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            tracing::info!("Shutdown requested");
            let stats = handle.stop().await.context("joining sync loop")?;
            println!(
                "Stopped after {} ticks: {} added, {} already present, {} not on Spotify, {} fetch failures, {} append failures",
                stats.ticks,
                stats.appended,
                stats.already_present,
                stats.unresolvable,
                stats.fetch_failures,
                stats.append_failures
            );
        }
    }

    Ok(())
}

/// Build the Spotify client, authorizing interactively unless a pre-issued
/// access token is configured.
async fn spotify_client(cfg: &Config) -> Result<SpotifyClient> {
    let tokens: Arc<dyn TokenSource> = match &cfg.access_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(
            lib::api::spotify_auth::authorize_interactive(cfg)
                .await
                .context("authorizing with Spotify")?,
        ),
    };
    Ok(SpotifyClient::from_config(cfg, tokens)?)
}

/// Initialize log->tracing bridge and structured logging.
/// Logs go to stdout and, when `log_dir` is set, to a daily-rotated file there.
fn init_logging(cfg: &Config) -> Result<Option<WorkerGuard>> {
    let _ = LogTracer::init();

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "station-playlist-sync.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().with_ansi(false).with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    // LogTracer is already installed, so set the subscriber directly rather
    // than through tracing-subscriber's init() which would install it again.
    tracing_subscriber_global::set_global_default(subscriber)
        .context("setting global tracing subscriber")?;
    Ok(guard)
}
