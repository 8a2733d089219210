//! louvor-rd (Repertoire Director) - Song sharing daemon
//!
//! Long-running service that watches the song library and promotes songs
//! into the shared repertoire once their waiting period has passed. Also
//! subscribes to the event bus and logs store activity for operational
//! visibility.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use louvor_common::collections::musicas::{self, DEFAULT_SHARE_DELAY_DAYS};
use louvor_common::config::{RootFolderInitializer, RootFolderResolver};
use louvor_common::db::{init_database, StorageBackend};
use louvor_common::events::{EventBus, LouvorEvent};
use louvor_common::DocumentStore;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Command-line arguments for louvor-rd
#[derive(Parser, Debug)]
#[command(name = "louvor-rd")]
#[command(about = "Repertoire director daemon for Louvor")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "LOUVOR_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Seconds between sharing sweeps (minimum 1)
    #[arg(
        short,
        long,
        default_value = "3600",
        env = "LOUVOR_RD_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    // Log build identification immediately, before any database delays
    info!(
        "Starting Louvor Repertoire Director (louvor-rd) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Resolve the root folder: CLI flag first, then env / config / default
    let resolver = RootFolderResolver::new("repertoire-director");
    let root_folder = match args.root_folder {
        Some(path) => path,
        None => resolver.resolve(),
    };
    info!("Root folder: {}", root_folder.display());

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    let pool = init_database(&db_path).await?;
    info!("✓ Database ready: {}", db_path.display());

    // The delay is applied when songs are added; the sweep only acts on
    // the dates already stamped on each record. Logged here so operators
    // can see the configured value at a glance.
    let share_delay_days = resolver
        .toml_config()
        .and_then(|config| config.share_delay_days)
        .unwrap_or(DEFAULT_SHARE_DELAY_DAYS);
    info!(
        "Songs enter the shared repertoire {} days after being added",
        share_delay_days
    );

    let events = EventBus::new(256);
    let store = DocumentStore::new(StorageBackend::Sqlite(pool), events.clone());
    info!("✓ Document store ready");

    spawn_event_logger(&events);

    run_sweep_loop(store, args.interval_secs).await;

    info!("Shutdown complete");
    Ok(())
}

/// Log every bus event so store activity shows up in the daemon's output
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(LouvorEvent::CollectionChanged { collection, .. }) => {
                    debug!("Collection '{}' changed", collection);
                }
                Ok(LouvorEvent::MemberJoined {
                    ministerio_id,
                    usuario_id,
                    ..
                }) => {
                    info!("User {} joined ministry {}", usuario_id, ministerio_id);
                }
                Ok(LouvorEvent::SongShared {
                    musica_id,
                    ministerio_id,
                    ..
                }) => {
                    info!(
                        "Song {} from ministry {} entered the shared repertoire",
                        musica_id, ministerio_id
                    );
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Event logger lagged, {} events dropped", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Run the sharing sweep on a fixed interval until shutdown
///
/// The first tick fires immediately, so due songs are promoted at startup
/// rather than waiting a full interval.
async fn run_sweep_loop(store: DocumentStore, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    info!("Sharing sweep every {}s", interval_secs);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let today = chrono::Local::now().date_naive();
                let promoted = musicas::promote_due_songs(&store, today).await;
                if promoted > 0 {
                    info!("Sharing sweep promoted {} song(s)", promoted);
                } else {
                    debug!("Sharing sweep found nothing due");
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
