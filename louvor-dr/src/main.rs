//! louvor-dr (Data Review) - Read-only collection inspection tool
//!
//! Command-line companion to louvor-rd for checking what the document
//! store actually holds: collection listing, full dumps, and filtered
//! finds. All database access is read-only.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use louvor_common::config::{RootFolderInitializer, RootFolderResolver};
use louvor_common::db::StorageBackend;
use louvor_common::events::EventBus;
use louvor_common::DocumentStore;
use louvor_dr::filters;
use tracing::debug;

mod db;

/// Command-line arguments for louvor-dr
#[derive(Parser, Debug)]
#[command(name = "louvor-dr")]
#[command(about = "Read-only inspection of Louvor collections")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "LOUVOR_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored collections with record counts
    Collections,
    /// Print every record of a collection as pretty JSON
    Dump {
        /// Collection name, e.g. usuarios or musicas
        collection: String,
    },
    /// Print the records matching all given conditions
    Find {
        /// Collection name, e.g. usuarios or musicas
        collection: String,
        /// Equality condition CAMPO=VALOR; repeatable
        #[arg(short = 'w', long = "where", value_name = "CAMPO=VALOR")]
        conditions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr at warn level so stdout stays clean for piping;
    // RUST_LOG overrides when more detail is wanted
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    debug!(
        "louvor-dr v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let resolver = RootFolderResolver::new("data-review");
    let root_folder = match args.root_folder {
        Some(path) => path,
        None => resolver.resolve(),
    };
    let db_path = RootFolderInitializer::new(root_folder).database_path();
    debug!("Database path: {}", db_path.display());

    let pool = db::connect_readonly(&db_path).await?;
    let backend = StorageBackend::Sqlite(pool);
    let store = DocumentStore::new(backend.clone(), EventBus::new(16));

    match args.command {
        Command::Collections => {
            let keys = backend.keys().await?;
            if keys.is_empty() {
                println!("(no collections)");
                return Ok(());
            }
            for key in keys {
                let count = store.get_all(&key).await.len();
                println!("{:<16} {:>6}", key, count);
            }
        }
        Command::Dump { collection } => {
            let records = store.get_all(&collection).await;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Find {
            collection,
            conditions,
        } => {
            let conditions = filters::parse_conditions(&conditions)?;
            let records = store.find_records(&collection, &conditions).await;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}
