// blobcell - stream files into and out of SQLite BLOB cells
// Entry point and command dispatch

use anyhow::{Context, Result};
use blobcell::config::DEFAULT_CHUNK_SIZE;
use blobcell::database::create_pool;
use blobcell::services::FileTransferService;
use blobcell::Locator;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "blobcell")]
#[command(about = "Chunked BLOB streaming for SQLite cells", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, env = "BLOBCELL_DB")]
    db: PathBuf,

    /// Bytes moved per read/write call
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file in a new row
    Put {
        table: String,
        column: String,
        file: PathBuf,
    },

    /// Write a cell's content to a file
    Get {
        table: String,
        column: String,
        row: i64,
        file: PathBuf,
    },

    /// Print a cell's size in bytes
    Size {
        table: String,
        column: String,
        row: i64,
    },

    /// Print the SHA-256 of a cell's content
    Sha256 {
        table: String,
        column: String,
        row: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blobcell=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let pool = create_pool(&cli.db)
        .await
        .with_context(|| format!("failed to open database {:?}", cli.db))?;
    let service = FileTransferService::new(pool).with_chunk_size(cli.chunk_size);

    match cli.command {
        Commands::Put { table, column, file } => {
            let (locator, summary) = service.import_file(&table, &column, &file).await?;
            println!("{}\t{}\t{}", locator.row_id, summary.bytes, summary.sha256);
        }
        Commands::Get {
            table,
            column,
            row,
            file,
        } => {
            let locator = Locator::new(table, column, row);
            match service.export_file(&locator, &file).await? {
                Some(summary) => println!("{}\t{}", summary.bytes, summary.sha256),
                None => anyhow::bail!("no blob at {}", locator),
            }
        }
        Commands::Size { table, column, row } => {
            let locator = Locator::new(table, column, row);
            println!("{}", service.size(&locator).await?.unwrap_or(0));
        }
        Commands::Sha256 { table, column, row } => {
            let locator = Locator::new(table, column, row);
            match service.checksum(&locator).await? {
                Some(sha256) => println!("{}", sha256),
                None => anyhow::bail!("no blob at {}", locator),
            }
        }
    }

    Ok(())
}
