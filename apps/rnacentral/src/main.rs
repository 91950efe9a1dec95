//! # RNAcentral
//!
//! Portal binary: REST server and batch commands.
//!
//! ```text
//! rnacentral init --db rnacentral.redb
//! rnacentral load --db rnacentral.redb dataset.json
//! rnacentral serve --db rnacentral.redb --bind 0.0.0.0:8000
//! rnacentral export-fasta --db rnacentral.redb ./ftp
//! ```

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rnacentral::api::{AppState, create_router};
use rnacentral::cli;
use rnacentral::config::{ENV_DB, ServeOptions};
use rnacentral::jobs::{JobQueue, NhmmerBackend};
use rnacentral_core::RedbStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Pending searches the queue accepts before rejecting submissions.
const QUEUE_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(name = "rnacentral", version, about = "RNAcentral portal server and batch commands")]
struct Cli {
    /// Catalogue file.
    #[arg(long, global = true, env = ENV_DB, default_value = "rnacentral.redb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty catalogue.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Import a JSON dataset.
    Load { dataset: PathBuf },
    /// Show catalogue statistics.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Run the HTTP server and search workers.
    Serve(ServeOptions),
    /// Write the FASTA release files.
    ExportFasta {
        destination: PathBuf,
        /// Only a few entries per file.
        #[arg(long)]
        test: bool,
    },
    /// Write the EBeye XML dump.
    ExportXml {
        output: PathBuf,
        #[arg(long)]
        release: String,
        /// Release date, YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
        /// Stop after this many sequences.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Write external id to UPI mappings of one expert database.
    ExportMapping {
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        filename: Option<PathBuf>,
    },
    /// Replace genome coordinates from computed mappings.
    ImportGenomeMappings {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Add RNAcentral ids to an MGI export.
    MapMgi { input: PathBuf, output: PathBuf },
    /// Refresh Ensembl assemblies from a snapshot.
    UpdateEnsembl { snapshot: PathBuf },
}

#[derive(Debug, thiserror::Error)]
enum ServeError {
    #[error(transparent)]
    Config(#[from] rnacentral::config::ConfigError),
    #[error(transparent)]
    Store(#[from] rnacentral_core::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

async fn serve(db: PathBuf, options: ServeOptions) -> Result<(), ServeError> {
    let config = options.into_config(db)?;

    let store = RedbStore::open(&config.db_path)?;
    let backend = NhmmerBackend {
        binary: config.nhmmer_bin.clone(),
        database: config.nhmmer_db.clone(),
        work_dir: config.work_dir.clone(),
    };
    let jobs = JobQueue::start(
        Arc::new(backend),
        config.search_workers,
        QUEUE_CAPACITY,
        config.job_ttl,
    );
    let state = AppState::new(Arc::new(store), jobs, config.base_url.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(
        bind = %config.bind,
        db = %config.db_path.display(),
        workers = config.search_workers,
        "RNAcentral server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db = cli.db;
    match cli.command {
        Command::Init { force } => cli::cmd_init(&db, force)?,
        Command::Load { dataset } => cli::cmd_load(&db, &dataset)?,
        Command::Status { json } => cli::cmd_status(&db, json)?,
        Command::Serve(options) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve(db, options))?;
        }
        Command::ExportFasta { destination, test } => {
            cli::cmd_export_fasta(&db, &destination, test)?;
        }
        Command::ExportXml {
            output,
            release,
            date,
            limit,
        } => cli::cmd_export_xml(&db, &output, &release, date, limit)?,
        Command::ExportMapping { database, filename } => {
            cli::cmd_export_mapping(&db, database.as_deref(), filename.as_deref())?;
        }
        Command::ImportGenomeMappings { input } => {
            cli::cmd_import_genome_mappings(&db, input.as_deref())?;
        }
        Command::MapMgi { input, output } => cli::cmd_map_mgi(&db, &input, &output)?,
        Command::UpdateEnsembl { snapshot } => cli::cmd_update_ensembl(&db, &snapshot)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
