//! # CLI Commands
//!
//! One `cmd_*` function per subcommand. Each opens the redb catalogue,
//! does its work synchronously and prints a short report.

use chrono::NaiveDate;
use rnacentral_core::ensembl::{load_snapshot, summary_line, update_assemblies};
use rnacentral_core::formats::{FastaExporter, MappingExporter, XmlDumpWriter};
use rnacentral_core::genome::{import_mappings, load_mappings};
use rnacentral_core::mgi::MgiMapper;
use rnacentral_core::{Dataset, RedbStore};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Failure of a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(&'static str),

    #[error("database already exists at {0} (use --force to overwrite)")]
    AlreadyExists(String),

    #[error("database not found at {0} (run `rnacentral init` first)")]
    MissingDatabase(String),

    #[error(transparent)]
    Core(#[from] rnacentral_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T = ()> = Result<T, CliError>;

fn open_store(db: &Path) -> CliResult<RedbStore> {
    if !db.exists() {
        return Err(CliError::MissingDatabase(db.display().to_string()));
    }
    Ok(RedbStore::open(db)?)
}

// =============================================================================
// CATALOGUE
// =============================================================================

/// Create an empty catalogue.
pub fn cmd_init(db: &Path, force: bool) -> CliResult {
    if db.exists() {
        if !force {
            return Err(CliError::AlreadyExists(db.display().to_string()));
        }
        std::fs::remove_file(db)?;
    }
    RedbStore::create(db)?;
    println!("Initialized catalogue at {}", db.display());
    Ok(())
}

/// Import a JSON dataset into the catalogue.
pub fn cmd_load(db: &Path, dataset: &Path) -> CliResult {
    let store = open_store(db)?;
    let data = Dataset::from_json_file(dataset)?;
    let stats = store.import_dataset(&data)?;
    info!(sequences = stats.sequences, xrefs = stats.xrefs, "Dataset loaded");
    println!(
        "Loaded {} sequences, {} accessions, {} xrefs",
        stats.sequences, stats.accessions, stats.xrefs
    );
    Ok(())
}

/// Print table sizes.
pub fn cmd_status(db: &Path, json: bool) -> CliResult {
    let stats = open_store(db)?.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Catalogue: {}", db.display());
        println!("  Sequences:  {}", stats.sequences);
        println!("  Accessions: {}", stats.accessions);
        println!("  Xrefs:      {}", stats.xrefs);
        println!("  Databases:  {}", stats.databases);
        println!("  Releases:   {}", stats.releases);
        println!("  Citations:  {}", stats.citations);
    }
    Ok(())
}

// =============================================================================
// EXPORTS
// =============================================================================

/// Write the FASTA release files into `destination`.
///
/// `test` limits every file to a handful of entries.
pub fn cmd_export_fasta(db: &Path, destination: &Path, test: bool) -> CliResult {
    let store = open_store(db)?;
    let mut exporter = FastaExporter::new(destination);
    if test {
        exporter = exporter.with_test_entries(10);
    }
    let summary = exporter.export(&store)?;
    println!(
        "Exported {} active and {} inactive sequences to {}",
        summary.active,
        summary.inactive,
        exporter.subdirectory().display()
    );
    Ok(())
}

/// Write the EBeye XML dump.
pub fn cmd_export_xml(
    db: &Path,
    output: &Path,
    release: &str,
    date: NaiveDate,
    limit: Option<usize>,
) -> CliResult {
    let store = open_store(db)?;
    let mut writer = XmlDumpWriter::new(release, date);
    if let Some(limit) = limit {
        writer = writer.with_limit(limit);
    }
    let mut out = BufWriter::new(File::create(output)?);
    let entries = writer.write(&store, &mut out)?;
    out.flush()?;
    println!("Wrote {entries} entries to {}", output.display());
    Ok(())
}

/// Write the `external id -> UPI` mapping of one expert database.
pub fn cmd_export_mapping(
    db: &Path,
    database: Option<&str>,
    filename: Option<&Path>,
) -> CliResult {
    let database = database
        .filter(|d| !d.is_empty())
        .ok_or(CliError::Usage("Must specify database to use"))?;
    let filename = filename.ok_or(CliError::Usage("Must specify an output filename"))?;

    let store = open_store(db)?;
    let mut out = BufWriter::new(File::create(filename)?);
    let rows = MappingExporter::new(database).export(&store, &mut out)?;
    out.flush()?;
    println!("Wrote {rows} {database} mappings to {}", filename.display());
    Ok(())
}

// =============================================================================
// IMPORTS
// =============================================================================

/// Replace genome coordinates from a JSON file of computed mappings.
pub fn cmd_import_genome_mappings(db: &Path, input: Option<&Path>) -> CliResult {
    let input = input.ok_or(CliError::Usage("Please specify input file"))?;
    let mappings = load_mappings(input)?;
    let mut store = open_store(db)?;
    let summary = import_mappings(&mut store, &mappings)?;
    println!(
        "Imported {} mappings covering {} accessions",
        summary.mappings, summary.accessions
    );
    Ok(())
}

/// Add RNAcentral ids to MGI entries.
pub fn cmd_map_mgi(db: &Path, input: &Path, output: &Path) -> CliResult {
    let store = open_store(db)?;
    let raw = std::fs::read_to_string(input)?;
    let entries: Vec<Value> = serde_json::from_str(&raw)?;

    let mapper = MgiMapper::new(&store)?;
    let (mapped, counts) = mapper.map_entries(&entries);

    let mut out = BufWriter::new(File::create(output)?);
    serde_json::to_writer_pretty(&mut out, &mapped)?;
    out.flush()?;
    println!("{counts}");
    Ok(())
}

/// Refresh Ensembl assemblies from a snapshot file.
pub fn cmd_update_ensembl(db: &Path, snapshot: &Path) -> CliResult {
    let databases = load_snapshot(snapshot)?;
    let mut store = open_store(db)?;
    for assembly in update_assemblies(&mut store, &databases)? {
        println!("{}", summary_line(&assembly));
    }
    Ok(())
}
