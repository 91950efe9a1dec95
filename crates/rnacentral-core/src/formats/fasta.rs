//! FASTA formatting and the FTP sequence export.

use regex::Regex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

use crate::storage::SequenceStore;
use crate::{Result, Rna};

/// Residues per sequence line.
pub const LINE_WIDTH: usize = 80;

/// Number of active sequences copied into `example.txt`.
pub const EXAMPLE_ENTRIES: usize = 10;

static IUPAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ABCDGHKMNRSTVWXYU]+$").expect("valid IUPAC pattern")
});

/// Format one FASTA record: `>header`, then the sequence wrapped at
/// [`LINE_WIDTH`] columns. Every line ends with a newline.
#[must_use]
pub fn format_fasta(header: &str, sequence: &str) -> String {
    let capacity = header.len() + sequence.len() + sequence.len() / LINE_WIDTH + 3;
    let mut out = String::with_capacity(capacity);
    out.push('>');
    out.push_str(header);
    out.push('\n');
    out.push_str(&wrap_sequence(sequence));
    out
}

/// Wrap a sequence at [`LINE_WIDTH`] columns.
#[must_use]
pub fn wrap_sequence(sequence: &str) -> String {
    let mut out = String::with_capacity(sequence.len() + sequence.len() / LINE_WIDTH + 1);
    let bytes = sequence.as_bytes();
    for chunk in bytes.chunks(LINE_WIDTH) {
        // sequences are ASCII; fall back to lossy for anything else
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out
}

/// Whether a sequence uses only IUPAC nucleotide codes and can go into
/// the nhmmer search database.
#[must_use]
pub fn is_iupac(sequence: &str) -> bool {
    IUPAC.is_match(sequence)
}

// =============================================================================
// EXPORTER
// =============================================================================

const README: &str = "\
===================================================================
RNAcentral Sequence Data
===================================================================

This directory contains sequences with RNAcentral ids in FASTA format.

* rnacentral_active.fasta.gz
Current set of sequences that are present in at least one expert database.

* rnacentral_inactive.fasta.gz
All RNAcentral sequences that used to be present in one or more expert database
but don't have any current cross-references.

* rnacentral_species_specific_ids.fasta.gz
Active sequences with species-specific identifiers (URS_taxid) and descriptions.

* rnacentral_nhmmer.fasta.gz
Active sequences made only of IUPAC nucleotide codes, used by the sequence search.

* example.txt
A small example file showing the format of rnacentral_active.fasta.gz
and rnacentral_inactive.fasta.gz.
";

/// Counts of records written by [`FastaExporter::export`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastaSummary {
    pub active: usize,
    pub inactive: usize,
    pub nhmmer: usize,
    pub nhmmer_excluded: usize,
    pub species_specific: usize,
}

/// Output files of the sequence export.
struct FastaFiles {
    active: BufWriter<File>,
    inactive: BufWriter<File>,
    nhmmer: BufWriter<File>,
    nhmmer_excluded: BufWriter<File>,
    species_specific: BufWriter<File>,
    example: BufWriter<File>,
}

impl FastaFiles {
    fn create(dir: &Path) -> Result<Self> {
        let open = |name: &str| -> Result<BufWriter<File>> {
            Ok(BufWriter::new(File::create(dir.join(name))?))
        };
        Ok(Self {
            active: open("rnacentral_active.fasta")?,
            inactive: open("rnacentral_inactive.fasta")?,
            nhmmer: open("rnacentral_nhmmer.fasta")?,
            nhmmer_excluded: open("rnacentral_nhmmer_excluded.fasta")?,
            species_specific: open("rnacentral_species_specific_ids.fasta")?,
            example: open("example.txt")?,
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.active.flush()?;
        self.inactive.flush()?;
        self.nhmmer.flush()?;
        self.nhmmer_excluded.flush()?;
        self.species_specific.flush()?;
        self.example.flush()?;
        Ok(())
    }
}

/// Export RNAcentral sequences in FASTA format for the FTP archive.
#[derive(Debug, Clone)]
pub struct FastaExporter {
    destination: PathBuf,
    test_entries: Option<usize>,
    examples: usize,
}

impl FastaExporter {
    /// Exporter writing into `<destination>/sequences`.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            test_entries: None,
            examples: EXAMPLE_ENTRIES,
        }
    }

    /// Stop after `entries` sequences per file.
    #[must_use]
    pub fn with_test_entries(mut self, entries: usize) -> Self {
        self.test_entries = Some(entries);
        self
    }

    /// Directory the files are written to.
    #[must_use]
    pub fn subdirectory(&self) -> PathBuf {
        self.destination.join("sequences")
    }

    /// Write all FASTA files and the readme.
    pub fn export(&self, store: &dyn SequenceStore) -> Result<FastaSummary> {
        let dir = self.subdirectory();
        info!("Exporting fasta to {}", dir.display());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("readme.txt"), README)?;

        let mut files = FastaFiles::create(&dir)?;
        let mut summary = FastaSummary::default();
        let limit = self.test_entries.unwrap_or(usize::MAX);

        for rna in store.rnas()? {
            let xrefs = store.xrefs(&rna.upi)?;
            if xrefs.is_empty() {
                continue;
            }
            if xrefs.iter().any(|x| x.is_active()) {
                if summary.active < limit {
                    self.write_active(store, &rna, &mut files, &mut summary)?;
                }
            } else if summary.inactive < limit {
                files.inactive.write_all(rna.fasta().as_bytes())?;
                summary.inactive += 1;
            }
        }

        files.flush()?;
        info!(
            active = summary.active,
            inactive = summary.inactive,
            "Fasta export complete"
        );
        Ok(summary)
    }

    fn write_active(
        &self,
        store: &dyn SequenceStore,
        rna: &Rna,
        files: &mut FastaFiles,
        summary: &mut FastaSummary,
    ) -> Result<()> {
        let fasta = rna.fasta();
        files.active.write_all(fasta.as_bytes())?;
        if summary.active < self.examples {
            files.example.write_all(fasta.as_bytes())?;
        }
        if is_iupac(rna.sequence()) {
            files.nhmmer.write_all(fasta.as_bytes())?;
            summary.nhmmer += 1;
        } else {
            files.nhmmer_excluded.write_all(fasta.as_bytes())?;
            summary.nhmmer_excluded += 1;
        }

        let wrapped = wrap_sequence(rna.sequence());
        for taxid in store.taxids(&rna.upi, true)? {
            let description = store.description(&rna.upi, taxid)?;
            write!(
                files.species_specific,
                ">{} {}\n{}",
                rna.upi.with_taxid(taxid),
                description,
                wrapped
            )?;
            summary.species_specific += 1;
        }
        summary.active += 1;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
