//! # Model Module
//!
//! Core records of the sequence catalogue.
//!
//! Every record is a plain serde struct so the same types travel through
//! the JSON dataset format, the redb tables (postcard) and the REST API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::formats::fasta::format_fasta;

// =============================================================================
// UPI
// =============================================================================

/// Number of hex digits after the `URS` prefix.
const UPI_HEX_DIGITS: usize = 10;

/// RNAcentral Unique Product Identifier, e.g. `URS0000000001`.
///
/// The primary key of a unique RNA sequence. Always `URS` followed by ten
/// upper-case hexadecimal digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Upi(String);

impl Upi {
    /// Parse and validate an identifier.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let digits = raw
            .strip_prefix("URS")
            .ok_or_else(|| Error::InvalidUpi(raw.to_string()))?;
        let valid = digits.len() == UPI_HEX_DIGITS
            && digits
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidUpi(raw.to_string()))
        }
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Species-specific identifier, e.g. `URS0000000001_9606`.
    #[must_use]
    pub fn with_taxid(&self, taxid: u32) -> String {
        format!("{}_{}", self.0, taxid)
    }
}

impl fmt::Display for Upi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Upi {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Upi {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Upi> for String {
    fn from(value: Upi) -> Self {
        value.0
    }
}

// =============================================================================
// SEQUENCES
// =============================================================================

/// A unique RNA sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rna {
    pub upi: Upi,
    pub md5: String,
    pub length: u32,
    pub sequence: String,
}

impl Rna {
    /// The nucleotide sequence.
    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// The sequence as a FASTA record headed by the UPI.
    #[must_use]
    pub fn fasta(&self) -> String {
        format_fasta(self.upi.as_str(), &self.sequence)
    }

    /// Count nucleotides. `T` is counted as `U`.
    #[must_use]
    pub fn count_symbols(&self) -> SymbolCounts {
        let mut counts = SymbolCounts::default();
        for symbol in self.sequence.chars() {
            match symbol.to_ascii_uppercase() {
                'A' => counts.a += 1,
                'C' => counts.c += 1,
                'G' => counts.g += 1,
                'U' | 'T' => counts.u += 1,
                'N' => counts.n += 1,
                _ => counts.other += 1,
            }
        }
        counts
    }
}

/// Per-nucleotide counts of a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCounts {
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "C")]
    pub c: u64,
    #[serde(rename = "G")]
    pub g: u64,
    #[serde(rename = "U")]
    pub u: u64,
    #[serde(rename = "N")]
    pub n: u64,
    pub other: u64,
}

// =============================================================================
// CROSS-REFERENCES
// =============================================================================

/// Link between a sequence and an expert database accession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xref {
    pub upi: Upi,
    pub accession: String,
    pub database_id: u32,
    pub taxid: u32,
    #[serde(default)]
    pub deleted: bool,
    /// Release in which the xref first appeared.
    pub created: u32,
    /// Release in which the xref was last seen.
    pub last: u32,
}

impl Xref {
    /// An xref is active until it is flagged as deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// An expert database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub id: u32,
    /// Short upper-case name, e.g. `ENA`, `PDBE`.
    pub name: String,
    /// Human readable name, e.g. `miRBase`.
    pub display_name: String,
}

/// Kind of a database release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReleaseType {
    #[serde(rename = "F")]
    Full,
    #[serde(rename = "I")]
    Incremental,
}

/// A database release. Xrefs point at releases for first/last seen dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u32,
    pub database_id: u32,
    pub release_date: NaiveDate,
    pub release_type: ReleaseType,
}

// =============================================================================
// LITERATURE & ANNOTATION
// =============================================================================

/// A literature reference attached to accessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: u64,
    #[serde(default)]
    pub authors: String,
    /// Journal reference or INSDC submission note.
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pubmed: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

/// Genome location of an accession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicCoordinate {
    pub accession: String,
    pub chromosome: String,
    pub primary_start: u64,
    pub primary_end: u64,
    /// `1` forward, `-1` reverse.
    pub strand: i8,
}

/// Values computed ahead of time for a sequence in one organism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precomputed {
    pub upi: Upi,
    pub taxid: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rna_type: Option<String>,
    /// JSON document: `{"has_issue": bool, "problems": [{"name": ...}]}`.
    #[serde(default)]
    pub rfam_problems: Option<String>,
}

/// An Rfam family match for a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfamHit {
    pub upi: Upi,
    pub rfam_model_id: String,
    pub short_name: String,
    #[serde(default)]
    pub rfam_clan: Option<String>,
}

// =============================================================================
// ENSEMBL
// =============================================================================

/// A genome assembly used by Ensembl for one organism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsemblAssembly {
    pub assembly_id: String,
    pub assembly_full_name: String,
    pub gca_accession: Option<String>,
    pub assembly_ucsc: Option<String>,
    pub common_name: String,
    pub taxid: u32,
    pub ensembl_url: String,
    pub division: String,
}

/// Chromosome name mapping between INSDC and Ensembl for an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsemblInsdcMapping {
    pub assembly_id: String,
    pub insdc: String,
    pub ensembl_name: String,
}

// =============================================================================
// TESTS
// =============================================================================
