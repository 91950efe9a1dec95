//! # RNAcentral Core
//!
//! The deterministic logic behind the RNAcentral portal.
//!
//! This crate holds everything that does not need a network or an async
//! runtime:
//! - the sequence catalogue model (`Rna`, `Accession`, `Xref`, ...)
//! - storage (`SequenceStore`, backed by an in-memory `Dataset` or redb)
//! - flat-file exporters (FASTA, EBeye XML, ID mapping)
//! - genome coordinate import, MGI mapping and Ensembl assembly metadata
//! - nhmmer output parsing and result ordering for the sequence search
//!
//! The HTTP server, CLI and job queue live in `apps/rnacentral`.

pub mod accession;
pub mod ensembl;
pub mod error;
pub mod expert_db;
pub mod formats;
pub mod genome;
pub mod mgi;
pub mod model;
pub mod pagination;
pub mod search;
pub mod storage;

pub use accession::Accession;
pub use error::{Error, Result};
pub use model::{
    Citation, Database, EnsemblAssembly, EnsemblInsdcMapping, GenomicCoordinate, Precomputed,
    Release, ReleaseType, RfamHit, Rna, SymbolCounts, Upi, Xref,
};
pub use pagination::{Page, PageRequest};
pub use storage::{Dataset, RedbStore, SequenceStore};
