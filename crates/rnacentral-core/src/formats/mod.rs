//! # Formats Module
//!
//! Flat-file outputs of the catalogue.
//!
//! This module contains:
//! - FASTA formatting and the FTP sequence export
//! - The EBeye XML metadata dump used for search indexing
//! - Tab-separated external id to UPI mappings
//!
//! Exporters take any `SequenceStore` and a writer or destination
//! directory; they never open files they were not told about.

pub mod fasta;
pub mod mapping;
pub mod xml;

pub use fasta::{FastaExporter, FastaSummary, format_fasta, is_iupac};
pub use mapping::{MappingExporter, external_id};
pub use xml::{Boost, RnaXmlExporter, XmlDumpWriter};
