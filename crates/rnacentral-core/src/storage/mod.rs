//! # Storage Module
//!
//! Data access for the sequence catalogue.
//!
//! `SequenceStore` is the seam every exporter and endpoint reads through.
//! Two implementations:
//! - [`Dataset`]: in-memory, ordered maps; the JSON interchange format
//! - [`RedbStore`]: disk-backed redb tables with postcard-encoded records
//!
//! Derived queries (active taxids, descriptions, publications) are
//! provided methods so both backends answer them identically.

mod dataset;
mod redb_store;

pub use dataset::{AccessionCitation, Dataset};
pub use redb_store::{RedbStore, StoreStats};

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    Accession, Citation, Database, EnsemblAssembly, EnsemblInsdcMapping, GenomicCoordinate,
    Precomputed, Release, Result, RfamHit, Rna, Upi, Xref,
};

/// Read access to the catalogue plus the few writes batch commands need.
pub trait SequenceStore {
    /// Lookup a sequence.
    fn rna(&self, upi: &Upi) -> Result<Option<Rna>>;

    /// All sequences ordered by UPI.
    fn rnas(&self) -> Result<Vec<Rna>>;

    /// Cross-references of a sequence, ordered by accession.
    fn xrefs(&self, upi: &Upi) -> Result<Vec<Xref>>;

    /// Lookup an accession record.
    fn accession(&self, id: &str) -> Result<Option<Accession>>;

    /// Lookup an expert database.
    fn database(&self, id: u32) -> Result<Option<Database>>;

    /// All expert databases ordered by id.
    fn databases(&self) -> Result<Vec<Database>>;

    /// Lookup a release.
    fn release(&self, id: u32) -> Result<Option<Release>>;

    /// All releases ordered by id.
    fn releases(&self) -> Result<Vec<Release>>;

    /// Literature attached to an accession, ordered by citation id.
    fn citations(&self, accession: &str) -> Result<Vec<Citation>>;

    /// Genome locations of an accession.
    fn coordinates(&self, accession: &str) -> Result<Vec<GenomicCoordinate>>;

    /// Precomputed annotation of a sequence in one organism.
    fn precomputed(&self, upi: &Upi, taxid: u32) -> Result<Option<Precomputed>>;

    /// Rfam family matches of a sequence.
    fn rfam_hits(&self, upi: &Upi) -> Result<Vec<RfamHit>>;

    /// All Ensembl assemblies ordered by taxid.
    fn ensembl_assemblies(&self) -> Result<Vec<EnsemblAssembly>>;

    /// INSDC to Ensembl chromosome names of an assembly.
    fn insdc_mappings(&self, assembly_id: &str) -> Result<Vec<EnsemblInsdcMapping>>;

    /// Replace the coordinates of every listed accession in one step.
    fn replace_coordinates(
        &mut self,
        updates: &BTreeMap<String, Vec<GenomicCoordinate>>,
    ) -> Result<()>;

    /// Replace the assembly of an organism and the mappings of that assembly.
    fn replace_ensembl_assembly(
        &mut self,
        assembly: EnsemblAssembly,
        mappings: Vec<EnsemblInsdcMapping>,
    ) -> Result<()>;

    // =========================================================================
    // DERIVED QUERIES
    // =========================================================================

    /// Whether any cross-reference of the sequence is still active.
    fn is_active(&self, upi: &Upi) -> Result<bool> {
        Ok(self.xrefs(upi)?.iter().any(Xref::is_active))
    }

    /// Distinct organisms of a sequence, active xrefs only if requested.
    fn taxids(&self, upi: &Upi, active_only: bool) -> Result<BTreeSet<u32>> {
        Ok(self
            .xrefs(upi)?
            .into_iter()
            .filter(|x| !active_only || x.is_active())
            .map(|x| x.taxid)
            .collect())
    }

    /// Human readable description of a sequence in one organism.
    ///
    /// Uses the precomputed description, falling back to species and
    /// product of the first active accession.
    fn description(&self, upi: &Upi, taxid: u32) -> Result<String> {
        if let Some(pre) = self.precomputed(upi, taxid)?
            && !pre.description.is_empty()
        {
            return Ok(pre.description);
        }
        for xref in self.xrefs(upi)? {
            if xref.taxid != taxid || !xref.is_active() {
                continue;
            }
            if let Some(acc) = self.accession(&xref.accession)? {
                let label = if acc.product.is_empty() {
                    &acc.description
                } else {
                    &acc.product
                };
                return Ok(format!("{} {}", acc.species, label).trim().to_string());
            }
        }
        Ok(String::new())
    }

    /// Whether any active accession of the sequence in this organism has
    /// genome coordinates.
    fn has_genomic_coordinates(&self, upi: &Upi, taxid: u32) -> Result<bool> {
        for xref in self.xrefs(upi)? {
            if xref.taxid == taxid
                && xref.is_active()
                && !self.coordinates(&xref.accession)?.is_empty()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Distinct citations of all accessions of the sequence in one
    /// organism, or in every organism when `taxid` is `None`.
    fn publications(&self, upi: &Upi, taxid: Option<u32>) -> Result<Vec<Citation>> {
        let mut seen = BTreeMap::new();
        for xref in self.xrefs(upi)? {
            if taxid.is_some_and(|t| t != xref.taxid) {
                continue;
            }
            for citation in self.citations(&xref.accession)? {
                seen.entry(citation.id).or_insert(citation);
            }
        }
        Ok(seen.into_values().collect())
    }
}
