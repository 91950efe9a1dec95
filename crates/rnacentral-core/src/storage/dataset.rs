//! In-memory catalogue.
//!
//! Serialized as flat JSON lists (`DatasetFile`) and indexed into ordered
//! maps on load.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::SequenceStore;
use crate::{
    Accession, Citation, Database, EnsemblAssembly, EnsemblInsdcMapping, GenomicCoordinate,
    Precomputed, Release, Result, RfamHit, Rna, Upi, Xref,
};

/// Link between an accession and one of its citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessionCitation {
    pub accession: String,
    pub citation_id: u64,
}

/// On-disk JSON layout of a dataset.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DatasetFile {
    rna: Vec<Rna>,
    accessions: Vec<Accession>,
    xrefs: Vec<Xref>,
    databases: Vec<Database>,
    releases: Vec<Release>,
    citations: Vec<Citation>,
    accession_citations: Vec<AccessionCitation>,
    coordinates: Vec<GenomicCoordinate>,
    precomputed: Vec<Precomputed>,
    rfam_hits: Vec<RfamHit>,
    ensembl_assemblies: Vec<EnsemblAssembly>,
    insdc_mappings: Vec<EnsemblInsdcMapping>,
}

/// The whole catalogue held in ordered maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DatasetFile", into = "DatasetFile")]
pub struct Dataset {
    rna: BTreeMap<Upi, Rna>,
    accessions: BTreeMap<String, Accession>,
    xrefs: BTreeMap<Upi, BTreeMap<String, Xref>>,
    databases: BTreeMap<u32, Database>,
    releases: BTreeMap<u32, Release>,
    citations: BTreeMap<u64, Citation>,
    accession_citations: BTreeMap<String, BTreeSet<u64>>,
    coordinates: BTreeMap<String, Vec<GenomicCoordinate>>,
    precomputed: BTreeMap<(Upi, u32), Precomputed>,
    rfam_hits: BTreeMap<Upi, Vec<RfamHit>>,
    assemblies: BTreeMap<u32, EnsemblAssembly>,
    insdc_mappings: BTreeMap<String, Vec<EnsemblInsdcMapping>>,
}

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a dataset from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the dataset as pretty JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn insert_rna(&mut self, rna: Rna) {
        self.rna.insert(rna.upi.clone(), rna);
    }

    pub fn insert_accession(&mut self, accession: Accession) {
        self.accessions.insert(accession.accession.clone(), accession);
    }

    pub fn insert_xref(&mut self, xref: Xref) {
        self.xrefs
            .entry(xref.upi.clone())
            .or_default()
            .insert(xref.accession.clone(), xref);
    }

    pub fn insert_database(&mut self, database: Database) {
        self.databases.insert(database.id, database);
    }

    pub fn insert_release(&mut self, release: Release) {
        self.releases.insert(release.id, release);
    }

    /// Add a citation and attach it to an accession.
    pub fn insert_citation(&mut self, accession: &str, citation: Citation) {
        self.accession_citations
            .entry(accession.to_string())
            .or_default()
            .insert(citation.id);
        self.citations.insert(citation.id, citation);
    }

    pub fn insert_coordinate(&mut self, coordinate: GenomicCoordinate) {
        self.coordinates
            .entry(coordinate.accession.clone())
            .or_default()
            .push(coordinate);
    }

    pub fn insert_precomputed(&mut self, precomputed: Precomputed) {
        self.precomputed
            .insert((precomputed.upi.clone(), precomputed.taxid), precomputed);
    }

    pub fn insert_rfam_hit(&mut self, hit: RfamHit) {
        self.rfam_hits.entry(hit.upi.clone()).or_default().push(hit);
    }

    /// Number of sequences.
    #[must_use]
    pub fn rna_count(&self) -> usize {
        self.rna.len()
    }

    pub(super) fn all_accessions(&self) -> impl Iterator<Item = &Accession> {
        self.accessions.values()
    }

    pub(super) fn all_xrefs(&self) -> impl Iterator<Item = &Xref> {
        self.xrefs.values().flat_map(|by_ac| by_ac.values())
    }

    pub(super) fn all_citations(&self) -> impl Iterator<Item = &Citation> {
        self.citations.values()
    }

    pub(super) fn all_accession_citations(
        &self,
    ) -> impl Iterator<Item = (&String, &BTreeSet<u64>)> {
        self.accession_citations.iter()
    }

    pub(super) fn all_coordinates(
        &self,
    ) -> impl Iterator<Item = (&String, &Vec<GenomicCoordinate>)> {
        self.coordinates.iter()
    }

    pub(super) fn all_precomputed(&self) -> impl Iterator<Item = &Precomputed> {
        self.precomputed.values()
    }

    pub(super) fn all_rfam_hits(&self) -> impl Iterator<Item = (&Upi, &Vec<RfamHit>)> {
        self.rfam_hits.iter()
    }

    pub(super) fn all_insdc_mappings(
        &self,
    ) -> impl Iterator<Item = (&String, &Vec<EnsemblInsdcMapping>)> {
        self.insdc_mappings.iter()
    }
}

impl From<DatasetFile> for Dataset {
    fn from(file: DatasetFile) -> Self {
        let mut dataset = Self::new();
        file.rna.into_iter().for_each(|r| dataset.insert_rna(r));
        file.accessions
            .into_iter()
            .for_each(|a| dataset.insert_accession(a));
        file.xrefs.into_iter().for_each(|x| dataset.insert_xref(x));
        file.databases
            .into_iter()
            .for_each(|d| dataset.insert_database(d));
        file.releases
            .into_iter()
            .for_each(|r| dataset.insert_release(r));
        for citation in file.citations {
            dataset.citations.insert(citation.id, citation);
        }
        for link in file.accession_citations {
            dataset
                .accession_citations
                .entry(link.accession)
                .or_default()
                .insert(link.citation_id);
        }
        file.coordinates
            .into_iter()
            .for_each(|c| dataset.insert_coordinate(c));
        file.precomputed
            .into_iter()
            .for_each(|p| dataset.insert_precomputed(p));
        file.rfam_hits
            .into_iter()
            .for_each(|h| dataset.insert_rfam_hit(h));
        for assembly in file.ensembl_assemblies {
            dataset.assemblies.insert(assembly.taxid, assembly);
        }
        for mapping in file.insdc_mappings {
            dataset
                .insdc_mappings
                .entry(mapping.assembly_id.clone())
                .or_default()
                .push(mapping);
        }
        dataset
    }
}

impl From<Dataset> for DatasetFile {
    fn from(dataset: Dataset) -> Self {
        Self {
            rna: dataset.rna.into_values().collect(),
            accessions: dataset.accessions.into_values().collect(),
            xrefs: dataset
                .xrefs
                .into_values()
                .flat_map(|by_ac| by_ac.into_values())
                .collect(),
            databases: dataset.databases.into_values().collect(),
            releases: dataset.releases.into_values().collect(),
            citations: dataset.citations.into_values().collect(),
            accession_citations: dataset
                .accession_citations
                .into_iter()
                .flat_map(|(accession, ids)| {
                    ids.into_iter().map(move |citation_id| AccessionCitation {
                        accession: accession.clone(),
                        citation_id,
                    })
                })
                .collect(),
            coordinates: dataset.coordinates.into_values().flatten().collect(),
            precomputed: dataset.precomputed.into_values().collect(),
            rfam_hits: dataset.rfam_hits.into_values().flatten().collect(),
            ensembl_assemblies: dataset.assemblies.into_values().collect(),
            insdc_mappings: dataset.insdc_mappings.into_values().flatten().collect(),
        }
    }
}

impl SequenceStore for Dataset {
    fn rna(&self, upi: &Upi) -> Result<Option<Rna>> {
        Ok(self.rna.get(upi).cloned())
    }

    fn rnas(&self) -> Result<Vec<Rna>> {
        Ok(self.rna.values().cloned().collect())
    }

    fn xrefs(&self, upi: &Upi) -> Result<Vec<Xref>> {
        Ok(self
            .xrefs
            .get(upi)
            .map(|by_ac| by_ac.values().cloned().collect())
            .unwrap_or_default())
    }

    fn accession(&self, id: &str) -> Result<Option<Accession>> {
        Ok(self.accessions.get(id).cloned())
    }

    fn database(&self, id: u32) -> Result<Option<Database>> {
        Ok(self.databases.get(&id).cloned())
    }

    fn databases(&self) -> Result<Vec<Database>> {
        Ok(self.databases.values().cloned().collect())
    }

    fn release(&self, id: u32) -> Result<Option<Release>> {
        Ok(self.releases.get(&id).cloned())
    }

    fn releases(&self) -> Result<Vec<Release>> {
        Ok(self.releases.values().cloned().collect())
    }

    fn citations(&self, accession: &str) -> Result<Vec<Citation>> {
        Ok(self
            .accession_citations
            .get(accession)
            .into_iter()
            .flatten()
            .filter_map(|id| self.citations.get(id).cloned())
            .collect())
    }

    fn coordinates(&self, accession: &str) -> Result<Vec<GenomicCoordinate>> {
        Ok(self.coordinates.get(accession).cloned().unwrap_or_default())
    }

    fn precomputed(&self, upi: &Upi, taxid: u32) -> Result<Option<Precomputed>> {
        Ok(self.precomputed.get(&(upi.clone(), taxid)).cloned())
    }

    fn rfam_hits(&self, upi: &Upi) -> Result<Vec<RfamHit>> {
        Ok(self.rfam_hits.get(upi).cloned().unwrap_or_default())
    }

    fn ensembl_assemblies(&self) -> Result<Vec<EnsemblAssembly>> {
        Ok(self.assemblies.values().cloned().collect())
    }

    fn insdc_mappings(&self, assembly_id: &str) -> Result<Vec<EnsemblInsdcMapping>> {
        Ok(self
            .insdc_mappings
            .get(assembly_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_coordinates(
        &mut self,
        updates: &BTreeMap<String, Vec<GenomicCoordinate>>,
    ) -> Result<()> {
        for (accession, coordinates) in updates {
            self.coordinates
                .insert(accession.clone(), coordinates.clone());
        }
        Ok(())
    }

    fn replace_ensembl_assembly(
        &mut self,
        assembly: EnsemblAssembly,
        mappings: Vec<EnsemblInsdcMapping>,
    ) -> Result<()> {
        self.insdc_mappings
            .insert(assembly.assembly_id.clone(), mappings);
        self.assemblies.insert(assembly.taxid, assembly);
        Ok(())
    }
}
