//! redb-backed catalogue.
//!
//! Each record kind lives in its own table. Values are postcard-encoded
//! records; keys are natural identifiers. Cross-references are keyed by
//! `UPI|ACCESSION` so one range scan returns all xrefs of a sequence.

use redb::{
    Database as RedbDatabase, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

use super::{Dataset, SequenceStore};
use crate::{
    Accession, Citation, Database, EnsemblAssembly, EnsemblInsdcMapping, GenomicCoordinate,
    Precomputed, Release, Result, RfamHit, Rna, Upi, Xref,
};

// =============================================================================
// TABLE DEFINITIONS
// =============================================================================

const RNA: TableDefinition<&str, &[u8]> = TableDefinition::new("rna");
const ACCESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("accessions");
const XREFS: TableDefinition<&str, &[u8]> = TableDefinition::new("xrefs");
const DATABASES: TableDefinition<u32, &[u8]> = TableDefinition::new("databases");
const RELEASES: TableDefinition<u32, &[u8]> = TableDefinition::new("releases");
const CITATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("citations");
const ACCESSION_CITATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("accession_citations");
const COORDINATES: TableDefinition<&str, &[u8]> = TableDefinition::new("coordinates");
const PRECOMPUTED: TableDefinition<&str, &[u8]> = TableDefinition::new("precomputed");
const RFAM_HITS: TableDefinition<&str, &[u8]> = TableDefinition::new("rfam_hits");
const ASSEMBLIES: TableDefinition<u32, &[u8]> = TableDefinition::new("ensembl_assemblies");
const INSDC_MAPPINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("insdc_mappings");

/// Separator between UPI and accession in xref keys. Sorts before any
/// character allowed in an accession.
const XREF_SEPARATOR: char = '|';

fn xref_key(upi: &Upi, accession: &str) -> String {
    format!("{upi}{XREF_SEPARATOR}{accession}")
}

fn precomputed_key(upi: &Upi, taxid: u32) -> String {
    format!("{upi}_{taxid}")
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(postcard::from_bytes(bytes)?)
}

// =============================================================================
// STORE
// =============================================================================

/// Row counts of the main tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub sequences: u64,
    pub accessions: u64,
    pub xrefs: u64,
    pub databases: u64,
    pub releases: u64,
    pub citations: u64,
}

/// Disk-backed catalogue.
pub struct RedbStore {
    db: RedbDatabase,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Create (or open) a store and make sure every table exists.
    pub fn create(path: &Path) -> Result<Self> {
        let db = RedbDatabase::create(path)?;
        let txn = db.begin_write()?;
        {
            txn.open_table(RNA)?;
            txn.open_table(ACCESSIONS)?;
            txn.open_table(XREFS)?;
            txn.open_table(DATABASES)?;
            txn.open_table(RELEASES)?;
            txn.open_table(CITATIONS)?;
            txn.open_table(ACCESSION_CITATIONS)?;
            txn.open_table(COORDINATES)?;
            txn.open_table(PRECOMPUTED)?;
            txn.open_table(RFAM_HITS)?;
            txn.open_table(ASSEMBLIES)?;
            txn.open_table(INSDC_MAPPINGS)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// Open an existing store.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: RedbDatabase::open(path)?,
        })
    }

    /// Write a whole dataset in a single transaction.
    ///
    /// Records with the same key are overwritten; nothing is deleted.
    pub fn import_dataset(&self, dataset: &Dataset) -> Result<StoreStats> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RNA)?;
            for rna in dataset.rnas()? {
                table.insert(rna.upi.as_str(), encode(&rna)?.as_slice())?;
            }

            let mut table = txn.open_table(ACCESSIONS)?;
            for accession in dataset.all_accessions() {
                table.insert(accession.accession.as_str(), encode(accession)?.as_slice())?;
            }

            let mut table = txn.open_table(XREFS)?;
            for xref in dataset.all_xrefs() {
                let key = xref_key(&xref.upi, &xref.accession);
                table.insert(key.as_str(), encode(xref)?.as_slice())?;
            }

            let mut table = txn.open_table(DATABASES)?;
            for database in dataset.databases()? {
                table.insert(database.id, encode(&database)?.as_slice())?;
            }

            let mut table = txn.open_table(RELEASES)?;
            for release in dataset.releases()? {
                table.insert(release.id, encode(&release)?.as_slice())?;
            }

            let mut table = txn.open_table(CITATIONS)?;
            for citation in dataset.all_citations() {
                table.insert(citation.id, encode(citation)?.as_slice())?;
            }

            let mut table = txn.open_table(ACCESSION_CITATIONS)?;
            for (accession, ids) in dataset.all_accession_citations() {
                let ids: Vec<u64> = ids.iter().copied().collect();
                table.insert(accession.as_str(), encode(&ids)?.as_slice())?;
            }

            let mut table = txn.open_table(COORDINATES)?;
            for (accession, coordinates) in dataset.all_coordinates() {
                table.insert(accession.as_str(), encode(coordinates)?.as_slice())?;
            }

            let mut table = txn.open_table(PRECOMPUTED)?;
            for pre in dataset.all_precomputed() {
                let key = precomputed_key(&pre.upi, pre.taxid);
                table.insert(key.as_str(), encode(pre)?.as_slice())?;
            }

            let mut table = txn.open_table(RFAM_HITS)?;
            for (upi, hits) in dataset.all_rfam_hits() {
                table.insert(upi.as_str(), encode(hits)?.as_slice())?;
            }

            let mut table = txn.open_table(ASSEMBLIES)?;
            for assembly in dataset.ensembl_assemblies()? {
                table.insert(assembly.taxid, encode(&assembly)?.as_slice())?;
            }

            let mut table = txn.open_table(INSDC_MAPPINGS)?;
            for (assembly_id, mappings) in dataset.all_insdc_mappings() {
                table.insert(assembly_id.as_str(), encode(mappings)?.as_slice())?;
            }
        }
        txn.commit()?;
        self.stats()
    }

    /// Row counts of the main tables.
    pub fn stats(&self) -> Result<StoreStats> {
        let txn = self.db.begin_read()?;
        Ok(StoreStats {
            sequences: txn.open_table(RNA)?.len()?,
            accessions: txn.open_table(ACCESSIONS)?.len()?,
            xrefs: txn.open_table(XREFS)?.len()?,
            databases: txn.open_table(DATABASES)?.len()?,
            releases: txn.open_table(RELEASES)?.len()?,
            citations: txn.open_table(CITATIONS)?.len()?,
        })
    }

    fn get_str<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> Result<Option<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(def)?;
        match table.get(key)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn get_u32<T: DeserializeOwned>(
        &self,
        def: TableDefinition<u32, &[u8]>,
        key: u32,
    ) -> Result<Option<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(def)?;
        match table.get(key)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn all_u32<T: DeserializeOwned>(&self, def: TableDefinition<u32, &[u8]>) -> Result<Vec<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(def)?;
        let mut values = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            values.push(decode(value.value())?);
        }
        Ok(values)
    }
}

impl SequenceStore for RedbStore {
    fn rna(&self, upi: &Upi) -> Result<Option<Rna>> {
        self.get_str(RNA, upi.as_str())
    }

    fn rnas(&self) -> Result<Vec<Rna>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RNA)?;
        let mut values = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            values.push(decode(value.value())?);
        }
        Ok(values)
    }

    fn xrefs(&self, upi: &Upi) -> Result<Vec<Xref>> {
        let start = format!("{upi}{XREF_SEPARATOR}");
        // '}' is the character after '|'
        let end = format!("{upi}}}");
        let txn = self.db.begin_read()?;
        let table = txn.open_table(XREFS)?;
        let mut values = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let (_, value) = entry?;
            values.push(decode(value.value())?);
        }
        Ok(values)
    }

    fn accession(&self, id: &str) -> Result<Option<Accession>> {
        self.get_str(ACCESSIONS, id)
    }

    fn database(&self, id: u32) -> Result<Option<Database>> {
        self.get_u32(DATABASES, id)
    }

    fn databases(&self) -> Result<Vec<Database>> {
        self.all_u32(DATABASES)
    }

    fn release(&self, id: u32) -> Result<Option<Release>> {
        self.get_u32(RELEASES, id)
    }

    fn releases(&self) -> Result<Vec<Release>> {
        self.all_u32(RELEASES)
    }

    fn citations(&self, accession: &str) -> Result<Vec<Citation>> {
        let ids: Vec<u64> = self
            .get_str(ACCESSION_CITATIONS, accession)?
            .unwrap_or_default();
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CITATIONS)?;
        let mut citations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(guard) = table.get(id)? {
                citations.push(decode(guard.value())?);
            }
        }
        Ok(citations)
    }

    fn coordinates(&self, accession: &str) -> Result<Vec<GenomicCoordinate>> {
        Ok(self.get_str(COORDINATES, accession)?.unwrap_or_default())
    }

    fn precomputed(&self, upi: &Upi, taxid: u32) -> Result<Option<Precomputed>> {
        self.get_str(PRECOMPUTED, &precomputed_key(upi, taxid))
    }

    fn rfam_hits(&self, upi: &Upi) -> Result<Vec<RfamHit>> {
        Ok(self.get_str(RFAM_HITS, upi.as_str())?.unwrap_or_default())
    }

    fn ensembl_assemblies(&self) -> Result<Vec<EnsemblAssembly>> {
        self.all_u32(ASSEMBLIES)
    }

    fn insdc_mappings(&self, assembly_id: &str) -> Result<Vec<EnsemblInsdcMapping>> {
        Ok(self
            .get_str(INSDC_MAPPINGS, assembly_id)?
            .unwrap_or_default())
    }

    fn replace_coordinates(
        &mut self,
        updates: &BTreeMap<String, Vec<GenomicCoordinate>>,
    ) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(COORDINATES)?;
            for (accession, coordinates) in updates {
                table.insert(accession.as_str(), encode(coordinates)?.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn replace_ensembl_assembly(
        &mut self,
        assembly: EnsemblAssembly,
        mappings: Vec<EnsemblInsdcMapping>,
    ) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ASSEMBLIES)?;
            table.insert(assembly.taxid, encode(&assembly)?.as_slice())?;
            let mut table = txn.open_table(INSDC_MAPPINGS)?;
            table.insert(assembly.assembly_id.as_str(), encode(&mappings)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
