//! # Genome Mapping Import
//!
//! Loads computed genome coordinates for sequences that are already in
//! the catalogue.
//!
//! The input is a JSON list of `{upi, taxid, chromosome, primary_start,
//! primary_end, strand}` records. Every record is validated before
//! anything is written; one bad record aborts the whole import.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::storage::SequenceStore;
use crate::{Error, GenomicCoordinate, Result, Upi};

/// One computed genome location of a sequence in an organism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeMapping {
    pub upi: Upi,
    pub taxid: u32,
    pub chromosome: String,
    pub primary_start: u64,
    pub primary_end: u64,
    pub strand: i8,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub mappings: usize,
    pub accessions: usize,
}

/// Read mappings from a JSON file.
pub fn load_mappings(path: &Path) -> Result<Vec<GenomeMapping>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Check every mapping against the store and collect the accessions each
/// one applies to.
pub fn plan_import(
    store: &dyn SequenceStore,
    mappings: &[GenomeMapping],
) -> Result<BTreeMap<String, Vec<GenomicCoordinate>>> {
    let mut updates: BTreeMap<String, Vec<GenomicCoordinate>> = BTreeMap::new();

    for (index, mapping) in mappings.iter().enumerate() {
        if mapping.chromosome.trim().is_empty() {
            return Err(Error::invalid(index, "chromosome is empty"));
        }
        if mapping.primary_start > mapping.primary_end {
            return Err(Error::invalid(
                index,
                format!(
                    "start {} is after end {}",
                    mapping.primary_start, mapping.primary_end
                ),
            ));
        }
        if mapping.strand != 1 && mapping.strand != -1 {
            return Err(Error::invalid(
                index,
                format!("strand must be 1 or -1, got {}", mapping.strand),
            ));
        }
        if store.rna(&mapping.upi)?.is_none() {
            return Err(Error::invalid(
                index,
                format!("unknown sequence {}", mapping.upi),
            ));
        }

        let accessions: Vec<String> = store
            .xrefs(&mapping.upi)?
            .into_iter()
            .filter(|x| x.taxid == mapping.taxid)
            .map(|x| x.accession)
            .collect();
        if accessions.is_empty() {
            return Err(Error::invalid(
                index,
                format!("{} has no xrefs for taxid {}", mapping.upi, mapping.taxid),
            ));
        }

        for accession in accessions {
            let coordinate = GenomicCoordinate {
                accession: accession.clone(),
                chromosome: mapping.chromosome.clone(),
                primary_start: mapping.primary_start,
                primary_end: mapping.primary_end,
                strand: mapping.strand,
            };
            // later records for the same accession win
            updates.insert(accession, vec![coordinate]);
        }
    }
    Ok(updates)
}

/// Validate all mappings, then replace the coordinates of every affected
/// accession.
pub fn import_mappings(
    store: &mut dyn SequenceStore,
    mappings: &[GenomeMapping],
) -> Result<ImportSummary> {
    let updates = plan_import(&*store, mappings)?;
    store.replace_coordinates(&updates)?;
    let summary = ImportSummary {
        mappings: mappings.len(),
        accessions: updates.len(),
    };
    info!(
        mappings = summary.mappings,
        accessions = summary.accessions,
        "Genome mappings imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{Dataset, Rna, Xref};

    fn upi(raw: &str) -> Upi {
        Upi::parse(raw).unwrap()
    }

    fn dataset() -> Dataset {
        let mut dataset = Dataset::new();
        dataset.insert_rna(Rna {
            upi: upi("URS0000000001"),
            md5: String::new(),
            length: 4,
            sequence: "ACGU".to_string(),
        });
        for (accession, taxid) in [("E1", 9606), ("E2", 9606), ("E3", 10090)] {
            dataset.insert_xref(Xref {
                upi: upi("URS0000000001"),
                accession: accession.to_string(),
                database_id: 1,
                taxid,
                deleted: false,
                created: 1,
                last: 1,
            });
        }
        dataset.insert_coordinate(GenomicCoordinate {
            accession: "E1".to_string(),
            chromosome: "X".to_string(),
            primary_start: 1,
            primary_end: 2,
            strand: 1,
        });
        dataset
    }

    fn mapping(upi_raw: &str, taxid: u32, start: u64, end: u64, strand: i8) -> GenomeMapping {
        GenomeMapping {
            upi: upi(upi_raw),
            taxid,
            chromosome: "1".to_string(),
            primary_start: start,
            primary_end: end,
            strand,
        }
    }

    #[test]
    fn import_replaces_coordinates_of_matching_accessions() {
        let mut store = dataset();
        let records = [mapping("URS0000000001", 9606, 100, 200, -1)];
        let summary = import_mappings(&mut store, &records).unwrap();
        assert_eq!(summary.accessions, 2);

        let e1 = store.coordinates("E1").unwrap();
        assert_eq!(e1.len(), 1);
        assert_eq!(e1[0].chromosome, "1");
        assert_eq!(e1[0].strand, -1);
        assert_eq!(store.coordinates("E2").unwrap().len(), 1);
        assert!(store.coordinates("E3").unwrap().is_empty());
    }

    #[test]
    fn one_invalid_record_aborts_everything() {
        let mut store = dataset();
        let result = import_mappings(
            &mut store,
            &[
                mapping("URS0000000001", 9606, 100, 200, 1),
                mapping("URS0000000001", 9606, 300, 200, 1),
            ],
        );
        assert!(matches!(result, Err(Error::Invalid { index: 1, .. })));
        assert_eq!(store.coordinates("E1").unwrap()[0].chromosome, "X");
        assert!(store.coordinates("E2").unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_sequences_and_organisms() {
        let store = dataset();
        assert!(plan_import(&store, &[mapping("URS00000000FF", 9606, 1, 2, 1)]).is_err());
        assert!(plan_import(&store, &[mapping("URS0000000001", 7955, 1, 2, 1)]).is_err());
        assert!(plan_import(&store, &[mapping("URS0000000001", 9606, 1, 2, 0)]).is_err());
    }

    #[test]
    fn parses_json_records() {
        let json = r#"[{"upi": "URS0000000001", "taxid": 9606, "chromosome": "2",
            "primary_start": 10, "primary_end": 20, "strand": 1}]"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        std::fs::write(&path, json).unwrap();
        let mappings = load_mappings(&path).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].chromosome, "2");
    }
}
