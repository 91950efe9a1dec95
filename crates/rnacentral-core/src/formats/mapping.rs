//! Tab-separated mapping from expert database ids to UPIs.

use std::collections::BTreeSet;
use std::io::Write;
use tracing::{debug, info};

use crate::storage::SequenceStore;
use crate::{Accession, Result, Upi};

/// External identifier of an accession as published in the mapping.
///
/// PDB chains are only unique with their chain id, so PDBE entries get
/// `EXTERNALID_OPTIONALID`.
#[must_use]
pub fn external_id(database: &str, external_id: &str, optional_id: &str) -> String {
    if database == "PDBE" {
        format!("{external_id}_{optional_id}")
    } else {
        external_id.to_string()
    }
}

/// Writes `external_id<TAB>upi` lines for one expert database.
#[derive(Debug, Clone)]
pub struct MappingExporter {
    database: String,
}

impl MappingExporter {
    /// Exporter for an expert database, matched case-insensitively
    /// against the accession `database` field.
    #[must_use]
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_uppercase(),
        }
    }

    /// Collect the mapping, sorted and without adjacent duplicates.
    pub fn rows(&self, store: &dyn SequenceStore) -> Result<Vec<(String, Upi)>> {
        let mut distinct: BTreeSet<(Upi, String, String)> = BTreeSet::new();
        for rna in store.rnas()? {
            for xref in store.xrefs(&rna.upi)? {
                if !xref.is_active() {
                    continue;
                }
                let Some(Accession {
                    database,
                    external_id,
                    optional_id,
                    ..
                }) = store.accession(&xref.accession)?
                else {
                    debug!(accession = %xref.accession, "xref without accession record");
                    continue;
                };
                if database == self.database {
                    distinct.insert((xref.upi.clone(), external_id, optional_id));
                }
            }
        }

        let mut rows: Vec<(String, Upi)> = Vec::with_capacity(distinct.len());
        for (upi, ext, optional) in distinct {
            let row = (external_id(&self.database, &ext, &optional), upi);
            if rows.last() != Some(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Write the mapping and return the number of lines written.
    pub fn export<W: Write>(&self, store: &dyn SequenceStore, out: &mut W) -> Result<usize> {
        let rows = self.rows(store)?;
        for (external, upi) in &rows {
            writeln!(out, "{external}\t{upi}")?;
        }
        out.flush()?;
        info!(database = %self.database, lines = rows.len(), "Mapping export complete");
        Ok(rows.len())
    }
}
