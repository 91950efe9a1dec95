//! # MGI Mapping
//!
//! Maps MGI gene records to RNAcentral identifiers through the
//! transcripts they reference.
//!
//! Ensembl transcript ids are tried first against accession external ids;
//! if none match, RefSeq transcript ids are tried against parent
//! accessions. Only active cross-references count.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

use crate::storage::SequenceStore;
use crate::{Result, Upi};

/// What happened to each input entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub mapped: usize,
    pub unmapped: usize,
    pub ensembl: usize,
    pub ref_seq: usize,
    /// Transcript ids were given but none matched.
    pub all_failed: usize,
    /// No transcript ids to try.
    pub none_possible: usize,
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} mapped={} unmapped={} ensembl={} ref_seq={} all_failed={} none_possible={}",
            self.total,
            self.mapped,
            self.unmapped,
            self.ensembl,
            self.ref_seq,
            self.all_failed,
            self.none_possible
        )
    }
}

/// Transcript source an entry was mapped through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Ensembl,
    RefSeq,
}

impl Source {
    fn key(self) -> &'static str {
        match self {
            Self::Ensembl => "ensembl",
            Self::RefSeq => "ref_seq",
        }
    }
}

/// Lookup tables over active cross-references.
#[derive(Debug, Default)]
pub struct MgiMapper {
    by_external_id: BTreeMap<String, BTreeSet<Upi>>,
    by_parent_ac: BTreeMap<String, BTreeSet<Upi>>,
}

impl MgiMapper {
    /// Index the active cross-references of a store.
    pub fn new(store: &dyn SequenceStore) -> Result<Self> {
        let mut mapper = Self::default();
        for rna in store.rnas()? {
            for xref in store.xrefs(&rna.upi)? {
                if !xref.is_active() {
                    continue;
                }
                let Some(acc) = store.accession(&xref.accession)? else {
                    continue;
                };
                if !acc.external_id.is_empty() {
                    mapper
                        .by_external_id
                        .entry(acc.external_id)
                        .or_default()
                        .insert(xref.upi.clone());
                }
                if !acc.parent_ac.is_empty() {
                    mapper
                        .by_parent_ac
                        .entry(acc.parent_ac)
                        .or_default()
                        .insert(xref.upi.clone());
                }
            }
        }
        Ok(mapper)
    }

    fn lookup(&self, source: Source, ids: &[String]) -> BTreeSet<Upi> {
        let index = match source {
            Source::Ensembl => &self.by_external_id,
            Source::RefSeq => &self.by_parent_ac,
        };
        ids.iter()
            .filter_map(|id| index.get(id))
            .flatten()
            .cloned()
            .collect()
    }

    /// UPIs an entry maps to, or `None` when it cannot be mapped.
    pub fn rnacentral_ids(&self, counts: &mut Counts, entry: &Value) -> Option<BTreeSet<Upi>> {
        let mgi_id = entry.get("accession").and_then(Value::as_str).unwrap_or("");
        let mut possible = 0;
        for source in [Source::Ensembl, Source::RefSeq] {
            let ids = transcript_ids(entry, source.key());
            possible += ids.len();
            let upis = self.lookup(source, &ids);
            if !upis.is_empty() {
                debug!(mgi_id, source = source.key(), "Mapped");
                match source {
                    Source::Ensembl => counts.ensembl += 1,
                    Source::RefSeq => counts.ref_seq += 1,
                }
                return Some(upis);
            }
        }
        if possible == 0 {
            debug!(mgi_id, "No possible mapping");
            counts.none_possible += 1;
        } else {
            debug!(mgi_id, "Failed mapping");
            counts.all_failed += 1;
        }
        None
    }

    /// Map every entry. Each (entry, UPI) pair becomes a copy of the entry
    /// with `rnacentral_id` added.
    pub fn map_entries(&self, entries: &[Value]) -> (Vec<Value>, Counts) {
        let mut counts = Counts::default();
        let mut mapped = Vec::new();
        for entry in entries {
            counts.total += 1;
            let Some(upis) = self.rnacentral_ids(&mut counts, entry) else {
                counts.unmapped += 1;
                continue;
            };
            counts.mapped += 1;
            for upi in upis {
                let mut result: Map<String, Value> = entry.as_object().cloned().unwrap_or_default();
                result.insert("rnacentral_id".to_string(), Value::String(upi.to_string()));
                mapped.push(Value::Object(result));
            }
        }
        info!(%counts, "MGI mapping complete");
        (mapped, counts)
    }
}

/// `xref_data.<key>.transcript_ids` of an entry.
fn transcript_ids(entry: &Value, key: &str) -> Vec<String> {
    entry
        .pointer(&format!("/xref_data/{key}/transcript_ids"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{Accession, Dataset, Xref};
    use serde_json::json;

    fn add(
        dataset: &mut Dataset,
        upi: &str,
        accession: &str,
        external_id: &str,
        parent_ac: &str,
        deleted: bool,
    ) {
        dataset.insert_accession(Accession {
            accession: accession.to_string(),
            external_id: external_id.to_string(),
            parent_ac: parent_ac.to_string(),
            ..Accession::default()
        });
        dataset.insert_xref(Xref {
            upi: Upi::parse(upi).unwrap(),
            accession: accession.to_string(),
            database_id: 1,
            taxid: 10090,
            deleted,
            created: 1,
            last: 1,
        });
    }

    fn store() -> Dataset {
        let mut dataset = Dataset::new();
        for upi in ["URS0000000001", "URS0000000002", "URS0000000003"] {
            dataset.insert_rna(crate::Rna {
                upi: Upi::parse(upi).unwrap(),
                md5: String::new(),
                length: 4,
                sequence: "ACGU".to_string(),
            });
        }
        add(&mut dataset, "URS0000000001", "A1", "ENSMUST01", "X1", false);
        add(&mut dataset, "URS0000000002", "A2", "OTHER", "NR_001", false);
        add(&mut dataset, "URS0000000003", "A3", "ENSMUST03", "X3", true);
        dataset
    }

    #[test]
    fn ensembl_wins_over_refseq() {
        let mapper = MgiMapper::new(&store()).unwrap();
        let entries = vec![json!({
            "accession": "MGI:1",
            "symbol": "Mir1",
            "xref_data": {
                "ensembl": {"transcript_ids": ["ENSMUST01"]},
                "ref_seq": {"transcript_ids": ["NR_001"]}
            }
        })];
        let (mapped, counts) = mapper.map_entries(&entries);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0]["rnacentral_id"], "URS0000000001");
        assert_eq!(mapped[0]["symbol"], "Mir1");
        assert_eq!(counts.ensembl, 1);
        assert_eq!(counts.ref_seq, 0);
    }

    #[test]
    fn falls_back_to_refseq_and_counts_failures() {
        let mapper = MgiMapper::new(&store()).unwrap();
        let entries = vec![
            json!({"accession": "MGI:2", "xref_data": {
                "ensembl": {"transcript_ids": ["ENSMUST99"]},
                "ref_seq": {"transcript_ids": ["NR_001"]}}}),
            json!({"accession": "MGI:3", "xref_data": {
                "ensembl": {"transcript_ids": ["ENSMUST03"]},
                "ref_seq": {"transcript_ids": []}}}),
            json!({"accession": "MGI:4", "xref_data": {
                "ensembl": {"transcript_ids": []},
                "ref_seq": {"transcript_ids": []}}}),
        ];
        let (mapped, counts) = mapper.map_entries(&entries);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0]["rnacentral_id"], "URS0000000002");
        assert_eq!(
            counts,
            Counts {
                total: 3,
                mapped: 1,
                unmapped: 2,
                ensembl: 0,
                ref_seq: 1,
                all_failed: 1,
                none_possible: 1,
            }
        );
    }
}
