//! # Accession Module
//!
//! Expert database records and the link-building helpers the portal uses
//! to point back at their source databases.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static HGNC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"HGNC:HGNC:(\d+)").expect("valid HGNC pattern"));
static BIOTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"biotype:(\w+)").expect("valid biotype pattern"));
static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\d+$").expect("valid version pattern"));

const ENA_NONCODING_URL: &str = "http://www.ebi.ac.uk/ena/data/view/Non-coding:";

/// Databases whose entries have no ENA source record to link to.
const NO_ENA_SOURCE: &[&str] = &[
    "RFAM",
    "PDBE",
    "REFSEQ",
    "RDP",
    "GtRNAdb",
    "lncRNAdb",
    "miRBase",
    "pombase",
    "Dictybase",
    "SGD",
    "snopy",
    "Srpdb",
    "tair",
    "tmRNA website",
];

/// A record imported from an expert database describing one sequence
/// entry and its annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Accession {
    pub accession: String,
    /// In miRNAs mature products and precursors share the same parent.
    pub parent_ac: String,
    pub seq_version: u32,
    pub feature_start: u64,
    pub feature_end: u64,
    /// INSDC feature; `ncRNA` unless rRNA, tRNA or precursor RNA.
    pub feature_name: String,
    pub ordinal: u32,
    pub division: String,
    pub keywords: String,
    pub description: String,
    pub species: String,
    pub organelle: String,
    /// Taxonomic lineage, `;` separated.
    pub classification: String,
    pub project: String,
    pub is_composite: bool,
    pub non_coding_id: String,
    /// Upper-case expert database name, e.g. `PDBE`.
    pub database: String,
    pub external_id: String,
    /// Gene id without coordinates; links splice variants and mature or
    /// precursor miRNAs.
    pub optional_id: String,
    pub common_name: String,
    pub anticodon: String,
    pub experiment: String,
    pub function: String,
    pub gene: String,
    pub gene_synonym: String,
    pub inference: String,
    pub locus_tag: String,
    pub genome_position: String,
    pub mol_type: String,
    pub ncrna_class: String,
    pub note: String,
    pub old_locus_tag: String,
    pub product: String,
    pub db_xref: String,
    pub standard_name: String,
}

impl Accession {
    /// `PARENT.VERSION`, the ENA record this accession was cut from.
    #[must_use]
    pub fn parent_accession(&self) -> String {
        format!("{}.{}", self.parent_ac, self.seq_version)
    }

    /// PDB entity id from accessions like `1J5E_A_1` (id, chain, entity).
    #[must_use]
    pub fn pdb_entity_id(&self) -> Option<&str> {
        if self.database == "PDBE" {
            self.accession.rsplit('_').next()
        } else {
            None
        }
    }

    /// 3D structure metadata stored as JSON in the note of PDB entries.
    #[must_use]
    pub fn pdb_structured_note(&self) -> Option<serde_json::Value> {
        if self.database == "PDBE" && !self.note.is_empty() {
            serde_json::from_str(&self.note).ok()
        } else {
            None
        }
    }

    /// Ensembl gene id stored in the JSON note of HGNC entries.
    #[must_use]
    pub fn hgnc_ensembl_id(&self) -> Option<String> {
        if self.database != "HGNC" || self.note.is_empty() {
            return None;
        }
        let note: serde_json::Value = serde_json::from_str(&self.note).ok()?;
        note.get("ensembl_gene_id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
    }

    /// HGNC id found in the `db_xref` field.
    #[must_use]
    pub fn hgnc_id(&self) -> Option<&str> {
        HGNC_ID
            .captures(&self.db_xref)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Biotype from Ensembl/VEGA notes, `ncRNA` when absent.
    #[must_use]
    pub fn biotype(&self) -> &str {
        BIOTYPE
            .captures(&self.note)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or("ncRNA")
    }

    /// Feature name, or the INSDC ncRNA class for `ncRNA` features.
    #[must_use]
    pub fn rna_type(&self) -> &str {
        if self.feature_name == "ncRNA" {
            &self.ncrna_class
        } else {
            &self.feature_name
        }
    }

    /// SRPDB id: the external id without its version suffix.
    #[must_use]
    pub fn srpdb_id(&self) -> Option<String> {
        if self.external_id.is_empty() {
            None
        } else {
            Some(VERSION_SUFFIX.replace(&self.external_id, "").into_owned())
        }
    }

    /// Link to the ENA Non-coding product containing this entry.
    #[must_use]
    pub fn ena_url(&self) -> String {
        if NO_ENA_SOURCE.contains(&self.database.as_str()) {
            return String::new();
        }
        if self.is_composite {
            format!("{ENA_NONCODING_URL}{}", self.non_coding_id)
        } else {
            format!("{ENA_NONCODING_URL}{}", self.accession)
        }
    }

    /// Species name as used in Ensembl urls, e.g. `Homo_sapiens`.
    #[must_use]
    pub fn ensembl_species_url(&self) -> String {
        let name = self
            .species
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Link to the entry in its expert database, empty if unknown.
    #[must_use]
    pub fn expert_db_external_url(&self) -> String {
        let id = self.external_id.as_str();
        match self.database.as_str() {
            "RFAM" => format!("http://rfam.org/family/{id}"),
            "SRPDB" => format!("http://rnp.uthscsa.edu/rnp/SRPDB/rna/sequences/fasta/{id}"),
            "MIRBASE" => format!("http://www.mirbase.org/cgi-bin/mirna_entry.pl?acc={id}"),
            "TMRNA_WEB" => format!("http://bioinformatics.sandia.gov/tmrna/seqs/{id}"),
            "LNCRNADB" => format!(
                "http://www.lncrnadb.org/{}",
                self.optional_id.replace(' ', "")
            ),
            "REFSEQ" => format!(
                "http://www.ncbi.nlm.nih.gov/nuccore/{id}.{}",
                self.seq_version
            ),
            "RDP" => format!("http://rdp.cme.msu.edu/hierarchy/detail.jsp?seqid={id}"),
            "SNOPY" => {
                format!("http://snoopy.med.miyazaki-u.ac.jp/snorna_db.cgi?mode=sno_info&id={id}")
            }
            "PDBE" => format!("http://www.ebi.ac.uk/pdbe-srv/view/entry/{id}"),
            "SGD" => format!("http://www.yeastgenome.org/locus/{id}/overview"),
            "TAIR" => format!("http://www.arabidopsis.org/servlets/TairObject?id={id}&type=locus"),
            "WORMBASE" => format!("http://www.wormbase.org/species/c_elegans/gene/{id}"),
            "PLNCDB" => format!(
                "http://chualab.rockefeller.edu/cgi-bin/gb2/gbrowse_details/arabidopsis?name={id}"
            ),
            "DICTYBASE" => format!("http://dictybase.org/gene/{id}"),
            "SILVA" => {
                let subunit = if self.product.contains("small") { "ssu" } else { "lsu" };
                format!(
                    "http://www.arb-silva.de/browser/{subunit}/silva/{}",
                    self.optional_id
                )
            }
            "POMBASE" => format!("http://www.pombase.org/spombe/result/{id}"),
            "GREENGENES" => format!(
                "http://www.ebi.ac.uk/ena/data/view/{}.{}",
                self.parent_ac, self.seq_version
            ),
            "NONCODE" => match id.split_once('.') {
                Some((noncode_id, version)) => format!(
                    "http://www.noncode.org/show_rna.php?id={noncode_id}&version={version}"
                ),
                None => String::new(),
            },
            "LNCIPEDIA" => format!("http://www.lncipedia.org/db/transcript/{id}"),
            "MODOMICS" => format!("http://modomics.genesilico.pl/sequences/list/{id}"),
            "HGNC" => format!(
                "http://www.genenames.org/cgi-bin/gene_symbol_report?hgnc_id={}",
                self.accession
            ),
            "ENSEMBL" | "GENCODE" => format!(
                "http://www.ensembl.org/{}/Transcript/Summary?t={id}",
                self.ensembl_species_url()
            ),
            "FLYBASE" => format!("http://flybase.org/reports/{id}.html"),
            "MGI" => format!("http://www.informatics.jax.org/marker/{id}"),
            "RGD" => format!("https://rgd.mcw.edu/rgdweb/report/gene/main.html?id={id}"),
            "GTRNADB" => serde_json::from_str::<serde_json::Value>(&self.note)
                .ok()
                .and_then(|note| note.get("url").and_then(|u| u.as_str()).map(str::to_string))
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn accession(database: &str) -> Accession {
        Accession {
            accession: "1J5E_A_1".to_string(),
            database: database.to_string(),
            external_id: "NONHSAT000001.2".to_string(),
            species: "Homo sapiens".to_string(),
            ..Accession::default()
        }
    }

    #[test]
    fn pdb_entity_id_only_for_pdbe() {
        assert_eq!(accession("PDBE").pdb_entity_id(), Some("1"));
        assert_eq!(accession("ENA").pdb_entity_id(), None);
    }

    #[test]
    fn hgnc_id_from_db_xref() {
        let mut acc = accession("HGNC");
        acc.db_xref = "taxon:9606 HGNC:HGNC:37101 other".to_string();
        assert_eq!(acc.hgnc_id(), Some("37101"));
    }

    #[test]
    fn hgnc_ensembl_id_from_note() {
        let mut acc = accession("HGNC");
        acc.note = r#"{"ensembl_gene_id": "ENSG00000228630"}"#.to_string();
        assert_eq!(acc.hgnc_ensembl_id().as_deref(), Some("ENSG00000228630"));
        acc.note = "{}".to_string();
        assert_eq!(acc.hgnc_ensembl_id(), None);
    }

    #[test]
    fn biotype_defaults_to_ncrna() {
        let mut acc = accession("ENSEMBL");
        assert_eq!(acc.biotype(), "ncRNA");
        acc.note = "biotype:lincRNA transcript".to_string();
        assert_eq!(acc.biotype(), "lincRNA");
    }

    #[test]
    fn rna_type_uses_ncrna_class_for_ncrna_features() {
        let mut acc = accession("ENA");
        acc.feature_name = "ncRNA".to_string();
        acc.ncrna_class = "miRNA".to_string();
        assert_eq!(acc.rna_type(), "miRNA");
        acc.feature_name = "tRNA".to_string();
        assert_eq!(acc.rna_type(), "tRNA");
    }

    #[test]
    fn srpdb_id_strips_version() {
        let mut acc = accession("SRPDB");
        acc.external_id = "Homo_sapi_1.2".to_string();
        assert_eq!(acc.srpdb_id().as_deref(), Some("Homo_sapi_1"));
    }

    #[test]
    fn ena_url_respects_composite_flag() {
        let mut acc = accession("ENA");
        acc.accession = "AB000001.1:1..100:ncRNA".to_string();
        acc.non_coding_id = "NC1".to_string();
        assert!(acc.ena_url().ends_with("AB000001.1:1..100:ncRNA"));
        acc.is_composite = true;
        assert!(acc.ena_url().ends_with(":NC1"));
        assert_eq!(accession("PDBE").ena_url(), "");
    }

    #[test]
    fn external_urls() {
        let noncode = accession("NONCODE");
        assert_eq!(
            noncode.expert_db_external_url(),
            "http://www.noncode.org/show_rna.php?id=NONHSAT000001&version=2"
        );

        let mut ensembl = accession("ENSEMBL");
        ensembl.external_id = "ENST00000516494".to_string();
        assert_eq!(
            ensembl.expert_db_external_url(),
            "http://www.ensembl.org/Homo_sapiens/Transcript/Summary?t=ENST00000516494"
        );

        let mut gtrnadb = accession("GTRNADB");
        gtrnadb.note = r#"{"url": "http://gtrnadb.ucsc.edu/x"}"#.to_string();
        assert_eq!(gtrnadb.expert_db_external_url(), "http://gtrnadb.ucsc.edu/x");

        assert_eq!(accession("UNKNOWN").expert_db_external_url(), "");
    }
}
