//! # Expert Databases
//!
//! The catalogue of databases RNAcentral imports from (or plans to), and
//! the mapping from `database` filter names to internal database ids.

use serde::Serialize;

/// An expert database known to the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpertDatabase {
    pub name: &'static str,
    /// Short label used in urls, empty for databases not yet imported.
    pub label: &'static str,
    pub url: &'static str,
    pub abbreviation: &'static str,
    pub imported: bool,
}

const fn db(
    name: &'static str,
    label: &'static str,
    url: &'static str,
    abbreviation: &'static str,
    imported: bool,
) -> ExpertDatabase {
    ExpertDatabase {
        name,
        label,
        url,
        abbreviation,
        imported,
    }
}

/// All expert databases, imported ones first in display order.
pub const EXPERT_DATABASES: &[ExpertDatabase] = &[
    db("ENA", "ena", "http://www.ebi.ac.uk/ena/", "European Nucleotide Archive", true),
    db("PDB", "pdb", "http://www.wwpdb.org/", "Protein Data Bank", true),
    db("FlyBase", "", "http://flybase.org/", "", false),
    db("Rfam", "rfam", "http://rfam.xfam.org", "", true),
    db("miRBase", "mirbase", "http://www.mirbase.org/", "", true),
    db("Vega", "vega", "http://vega.sanger.ac.uk/", "Vertebrate Genome Annotation", true),
    db("tmRNA Website", "tmrna-website", "http://bioinformatics.sandia.gov/tmrna/", "", true),
    db(
        "SRPDB",
        "srpdb",
        "http://rnp.uthscsa.edu/rnp/SRPDB/SRPDB.html",
        "Signal Recognition Particle Database",
        true,
    ),
    db("lncRNAdb", "lncrnadb", "http://lncrnadb.org/", "", true),
    db("gtRNAdb", "gtrnadb", "http://gtrnadb.ucsc.edu/", "", true),
    db(
        "RefSeq",
        "refseq",
        "http://www.ncbi.nlm.nih.gov/refseq/",
        "NCBI Reference Sequence Database",
        true,
    ),
    db("RDP", "rdp", "http://rdp.cme.msu.edu/", "Ribosomal Database Project", true),
    db("CRW Site", "", "http://www.rna.ccbb.utexas.edu/", "Comparative RNA Website", false),
    db("HGNC", "", "http://www.genenames.org/", "", false),
    db("GreenGenes", "", "http://greengenes.secondgenome.com/downloads", "", false),
    db("LncBase", "", "http://www.microrna.gr/LncBase", "", false),
    db("LNCipedia", "", "http://www.lncipedia.org/", "", false),
    db("MODOMICS", "", "http://modomics.genesilico.pl/", "", false),
    db("NONCODE", "", "http://www.noncode.org/", "", false),
    db("NPInter", "", "http://bioinfo.ibp.ac.cn/NPInter/", "", false),
    db("piRNABank", "", "http://pirnabank.ibab.ac.in/", "", false),
    db("PLncDB", "", "http://chualab.rockefeller.edu/gbrowse2/homepage.html", "", false),
    db("PomBase", "", "http://www.pombase.org/", "", false),
    db("RNApathwaysDB", "", "http://genesilico.pl/rnapathwaysdb", "", false),
    db("SILVA", "", "http://www.arb-silva.de/", "", false),
    db("SGD", "", "http://yeastgenome.org/", "Saccharomyces Genome Database", false),
    db(
        "snOPY",
        "snopy",
        "http://snoopy.med.miyazaki-u.ac.jp",
        "snoRNA Orthological Gene Database",
        true,
    ),
    db("snoRNA Database", "", "http://lowelab.ucsc.edu/snoRNAdb/", "", false),
    db("sRNAmap", "", "http://srnamap.mbc.nctu.edu.tw/", "", false),
    db("TarBase", "", "http://www.microrna.gr/tarbase", "", false),
    db("tmRDB", "", "http://rth.dk/resources/rnp/tmRDB/", "", false),
    db("tRNAdb", "", "http://trna.bioinf.uni-leipzig.de/DataOutput/", "", false),
    db("WormBase", "", "http://www.wormbase.org/", "", false),
];

/// Find an expert database by its url label.
#[must_use]
pub fn by_label(label: &str) -> Option<&'static ExpertDatabase> {
    if label.is_empty() {
        return None;
    }
    EXPERT_DATABASES.iter().find(|db| db.label == label)
}

/// Filter prefixes accepted by the RNA list endpoint and their ids.
const FILTER_IDS: &[(&str, u32)] = &[
    ("ena", 1),
    ("rfam", 2),
    ("srpdb", 3),
    ("mirbase", 4),
    ("vega", 5),
    ("tmrna_website", 6),
];

/// Map a `database` filter value to an internal database id.
///
/// Matching is a case-insensitive prefix match, so `ENA_2014` maps to ENA.
#[must_use]
pub fn database_id_for_filter(value: &str) -> Option<u32> {
    let value = value.to_ascii_lowercase();
    FILTER_IDS
        .iter()
        .find(|(prefix, _)| value.starts_with(prefix))
        .map(|(_, id)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_names_map_to_ids() {
        assert_eq!(database_id_for_filter("ENA"), Some(1));
        assert_eq!(database_id_for_filter("miRBase"), Some(4));
        assert_eq!(database_id_for_filter("tmrna_website"), Some(6));
        assert_eq!(database_id_for_filter("silva"), None);
    }

    #[test]
    fn labels_resolve_imported_databases() {
        assert_eq!(by_label("rfam").map(|db| db.name), Some("Rfam"));
        assert!(by_label("").is_none());
        assert!(EXPERT_DATABASES.iter().filter(|db| db.imported).all(|db| !db.label.is_empty()));
    }
}
