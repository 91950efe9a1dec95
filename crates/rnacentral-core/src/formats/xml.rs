//! # EBeye XML Dump
//!
//! Metadata about unique RNA sequences in the XML format consumed by the
//! EBI search indexer.
//!
//! One `<entry>` is written per sequence and organism (`UPI_TAXID`). The
//! active cross-references of that organism are joined with their
//! accessions, releases, precomputed annotation and Rfam hits, and every
//! column is folded into an ordered set so repeated values collapse.
//!
//! Values are stored raw and XML-escaped exactly once when the entry is
//! rendered.

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::storage::SequenceStore;
use crate::{Accession, Result, RfamHit, Rna, Upi};

/// Organisms whose entries rank above the rest.
pub const POPULAR_SPECIES: [u32; 10] = [
    9606,   // human
    10090,  // mouse
    7955,   // zebrafish
    3702,   // Arabidopsis thaliana
    6239,   // Caenorhabditis elegans
    7227,   // Drosophila melanogaster
    559292, // Saccharomyces cerevisiae S288c
    4896,   // Schizosaccharomyces pombe
    511145, // Escherichia coli str. K-12 substr. MG1655
    224308, // Bacillus subtilis subsp. subtilis str. 168
];

const HUMAN: u32 = 9606;

/// RNA types too vague to rank well on their own.
const GENERIC_RNA_TYPES: [&str; 3] = ["misc_RNA", "misc RNA", "other"];

const DATE_FORMAT: &str = "%d %b %Y";

static INSDC_SUBMISSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Submitted \(\d{2}-\w{3}-\d{4}\) to the INSDC\. ?")
        .expect("valid INSDC pattern")
});
static MIRNA_PRODUCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w{3}-").expect("valid product pattern"));
static ONTOLOGY_TERMS: LazyLock<[(&'static str, Regex); 3]> = LazyLock::new(|| {
    [
        ("GO", Regex::new(r"GO:\d+").expect("valid GO pattern")),
        ("SO", Regex::new(r"SO:\d+").expect("valid SO pattern")),
        ("ECO", Regex::new(r"ECO:\d+").expect("valid ECO pattern")),
    ]
});

// =============================================================================
// BOOST
// =============================================================================

/// Search ranking score, counted in half steps.
///
/// Renders as `3` for whole values and `2.5` for half values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Boost(i32);

impl Boost {
    /// A whole-number boost.
    #[must_use]
    pub const fn whole(value: i32) -> Self {
        Self(value * 2)
    }

    /// Lower the boost by half a step.
    #[must_use]
    pub const fn minus_half(self) -> Self {
        Self(self.0 - 1)
    }

    /// Rank an entry.
    ///
    /// `4` for HGNC entries, `3` for human, `2` for popular species, `1`
    /// otherwise and `0` for obsolete entries. Half a step is taken off
    /// for a single generic RNA type and again for an incomplete sequence.
    #[must_use]
    pub fn compute(
        active: bool,
        hgnc: bool,
        taxids: &BTreeSet<u32>,
        rna_types: &BTreeSet<String>,
        rfam_problems: &BTreeSet<String>,
    ) -> Self {
        let mut boost = if !active {
            Self::whole(0)
        } else if hgnc {
            Self::whole(4)
        } else if taxids.contains(&HUMAN) {
            Self::whole(3)
        } else if taxids.iter().any(|t| POPULAR_SPECIES.contains(t)) {
            Self::whole(2)
        } else {
            Self::whole(1)
        };

        if rna_types.len() == 1
            && rna_types
                .iter()
                .any(|t| GENERIC_RNA_TYPES.contains(&t.as_str()))
        {
            boost = boost.minus_half();
        }
        if rfam_problems.contains("incomplete_sequence") {
            boost = boost.minus_half();
        }
        boost
    }
}

impl fmt::Display for Boost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let halves = self.0.unsigned_abs();
        if halves % 2 == 0 {
            write!(f, "{sign}{}", halves / 2)
        } else {
            write!(f, "{sign}{}.5", halves / 2)
        }
    }
}

// =============================================================================
// ESCAPING
// =============================================================================

/// Escape `&`, `<` and `>` for element content.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value placed inside a double-quoted attribute.
#[must_use]
pub fn escape_attr(value: &str) -> String {
    escape(value).replace('"', "&quot;")
}

// =============================================================================
// JOINED ROWS
// =============================================================================

/// One active cross-reference joined with everything the entry needs.
#[derive(Debug, Clone)]
struct XrefRow {
    taxid: u32,
    deleted: bool,
    accession: Accession,
    expert_db: String,
    created: Option<NaiveDate>,
    last: Option<NaiveDate>,
    rna_type: Option<String>,
    rfam: Option<RfamHit>,
}

/// Active xrefs of a sequence in one organism. Rows repeat once per Rfam
/// hit; a sequence without hits yields one row with `rfam: None`.
fn xref_rows(store: &dyn SequenceStore, upi: &Upi, taxid: u32) -> Result<Vec<XrefRow>> {
    let precomputed = store.precomputed(upi, taxid)?;
    let rna_type = precomputed.as_ref().and_then(|p| p.rna_type.clone());
    let mut hits: Vec<Option<RfamHit>> = store.rfam_hits(upi)?.into_iter().map(Some).collect();
    if hits.is_empty() {
        hits.push(None);
    }

    let mut rows = Vec::new();
    for xref in store.xrefs(upi)? {
        if xref.taxid != taxid || !xref.is_active() {
            continue;
        }
        let Some(accession) = store.accession(&xref.accession)? else {
            continue;
        };
        let expert_db = store
            .database(xref.database_id)?
            .map(|db| db.display_name)
            .unwrap_or_default();
        let created = store.release(xref.created)?.map(|r| r.release_date);
        let last = store.release(xref.last)?.map(|r| r.release_date);
        for hit in &hits {
            rows.push(XrefRow {
                taxid: xref.taxid,
                deleted: xref.deleted,
                accession: accession.clone(),
                expert_db: expert_db.clone(),
                created,
                last,
                rna_type: rna_type.clone(),
                rfam: hit.clone(),
            });
        }
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct RfamStatus {
    #[serde(default)]
    problems: Vec<RfamProblem>,
}

#[derive(Debug, Deserialize)]
struct RfamProblem {
    name: String,
}

/// Names of the Rfam problems recorded for a sequence.
fn rfam_problem_names(upi: &Upi, taxid: u32, status: Option<&str>) -> Vec<String> {
    let Some(raw) = status.filter(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<RfamStatus>(raw) {
        Ok(status) => status.problems.into_iter().map(|p| p.name).collect(),
        Err(e) => {
            warn!(%upi, taxid, error = %e, "Malformed Rfam problems, treating as none");
            Vec::new()
        }
    }
}

// =============================================================================
// ENTRY DATA
// =============================================================================

/// Distinct values of one `UPI_TAXID` entry.
#[derive(Debug, Default)]
struct EntryData {
    taxid: BTreeSet<u32>,
    species: BTreeSet<String>,
    expert_db: BTreeSet<String>,
    organelle: BTreeSet<String>,
    created: BTreeSet<NaiveDate>,
    last: BTreeSet<NaiveDate>,
    deleted: BTreeSet<bool>,
    function: BTreeSet<String>,
    gene: BTreeSet<String>,
    gene_synonym: BTreeSet<String>,
    note: BTreeSet<String>,
    product: BTreeSet<String>,
    common_name: BTreeSet<String>,
    parent_accession: BTreeSet<String>,
    optional_id: BTreeSet<String>,
    locus_tag: BTreeSet<String>,
    standard_name: BTreeSet<String>,
    rfam_family_name: BTreeSet<String>,
    rfam_id: BTreeSet<String>,
    rfam_clan: BTreeSet<String>,
    rfam_problems: BTreeSet<String>,
    rna_type: BTreeSet<String>,
    tax_string: BTreeSet<String>,
    xrefs: BTreeSet<(String, String)>,
    hgnc: bool,
    authors: BTreeSet<String>,
    journal: BTreeSet<String>,
    insdc_submission: BTreeSet<String>,
    pub_title: BTreeSet<String>,
    pub_id: BTreeSet<u64>,
    popular_species: BTreeSet<u32>,
}

fn add(set: &mut BTreeSet<String>, value: &str) {
    if !value.is_empty() {
        set.insert(value.to_string());
    }
}

impl EntryData {
    fn store_row(&mut self, row: &XrefRow) {
        let acc = &row.accession;
        self.taxid.insert(row.taxid);
        self.deleted.insert(row.deleted);
        add(&mut self.species, &acc.species);
        add(&mut self.expert_db, &row.expert_db);
        add(&mut self.organelle, &acc.organelle);
        self.created.extend(row.created);
        self.last.extend(row.last);
        add(&mut self.function, &acc.function);
        add(&mut self.gene, &acc.gene);
        add(&mut self.gene_synonym, &acc.gene_synonym);
        add(&mut self.note, &acc.note);
        add(&mut self.product, &acc.product);
        add(&mut self.common_name, &acc.common_name);
        add(&mut self.parent_accession, &acc.parent_accession());
        add(&mut self.optional_id, &acc.optional_id);
        add(&mut self.locus_tag, &acc.locus_tag);
        add(&mut self.standard_name, &acc.standard_name);
        add(&mut self.tax_string, &acc.classification);

        self.store_xrefs(row);
        self.store_computed_gene(row);
        if let Some(hit) = &row.rfam {
            add(&mut self.rfam_family_name, &hit.short_name);
            add(&mut self.rfam_id, &hit.rfam_model_id);
            if let Some(clan) = &hit.rfam_clan {
                add(&mut self.rfam_clan, clan);
            }
        }

        let rna_type = match row.rna_type.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ if !acc.ncrna_class.is_empty() => acc.ncrna_class.as_str(),
            _ => acc.feature_name.as_str(),
        };
        add(&mut self.rna_type, &rna_type.replace('_', " "));
    }

    fn store_xrefs(&mut self, row: &XrefRow) {
        let acc = &row.accession;
        // optional ids are chain ids for PDB and INSDC accessions for SILVA
        if !matches!(row.expert_db.as_str(), "SILVA" | "PDB") && !acc.optional_id.is_empty() {
            self.xrefs
                .insert((row.expert_db.clone(), acc.optional_id.clone()));
        }

        let expert_db = row.expert_db.replace(' ', "_").to_uppercase();
        if !acc.non_coding_id.is_empty() || !expert_db.is_empty() {
            self.xrefs
                .insert((expert_db.clone(), acc.external_id.clone()));
        } else {
            self.xrefs
                .insert(("NON-CODING".to_string(), acc.accession.clone()));
        }

        if expert_db != "PDBE" {
            self.xrefs
                .insert(("ENA".to_string(), acc.parent_accession()));
        }

        if expert_db == "HGNC" {
            self.hgnc = true;
            self.xrefs
                .insert(("HGNC".to_string(), acc.accession.clone()));
        }

        if !acc.note.is_empty() {
            for (db, pattern) in ONTOLOGY_TERMS.iter() {
                for term in pattern.find_iter(&acc.note) {
                    self.xrefs
                        .insert(((*db).to_string(), term.as_str().to_string()));
                }
            }
        }
    }

    /// miRBase products such as `hsa-miR-21` give the gene name `miR-21`.
    fn store_computed_gene(&mut self, row: &XrefRow) {
        let acc = &row.accession;
        if acc.gene.is_empty()
            && !acc.product.is_empty()
            && row.expert_db.eq_ignore_ascii_case("mirbase")
            && MIRNA_PRODUCT.is_match(&acc.product)
        {
            let short = MIRNA_PRODUCT.replace(&acc.product, "");
            add(&mut self.gene, &short);
        }
    }

    fn store_literature(&mut self, store: &dyn SequenceStore, upi: &Upi, taxid: u32) -> Result<()> {
        for citation in store.publications(upi, Some(taxid))? {
            self.pub_id.insert(citation.id);
            add(&mut self.authors, &citation.authors);
            add(&mut self.pub_title, &citation.title);
            if let Some(pubmed) = citation.pubmed.filter(|p| !p.is_empty()) {
                self.xrefs.insert(("PUBMED".to_string(), pubmed));
            }
            if let Some(doi) = citation.doi.filter(|d| !d.is_empty()) {
                self.xrefs.insert(("DOI".to_string(), doi));
            }
            if citation.location.starts_with("Submitted") {
                let stripped = INSDC_SUBMISSION.replace(&citation.location, "");
                add(&mut self.insdc_submission, &stripped);
            } else {
                add(&mut self.journal, &citation.location);
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.deleted.contains(&false)
    }

    fn first_seen(&self) -> String {
        self.created
            .first()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }

    fn last_seen(&self) -> String {
        self.last
            .last()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

// =============================================================================
// RENDERING
// =============================================================================

fn field(out: &mut String, name: &str, value: &str) {
    if !value.is_empty() {
        out.push_str(&format!("<field name=\"{name}\">{}</field>\n", escape(value)));
    }
}

fn fields<'a>(out: &mut String, name: &str, values: impl IntoIterator<Item = &'a String>) {
    for value in values {
        field(out, name, value);
    }
}

struct EntryHeader<'a> {
    rna: &'a Rna,
    taxid: u32,
    description: &'a str,
    has_genomic_coordinates: bool,
}

fn render_entry(header: &EntryHeader<'_>, data: &EntryData, boost: Boost) -> String {
    let id = header.rna.upi.with_taxid(header.taxid);
    let mut out = String::new();
    out.push_str(&format!("<entry id=\"{id}\">\n"));
    out.push_str(&format!("<name>Unique RNA Sequence {id}</name>\n"));
    out.push_str(&format!(
        "<description>{}</description>\n",
        escape(header.description)
    ));
    out.push_str("<dates>\n");
    out.push_str(&format!(
        "<date value=\"{}\" type=\"first_seen\" />\n",
        data.first_seen()
    ));
    out.push_str(&format!(
        "<date value=\"{}\" type=\"last_seen\" />\n",
        data.last_seen()
    ));
    out.push_str("</dates>\n");

    out.push_str("<cross_references>\n");
    for (dbname, dbkey) in &data.xrefs {
        if dbkey.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "<ref dbname=\"{}\" dbkey=\"{}\" />\n",
            escape_attr(dbname),
            escape_attr(dbkey)
        ));
    }
    for taxid in &data.taxid {
        out.push_str(&format!(
            "<ref dbkey=\"{taxid}\" dbname=\"ncbi_taxonomy_id\" />\n"
        ));
    }
    out.push_str("</cross_references>\n");

    out.push_str("<additional_fields>\n");
    field(&mut out, "active", if data.is_active() { "Active" } else { "Obsolete" });
    field(&mut out, "length", &header.rna.length.to_string());
    fields(&mut out, "species", &data.species);
    fields(&mut out, "organelle", &data.organelle);
    fields(&mut out, "expert_db", &data.expert_db);
    fields(&mut out, "common_name", &data.common_name);
    fields(&mut out, "function", &data.function);
    fields(&mut out, "gene", &data.gene);
    for synonym in &data.gene_synonym {
        field(&mut out, "gene_synonym", &synonym.replace(' ', ";"));
    }
    fields(&mut out, "rna_type", &data.rna_type);
    fields(&mut out, "product", &data.product);
    field(
        &mut out,
        "has_genomic_coordinates",
        if header.has_genomic_coordinates { "True" } else { "False" },
    );
    field(&mut out, "md5", &header.rna.md5);
    let authors: BTreeSet<&str> = data
        .authors
        .iter()
        .flat_map(|list| list.split(", "))
        .collect();
    for author in authors {
        field(&mut out, "author", author);
    }
    fields(&mut out, "journal", &data.journal);
    fields(&mut out, "insdc_submission", &data.insdc_submission);
    fields(&mut out, "pub_title", &data.pub_title);
    for pub_id in &data.pub_id {
        field(&mut out, "pub_id", &pub_id.to_string());
    }
    for taxid in &data.popular_species {
        field(&mut out, "popular_species", &taxid.to_string());
    }
    field(&mut out, "boost", &boost.to_string());
    fields(&mut out, "locus_tag", &data.locus_tag);
    fields(&mut out, "standard_name", &data.standard_name);
    fields(&mut out, "rfam_family_name", &data.rfam_family_name);
    fields(&mut out, "rfam_id", &data.rfam_id);
    fields(&mut out, "rfam_clan", &data.rfam_clan);
    if data.rfam_problems.is_empty() {
        field(&mut out, "rfam_problems", "none");
    } else {
        fields(&mut out, "rfam_problems", &data.rfam_problems);
    }
    field(
        &mut out,
        "rfam_problem_found",
        if data.rfam_problems.is_empty() { "False" } else { "True" },
    );
    fields(&mut out, "tax_string", &data.tax_string);
    out.push_str("</additional_fields>\n");
    out.push_str("</entry>\n");
    out
}

// =============================================================================
// EXPORTER
// =============================================================================

/// Whether an organism has an active xref with a known accession, which is
/// what makes [`xref_rows`] non-empty.
fn has_entry(store: &dyn SequenceStore, upi: &Upi, taxid: u32) -> Result<bool> {
    for xref in store.xrefs(upi)? {
        if xref.taxid == taxid && xref.is_active() && store.accession(&xref.accession)?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Builds XML dump entries for unique RNA sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct RnaXmlExporter;

impl RnaXmlExporter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// One entry per organism with active cross-references.
    pub fn xml_entries(&self, store: &dyn SequenceStore, rna: &Rna) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        for taxid in store.taxids(&rna.upi, false)? {
            if let Some(entry) = self.entry(store, rna, taxid)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Number of entries [`Self::xml_entries`] yields, without rendering them.
    pub fn entry_count(&self, store: &dyn SequenceStore, rna: &Rna) -> Result<usize> {
        let mut count = 0;
        for taxid in store.taxids(&rna.upi, false)? {
            if has_entry(store, &rna.upi, taxid)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// All entries of a sequence concatenated.
    pub fn get_xml_entry(&self, store: &dyn SequenceStore, rna: &Rna) -> Result<String> {
        Ok(self.xml_entries(store, rna)?.concat())
    }

    fn entry(&self, store: &dyn SequenceStore, rna: &Rna, taxid: u32) -> Result<Option<String>> {
        let rows = xref_rows(store, &rna.upi, taxid)?;
        let mut data = EntryData::default();
        for row in &rows {
            data.store_row(row);
        }
        if data.xrefs.is_empty() {
            return Ok(None);
        }

        let status = store.precomputed(&rna.upi, taxid)?.and_then(|p| p.rfam_problems);
        data.rfam_problems
            .extend(rfam_problem_names(&rna.upi, taxid, status.as_deref()));
        data.store_literature(store, &rna.upi, taxid)?;
        data.popular_species = data
            .taxid
            .iter()
            .copied()
            .filter(|t| POPULAR_SPECIES.contains(t))
            .collect();

        let boost = Boost::compute(
            data.is_active(),
            data.hgnc,
            &data.taxid,
            &data.rna_type,
            &data.rfam_problems,
        );
        let description = store.description(&rna.upi, taxid)?;
        let header = EntryHeader {
            rna,
            taxid,
            description: &description,
            has_genomic_coordinates: store.has_genomic_coordinates(&rna.upi, taxid)?,
        };
        Ok(Some(render_entry(&header, &data, boost)))
    }
}

/// Writes a complete EBeye dump: the `<database>` envelope around the
/// entries of every sequence in a store.
#[derive(Debug, Clone)]
pub struct XmlDumpWriter {
    release: String,
    release_date: NaiveDate,
    limit: Option<usize>,
}

impl XmlDumpWriter {
    #[must_use]
    pub fn new(release: impl Into<String>, release_date: NaiveDate) -> Self {
        Self {
            release: release.into(),
            release_date,
            limit: None,
        }
    }

    /// Only export the first `sequences` sequences.
    #[must_use]
    pub fn with_limit(mut self, sequences: usize) -> Self {
        self.limit = Some(sequences);
        self
    }

    /// Write the dump and return the number of entries.
    ///
    /// Entries are counted in a first pass for `<entry_count>`, then
    /// rendered and written one sequence at a time.
    pub fn write<W: Write>(&self, store: &dyn SequenceStore, out: &mut W) -> Result<usize> {
        let exporter = RnaXmlExporter::new();
        let rnas = store.rnas()?;
        let take = self.limit.unwrap_or(rnas.len());

        let mut expected = 0;
        for rna in rnas.iter().take(take) {
            expected += exporter.entry_count(store, rna)?;
        }

        writeln!(out, "<database>")?;
        writeln!(out, "<name>RNAcentral</name>")?;
        writeln!(
            out,
            "<description>a database for non-protein coding RNA sequences</description>"
        )?;
        writeln!(out, "<release>{}</release>", escape(&self.release))?;
        writeln!(
            out,
            "<release_date>{}</release_date>",
            self.release_date.format("%d-%b-%Y")
        )?;
        writeln!(out, "<entry_count>{expected}</entry_count>")?;
        writeln!(out, "<entries>")?;
        let mut written = 0;
        for rna in rnas.iter().take(take) {
            for entry in exporter.xml_entries(store, rna)? {
                out.write_all(entry.as_bytes())?;
                written += 1;
            }
        }
        writeln!(out, "</entries>")?;
        writeln!(out, "</database>")?;
        out.flush()?;

        if written != expected {
            warn!(expected, written, "XML entry count changed while writing");
        }
        info!(entries = written, "XML dump complete");
        Ok(written)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{Citation, Database, Dataset, Precomputed, Release, ReleaseType, Xref};

    const UPI: &str = "URS0000000001";

    fn upi() -> Upi {
        Upi::parse(UPI).unwrap()
    }

    fn base_dataset() -> Dataset {
        let mut dataset = Dataset::new();
        dataset.insert_rna(Rna {
            upi: upi(),
            md5: "abc123".to_string(),
            length: 22,
            sequence: "UGAGGUAGUAGGUUGUAUAGUU".to_string(),
        });
        dataset.insert_database(Database {
            id: 4,
            name: "MIRBASE".to_string(),
            display_name: "miRBase".to_string(),
        });
        dataset.insert_database(Database {
            id: 7,
            name: "HGNC".to_string(),
            display_name: "HGNC".to_string(),
        });
        for (id, date) in [(1, "2014-11-18"), (2, "2015-03-02")] {
            dataset.insert_release(Release {
                id,
                database_id: 4,
                release_date: date.parse().unwrap(),
                release_type: ReleaseType::Full,
            });
        }
        dataset
    }

    fn add_xref(
        dataset: &mut Dataset,
        accession: Accession,
        database_id: u32,
        taxid: u32,
        deleted: bool,
    ) {
        dataset.insert_xref(Xref {
            upi: upi(),
            accession: accession.accession.clone(),
            database_id,
            taxid,
            deleted,
            created: 1,
            last: 2,
        });
        dataset.insert_accession(accession);
    }

    fn mirbase_accession() -> Accession {
        Accession {
            accession: "MIMAT0000062".to_string(),
            parent_ac: "AB000001".to_string(),
            seq_version: 1,
            feature_name: "ncRNA".to_string(),
            ncrna_class: "miRNA".to_string(),
            species: "Homo sapiens".to_string(),
            database: "MIRBASE".to_string(),
            external_id: "MI0000060".to_string(),
            optional_id: "hsa-let-7a-1".to_string(),
            product: "hsa-let-7a-5p".to_string(),
            note: "GO:0035195 SO:0000276".to_string(),
            classification: "Eukaryota; Metazoa".to_string(),
            ..Accession::default()
        }
    }

    #[test]
    fn boost_renders_half_steps() {
        assert_eq!(Boost::whole(3).to_string(), "3");
        assert_eq!(Boost::whole(3).minus_half().to_string(), "2.5");
        assert_eq!(Boost::whole(0).minus_half().to_string(), "-0.5");
        assert_eq!(Boost::whole(1).minus_half().minus_half().to_string(), "0");
    }

    #[test]
    fn boost_ranks_by_priority() {
        let human: BTreeSet<u32> = [9606].into();
        let mouse: BTreeSet<u32> = [10090].into();
        let other: BTreeSet<u32> = [12345].into();
        let none = BTreeSet::new();
        let mirna: BTreeSet<String> = ["miRNA".to_string()].into();

        assert_eq!(Boost::compute(true, true, &other, &mirna, &none), Boost::whole(4));
        assert_eq!(Boost::compute(true, false, &human, &mirna, &none), Boost::whole(3));
        assert_eq!(Boost::compute(true, false, &mouse, &mirna, &none), Boost::whole(2));
        assert_eq!(Boost::compute(true, false, &other, &mirna, &none), Boost::whole(1));
        assert_eq!(Boost::compute(false, true, &human, &mirna, &none), Boost::whole(0));
    }

    #[test]
    fn boost_penalises_generic_type_and_incomplete_sequence() {
        let human: BTreeSet<u32> = [9606].into();
        let misc: BTreeSet<String> = ["misc RNA".to_string()].into();
        let problems: BTreeSet<String> = ["incomplete_sequence".to_string()].into();
        assert_eq!(Boost::compute(true, false, &human, &misc, &problems).to_string(), "2");

        let two: BTreeSet<String> = ["misc RNA".to_string(), "miRNA".to_string()].into();
        let none = BTreeSet::new();
        assert_eq!(Boost::compute(true, false, &human, &two, &none), Boost::whole(3));
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn entry_contains_expected_sections() {
        let mut dataset = base_dataset();
        add_xref(&mut dataset, mirbase_accession(), 4, 9606, false);
        dataset.insert_precomputed(Precomputed {
            upi: upi(),
            taxid: 9606,
            description: "Homo sapiens hsa-let-7a-5p".to_string(),
            rna_type: Some("miRNA".to_string()),
            rfam_problems: Some(
                r#"{"has_issue": true, "problems": [{"name": "possible_contamination"}]}"#
                    .to_string(),
            ),
        });
        dataset.insert_citation(
            "MIMAT0000062",
            Citation {
                id: 11,
                authors: "Smith J., Doe A.".to_string(),
                location: "Submitted (12-JAN-2010) to the INSDC. Sanger Institute".to_string(),
                title: "Small & smaller RNAs".to_string(),
                pubmed: Some("12345".to_string()),
                doi: None,
            },
        );

        let rna = dataset.rna(&upi()).unwrap().unwrap();
        let xml = RnaXmlExporter::new().get_xml_entry(&dataset, &rna).unwrap();

        assert!(xml.starts_with("<entry id=\"URS0000000001_9606\">\n"));
        assert!(xml.contains("<name>Unique RNA Sequence URS0000000001_9606</name>"));
        assert!(xml.contains("<description>Homo sapiens hsa-let-7a-5p</description>"));
        assert!(xml.contains("<date value=\"18 Nov 2014\" type=\"first_seen\" />"));
        assert!(xml.contains("<date value=\"02 Mar 2015\" type=\"last_seen\" />"));
        assert!(xml.contains("<ref dbname=\"miRBase\" dbkey=\"hsa-let-7a-1\" />"));
        assert!(xml.contains("<ref dbname=\"MIRBASE\" dbkey=\"MI0000060\" />"));
        assert!(xml.contains("<ref dbname=\"ENA\" dbkey=\"AB000001.1\" />"));
        assert!(xml.contains("<ref dbname=\"GO\" dbkey=\"GO:0035195\" />"));
        assert!(xml.contains("<ref dbname=\"SO\" dbkey=\"SO:0000276\" />"));
        assert!(xml.contains("<ref dbname=\"PUBMED\" dbkey=\"12345\" />"));
        assert!(xml.contains("<ref dbkey=\"9606\" dbname=\"ncbi_taxonomy_id\" />"));
        assert!(xml.contains("<field name=\"active\">Active</field>"));
        assert!(xml.contains("<field name=\"gene\">let-7a-5p</field>"));
        assert!(xml.contains("<field name=\"author\">Smith J.</field>"));
        assert!(xml.contains("<field name=\"author\">Doe A.</field>"));
        assert!(xml.contains("<field name=\"insdc_submission\">Sanger Institute</field>"));
        assert!(xml.contains("<field name=\"pub_title\">Small &amp; smaller RNAs</field>"));
        assert!(xml.contains("<field name=\"popular_species\">9606</field>"));
        assert!(xml.contains("<field name=\"boost\">3</field>"));
        assert!(xml.contains("<field name=\"rfam_problems\">possible_contamination</field>"));
        assert!(xml.contains("<field name=\"rfam_problem_found\">True</field>"));
        assert!(xml.contains("<field name=\"has_genomic_coordinates\">False</field>"));
        assert!(!xml.contains("\n\n"));
        assert!(!xml.contains("\n "));
    }

    #[test]
    fn additional_fields_follow_fixed_order() {
        let mut dataset = base_dataset();
        add_xref(&mut dataset, mirbase_accession(), 4, 9606, false);
        let rna = dataset.rna(&upi()).unwrap().unwrap();
        let xml = RnaXmlExporter::new().get_xml_entry(&dataset, &rna).unwrap();

        let position = |name: &str| xml.find(&format!("<field name=\"{name}\">")).unwrap();
        assert!(position("active") < position("length"));
        assert!(position("length") < position("species"));
        assert!(position("rna_type") < position("product"));
        assert!(position("md5") < position("boost"));
        assert!(position("boost") < position("rfam_problems"));
        assert!(position("rfam_problem_found") < position("tax_string"));
        assert!(xml.contains("<field name=\"rfam_problems\">none</field>"));
        assert!(xml.contains("<field name=\"rfam_problem_found\">False</field>"));
    }

    #[test]
    fn hgnc_entries_get_top_boost() {
        let mut dataset = base_dataset();
        add_xref(
            &mut dataset,
            Accession {
                accession: "HGNC:31476".to_string(),
                parent_ac: "HGNC".to_string(),
                database: "HGNC".to_string(),
                external_id: "HGNC:31476".to_string(),
                feature_name: "ncRNA".to_string(),
                ..Accession::default()
            },
            7,
            9606,
            false,
        );
        let rna = dataset.rna(&upi()).unwrap().unwrap();
        let xml = RnaXmlExporter::new().get_xml_entry(&dataset, &rna).unwrap();
        assert!(xml.contains("<ref dbname=\"HGNC\" dbkey=\"HGNC:31476\" />"));
        assert!(xml.contains("<field name=\"boost\">4</field>"));
    }

    #[test]
    fn organisms_without_active_xrefs_are_skipped() {
        let mut dataset = base_dataset();
        add_xref(&mut dataset, mirbase_accession(), 4, 9606, false);
        let mut mouse = mirbase_accession();
        mouse.accession = "MIMAT0000521".to_string();
        add_xref(&mut dataset, mouse, 4, 10090, true);

        let rna = dataset.rna(&upi()).unwrap().unwrap();
        let entries = RnaXmlExporter::new().xml_entries(&dataset, &rna).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("URS0000000001_9606"));
    }

    #[test]
    fn malformed_rfam_problems_are_ignored() {
        let names = rfam_problem_names(&upi(), 9606, Some("{not json"));
        assert!(names.is_empty());
        let names = rfam_problem_names(
            &upi(),
            9606,
            Some(r#"{"problems": [{"name": "incomplete_sequence"}]}"#),
        );
        assert_eq!(names, vec!["incomplete_sequence".to_string()]);
    }

    #[test]
    fn dump_wraps_entries() {
        let mut dataset = base_dataset();
        add_xref(&mut dataset, mirbase_accession(), 4, 9606, false);
        let mut out = Vec::new();
        let count = XmlDumpWriter::new("7.0", "2016-05-01".parse().unwrap())
            .write(&dataset, &mut out)
            .unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert_eq!(count, 1);
        assert!(xml.starts_with("<database>\n<name>RNAcentral</name>\n"));
        assert!(xml.contains("<release>7.0</release>"));
        assert!(xml.contains("<release_date>01-May-2016</release_date>"));
        assert!(xml.contains("<entry_count>1</entry_count>"));
        assert!(xml.trim_end().ends_with("</entries>\n</database>"));
    }

    #[test]
    fn entry_count_matches_rendered_entries() {
        let mut dataset = base_dataset();
        add_xref(&mut dataset, mirbase_accession(), 4, 9606, false);
        let mut mouse = mirbase_accession();
        mouse.accession = "MIRBASE:MI0000002".to_string();
        add_xref(&mut dataset, mouse, 4, 10090, true);
        let rna = dataset.rna(&upi()).unwrap().unwrap();

        let exporter = RnaXmlExporter::new();
        let rendered = exporter.xml_entries(&dataset, &rna).unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(exporter.entry_count(&dataset, &rna).unwrap(), rendered.len());
    }
}
