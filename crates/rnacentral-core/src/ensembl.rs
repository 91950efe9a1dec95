//! # Ensembl Assemblies
//!
//! Genome assembly metadata for organisms with an Ensembl core database,
//! and the INSDC to Ensembl chromosome names of each assembly.
//!
//! Source data come as a JSON snapshot of the Ensembl public server: one
//! record per database with its `meta` key/value table and the INSDC
//! synonyms of its chromosomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::storage::SequenceStore;
use crate::{EnsemblAssembly, EnsemblInsdcMapping, Error, Result};

/// Oldest Ensembl release considered.
pub const MIN_RELEASE: u32 = 80;

/// Meta table keys an assembly cannot be built without.
const REQUIRED_META: [&str; 6] = [
    "assembly.default",
    "assembly.name",
    "species.taxonomy_id",
    "species.common_name",
    "species.url",
    "species.division",
];

/// One chromosome name pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsdcSynonym {
    pub insdc: String,
    pub ensembl: String,
}

/// Snapshot of one Ensembl database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsemblDatabase {
    pub database: String,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub insdc: Vec<InsdcSynonym>,
}

/// Read a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Vec<EnsemblDatabase>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Most recent core database per organism.
///
/// Names look like `homo_sapiens_core_91_38`: exactly four underscores,
/// no `mirror`, release at least [`MIN_RELEASE`].
#[must_use]
pub fn select_core_databases<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut latest: BTreeMap<String, (u32, String)> = BTreeMap::new();
    for name in names {
        if name.matches('_').count() != 4 || name.contains("mirror") {
            continue;
        }
        let parts: Vec<&str> = name.split('_').collect();
        let [genus, species, kind, release, _assembly] = parts[..] else {
            continue;
        };
        let Ok(release) = release.parse::<u32>() else {
            debug!(database = name, "Skipping database with non-numeric release");
            continue;
        };
        if release < MIN_RELEASE || kind != "core" {
            continue;
        }
        let organism = format!("{genus} {species}");
        let newer = latest
            .get(&organism)
            .is_none_or(|(current, _)| release > *current);
        if newer {
            latest.insert(organism, (release, name.to_string()));
        }
    }
    latest.into_values().map(|(_, name)| name).collect()
}

/// Build an assembly record from a `meta` table.
pub fn assembly_from_meta(meta: &BTreeMap<String, String>) -> Result<EnsemblAssembly> {
    let get = |key: &str| -> Result<String> {
        meta.get(key)
            .cloned()
            .ok_or_else(|| Error::MissingField(key.to_string()))
    };
    for key in REQUIRED_META {
        get(key)?;
    }
    let taxid_raw = get("species.taxonomy_id")?;
    let taxid = taxid_raw
        .parse::<u32>()
        .map_err(|_| Error::MissingField(format!("species.taxonomy_id ({taxid_raw})")))?;
    Ok(EnsemblAssembly {
        assembly_id: get("assembly.default")?,
        assembly_full_name: get("assembly.name")?,
        gca_accession: meta.get("assembly.accession").cloned(),
        assembly_ucsc: meta.get("assembly.ucsc_alias").cloned(),
        common_name: get("species.common_name")?,
        taxid,
        ensembl_url: get("species.url")?,
        division: get("species.division")?,
    })
}

/// Tab-separated summary line of an assembly.
#[must_use]
pub fn summary_line(assembly: &EnsemblAssembly) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        assembly.assembly_id,
        assembly.assembly_full_name,
        assembly.gca_accession.as_deref().unwrap_or(""),
        assembly.assembly_ucsc.as_deref().unwrap_or(""),
        assembly.common_name,
        assembly.taxid
    )
}

/// Replace assemblies and chromosome mappings with those of the most
/// recent core databases in the snapshot. Returns the stored assemblies.
pub fn update_assemblies(
    store: &mut dyn SequenceStore,
    snapshot: &[EnsemblDatabase],
) -> Result<Vec<EnsemblAssembly>> {
    let selected = select_core_databases(snapshot.iter().map(|db| db.database.as_str()));
    let mut stored = Vec::with_capacity(selected.len());
    for name in selected {
        let Some(db) = snapshot.iter().find(|db| db.database == name) else {
            continue;
        };
        let assembly = assembly_from_meta(&db.meta)?;
        let mappings = db
            .insdc
            .iter()
            .map(|s| EnsemblInsdcMapping {
                assembly_id: assembly.assembly_id.clone(),
                insdc: s.insdc.clone(),
                ensembl_name: s.ensembl.clone(),
            })
            .collect();
        info!(database = %name, assembly = %assembly.assembly_id, "Updating Ensembl assembly");
        store.replace_ensembl_assembly(assembly.clone(), mappings)?;
        stored.push(assembly);
    }
    Ok(stored)
}
