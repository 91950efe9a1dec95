//! Integration tests for RNAcentral CLI commands.
//!
//! Uses tempfile for the catalogue and command outputs.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDate;
use rnacentral::cli::{
    CliError, cmd_export_fasta, cmd_export_mapping, cmd_export_xml, cmd_import_genome_mappings,
    cmd_init, cmd_load, cmd_map_mgi, cmd_status, cmd_update_ensembl,
};
use rnacentral_core::{
    Accession, Database, Dataset, RedbStore, Release, ReleaseType, Rna, SequenceStore, Upi, Xref,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn upi(raw: &str) -> Upi {
    Upi::parse(raw).unwrap()
}

/// A small dataset: two active sequences and one inactive.
fn sample_dataset() -> Dataset {
    let mut data = Dataset::new();
    data.insert_database(Database {
        id: 1,
        name: "ENA".to_string(),
        display_name: "ENA".to_string(),
    });
    data.insert_database(Database {
        id: 4,
        name: "MIRBASE".to_string(),
        display_name: "miRBase".to_string(),
    });
    data.insert_release(Release {
        id: 1,
        database_id: 1,
        release_date: NaiveDate::from_ymd_opt(2014, 3, 1).unwrap(),
        release_type: ReleaseType::Full,
    });
    for (raw, sequence) in [
        ("URS0000000001", "UGAGGUAGUAGGUUGUAUAGUU"),
        ("URS0000000002", "ACGUACGUACGUNNNN"),
        ("URS0000000003", "GGGGCCCCAAAAUUUU"),
    ] {
        data.insert_rna(Rna {
            upi: upi(raw),
            md5: format!("md5-{raw}"),
            length: sequence.len() as u32,
            sequence: sequence.to_string(),
        });
    }
    let rows = [
        ("URS0000000001", "MIRBASE:MI0000001", "MIRBASE", "MI0000001", 4, false),
        ("URS0000000001", "NR_029476.1:1..22:ncRNA", "ENA", "", 1, false),
        ("URS0000000002", "AB000002.1:1..16:ncRNA", "ENA", "", 1, false),
        ("URS0000000003", "MIRBASE:MI0000003", "MIRBASE", "MI0000003", 4, true),
    ];
    for (u, ac, database, external_id, db_id, deleted) in rows {
        data.insert_accession(Accession {
            accession: ac.to_string(),
            parent_ac: ac.split('.').next().unwrap().to_string(),
            seq_version: 1,
            species: "Homo sapiens".to_string(),
            description: "Homo sapiens let-7a".to_string(),
            feature_name: "ncRNA".to_string(),
            ncrna_class: "miRNA".to_string(),
            database: database.to_string(),
            external_id: external_id.to_string(),
            ..Accession::default()
        });
        data.insert_xref(Xref {
            upi: upi(u),
            accession: ac.to_string(),
            database_id: db_id,
            taxid: 9606,
            deleted,
            created: 1,
            last: 1,
        });
    }
    data
}

/// Initialized and loaded catalogue.
fn loaded_db(dir: &TempDir) -> PathBuf {
    let db_path = dir.path().join("rnacentral.redb");
    let dataset_path = dir.path().join("dataset.json");
    sample_dataset().to_json_file(&dataset_path).unwrap();
    cmd_init(&db_path, false).unwrap();
    cmd_load(&db_path, &dataset_path).unwrap();
    db_path
}

// =============================================================================
// INIT / LOAD / STATUS
// =============================================================================

#[test]
fn test_init_creates_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("rnacentral.redb");

    let result = cmd_init(&db_path, false);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("rnacentral.redb");

    cmd_init(&db_path, false).unwrap();
    let result = cmd_init(&db_path, false);
    assert!(matches!(result, Err(CliError::AlreadyExists(_))));

    // Force recreates it empty
    assert!(cmd_init(&db_path, true).is_ok());
}

#[test]
fn test_load_imports_dataset() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);

    let store = RedbStore::open(&db_path).unwrap();
    let stats = store.stats().unwrap();
    assert_eq!(stats.sequences, 3);
    assert_eq!(stats.xrefs, 4);
    assert_eq!(stats.databases, 2);
}

#[test]
fn test_status_requires_database() {
    let temp = create_temp_dir();
    let missing = temp.path().join("missing.redb");
    assert!(matches!(
        cmd_status(&missing, false),
        Err(CliError::MissingDatabase(_))
    ));

    let db_path = loaded_db(&temp);
    assert!(cmd_status(&db_path, false).is_ok());
    assert!(cmd_status(&db_path, true).is_ok());
}

// =============================================================================
// EXPORTS
// =============================================================================

#[test]
fn test_export_fasta_writes_release_files() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);
    let out = temp.path().join("ftp");

    cmd_export_fasta(&db_path, &out, false).unwrap();

    let dir = out.join("sequences");
    let active = std::fs::read_to_string(dir.join("rnacentral_active.fasta")).unwrap();
    assert!(active.starts_with(">URS0000000001\nUGAGGUAGUAGGUUGUAUAGUU\n"));
    assert!(active.contains(">URS0000000002\n"));

    let inactive = std::fs::read_to_string(dir.join("rnacentral_inactive.fasta")).unwrap();
    assert_eq!(inactive, ">URS0000000003\nGGGGCCCCAAAAUUUU\n");
    assert!(dir.join("readme.txt").exists());
    assert!(dir.join("example.txt").exists());
}

#[test]
fn test_export_xml_writes_envelope() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);
    let out = temp.path().join("rnacentral.xml");
    let date = NaiveDate::from_ymd_opt(2014, 3, 1).unwrap();

    cmd_export_xml(&db_path, &out, "1.0", date, None).unwrap();

    let xml = std::fs::read_to_string(&out).unwrap();
    assert!(xml.contains("<release>1.0</release>"));
    assert!(xml.contains("URS0000000001_9606"));
    assert!(xml.trim_end().ends_with("</database>"));
}

#[test]
fn test_export_mapping_requires_arguments() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);
    let out = temp.path().join("mirbase.tsv");

    let no_db = cmd_export_mapping(&db_path, None, Some(&out)).unwrap_err();
    assert_eq!(no_db.to_string(), "Must specify database to use");

    let no_file = cmd_export_mapping(&db_path, Some("mirbase"), None).unwrap_err();
    assert_eq!(no_file.to_string(), "Must specify an output filename");
}

#[test]
fn test_export_mapping_skips_inactive_xrefs() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);
    let out = temp.path().join("mirbase.tsv");

    cmd_export_mapping(&db_path, Some("mirbase"), Some(&out)).unwrap();

    let mapping = std::fs::read_to_string(&out).unwrap();
    assert_eq!(mapping, "MI0000001\tURS0000000001\n");
}

// =============================================================================
// IMPORTS
// =============================================================================

#[test]
fn test_import_genome_mappings() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);

    let missing = cmd_import_genome_mappings(&db_path, None).unwrap_err();
    assert_eq!(missing.to_string(), "Please specify input file");

    let input = temp.path().join("mappings.json");
    let mappings = json!([{
        "upi": "URS0000000001",
        "taxid": 9606,
        "chromosome": "9",
        "primary_start": 96938239,
        "primary_end": 96938318,
        "strand": 1
    }]);
    std::fs::write(&input, mappings.to_string()).unwrap();
    cmd_import_genome_mappings(&db_path, Some(&input)).unwrap();

    let store = RedbStore::open(&db_path).unwrap();
    let coords = store.coordinates("MIRBASE:MI0000001").unwrap();
    assert_eq!(coords.len(), 1);
    assert_eq!(coords[0].chromosome, "9");
    assert!(store.has_genomic_coordinates(&upi("URS0000000001"), 9606).unwrap());
}

#[test]
fn test_import_genome_mappings_rejects_bad_records() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);
    let input = temp.path().join("mappings.json");
    let mappings = json!([
        {"upi": "URS0000000001", "taxid": 9606, "chromosome": "9",
         "primary_start": 10, "primary_end": 20, "strand": 1},
        {"upi": "URS0000000002", "taxid": 9606, "chromosome": "1",
         "primary_start": 50, "primary_end": 20, "strand": 1}
    ]);
    std::fs::write(&input, mappings.to_string()).unwrap();

    assert!(cmd_import_genome_mappings(&db_path, Some(&input)).is_err());

    // nothing was written
    let store = RedbStore::open(&db_path).unwrap();
    assert!(store.coordinates("MIRBASE:MI0000001").unwrap().is_empty());
}

#[test]
fn test_map_mgi_adds_rnacentral_ids() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);
    let input = temp.path().join("mgi.json");
    let output = temp.path().join("mgi_mapped.json");
    let entries = json!([
        {"accession": "MGI:1", "xref_data": {"ref_seq": {"transcript_ids": ["NR_029476"]}}},
        {"accession": "MGI:2", "xref_data": {}}
    ]);
    std::fs::write(&input, entries.to_string()).unwrap();

    cmd_map_mgi(&db_path, &input, &output).unwrap();

    let mapped: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped[0]["accession"], "MGI:1");
    assert_eq!(mapped[0]["rnacentral_id"], "URS0000000001");
}

#[test]
fn test_update_ensembl_stores_latest_assembly() {
    let temp = create_temp_dir();
    let db_path = loaded_db(&temp);
    let snapshot = temp.path().join("ensembl.json");
    let meta = |assembly: &str| {
        json!({
            "assembly.default": assembly,
            "assembly.name": assembly,
            "species.taxonomy_id": "9606",
            "species.common_name": "human",
            "species.url": "Homo_sapiens",
            "species.division": "Ensembl"
        })
    };
    let databases = json!([
        {"database": "homo_sapiens_core_90_38", "meta": meta("GRCh37")},
        {"database": "homo_sapiens_core_91_38", "meta": meta("GRCh38"),
         "insdc": [{"insdc": "CM000663.2", "ensembl": "1"}]}
    ]);
    std::fs::write(&snapshot, databases.to_string()).unwrap();

    cmd_update_ensembl(&db_path, &snapshot).unwrap();

    let store = RedbStore::open(&db_path).unwrap();
    let assemblies = store.ensembl_assemblies().unwrap();
    assert_eq!(assemblies.len(), 1);
    assert_eq!(assemblies[0].assembly_id, "GRCh38");
    assert_eq!(store.insdc_mappings("GRCh38").unwrap().len(), 1);
}
