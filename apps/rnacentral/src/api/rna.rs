//! Sequence, accession and catalogue statistics endpoints.

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::NaiveDate;
use rnacentral_core::expert_db::{
    EXPERT_DATABASES, ExpertDatabase, by_label, database_id_for_filter,
};
use rnacentral_core::{
    Accession, Citation, PageRequest, ReleaseType, Rna, SequenceStore, SymbolCounts, Upi, Xref,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{ApiError, ApiResult, AppState, PageBody};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/rna", get(list_rna))
        .route("/api/v1/rna/", get(list_rna))
        .route("/api/v1/rna/{upi}", get(rna_detail))
        .route("/api/v1/rna/{upi}/xrefs", get(rna_xrefs))
        .route("/api/v1/rna/{upi}/fasta", get(rna_fasta))
        .route("/api/v1/rna/{upi}/summary", get(rna_summary))
        .route("/api/v1/accession/{id}/info", get(accession_info))
        .route("/api/v1/accession/{id}/citations", get(accession_citations))
        .route("/api/v1/stats", get(stats))
        .route("/api/v1/expert-dbs", get(expert_dbs))
        .route("/api/v1/expert-dbs/{label}", get(expert_db))
}

// =============================================================================
// REPRESENTATIONS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AccessionView {
    pub id: String,
    pub url: String,
    pub parent_accession: String,
    pub external_id: String,
    pub optional_id: String,
    pub description: String,
    pub species: String,
    pub gene: String,
    pub product: String,
    pub organelle: String,
    pub rna_type: String,
    pub biotype: String,
    pub source_url: String,
    pub expert_db_url: String,
    pub ensembl_species_url: String,
    pub pdb_entity_id: Option<String>,
    pub pdb_structured_note: Option<serde_json::Value>,
    pub hgnc_ensembl_id: Option<String>,
    pub hgnc_id: Option<String>,
    pub srpdb_id: Option<String>,
    pub citations: String,
}

impl AccessionView {
    fn new(state: &AppState, acc: &Accession) -> Self {
        Self {
            id: acc.accession.clone(),
            url: state.url(&format!("/api/v1/accession/{}/info", acc.accession)),
            parent_accession: acc.parent_accession(),
            external_id: acc.external_id.clone(),
            optional_id: acc.optional_id.clone(),
            description: acc.description.clone(),
            species: acc.species.clone(),
            gene: acc.gene.clone(),
            product: acc.product.clone(),
            organelle: acc.organelle.clone(),
            rna_type: acc.rna_type().to_string(),
            biotype: acc.biotype().to_string(),
            source_url: acc.ena_url(),
            expert_db_url: acc.expert_db_external_url(),
            ensembl_species_url: acc.ensembl_species_url(),
            pdb_entity_id: acc.pdb_entity_id().map(str::to_string),
            pdb_structured_note: acc.pdb_structured_note(),
            hgnc_ensembl_id: acc.hgnc_ensembl_id(),
            hgnc_id: acc.hgnc_id().map(str::to_string),
            srpdb_id: acc.srpdb_id(),
            citations: state.url(&format!("/api/v1/accession/{}/citations", acc.accession)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct XrefView {
    pub database: String,
    pub is_active: bool,
    pub first_seen: Option<NaiveDate>,
    pub last_seen: Option<NaiveDate>,
    pub taxid: u32,
    pub accession: Option<AccessionView>,
}

fn release_date(store: &dyn SequenceStore, id: u32) -> ApiResult<Option<NaiveDate>> {
    Ok(store.release(id)?.map(|r| r.release_date))
}

fn xref_view(state: &AppState, xref: &Xref) -> ApiResult<XrefView> {
    let store = state.store.as_ref();
    let database = store
        .database(xref.database_id)?
        .map(|db| db.display_name)
        .unwrap_or_default();
    Ok(XrefView {
        database,
        is_active: xref.is_active(),
        first_seen: release_date(store, xref.created)?,
        last_seen: release_date(store, xref.last)?,
        taxid: xref.taxid,
        accession: store
            .accession(&xref.accession)?
            .map(|acc| AccessionView::new(state, &acc)),
    })
}

/// Cross-references of an RNA: a link (nested) or inlined (flat).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum XrefsField {
    Link(String),
    Inline(Vec<XrefView>),
}

#[derive(Debug, Serialize)]
pub struct RnaView {
    pub url: String,
    pub rnacentral_id: String,
    pub md5: String,
    pub sequence: String,
    pub length: u32,
    pub xrefs: XrefsField,
}

fn rna_view(state: &AppState, rna: Rna, flat: bool, database: Option<u32>) -> ApiResult<RnaView> {
    let url = state.url(&format!("/api/v1/rna/{}", rna.upi));
    let xrefs = if flat {
        let mut views = Vec::new();
        for xref in state.store.xrefs(&rna.upi)? {
            if database.is_none_or(|id| id == xref.database_id) {
                views.push(xref_view(state, &xref)?);
            }
        }
        XrefsField::Inline(views)
    } else {
        XrefsField::Link(format!("{url}/xrefs"))
    };
    Ok(RnaView {
        url,
        rnacentral_id: rna.upi.to_string(),
        md5: rna.md5,
        sequence: rna.sequence,
        length: rna.length,
        xrefs,
    })
}

/// `flat=true` (any case, anything after `true` ignored) inlines xrefs.
fn is_flat(flat: Option<&str>) -> bool {
    flat.is_some_and(|f| f.to_ascii_lowercase().starts_with("true"))
}

fn find_rna(state: &AppState, raw: &str) -> ApiResult<Rna> {
    let upi = Upi::parse(raw)?;
    state
        .store
        .rna(&upi)?
        .ok_or(ApiError::NotFound("Not found"))
}

// =============================================================================
// RNA LIST
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RnaListParams {
    pub upi: Option<String>,
    pub md5: Option<String>,
    pub length: Option<u32>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub external_id: Option<String>,
    pub database: Option<String>,
    pub flat: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl RnaListParams {
    fn matches_sequence(&self, rna: &Rna) -> bool {
        self.upi.as_deref().is_none_or(|u| u == rna.upi.as_str())
            && self.md5.as_deref().is_none_or(|m| m == rna.md5)
            && self.length.is_none_or(|l| l == rna.length)
            && self.min_length.is_none_or(|l| rna.length >= l)
            && self.max_length.is_none_or(|l| rna.length <= l)
    }
}

/// Whether the sequence passes the xref-based filters.
fn matches_xrefs(
    store: &dyn SequenceStore,
    rna: &Rna,
    external_id: Option<&str>,
    database: Option<u32>,
) -> ApiResult<bool> {
    if external_id.is_none() && database.is_none() {
        return Ok(true);
    }
    let xrefs = store.xrefs(&rna.upi)?;
    if let Some(id) = database
        && !xrefs.iter().any(|x| x.database_id == id)
    {
        return Ok(false);
    }
    if let Some(wanted) = external_id {
        for xref in &xrefs {
            if store
                .accession(&xref.accession)?
                .is_some_and(|acc| acc.external_id == wanted)
            {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    Ok(true)
}

async fn list_rna(
    State(state): State<AppState>,
    Query(params): Query<RnaListParams>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<PageBody<RnaView>>> {
    let request = PageRequest::new(params.page, params.page_size);
    let flat = is_flat(params.flat.as_deref());

    // An unrecognised database name matches nothing.
    let database = match params.database.as_deref() {
        Some(name) => match database_id_for_filter(name) {
            Some(id) => Some(id),
            None => {
                let empty = request.paginate(Vec::new())?;
                return Ok(Json(PageBody::new(empty, &state.url("/api/v1/rna"), query.as_deref())));
            }
        },
        None => None,
    };

    let mut selected = Vec::new();
    for rna in state.store.rnas()? {
        if params.matches_sequence(&rna)
            && matches_xrefs(
                state.store.as_ref(),
                &rna,
                params.external_id.as_deref(),
                database,
            )?
        {
            selected.push(rna);
        }
    }

    let page = request
        .paginate(selected)?
        .map(|rna| rna_view(&state, rna, flat, database));
    let body = PageBody::new(page, &state.url("/api/v1/rna"), query.as_deref());
    Ok(Json(PageBody {
        count: body.count,
        next: body.next,
        previous: body.previous,
        results: body.results.into_iter().collect::<ApiResult<Vec<_>>>()?,
    }))
}

// =============================================================================
// RNA DETAIL
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct FlatParam {
    pub flat: Option<String>,
}

async fn rna_detail(
    State(state): State<AppState>,
    Path(upi): Path<String>,
    Query(params): Query<FlatParam>,
) -> ApiResult<Json<RnaView>> {
    let rna = find_rna(&state, &upi)?;
    Ok(Json(rna_view(&state, rna, is_flat(params.flat.as_deref()), None)?))
}

async fn rna_xrefs(
    State(state): State<AppState>,
    Path(upi): Path<String>,
) -> ApiResult<Json<Vec<XrefView>>> {
    let rna = find_rna(&state, &upi)?;
    let views = state
        .store
        .xrefs(&rna.upi)?
        .iter()
        .map(|x| xref_view(&state, x))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(views))
}

async fn rna_fasta(
    State(state): State<AppState>,
    Path(upi): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let rna = find_rna(&state, &upi)?;
    Ok(([(header::CONTENT_TYPE, "text/fasta")], rna.fasta()))
}

#[derive(Debug, Serialize)]
pub struct RnaSummary {
    pub rnacentral_id: String,
    pub length: u32,
    pub counts: SymbolCounts,
    pub is_active: bool,
    pub organisms: usize,
    pub databases: Vec<String>,
    pub first_seen: Option<NaiveDate>,
    pub last_seen: Option<NaiveDate>,
}

async fn rna_summary(
    State(state): State<AppState>,
    Path(upi): Path<String>,
) -> ApiResult<Json<RnaSummary>> {
    let rna = find_rna(&state, &upi)?;
    let store = state.store.as_ref();
    let xrefs = store.xrefs(&rna.upi)?;

    let mut databases = BTreeSet::new();
    let mut first_seen: Option<NaiveDate> = None;
    let mut last_seen: Option<NaiveDate> = None;
    for xref in &xrefs {
        if let Some(db) = store.database(xref.database_id)? {
            databases.insert(db.display_name);
        }
        if let Some(date) = release_date(store, xref.created)? {
            first_seen = Some(first_seen.map_or(date, |d| d.min(date)));
        }
        if let Some(date) = release_date(store, xref.last)? {
            last_seen = Some(last_seen.map_or(date, |d| d.max(date)));
        }
    }

    Ok(Json(RnaSummary {
        rnacentral_id: rna.upi.to_string(),
        length: rna.length,
        counts: rna.count_symbols(),
        is_active: xrefs.iter().any(Xref::is_active),
        organisms: store.taxids(&rna.upi, false)?.len(),
        databases: databases.into_iter().collect(),
        first_seen,
        last_seen,
    }))
}

// =============================================================================
// ACCESSIONS
// =============================================================================

async fn accession_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccessionView>> {
    let acc = state
        .store
        .accession(&id)?
        .ok_or(ApiError::NotFound("Not found"))?;
    Ok(Json(AccessionView::new(&state, &acc)))
}

async fn accession_citations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Citation>>> {
    if state.store.accession(&id)?.is_none() {
        return Err(ApiError::NotFound("Not found"));
    }
    Ok(Json(state.store.citations(&id)?))
}

// =============================================================================
// STATS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CatalogueStats {
    pub sequences: usize,
    pub databases: usize,
    pub last_full_release: Option<NaiveDate>,
    pub last_incremental_release: Option<NaiveDate>,
}

async fn stats(State(state): State<AppState>) -> ApiResult<Json<CatalogueStats>> {
    let releases = state.store.releases()?;
    let latest = |kind: ReleaseType| {
        releases
            .iter()
            .filter(|r| r.release_type == kind)
            .map(|r| r.release_date)
            .max()
    };
    Ok(Json(CatalogueStats {
        sequences: state.store.rnas()?.len(),
        databases: state.store.databases()?.len(),
        last_full_release: latest(ReleaseType::Full),
        last_incremental_release: latest(ReleaseType::Incremental),
    }))
}

async fn expert_dbs() -> Json<&'static [ExpertDatabase]> {
    Json(EXPERT_DATABASES)
}

/// One expert database by its url label, e.g. `mirbase`.
async fn expert_db(Path(label): Path<String>) -> ApiResult<Json<&'static ExpertDatabase>> {
    by_label(&label)
        .map(Json)
        .ok_or(ApiError::NotFound("Not found"))
}
