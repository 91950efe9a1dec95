//! # HTTP API
//!
//! axum router for the REST interface.
//!
//! Routes:
//! - `GET /health`
//! - `GET /api/v1/` links to the resources
//! - `/api/v1/rna...`, `/api/v1/accession...`, `/api/v1/stats`,
//!   `/api/v1/expert-dbs...`: see [`rna`]
//! - `/api/v1/sequence-search/...`: see [`search`]
//!
//! Hyperlinks in responses are absolute, built from the configured base url.

pub mod error;
pub mod rna;
pub mod search;

pub use error::{ApiError, ApiResult};

use axum::Json;
use axum::Router;
use axum::http::{Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use rnacentral_core::{Page, SequenceStore};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::jobs::JobQueue;

/// Catalogue handle shared by all requests.
pub type SharedStore = Arc<dyn SequenceStore + Send + Sync>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub jobs: JobQueue,
    /// Url prefix for hyperlinks, without trailing slash.
    pub base_url: String,
}

impl AppState {
    #[must_use]
    pub fn new(store: SharedStore, jobs: JobQueue, base_url: impl Into<String>) -> Self {
        Self {
            store,
            jobs,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute url of an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Paginated list body.
#[derive(Debug, Serialize)]
pub struct PageBody<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageBody<T> {
    /// Wrap a page, linking neighbours through `url` with the request's
    /// other query parameters kept.
    pub fn new(page: Page<T>, url: &str, query: Option<&str>) -> Self {
        Self {
            count: page.count,
            next: page.next_page().map(|n| page_link(url, query, n)),
            previous: page.previous_page().map(|n| page_link(url, query, n)),
            results: page.results,
        }
    }
}

fn page_link(url: &str, query: Option<&str>, page: usize) -> String {
    let mut params: Vec<String> = query
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page="))
        .map(str::to_string)
        .collect();
    params.push(format!("page={page}"));
    format!("{url}?{}", params.join("&"))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn api_root(axum::extract::State(state): axum::extract::State<AppState>) -> Json<Value> {
    Json(json!({
        "rna": state.url("/api/v1/rna"),
        "stats": state.url("/api/v1/stats"),
        "expert-dbs": state.url("/api/v1/expert-dbs"),
        "sequence-search": state.url("/api/v1/sequence-search/submit"),
    }))
}

/// Build the router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/", get(api_root))
        .merge(rna::routes())
        .merge(search::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
