use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    auth::Requester,
    domain::search::{BackfillStats, DocumentId, SearchHit, SearchStats},
    routes::{ApiError, ApiJson, ApiPath},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(search))
        .route("/stats", get(stats))
        .route("/reindex", post(reindex))
        .route("/reindex/:id", post(reindex_document))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    // Missing or null is rejected by the service as an invalid query
    #[serde(default)]
    query: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[instrument(name = "POST /search", skip(app_state, body), fields(role = %requester.role))]
async fn search(
    State(app_state): State<AppState>,
    requester: Requester,
    ApiJson(body): ApiJson<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = app_state
        .search_service()
        .search(
            body.query.as_deref().unwrap_or_default(),
            &requester.scope,
            body.limit,
        )
        .await?;

    Ok(Json(SearchResponse {
        results: results.into_iter().map(SearchHit::from).collect(),
    }))
}

#[instrument(name = "GET /search/stats", skip(app_state), fields(role = %requester.role))]
async fn stats(
    State(app_state): State<AppState>,
    requester: Requester,
) -> Result<Json<SearchStats>, ApiError> {
    Ok(Json(app_state.search_service().stats().await?))
}

#[instrument(name = "POST /search/reindex", skip(app_state), fields(role = %requester.role))]
async fn reindex(
    State(app_state): State<AppState>,
    requester: Requester,
) -> Result<Json<BackfillStats>, ApiError> {
    if !requester.scope.is_unrestricted() {
        return Err(ApiError::forbidden(
            "Only faculty and staff can trigger reindexing",
        ));
    }

    Ok(Json(app_state.indexer().backfill_missing().await?))
}

#[instrument(name = "POST /search/reindex/:id", skip(app_state), fields(role = %requester.role))]
async fn reindex_document(
    State(app_state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<BackfillStats>, ApiError> {
    if !requester.scope.is_unrestricted() {
        return Err(ApiError::forbidden(
            "Only faculty and staff can trigger reindexing",
        ));
    }

    match app_state
        .indexer()
        .reindex_document(DocumentId::new(id))
        .await?
    {
        Some(_) => Ok(Json(BackfillStats {
            embedded: 1,
            failed: 0,
        })),
        None => Err(ApiError::not_found(format!("Document {id} not found"))),
    }
}
