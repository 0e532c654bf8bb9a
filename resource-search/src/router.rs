use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{
    app_state::AppState,
    auth::{BRANCH_HEADER, ROLE_HEADER, SEMESTER_HEADER},
    routes,
};

pub fn create(app_state: AppState, app_url: &str) -> Router<()> {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/search", routes::search::router());

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(ROLE_HEADER),
            HeaderName::from_static(BRANCH_HEADER),
            HeaderName::from_static(SEMESTER_HEADER),
        ]);
    match app_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!(app_url, "Invalid app_url, CORS origin not set"),
    }

    // Finally, wrap the app with tracing layer, state and CORS
    app.with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::search::embedder::MockEmbedder;
    use crate::domain::search::repository::InMemoryDocumentStore;
    use crate::domain::search::fixtures::{document, document_in};
    use crate::domain::search::{DocumentStore, IndexerConfig, SearchConfig};

    fn app(embedder: MockEmbedder, store: InMemoryDocumentStore) -> Router<()> {
        let state = AppState::new(
            Arc::new(embedder),
            Arc::new(store),
            SearchConfig::default(),
            IndexerConfig::default(),
        );
        create(state, "http://localhost:5173")
    }

    fn search_request(body: Value, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/search")
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check() {
        let response = app(MockEmbedder::default(), InMemoryDocumentStore::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn search_returns_ranked_hits() {
        let store = InMemoryDocumentStore::new().with_documents(vec![
            document(1, Some(vec![1.0, 0.0])),
            document(2, Some(vec![0.0, 1.0])),
            document(3, None),
        ]);

        let response = app(MockEmbedder::returning(vec![1.0, 0.0]), store)
            .oneshot(search_request(
                json!({ "query": "stacks", "limit": 2 }),
                &[(ROLE_HEADER, "faculty")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["id"], 1);
        assert_eq!(results[0]["similarityScore"], 1.0);
        assert_eq!(results[1]["id"], 2);
        assert!(results[0].get("embedding").is_none());
    }

    #[tokio::test]
    async fn search_applies_student_scope() {
        let store = InMemoryDocumentStore::new().with_documents(vec![
            document_in(1, "cse", "3"),
            document_in(2, "ece", "3"),
            document_in(3, "cse", "4"),
        ]);

        let response = app(MockEmbedder::default(), store)
            .oneshot(search_request(
                json!({ "query": "notes" }),
                &[
                    (ROLE_HEADER, "student"),
                    (BRANCH_HEADER, "cse"),
                    (SEMESTER_HEADER, "3"),
                ],
            ))
            .await
            .unwrap();

        let body = json_body(response).await;
        let ids: Vec<_> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn empty_query_is_a_bad_request() {
        let embedder = MockEmbedder::default();

        let response = app(embedder.clone(), InMemoryDocumentStore::new())
            .oneshot(search_request(
                json!({ "query": "  " }),
                &[(ROLE_HEADER, "faculty")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_QUERY");
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_search_bodies_are_invalid_queries() {
        let embedder = MockEmbedder::default();
        let router = app(embedder.clone(), InMemoryDocumentStore::new());

        for body in [
            json!({}),
            json!({ "query": null }),
            json!({ "query": "x", "limit": -1 }),
            json!({ "query": 42 }),
        ] {
            let response = router
                .clone()
                .oneshot(search_request(body.clone(), &[(ROLE_HEADER, "faculty")]))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
            let error = json_body(response).await;
            assert_eq!(error["code"], "INVALID_QUERY", "body {body}");
            assert!(error["error"].is_string());
        }

        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn unparseable_json_is_an_invalid_query() {
        let response = app(MockEmbedder::default(), InMemoryDocumentStore::new())
            .oneshot(
                Request::post("/search")
                    .header(CONTENT_TYPE, "application/json")
                    .header(ROLE_HEADER, "faculty")
                    .body(Body::from("{\"query\":"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn embedding_failure_is_service_unavailable() {
        let response = app(MockEmbedder::failing(), InMemoryDocumentStore::new())
            .oneshot(search_request(
                json!({ "query": "graphs" }),
                &[(ROLE_HEADER, "staff")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["code"], "EMBEDDING_UNAVAILABLE");
    }

    #[tokio::test]
    async fn anonymous_search_is_unauthorized() {
        let response = app(MockEmbedder::default(), InMemoryDocumentStore::new())
            .oneshot(search_request(json!({ "query": "graphs" }), &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn students_cannot_reindex() {
        let response = app(MockEmbedder::default(), InMemoryDocumentStore::new())
            .oneshot(
                Request::post("/search/reindex")
                    .header(ROLE_HEADER, "student")
                    .header(BRANCH_HEADER, "cse")
                    .header(SEMESTER_HEADER, "3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn faculty_reindex_backfills_and_updates_stats() {
        let store = InMemoryDocumentStore::new()
            .with_documents(vec![document(1, None), document(2, Some(vec![1.0, 0.0]))]);
        let router = app(MockEmbedder::default(), store);

        let response = router
            .clone()
            .oneshot(
                Request::post("/search/reindex")
                    .header(ROLE_HEADER, "faculty")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "embedded": 1, "failed": 0 }));

        let response = router
            .oneshot(
                Request::get("/search/stats")
                    .header(ROLE_HEADER, "faculty")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            json_body(response).await,
            json!({ "total": 2, "embedded": 2, "missingEmbedding": 0 })
        );
    }

    #[tokio::test]
    async fn reindex_single_document() {
        let store = InMemoryDocumentStore::new().with_documents(vec![document(7, None)]);
        let router = app(MockEmbedder::default(), store.clone());

        let reindex = |path: &str, role: &str| {
            let mut builder = Request::post(path).header(ROLE_HEADER, role);
            if role == "student" {
                builder = builder
                    .header(BRANCH_HEADER, "cse")
                    .header(SEMESTER_HEADER, "3");
            }
            builder.body(Body::empty()).unwrap()
        };

        let response = router
            .clone()
            .oneshot(reindex("/search/reindex/7", "student"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router
            .clone()
            .oneshot(reindex("/search/reindex/7", "staff"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.count_embedded().await.unwrap(), 1);

        let response = router
            .clone()
            .oneshot(reindex("/search/reindex/8", "staff"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NOT_FOUND");

        let response = router
            .oneshot(reindex("/search/reindex/abc", "staff"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_REQUEST");
    }
}
