//! Route definitions for the API server

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Creates the main application router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // The diagram editor is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Dataset upload and inspection; the editor posts with a trailing slash
        .route("/data", post(handlers::upload_data))
        .route("/data/", post(handlers::upload_data))
        .route("/variables", get(handlers::list_variables))
        // Graph upload and inspection
        .route("/parse_graph", post(handlers::parse_graph))
        .route("/parse_graph/", post(handlers::parse_graph))
        .route("/graph/variables", get(handlers::graph_variables))
        // Estimation
        .route("/causal_effect", get(handlers::causal_effect))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    const BOUNDARY: &str = "editor-upload";

    fn router() -> Router {
        create_router(Arc::new(AppState::new(SqliteStore::new_in_memory().unwrap())))
    }

    fn csv_upload(uri: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"panel.csv\"\r\n\r\n\
             subject_id,time,dose\ns1,0,1\ns1,1,2\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn graph_upload(uri: &str) -> Request<Body> {
        let body = r#"{"nodes": [{"name": "Treatment", "mode": "dynamic",
            "graph": {"nodes": [{"name": "dose"}], "edges": []}}], "edges": []}"#;
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_uploads_accept_trailing_slash() {
        for uri in ["/data", "/data/"] {
            let response = router().oneshot(csv_upload(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "POST {}", uri);
        }
        for uri in ["/parse_graph", "/parse_graph/"] {
            let response = router().oneshot(graph_upload(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "POST {}", uri);
        }
    }

    #[tokio::test]
    async fn test_raw_body_upload_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/data/")
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from("subject_id,time,dose\ns1,0,1\n"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
