use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::search::reindex_all;
use crate::AppState;

/// POST /api/_reindex: rebuild every search index from the database
pub async fn reindex(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<&'static str, usize>>, ApiError> {
    tracing::debug!("REST request to reindex all entities");
    let counts = reindex_all(&state.pool, &state.search).await?;
    Ok(Json(counts.into_iter().collect()))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "UP" }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "DOWN" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::handlers::test_support::{create_patient, send, test_app};
    use crate::models::Patient;

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app().await;
        let (status, _, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
    }

    #[tokio::test]
    async fn test_reindex_restores_documents() {
        let (app, state) = test_app().await;
        create_patient(&app, "Ada", 1001).await;
        state.search.replace::<Patient>(&[]);
        assert_eq!(state.search.document_count::<Patient>(), 0);

        let (status, _, body) = send(&app, Method::POST, "/api/_reindex", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient"], 1);
        assert_eq!(body["address"], 1);
        assert_eq!(body["user"], 0);
        assert_eq!(state.search.document_count::<Patient>(), 1);
    }
}
