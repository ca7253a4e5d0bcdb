use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use shopwise_db::Storage;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub storage: HealthCheck,
    pub backend: &'static str,
    pub llm_provider: &'static str,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = storage_check(&state.storage).await;
    let ready = storage.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "shopwise-server runtime initialized".to_string(),
        },
        storage,
        backend: state.storage.backend_name(),
        llm_provider: state.orchestrator.llm_provider(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn storage_check(storage: &Storage) -> HealthCheck {
    match storage.health_check().await {
        Ok(()) if storage.is_connected() => {
            HealthCheck { status: "ready", detail: "database query succeeded".to_string() }
        }
        Ok(()) => HealthCheck { status: "ready", detail: "in-memory storage".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
