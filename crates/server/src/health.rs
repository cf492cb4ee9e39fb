use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use cotiza_agent::runtime::IntakeRuntime;
use serde::Serialize;
use std::sync::Arc;

use crate::document::DocumentGenerator;

#[derive(Clone)]
pub struct HealthState {
    runtime: Arc<IntakeRuntime>,
    documents: Arc<DocumentGenerator>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub documents: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(runtime: Arc<IntakeRuntime>, documents: Arc<DocumentGenerator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { runtime, documents })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let documents = documents_check(&state.documents);
    let ready = documents.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "cotiza-server runtime initialized".to_string(),
        },
        documents,
        active_sessions: state.runtime.session_count(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

// A missing wkhtmltopdf is not degradation; documents still render as
// printable HTML.
fn documents_check(documents: &DocumentGenerator) -> HealthCheck {
    if !documents.has_templates() {
        return HealthCheck {
            status: "degraded",
            detail: "no quotation templates registered".to_string(),
        };
    }
    let detail = if documents.pdf_available() {
        "templates loaded, wkhtmltopdf available".to_string()
    } else {
        "templates loaded, HTML fallback active".to_string()
    };
    HealthCheck { status: "ready", detail }
}
