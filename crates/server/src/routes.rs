//! HTTP interface for the guided quotation intake.
//!
//! Sessions are opened, advanced one turn at a time, and inspected over
//! a small JSON API. Completed sessions can render their proposal
//! document or push a completion notice to the configured webhook.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use cotiza_agent::collaborators::{
    CompletionNotice, NotificationDispatcher, PendingQuestion, PhrasingService,
};
use cotiza_agent::runtime::{IntakeRuntime, RecordSnapshot, TurnReply};
use cotiza_agent::session::SessionId;
use cotiza_core::errors::ApplicationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::bootstrap::Application;
use crate::document::DocumentGenerator;
use crate::health;
use crate::notify::WebhookNotifier;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<IntakeRuntime>,
    pub phrasing: Arc<dyn PhrasingService>,
    pub documents: Arc<DocumentGenerator>,
    pub notifier: Option<Arc<WebhookNotifier>>,
}

impl From<&Application> for AppState {
    fn from(app: &Application) -> Self {
        Self {
            runtime: app.runtime.clone(),
            phrasing: app.phrasing.clone(),
            documents: app.documents.clone(),
            notifier: app.notifier.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PendingDto {
    pub key: String,
    pub prompt: String,
    pub position: usize,
    pub total: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SessionOpenedResponse {
    pub session_id: String,
    pub message: String,
    pub pending: PendingDto,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<CompletionNotice>,
    /// Updated record after the turn, with the live area breakdown.
    pub record: Option<RecordSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    let health = health::router(state.runtime.clone(), state.documents.clone());

    Router::new()
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/{session_id}/turns", post(submit_turn))
        .route("/api/sessions/{session_id}/record", get(get_record))
        .route("/api/sessions/{session_id}/restart", post(restart_session))
        .route("/api/sessions/{session_id}", delete(end_session))
        .route("/api/sessions/{session_id}/document", get(download_document))
        .route("/api/sessions/{session_id}/notify", post(send_notification))
        .with_state(state)
        .merge(health)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn open_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionOpenedResponse>), (StatusCode, Json<ApiError>)> {
    let opened = state.runtime.open_session().map_err(reject)?;
    let message = phrase_or_prompt(&state, &opened.session_id, &opened.pending).await;

    info!(
        event_name = "http.session.opened",
        session_id = %opened.session_id,
        "intake session opened over HTTP"
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionOpenedResponse {
            session_id: opened.session_id.to_string(),
            message,
            pending: pending_dto(&opened.pending),
        }),
    ))
}

async fn submit_turn(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, (StatusCode, Json<ApiError>)> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "No pudimos procesar la solicitud. Revisa los datos e intenta de nuevo."
                    .to_string(),
                detail: "message must not be empty".to_string(),
                correlation_id: uuid::Uuid::new_v4().to_string(),
            }),
        ));
    }

    let session_id = SessionId::from(session_id.as_str());
    let reply = state.runtime.submit_turn(&session_id, message).map_err(reject)?;
    Ok(Json(turn_response(&state, &session_id, reply).await))
}

async fn get_record(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RecordSnapshot>, (StatusCode, Json<ApiError>)> {
    let session_id = SessionId::from(session_id.as_str());
    let snapshot = state.runtime.record(&session_id).map_err(reject)?;
    Ok(Json(snapshot))
}

async fn restart_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TurnResponse>, (StatusCode, Json<ApiError>)> {
    let session_id = SessionId::from(session_id.as_str());
    let reply = state.runtime.restart(&session_id).map_err(reject)?;
    Ok(Json(turn_response(&state, &session_id, reply).await))
}

async fn end_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let session_id = SessionId::from(session_id.as_str());
    state.runtime.end_session(&session_id).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_document(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let session_id = SessionId::from(session_id.as_str());
    let snapshot = state.runtime.record(&session_id).map_err(reject)?;
    if snapshot.record.costs.is_none() {
        return Err(incomplete_conflict());
    }

    let document = state.documents.generate(&snapshot.record).await.map_err(|error| {
        reject(ApplicationError::Collaborator {
            collaborator: "document_renderer".to_string(),
            message: error.to_string(),
        })
    })?;

    info!(
        event_name = "http.document.rendered",
        session_id = %snapshot.session_id,
        "quotation document rendered"
    );

    let filename = format!("cotizacion_{}.pdf", snapshot.session_id);
    Ok(document.into_response(&filename))
}

async fn send_notification(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AckResponse>, (StatusCode, Json<ApiError>)> {
    let Some(notifier) = state.notifier.clone() else {
        return Err(reject(ApplicationError::Collaborator {
            collaborator: "notifications".to_string(),
            message: "notifications are disabled".to_string(),
        }));
    };

    let session_id = SessionId::from(session_id.as_str());
    let snapshot = state.runtime.record(&session_id).map_err(reject)?;
    let costs = match snapshot.record.costs.clone() {
        Some(costs) => costs,
        None => return Err(incomplete_conflict()),
    };

    let notice = CompletionNotice {
        client_name: snapshot.record.client_name.clone(),
        project_type: snapshot.record.project_type.clone(),
        costs,
        completed_at: Utc::now(),
    };
    notifier.dispatch(&notice).await.map_err(|error| {
        reject(ApplicationError::Collaborator {
            collaborator: "notifications".to_string(),
            message: error.to_string(),
        })
    })?;

    info!(
        event_name = "http.notice.dispatched",
        session_id = %snapshot.session_id,
        "completion notice dispatched"
    );

    Ok(Json(AckResponse {
        success: true,
        message: "Notificación de cotización enviada.".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Reply mapping
// ---------------------------------------------------------------------------

fn pending_dto(pending: &PendingQuestion) -> PendingDto {
    PendingDto {
        key: pending.key.storage_key(),
        prompt: pending.prompt.clone(),
        position: pending.position,
        total: pending.total,
    }
}

/// Delegate wording to the phrasing collaborator, keeping the canonical
/// prompt when the collaborator is unreachable.
async fn phrase_or_prompt(
    state: &AppState,
    session_id: &SessionId,
    pending: &PendingQuestion,
) -> String {
    let record = match state.runtime.record(session_id) {
        Ok(snapshot) => snapshot.record,
        Err(_) => return pending.prompt.clone(),
    };
    match state.phrasing.phrase(pending, &record).await {
        Ok(text) => text,
        Err(error) => {
            warn!(
                event_name = "http.phrasing.fallback",
                session_id = %session_id,
                error = %error,
                "phrasing failed, using canonical prompt"
            );
            pending.prompt.clone()
        }
    }
}

async fn turn_response(state: &AppState, session_id: &SessionId, reply: TurnReply) -> TurnResponse {
    let record = state.runtime.record(session_id).ok();
    match reply {
        TurnReply::NextQuestion { pending } => TurnResponse {
            status: "question",
            message: phrase_or_prompt(state, session_id, &pending).await,
            pending: Some(pending_dto(&pending)),
            notice: None,
            record,
        },
        TurnReply::StillPending { pending, clarification } => TurnResponse {
            status: "pending",
            message: format!("{clarification} {}", pending.prompt),
            pending: Some(pending_dto(&pending)),
            notice: None,
            record,
        },
        TurnReply::Redirected { redirect, pending } => TurnResponse {
            status: "redirect",
            message: format!("{redirect} {}", pending.prompt),
            pending: Some(pending_dto(&pending)),
            notice: None,
            record,
        },
        TurnReply::Completed { notice, closing } => TurnResponse {
            status: "complete",
            message: closing,
            pending: None,
            notice: Some(notice),
            record,
        },
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

// SessionNotFound is a 404 at the HTTP surface; the shared interface
// mapping keeps it a bad request for non-HTTP hosts.
fn reject(error: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        ApplicationError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ApplicationError::Domain(_) => StatusCode::BAD_REQUEST,
        ApplicationError::Collaborator { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ApplicationError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let detail = error.to_string();
    let correlation_id = uuid::Uuid::new_v4().to_string();
    let interface = error.into_interface(correlation_id.clone());

    warn!(
        event_name = "http.request.rejected",
        correlation_id = %correlation_id,
        status = %status,
        detail = %detail,
        "request rejected"
    );

    (
        status,
        Json(ApiError {
            error: interface.user_message().to_string(),
            detail,
            correlation_id,
        }),
    )
}

fn incomplete_conflict() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::CONFLICT,
        Json(ApiError {
            error: "La cotización aún no está completa.".to_string(),
            detail: "quotation record has no computed costs".to_string(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use cotiza_agent::collaborators::TemplatePhrasing;
    use cotiza_core::config::{DocumentsConfig, NotificationsConfig};
    use cotiza_core::flows::FlowState;

    fn test_state() -> AppState {
        let config = DocumentsConfig {
            wkhtmltopdf_path: None,
            company_name: "Cotiza Arquitectos".to_string(),
        };
        AppState {
            runtime: Arc::new(IntakeRuntime::new()),
            phrasing: Arc::new(TemplatePhrasing),
            documents: Arc::new(DocumentGenerator::new(&config)),
            notifier: None,
        }
    }

    async fn open(state: &AppState) -> String {
        let (status, Json(payload)) = open_session(State(state.clone())).await.expect("open");
        assert_eq!(status, StatusCode::CREATED);
        payload.session_id
    }

    async fn turn(state: &AppState, session_id: &str, message: &str) -> TurnResponse {
        let Json(payload) = submit_turn(
            Path(session_id.to_string()),
            State(state.clone()),
            Json(TurnRequest { message: message.to_string() }),
        )
        .await
        .expect("turn");
        payload
    }

    const FULL_SCRIPT: [&str; 15] = [
        "Me llamo Laura Restrepo",
        "35",
        "una casa nueva",
        "120 metros cuadrados",
        "acabados medio",
        "12 meses",
        "unos 400 millones",
        "sí, ya lo tengo",
        "2",
        "king",
        "queen",
        "sí, con baño",
        "sencilla",
        "no",
        "estudio y sauna",
    ];

    #[tokio::test]
    async fn opening_a_session_returns_the_first_question() {
        let state = test_state();
        let (status, Json(payload)) = open_session(State(state)).await.expect("open");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(payload.pending.key, "client_name");
        assert!(!payload.message.is_empty());
    }

    #[tokio::test]
    async fn answers_advance_and_get_phrased_with_the_client_name() {
        let state = test_state();
        let session_id = open(&state).await;

        let response = turn(&state, &session_id, "Me llamo Laura Restrepo").await;

        assert_eq!(response.status, "question");
        let pending = response.pending.expect("pending question");
        assert_eq!(pending.key, "client_age");
        assert!(response.message.contains("Laura Restrepo"));

        let snapshot = response.record.expect("updated record rides along");
        assert_eq!(snapshot.record.client_name.as_deref(), Some("Laura Restrepo"));
        assert!(snapshot.areas.total().is_zero());
    }

    #[tokio::test]
    async fn empty_turns_are_rejected() {
        let state = test_state();
        let session_id = open(&state).await;

        let error = submit_turn(
            Path(session_id),
            State(state),
            Json(TurnRequest { message: "   ".to_string() }),
        )
        .await
        .expect_err("empty turn should be rejected");

        assert_eq!(error.0, StatusCode::BAD_REQUEST);
        assert_eq!(error.1 .0.detail, "message must not be empty");
    }

    #[tokio::test]
    async fn unknown_sessions_return_not_found() {
        let state = test_state();

        let error = get_record(Path("ghost".to_string()), State(state))
            .await
            .expect_err("unknown session");

        assert_eq!(error.0, StatusCode::NOT_FOUND);
        assert!(error.1 .0.detail.contains("ghost"));
    }

    #[tokio::test]
    async fn a_full_conversation_completes_with_costs_on_the_record() {
        let state = test_state();
        let session_id = open(&state).await;

        let mut last = None;
        for message in FULL_SCRIPT {
            last = Some(turn(&state, &session_id, message).await);
        }

        let closing = last.expect("final reply");
        assert_eq!(closing.status, "complete");
        assert!(closing.message.contains("$376.200.000 COP"));
        assert!(closing.notice.is_some());
        let final_record = closing.record.expect("completed record rides along");
        assert!(final_record.record.costs.is_some());

        let Json(snapshot) =
            get_record(Path(session_id), State(state)).await.expect("record");
        assert_eq!(snapshot.state, FlowState::Complete);
        assert!(snapshot.record.costs.is_some());
        assert_eq!(snapshot.answered.len(), 15);
    }

    #[tokio::test]
    async fn documents_require_a_completed_interview() {
        let state = test_state();
        let session_id = open(&state).await;

        let error = download_document(Path(session_id), State(state))
            .await
            .expect_err("incomplete record");

        assert_eq!(error.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn notifications_are_unavailable_without_a_dispatcher() {
        let state = test_state();
        let session_id = open(&state).await;

        let error = send_notification(Path(session_id), State(state))
            .await
            .expect_err("disabled notifications");

        assert_eq!(error.0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn failed_dispatch_is_reported_and_leaves_the_record_intact() {
        let notifier = WebhookNotifier::from_config(&NotificationsConfig {
            enabled: true,
            webhook_url: Some("http://127.0.0.1:9/webhook".to_string()),
            timeout_secs: 1,
            max_retries: 0,
        })
        .expect("webhook config is valid")
        .expect("notifications are enabled");

        let mut state = test_state();
        state.notifier = Some(Arc::new(notifier));
        let session_id = open(&state).await;
        for message in FULL_SCRIPT {
            turn(&state, &session_id, message).await;
        }

        let error = send_notification(Path(session_id.clone()), State(state.clone()))
            .await
            .expect_err("unreachable webhook");
        assert_eq!(error.0, StatusCode::SERVICE_UNAVAILABLE);

        // The record is untouched and stays valid for a retry.
        let Json(snapshot) = get_record(Path(session_id), State(state)).await.expect("record");
        assert!(snapshot.record.costs.is_some());
    }

    #[tokio::test]
    async fn restarting_keeps_identity_and_reasks_the_project_type() {
        let state = test_state();
        let session_id = open(&state).await;
        turn(&state, &session_id, "Me llamo Laura Restrepo").await;
        turn(&state, &session_id, "35").await;

        let Json(response) =
            restart_session(Path(session_id.clone()), State(state.clone()))
                .await
                .expect("restart");

        assert_eq!(response.status, "question");
        assert_eq!(response.pending.expect("pending").key, "project_type");

        let Json(snapshot) = get_record(Path(session_id), State(state)).await.expect("record");
        assert_eq!(snapshot.record.client_name.as_deref(), Some("Laura Restrepo"));
    }

    #[tokio::test]
    async fn ended_sessions_are_gone() {
        let state = test_state();
        let session_id = open(&state).await;

        let status = end_session(Path(session_id.clone()), State(state.clone()))
            .await
            .expect("end");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let error = get_record(Path(session_id), State(state))
            .await
            .expect_err("session should be gone");
        assert_eq!(error.0, StatusCode::NOT_FOUND);
    }
}
