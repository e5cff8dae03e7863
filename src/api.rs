//! HTTP surface for pdfchat.
//!
//! The router plays the role of the session shell: it owns the [`SessionStore`], turns uploads
//! into [`PdfSource`]s, and renders conversation history as alternating user/assistant
//! messages.
//!
//! - `POST /sessions` – Create an Idle session.
//! - `POST /sessions/:id/documents` – Multipart upload of one or more PDFs (`files` parts);
//!   rebuilds the session index from scratch.
//! - `POST /sessions/:id/text` – Same as above for already-extracted text.
//! - `POST /sessions/:id/questions` – Ask a question; returns the full updated history.
//! - `GET /sessions/:id/history` – Current phase and history.
//! - `DELETE /sessions/:id` – Discard a session.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog.

use crate::{
    AppServices,
    chat::ChatMessage,
    conversation::ConversationError,
    processing::{ExtractionError, PdfSource, ProcessingError, ProcessingOutcome},
    session::{SessionHandle, SessionPhase, SessionStore},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use uuid::Uuid;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared router state.
pub struct AppState {
    services: AppServices,
    sessions: SessionStore,
}

impl AppState {
    /// Wrap the pipeline services with an empty session store.
    pub fn new(services: AppServices) -> Self {
        Self {
            services,
            sessions: SessionStore::new(),
        }
    }
}

/// Periodically drop sessions that have been idle for at least `ttl`.
pub fn spawn_session_sweeper(state: Arc<AppState>, ttl: Duration) -> JoinHandle<()> {
    let period = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = state.sessions.evict_idle(ttl).await;
            if evicted > 0 {
                tracing::info!(evicted, "Expired idle sessions");
            }
        }
    })
}

/// Build the HTTP router exposing the session API surface.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/documents", post(upload_documents))
        .route("/sessions/:id/text", post(process_text))
        .route("/sessions/:id/questions", post(ask_question))
        .route("/sessions/:id/history", get(get_history))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[derive(Serialize)]
struct CreateSessionResponse {
    session_id: Uuid,
}

async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    )
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound)
    }
}

/// Success response for processing endpoints.
#[derive(Serialize)]
struct ProcessResponse {
    documents: usize,
    characters: usize,
    chunks_indexed: usize,
    phase: SessionPhase,
}

impl ProcessResponse {
    fn ready(outcome: ProcessingOutcome) -> Self {
        Self {
            documents: outcome.documents,
            characters: outcome.characters,
            chunks_indexed: outcome.chunk_count,
            phase: SessionPhase::Ready,
        }
    }
}

/// Accept one or more PDFs and rebuild the session index.
///
/// Parts named `files` (or `file`) are treated as uploads; anything else is ignored.
async fn upload_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let handle = session(&state, &id).await?;

    let mut sources = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if !matches!(field.name(), Some("files") | Some("file")) {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}.pdf", sources.len() + 1));
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            continue;
        }
        sources.push(PdfSource::new(name, bytes.to_vec()));
    }

    tracing::info!(session = %id, files = sources.len(), "Processing upload");
    let mut session = handle.lock().await;
    let outcome = session
        .process_documents(&state.services.processor, sources)
        .await?;
    tracing::info!(
        session = %id,
        documents = outcome.documents,
        chunks = outcome.chunk_count,
        "Documents processed"
    );
    Ok(Json(ProcessResponse::ready(outcome)))
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

async fn process_text(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<TextRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let handle = session(&state, &id).await?;
    let mut session = handle.lock().await;
    let outcome = session
        .process_text(&state.services.processor, &request.text)
        .await?;
    Ok(Json(ProcessResponse::ready(outcome)))
}

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

/// Rendered conversation.
#[derive(Serialize)]
struct HistoryResponse {
    phase: SessionPhase,
    messages: Vec<ChatMessage>,
}

async fn ask_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let handle = session(&state, &id).await?;
    let mut session = handle.lock().await;
    let messages = session
        .ask(&state.services.pipeline, &request.question)
        .await?
        .messages();
    Ok(Json(HistoryResponse {
        phase: session.phase(),
        messages,
    }))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let handle = session(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(HistoryResponse {
        phase: session.phase(),
        messages: session.messages(),
    }))
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.services.metrics.snapshot();
    Json(json!({
        "documents_processed": snapshot.documents_processed,
        "chunks_indexed": snapshot.chunks_indexed,
        "last_chunk_count": snapshot.last_chunk_count,
        "questions_answered": snapshot.questions_answered,
        "active_sessions": state.sessions.len().await,
    }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "create_session",
                method: "POST",
                path: "/sessions",
                description: "Create an empty session. Response returns { \"session_id\": uuid }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "upload_documents",
                method: "POST",
                path: "/sessions/:id/documents",
                description: "Multipart upload of one or more PDFs in `files` parts. Rebuilds the session index.",
                request_example: None,
            },
            CommandDescriptor {
                name: "process_text",
                method: "POST",
                path: "/sessions/:id/text",
                description: "Chunk and index already-extracted text instead of PDFs.",
                request_example: Some(json!({ "text": "Document contents" })),
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/sessions/:id/questions",
                description: "Ask a question about the processed documents. Returns the full conversation.",
                request_example: Some(json!({ "question": "What is the main finding?" })),
            },
            CommandDescriptor {
                name: "history",
                method: "GET",
                path: "/sessions/:id/history",
                description: "Return the session phase and conversation so far.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_session",
                method: "DELETE",
                path: "/sessions/:id",
                description: "Discard the session, its index, and its history.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return processing and question counters.",
                request_example: None,
            },
        ],
    })
}

async fn session(state: &AppState, id: &Uuid) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound)
}

enum ApiError {
    SessionNotFound,
    Upload(MultipartError),
    Processing(ProcessingError),
    Conversation(ConversationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::SessionNotFound => (StatusCode::NOT_FOUND, "Unknown session.".to_string()),
            Self::Upload(error) => (error.status(), error.body_text()),
            Self::Processing(error) => match (&error, error.guidance()) {
                (_, Some(guidance)) => (StatusCode::BAD_REQUEST, guidance),
                (ProcessingError::Extraction(ExtractionError::Worker(_)), None) => {
                    tracing::error!(error = %error, "PDF extraction worker failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
                }
                (_, None) => {
                    tracing::error!(error = %error, "Document processing failed");
                    (StatusCode::BAD_GATEWAY, error.to_string())
                }
            },
            Self::Conversation(error) => match (&error, error.guidance()) {
                (ConversationError::NotReady, Some(guidance)) => (StatusCode::CONFLICT, guidance),
                (_, Some(guidance)) => (StatusCode::BAD_REQUEST, guidance),
                (_, None) => {
                    tracing::error!(error = %error, "Question answering failed");
                    (StatusCode::BAD_GATEWAY, error.to_string())
                }
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(inner: MultipartError) -> Self {
        Self::Upload(inner)
    }
}

impl From<ProcessingError> for ApiError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

impl From<ConversationError> for ApiError {
    fn from(inner: ConversationError) -> Self {
        Self::Conversation(inner)
    }
}
