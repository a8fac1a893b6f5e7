use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use helpdesk_rag::{
    Catalogue, CatalogueIndexer, Command, ContentFilter, EmbeddingProvider, EvaluationLedger,
    Feedback, FeedbackAction, FeedbackLog, FeedbackOutcome, FeedbackReconciler,
    HashingEmbeddingProvider, HelpdeskAssistant, InMemoryVectorStore, QueryToken, RagError, Reply,
    RetrievalEngine, RetrievalMetrics,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::config::{EmbedderKind, ServerConfig};

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<HelpdeskAssistant>,
}

impl AppState {
    pub fn new(assistant: Arc<HelpdeskAssistant>) -> Self {
        Self { assistant }
    }

    /// Load the catalogue, index it completely, and wire the assistant.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let catalogue = Catalogue::load(&config.catalogue_path)
            .with_context(|| format!("loading catalogue {}", config.catalogue_path.display()))?;
        let embedder = build_embedder(config.embedder)?;
        let store = Arc::new(InMemoryVectorStore::with_metric(config.rag.distance_metric));

        let index = CatalogueIndexer::new(embedder, store)
            .with_collection(config.rag.collection.clone())
            .with_batch_size(config.rag.batch_size)
            .index_catalogue(catalogue)
            .await
            .context("indexing catalogue")?;

        let ledger = Arc::new(EvaluationLedger::new());
        let engine = RetrievalEngine::new(
            config.rag.clone(),
            ContentFilter::default(),
            Arc::new(index),
            ledger.clone(),
        );
        let reconciler = FeedbackReconciler::new(ledger)
            .with_log(Arc::new(FeedbackLog::new(config.feedback_log_path.clone())));

        Ok(Self::new(Arc::new(HelpdeskAssistant::new(Arc::new(engine), Arc::new(reconciler)))))
    }
}

fn build_embedder(kind: EmbedderKind) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match kind {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbeddingProvider::default())),
        #[cfg(feature = "openai")]
        EmbedderKind::OpenAI => Ok(Arc::new(helpdesk_rag::OpenAIEmbeddingProvider::from_env()?)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub user_id: String,
    pub text: String,
}

/// A pressed feedback button: either the encoded `action` payload or its fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub token: Option<QueryToken>,
}

impl FeedbackRequest {
    fn into_action(self) -> Result<FeedbackAction, ApiError> {
        if let Some(encoded) = self.action {
            return Ok(encoded.parse()?);
        }
        match (self.feedback, self.candidate_id) {
            (Some(feedback), Some(candidate_id)) if !candidate_id.is_empty() => {
                let action = FeedbackAction::new(feedback, candidate_id);
                Ok(match self.token {
                    Some(token) => action.with_token(token),
                    None => action,
                })
            }
            _ => Err(ApiError::BadRequest(
                "feedback requires either `action` or `feedback` and `candidate_id`".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResponse {
    pub reply: Reply,
    pub outcome: FeedbackOutcome,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rag(err) => match err {
                RagError::EmbeddingError { .. } | RagError::VectorStoreError { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                RagError::MalformedFeedback { .. }
                | RagError::FeedbackAlreadyApplied
                | RagError::UnknownQueryToken(_)
                | RagError::InvalidFeedbackAction(_)
                | RagError::ConfigError(_) => StatusCode::BAD_REQUEST,
                RagError::UnknownCommand(_) => StatusCode::NOT_FOUND,
                RagError::CatalogueError(_) | RagError::FeedbackLogError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/messages", post(post_message))
        .route("/api/feedback", post(post_feedback))
        .route("/api/stats", get(get_stats))
        .route("/api/commands/{name}", get(run_command))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Index the catalogue, then bind and serve until the process stops.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for helpdesk server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("helpdesk-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.assistant.engine().index().catalogue().len();
    Json(json!({"status": "ok", "service": "helpdesk-server", "catalogue_entries": entries}))
}

async fn post_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<Reply>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text cannot be empty".to_string()));
    }
    let reply = state.assistant.on_user_text(&request.user_id, &request.text).await?;
    Ok(Json(reply))
}

async fn post_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let user_id = request.user_id.clone();
    let action = request.into_action()?;
    let (reply, outcome) = state.assistant.on_feedback_action(&user_id, &action).await?;
    Ok(Json(FeedbackResponse { reply, outcome }))
}

async fn get_stats(State(state): State<AppState>) -> Json<RetrievalMetrics> {
    Json(state.assistant.stats().await)
}

async fn run_command(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Reply>, ApiError> {
    let command: Command = name.parse()?;
    Ok(Json(state.assistant.on_command(command).await))
}
