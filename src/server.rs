//! Browser front end: one static page plus a small JSON API over a single
//! [`ChessAssistant`].

use crate::analysis_chat::EXAMPLE_QUERIES;
use crate::buddy::BuddyReply;
use crate::errors::AssistantError;
use crate::llm::ChatMessage;
use crate::personality::Personality;
use crate::session::SessionView;
use crate::ChessAssistant;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("../static/index.html");

type AppState = Arc<ChessAssistant>;

/// Error body returned by every API route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError(pub AssistantError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            AssistantError::InvalidMove(_)
            | AssistantError::InvalidPosition(_)
            | AssistantError::ValidationError { .. }
            | AssistantError::UnknownPersonality(_)
            | AssistantError::SerializationError(_) => StatusCode::BAD_REQUEST,
            AssistantError::IndexNotFound(_) | AssistantError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(error: AssistantError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self.0);
        } else {
            log::debug!("request rejected: {}", self.0);
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub uci: String,
}

#[derive(Debug, Deserialize)]
pub struct PersonalityRequest {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
    /// False when the question came from an example button
    #[serde(default = "default_from_input")]
    pub from_input: bool,
}

fn default_from_input() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub reply: BuddyReply,
    pub game: SessionView,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chat_model: String,
}

pub fn router(assistant: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/personalities", get(personalities))
        .route("/api/game", get(game))
        .route("/api/game/new", post(new_game))
        .route("/api/game/move", post(user_move))
        .route("/api/game/reply", post(buddy_move))
        .route("/api/game/personality", post(set_personality))
        .route("/api/game/saves", get(list_saves))
        .route("/api/game/save", post(save_game))
        .route("/api/game/load", post(load_game))
        .route("/api/analysis", get(analysis))
        .route("/api/analysis/ask", post(ask))
        .route("/api/analysis/clear", post(clear_analysis))
        .route("/api/analysis/examples", get(examples))
        .with_state(assistant)
}

pub async fn serve(assistant: ChessAssistant, addr: SocketAddr) -> crate::errors::Result<()> {
    let app = router(Arc::new(assistant));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Chess assistant listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz(State(assistant): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        chat_model: assistant.chat_model().to_string(),
    })
}

async fn personalities() -> Json<Vec<&'static str>> {
    Json(Personality::ALL.iter().map(|p| p.label()).collect())
}

async fn game(State(assistant): State<AppState>) -> Json<SessionView> {
    Json(assistant.game().await)
}

async fn new_game(State(assistant): State<AppState>) -> Json<SessionView> {
    Json(assistant.new_game().await)
}

async fn user_move(State(assistant): State<AppState>, Json(request): Json<MoveRequest>) -> ApiResult<SessionView> {
    Ok(Json(assistant.user_move(&request.uci).await?))
}

async fn buddy_move(State(assistant): State<AppState>) -> ApiResult<ReplyResponse> {
    let reply = assistant.buddy_move().await?;
    Ok(Json(ReplyResponse {
        reply,
        game: assistant.game().await,
    }))
}

async fn set_personality(
    State(assistant): State<AppState>,
    Json(request): Json<PersonalityRequest>,
) -> ApiResult<SessionView> {
    Ok(Json(assistant.set_personality(&request.label).await?))
}

async fn list_saves(State(assistant): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(assistant.list_saves()?))
}

async fn save_game(State(assistant): State<AppState>, Json(request): Json<SaveRequest>) -> ApiResult<SaveResponse> {
    let path = assistant.save_game(&request.name).await?;
    Ok(Json(SaveResponse {
        path: path.display().to_string(),
    }))
}

async fn load_game(State(assistant): State<AppState>, Json(request): Json<SaveRequest>) -> ApiResult<SessionView> {
    Ok(Json(assistant.load_game(&request.name).await?))
}

async fn analysis(State(assistant): State<AppState>) -> Json<Vec<ChatMessage>> {
    Json(assistant.analysis_messages().await)
}

async fn ask(State(assistant): State<AppState>, Json(request): Json<AskRequest>) -> Json<Vec<ChatMessage>> {
    Json(assistant.ask_analysis(&request.query, request.from_input).await)
}

async fn clear_analysis(State(assistant): State<AppState>) -> StatusCode {
    assistant.clear_analysis().await;
    StatusCode::NO_CONTENT
}

async fn examples() -> Json<Vec<&'static str>> {
    Json(EXAMPLE_QUERIES.to_vec())
}
