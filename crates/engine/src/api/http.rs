//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use trailwise_domain::{GameId, GameMode, GameState, ScenarioRequest};

use crate::app::App;
use crate::use_cases::{CoachReply, GameError, TurnOutcome};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/games", post(create_game))
        .route("/api/games/{id}", get(get_game).delete(end_game))
        .route("/api/games/{id}/disclaimer", post(accept_disclaimer))
        .route("/api/games/{id}/scenario", post(start_scenario))
        .route("/api/games/{id}/choices", post(choose))
        .route("/api/games/{id}/analysis", get(analysis))
        .route("/api/games/{id}/chat", post(chat))
        .route("/api/games/{id}/menu", post(return_to_menu))
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game_id: GameId,
    pub state: GameState,
}

impl GameView {
    fn new(game_id: GameId, state: GameState) -> Json<Self> {
        Json(Self { game_id, state })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScenarioBody {
    pub difficulty: String,
    pub environment: String,
    pub mode: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChooseBody {
    pub choice_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub report: String,
}

// =============================================================================
// Games
// =============================================================================

async fn create_game(State(app): State<Arc<App>>) -> Result<(StatusCode, Json<GameView>), ApiError> {
    let game = &app.use_cases.game;
    let id = game.create_game();
    let state = game.snapshot(id).await?;
    Ok((StatusCode::CREATED, GameView::new(id, state)))
}

async fn get_game(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    let id = GameId::from_uuid(id);
    let state = app.use_cases.game.snapshot(id).await?;
    Ok(GameView::new(id, state))
}

async fn end_game(State(app): State<Arc<App>>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    app.use_cases.game.end_game(GameId::from_uuid(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn accept_disclaimer(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    let id = GameId::from_uuid(id);
    let state = app.use_cases.game.accept_disclaimer(id).await?;
    Ok(GameView::new(id, state))
}

async fn start_scenario(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<StartScenarioBody>,
) -> Result<Json<GameView>, ApiError> {
    let id = GameId::from_uuid(id);
    let mode: GameMode = body
        .mode
        .parse()
        .map_err(|e: trailwise_domain::DomainError| ApiError::BadRequest(e.to_string()))?;

    let mut request = ScenarioRequest::new(body.difficulty, body.environment, mode);
    if let Some(notes) = body.notes {
        request = request.with_notes(notes);
    }

    let state = app.use_cases.game.start_scenario(id, request).await?;
    Ok(GameView::new(id, state))
}

async fn choose(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChooseBody>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let outcome = app
        .use_cases
        .game
        .choose(GameId::from_uuid(id), &body.choice_id)
        .await?;
    Ok(Json(outcome))
}

async fn analysis(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisView>, ApiError> {
    let report = app.use_cases.game.analysis(GameId::from_uuid(id)).await?;
    Ok(Json(AnalysisView { report }))
}

async fn chat(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChatBody>,
) -> Result<Json<CoachReply>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }
    let reply = app
        .use_cases
        .game
        .chat(GameId::from_uuid(id), body.message)
        .await?;
    Ok(Json(reply))
}

async fn return_to_menu(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    let id = GameId::from_uuid(id);
    let state = app.use_cases.game.return_to_menu(id).await?;
    Ok(GameView::new(id, state))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    Busy,
    BadRequest(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::Busy => (
                StatusCode::CONFLICT,
                "A request for this game is already in progress",
            )
                .into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::NotFound(_) => ApiError::NotFound,
            GameError::Busy(_) => ApiError::Busy,
            GameError::InvalidTransition(_) | GameError::UnknownChoice(_) => {
                ApiError::BadRequest(e.to_string())
            }
        }
    }
}
