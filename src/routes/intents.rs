//! UI→core intent endpoints.
//!
//! These routes are the only way input reaches the game: each POST publishes
//! one intent, and whichever phase is currently listening consumes it. A 409
//! means nothing was listening for that intent, typically because the UI is
//! out of sync with the phase.

use axum::{Json, Router, extract::State, routing::post};
use validator::Validate;

use crate::{
    dto::intents::{ActionResponse, AnswerIntentRequest, RegisterIntentRequest},
    engine::{SharedState, dispatcher::Intent},
    error::AppError,
    services::intent_service,
};

#[utoipa::path(
    post,
    path = "/intents/register",
    tag = "intents",
    request_body = RegisterIntentRequest,
    responses(
        (status = 200, description = "Registration delivered", body = ActionResponse),
        (status = 409, description = "No registration phase is active")
    )
)]
/// Submit the registration form.
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterIntentRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    intent_service::submit(
        &state,
        Intent::Register {
            name: payload.name,
            email: payload.email,
        },
    )?;
    Ok(Json(ActionResponse::accepted()))
}

#[utoipa::path(
    post,
    path = "/intents/answer",
    tag = "intents",
    request_body = AnswerIntentRequest,
    responses(
        (status = 200, description = "Answer delivered", body = ActionResponse),
        (status = 409, description = "No round is awaiting an answer")
    )
)]
/// Submit a free-text answer for the current round.
pub async fn answer(
    State(state): State<SharedState>,
    Json(payload): Json<AnswerIntentRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    intent_service::submit(&state, Intent::Answer { text: payload.text })?;
    Ok(Json(ActionResponse::accepted()))
}

#[utoipa::path(
    post,
    path = "/intents/replay",
    tag = "intents",
    responses(
        (status = 200, description = "Replay request delivered", body = ActionResponse),
        (status = 409, description = "No round is active")
    )
)]
/// Ask for the current round's prompt to be replayed.
pub async fn replay(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    intent_service::submit(&state, Intent::Replay)?;
    Ok(Json(ActionResponse::accepted()))
}

#[utoipa::path(
    post,
    path = "/intents/end",
    tag = "intents",
    responses(
        (status = 200, description = "End request delivered", body = ActionResponse),
        (status = 409, description = "Nothing can be ended right now")
    )
)]
/// Force the active phase to end (skip the session or dismiss the result).
pub async fn end(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    intent_service::submit(&state, Intent::End)?;
    Ok(Json(ActionResponse::accepted()))
}

/// Configure the intent routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/intents/register", post(register))
        .route("/intents/answer", post(answer))
        .route("/intents/replay", post(replay))
        .route("/intents/end", post(end))
}
