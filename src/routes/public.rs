//! Read-only public endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::public::{PlayerSummary, StateResponse},
    engine::SharedState,
    error::AppError,
    services::player_service,
};

#[utoipa::path(
    get,
    path = "/state",
    tag = "public",
    responses((status = 200, description = "Current engine state", body = StateResponse))
)]
/// Return the active session phase, for UI bootstrapping after a reload.
pub async fn get_state(State(state): State<SharedState>) -> Json<StateResponse> {
    Json(player_service::current_state(&state).await)
}

#[utoipa::path(
    get,
    path = "/players/{email}",
    tag = "public",
    params(("email" = String, Path, description = "Player email, canonicalized before lookup")),
    responses(
        (status = 200, description = "Player record summary", body = PlayerSummary),
        (status = 404, description = "No record for this identity")
    )
)]
/// Look up the persisted record for a player.
pub async fn get_player(
    State(state): State<SharedState>,
    Path(email): Path<String>,
) -> Result<Json<PlayerSummary>, AppError> {
    let summary = player_service::get_player(&state, &email).await?;
    Ok(Json(summary))
}

/// Configure the public routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/state", get(get_state))
        .route("/players/{email}", get(get_player))
}
