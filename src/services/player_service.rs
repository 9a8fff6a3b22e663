//! Read-only projections of engine and player state.

use crate::{
    dao::models::canonical_email,
    dto::public::{PlayerSummary, StateResponse},
    engine::SharedState,
    error::ServiceError,
};

/// Current phase and degraded flag, for UI bootstrapping.
pub async fn current_state(state: &SharedState) -> StateResponse {
    StateResponse {
        phase: state.phase_snapshot().await.into(),
        degraded: state.is_degraded().await,
    }
}

/// Look up the persisted record behind `email`.
pub async fn get_player(state: &SharedState, email: &str) -> Result<PlayerSummary, ServiceError> {
    let canonical = canonical_email(email);
    if canonical.is_empty() {
        return Err(ServiceError::InvalidInput("email must not be empty".into()));
    }

    let store = state.require_player_store().await?;
    let Some(record) = store.find(canonical.clone()).await? else {
        return Err(ServiceError::NotFound(format!("no record for `{canonical}`")));
    };
    Ok(record.into())
}
