//! Health probing.

use tracing::warn;

use crate::{dto::health::HealthResponse, engine::SharedState};

/// Respond with the current health payload while logging storage issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_player_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded().await {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
