//! Delivery of UI intents into the active game phase.

use tracing::warn;

use crate::{
    engine::{SharedState, dispatcher::Intent},
    error::ServiceError,
};

/// Publish `intent` to whichever phase is currently listening.
///
/// Publishing with nobody attached is a sequencing defect on the client's
/// side (or a race against a phase change); the intent is logged and dropped,
/// and the caller is told the current state refused it. The process never
/// crashes over it.
pub fn submit(state: &SharedState, intent: Intent) -> Result<(), ServiceError> {
    state.dispatcher().publish(intent).map_err(|err| {
        warn!(topic = ?err.topic, "dropping intent with no active listener");
        ServiceError::from(err)
    })
}
