//! Request bodies for the UI→core intent routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Registration form payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterIntentRequest {
    /// Display name for the player.
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    /// Email identifying the player across sessions.
    #[validate(email)]
    pub email: String,
}

/// Free-text answer payload.
///
/// An empty `text` is deliberately allowed: it records the "no answer"
/// sentinel for the current round.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnswerIntentRequest {
    /// The player's input, verbatim.
    pub text: String,
}

/// Acknowledgement returned by intent routes.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Whether the intent was delivered to an active listener.
    pub accepted: bool,
}

impl ActionResponse {
    /// Intent was delivered.
    pub fn accepted() -> Self {
        Self { accepted: true }
    }
}
