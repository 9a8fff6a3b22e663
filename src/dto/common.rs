//! Projections shared between REST responses and SSE payloads.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::AnswerEntity,
    engine::{PhaseSnapshot, state_machine::SessionPhase},
};

/// Coarse phase discriminant exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Waiting for a registration intent.
    Registering,
    /// A round is being played.
    Playing,
    /// The session result is being displayed.
    Ended,
}

/// Public projection of the active session's phase.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionPhaseSnapshot {
    /// Which phase the session is in.
    pub kind: PhaseKind,
    /// Zero-based index of the round being played, in the playing phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<usize>,
    /// Total round count of the active session, when one is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<usize>,
    /// Identifier of the active play session, when one is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Uuid>,
}

impl From<PhaseSnapshot> for SessionPhaseSnapshot {
    fn from(value: PhaseSnapshot) -> Self {
        let (kind, round) = match value.phase {
            SessionPhase::Registering => (PhaseKind::Registering, None),
            SessionPhase::Playing { round } => (PhaseKind::Playing, Some(round)),
            SessionPhase::Ended => (PhaseKind::Ended, None),
        };
        Self {
            kind,
            round,
            total_rounds: value.total_rounds,
            session: value.session,
        }
    }
}

/// Public projection of a recorded answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerSummary {
    /// Literal input, or `null` for the "no answer" sentinel.
    pub user_input: Option<String>,
    /// Whether the answer was accepted.
    pub is_right: bool,
}

impl From<&AnswerEntity> for AnswerSummary {
    fn from(value: &AnswerEntity) -> Self {
        Self {
            user_input: value.user_input.clone(),
            is_right: value.is_right,
        }
    }
}
