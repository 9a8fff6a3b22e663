//! Read-only public projections.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::PlayerEntity,
    dto::{common::SessionPhaseSnapshot, format_system_time},
};

/// Current engine status returned by `GET /state`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StateResponse {
    /// Phase of the active session.
    pub phase: SessionPhaseSnapshot,
    /// Whether the backend is running without a storage backend.
    pub degraded: bool,
}

/// Public projection of a persisted player record.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Display name captured at registration.
    pub name: String,
    /// Canonical email identifying the player.
    pub email: String,
    /// Cumulative score across all playthroughs of the current task set.
    pub score: u32,
    /// Number of rounds already answered.
    pub rounds_answered: usize,
    /// Total rounds in the player's task set.
    pub rounds_total: usize,
    /// RFC-3339 creation timestamp.
    pub created_at: String,
    /// RFC-3339 last-update timestamp.
    pub updated_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(value: PlayerEntity) -> Self {
        Self {
            name: value.name,
            email: value.email,
            score: value.score,
            rounds_answered: value.answers.len(),
            rounds_total: value.tasks.len(),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}
