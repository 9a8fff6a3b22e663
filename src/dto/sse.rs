//! Payloads broadcast on the public SSE stream.

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::common::{AnswerSummary, SessionPhaseSnapshot};

/// Dispatched payload carried across the SSE channel.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// SSE event name, when one applies.
    pub event: Option<String>,
    /// Serialized event data.
    pub data: String,
}

impl ServerEvent {
    /// Build an event carrying a preserialized string payload.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Broadcast when the backend enters or leaves degraded mode.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatus {
    /// Whether the backend is currently degraded.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the session phase changes.
pub struct PhaseChangedEvent(pub SessionPhaseSnapshot);

/// Broadcast when a round is presented to the player.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundPresentedEvent {
    /// Play session this round belongs to.
    pub session: Uuid,
    /// Zero-based round index.
    pub index: usize,
    /// Total rounds in the session.
    pub total: usize,
    /// Media reference the UI should present.
    pub prompt: String,
}

/// Broadcast every second while the round clock runs.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClockTickEvent {
    /// Whole seconds remaining before the deadline.
    pub remaining_secs: u64,
}

/// Broadcast when the player asks to replay the current prompt.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundReplayEvent {
    /// Media reference the UI should replay.
    pub prompt: String,
}

/// Final summary broadcast when a session ends.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResultEvent {
    /// Points gained during this session; absent when the player had no
    /// prior score to measure against.
    pub score: Option<u32>,
    /// Cumulative score of the persisted record.
    pub total_score: u32,
    /// Answers recorded during this session, oldest first.
    pub answers: Vec<AnswerSummary>,
}
