//! Helpers building and broadcasting the core→UI event payloads.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::sse::{
        ClockTickEvent, PhaseChangedEvent, RoundPresentedEvent, RoundReplayEvent, ServerEvent,
        SessionResultEvent, SystemStatus,
    },
    engine::{SharedState, session::SessionOutcome},
};

const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_ROUND_PRESENTED: &str = "round.presented";
const EVENT_CLOCK_TICK: &str = "clock.tick";
const EVENT_ROUND_REPLAY: &str = "round.replay";
const EVENT_SESSION_RESULT: &str = "session.result";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the current phase snapshot to all subscribers.
pub async fn broadcast_phase_changed(state: &SharedState) {
    let snapshot = state.phase_snapshot().await;
    send_public_event(state, EVENT_PHASE_CHANGED, &PhaseChangedEvent(snapshot.into()));
}

/// Broadcast that a round is now being presented.
pub fn broadcast_round_presented(
    state: &SharedState,
    session: Uuid,
    index: usize,
    total: usize,
    prompt: &str,
) {
    let payload = RoundPresentedEvent {
        session,
        index,
        total,
        prompt: prompt.to_string(),
    };
    send_public_event(state, EVENT_ROUND_PRESENTED, &payload);
}

/// Broadcast the remaining time on the round clock.
pub fn broadcast_clock_tick(state: &SharedState, remaining_secs: u64) {
    let payload = ClockTickEvent { remaining_secs };
    send_public_event(state, EVENT_CLOCK_TICK, &payload);
}

/// Ask the UI to replay the current round's prompt.
pub fn broadcast_round_replay(state: &SharedState, prompt: &str) {
    let payload = RoundReplayEvent {
        prompt: prompt.to_string(),
    };
    send_public_event(state, EVENT_ROUND_REPLAY, &payload);
}

/// Broadcast the final summary of a finished session.
///
/// The session score is reported as a delta against the score the player
/// carried into the session, and is omitted entirely for first-time players;
/// answers are reported from the session's start index onward.
pub fn broadcast_session_result(state: &SharedState, outcome: &SessionOutcome) {
    let payload = SessionResultEvent {
        score: outcome
            .prev_score
            .map(|prev| outcome.record.score.saturating_sub(prev)),
        total_score: outcome.record.score,
        answers: outcome
            .record
            .answers
            .iter()
            .skip(outcome.start_index)
            .map(Into::into)
            .collect(),
    };
    send_public_event(state, EVENT_SESSION_RESULT, &payload);
}

/// Broadcast a degraded-mode flag change.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
