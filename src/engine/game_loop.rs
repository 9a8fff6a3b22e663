//! Top-level kiosk loop: Registration → Play → Result, forever.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::{rng, seq::SliceRandom};
use tokio::{sync::oneshot, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    dao::models::TaskEntity,
    engine::{
        PhaseSnapshot, SharedState,
        dispatcher::{Intent, IntentTopic},
        session::{PlaySession, SessionOutcome, UserProfile},
    },
    error::ServiceError,
    services::sse_events,
};

/// Delay before retrying after a failed session cycle.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Continuously reusable game loop.
///
/// Each cycle shuffles the configured level's task list, waits for a
/// registration, plays a session, persists its result, and displays it until
/// dismissed. Failures abort only the current cycle; the next one starts
/// from a clean registration phase.
pub struct GameLoop {
    state: SharedState,
}

impl GameLoop {
    /// Build a loop driving sessions against `state`.
    ///
    /// Configuration and the level table are taken from the state explicitly
    /// at each cycle; the loop keeps no ambient copies.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run forever. There is no exit condition.
    pub async fn run(self) {
        loop {
            if let Err(err) = self.play_once().await {
                warn!(error = %err, "session cycle failed; starting a fresh one");
                sleep(RETRY_DELAY).await;
            }
        }
    }

    /// One full Registration → Play → Result cycle.
    async fn play_once(&self) -> Result<(), ServiceError> {
        let game = self.state.config().game().clone();
        let mut tasks: Vec<TaskEntity> = self
            .state
            .config()
            .level_tasks(&game.level)
            .ok_or_else(|| {
                ServiceError::InvalidState(format!("unknown level `{}`", game.level))
            })?
            .to_vec();
        tasks.shuffle(&mut rng());

        let profile = self.await_registration().await?;
        info!(name = %profile.name, "player registered");

        let store = self.state.require_player_store().await?;
        let session = PlaySession::start(&store, profile, game, tasks).await?;
        let outcome = session.run(&self.state).await?;

        // Final persist of the session result; round progress has already
        // been saved incrementally.
        store
            .save_progress(
                outcome.record.email.clone(),
                outcome.record.score,
                outcome.record.answers.clone(),
            )
            .await?;

        self.await_result_dismissal(&outcome).await;
        Ok(())
    }

    /// Open the registration phase and suspend until a valid profile arrives.
    ///
    /// Incomplete registrations are ignored and the phase stays open; the
    /// player simply resubmits.
    async fn await_registration(&self) -> Result<UserProfile, ServiceError> {
        self.state.set_phase_snapshot(PhaseSnapshot::default()).await;
        sse_events::broadcast_phase_changed(&self.state).await;

        let (resolve, resolved) = oneshot::channel();
        let slot = Mutex::new(Some(resolve));
        self.state.dispatcher().attach(
            IntentTopic::Register,
            Arc::new(move |intent| {
                let Intent::Register { name, email } = intent else {
                    return;
                };
                let name = name.trim().to_string();
                let email = email.trim().to_string();
                if name.is_empty() || email.is_empty() {
                    debug!("ignoring registration with missing name or email");
                    return;
                }
                if let Ok(mut guard) = slot.lock() {
                    if let Some(resolve) = guard.take() {
                        let _ = resolve.send(UserProfile { name, email });
                    }
                }
            }),
        );

        let profile = resolved.await;
        self.state.dispatcher().detach(IntentTopic::Register);
        profile.map_err(|_| ServiceError::InvalidState("registration listener was replaced".into()))
    }

    /// Present the session result and suspend until the player dismisses it.
    async fn await_result_dismissal(&self, outcome: &SessionOutcome) {
        sse_events::broadcast_session_result(&self.state, outcome);

        let (resolve, resolved) = oneshot::channel();
        let slot = Mutex::new(Some(resolve));
        self.state.dispatcher().attach(
            IntentTopic::End,
            Arc::new(move |_| {
                if let Ok(mut guard) = slot.lock() {
                    if let Some(resolve) = guard.take() {
                        let _ = resolve.send(());
                    }
                }
            }),
        );

        let _ = resolved.await;
        self.state.dispatcher().detach(IntentTopic::End);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::player_store::{PlayerStore, memory::MemoryStore},
        engine::AppState,
        engine::state_machine::SessionPhase,
    };

    async fn publish_when_listening(state: &SharedState, intent: Intent) {
        loop {
            if state.dispatcher().publish(intent.clone()).is_ok() {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_persists_and_reopens_registration() {
        let state = AppState::new(AppConfig::default());
        let store: Arc<dyn PlayerStore> = Arc::new(MemoryStore::new());
        state.install_player_store(store.clone()).await;

        let game_loop = tokio::spawn({
            let state = state.clone();
            async move { GameLoop::new(state).run().await }
        });

        // An incomplete registration must be ignored without closing the
        // registration phase.
        publish_when_listening(
            &state,
            Intent::Register {
                name: "  ".into(),
                email: "a@b.com".into(),
            },
        )
        .await;
        publish_when_listening(
            &state,
            Intent::Register {
                name: "Al".into(),
                email: "A@B.com".into(),
            },
        )
        .await;

        // Rounds advance on every answer, right or wrong, so a fixed guess
        // works regardless of the shuffle; the session ends once all rounds
        // are exhausted.
        let total = AppConfig::default()
            .level_tasks("developer")
            .unwrap()
            .len();
        for _ in 0..total {
            publish_when_listening(&state, Intent::Answer { text: "git".into() }).await;
        }

        // Wait for the result phase, then dismiss it.
        loop {
            if state.phase_snapshot().await.phase == SessionPhase::Ended {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        let record = store.find("a@b.com".into()).await.unwrap().unwrap();
        assert_eq!(record.answers.len(), total);
        assert_eq!(record.name, "Al");

        publish_when_listening(&state, Intent::End).await;

        // The loop must come back around to a fresh registration phase.
        loop {
            if state.phase_snapshot().await.phase == SessionPhase::Registering {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        game_loop.abort();
    }
}
